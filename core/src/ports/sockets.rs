//! Socket enumerator port (interface).

use crate::domain::ListeningSocket;
use crate::error::Result;

/// Port for reading the kernel's listening-socket table.
///
/// Implementations skip individual malformed entries and only fail when the
/// table cannot be read at all.
pub trait SocketEnumeratorPort: Send + Sync {
    /// Enumerate all listening TCP and UDP sockets.
    fn enumerate(&self) -> impl std::future::Future<Output = Result<Vec<ListeningSocket>>> + Send;
}
