//! Process reader port (interface).

use crate::domain::ProcessInfo;

/// Port for reading process metadata.
pub trait ProcessReaderPort: Send + Sync {
    /// Read a process by PID.
    ///
    /// Returns `None` when the process is gone or its metadata is unreadable.
    fn read(&self, pid: u32) -> impl std::future::Future<Output = Option<ProcessInfo>> + Send;
}
