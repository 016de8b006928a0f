//! Socket enumerator adapters.
//!
//! `ss` is preferred; the procfs socket tables are read when `ss` is
//! missing or fails.

mod proc_net;
mod ss;
mod utils;

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::domain::ListeningSocket;
use crate::error::{Error, Result};
use crate::ports::SocketEnumeratorPort;

pub use proc_net::ProcfsEnumerator;
pub use ss::SsEnumerator;

/// Which socket table reader to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketSource {
    /// `ss` if installed, otherwise procfs.
    #[default]
    Auto,
    Ss,
    Procfs,
}

/// The socket enumerator used by the audit pipeline.
pub struct SocketEnumerator {
    source: SocketSource,
    proc_root: PathBuf,
}

impl SocketEnumerator {
    pub fn new(source: SocketSource) -> Self {
        Self {
            source,
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Use an alternative proc root for the procfs reader (for testing).
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    pub fn source(&self) -> SocketSource {
        self.source
    }

    /// Enumerate all listening TCP and UDP sockets.
    pub async fn enumerate(&self) -> Result<Vec<ListeningSocket>> {
        if !cfg!(target_os = "linux") && self.proc_root == PathBuf::from("/proc") {
            return Err(Error::UnsupportedPlatform(std::env::consts::OS.to_string()));
        }

        let procfs = || ProcfsEnumerator::with_root(&self.proc_root);

        match self.source {
            SocketSource::Procfs => procfs().enumerate().await,
            SocketSource::Ss => SsEnumerator::locate()
                .ok_or_else(|| Error::CommandFailed("ss not found".to_string()))?
                .enumerate()
                .await,
            SocketSource::Auto => {
                let Some(ss) = SsEnumerator::locate() else {
                    debug!("ss not found, reading procfs socket tables");
                    return procfs().enumerate().await;
                };
                match ss.enumerate().await {
                    Err(e @ (Error::CommandFailed(_) | Error::ParseError(_))) => {
                        warn!(error = %e, path = %ss.path().display(), "ss failed, falling back to procfs");
                        procfs().enumerate().await
                    }
                    other => other,
                }
            }
        }
    }
}

impl Default for SocketEnumerator {
    fn default() -> Self {
        Self::new(SocketSource::Auto)
    }
}

impl SocketEnumeratorPort for SocketEnumerator {
    async fn enumerate(&self) -> Result<Vec<ListeningSocket>> {
        SocketEnumerator::enumerate(self).await
    }
}

/// Internal trait for the concrete table readers.
trait Enumerator: Send + Sync {
    fn enumerate(&self) -> impl std::future::Future<Output = Result<Vec<ListeningSocket>>> + Send;
}

/// Finds an executable in the given paths.
pub(crate) fn find_executable(paths: &[&str]) -> Option<PathBuf> {
    paths.iter().map(PathBuf::from).find(|p| p.exists())
}
