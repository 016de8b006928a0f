//! Memoized PID resolution.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::ProcessLookup;
use crate::ports::ProcessReaderPort;

/// Resolves PIDs to processes, reading each PID at most once per run.
///
/// A failed read is cached as `Unknown` too, so a process that exits
/// mid-run reports consistently.
pub struct ProcessResolver<R: ProcessReaderPort> {
    reader: R,
    cache: RwLock<HashMap<u32, ProcessLookup>>,
}

impl<R: ProcessReaderPort> ProcessResolver<R> {
    /// Create a new resolver with the given reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve one PID.
    pub async fn resolve(&self, pid: u32) -> ProcessLookup {
        let cached = self.cache.read().get(&pid).cloned();
        if let Some(lookup) = cached {
            return lookup;
        }

        let lookup = match self.reader.read(pid).await {
            Some(info) => ProcessLookup::Found(info),
            None => {
                debug!(pid = pid, "Process unavailable, reporting as unknown");
                ProcessLookup::Unknown { pid }
            }
        };

        self.cache.write().insert(pid, lookup.clone());
        lookup
    }

    /// Resolve every PID in `pids`.
    pub async fn resolve_all<I>(&self, pids: I) -> HashMap<u32, ProcessLookup>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut resolved = HashMap::new();
        for pid in pids {
            let lookup = self.resolve(pid).await;
            resolved.insert(pid, lookup);
        }
        resolved
    }

    /// Number of PIDs resolved so far.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Forget all cached lookups, starting a fresh run.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}
