//! Frozen view of host state for one audit run.

use std::collections::HashMap;

use super::{ListeningSocket, ProcessLookup, RegistryState};

/// Everything the correlator needs, gathered once and never mutated.
#[derive(Debug, Clone)]
pub struct HostSnapshot {
    pub sockets: Vec<ListeningSocket>,

    /// Resolution result for every PID that owns a socket.
    pub processes: HashMap<u32, ProcessLookup>,

    pub registry: RegistryState,
}

impl HostSnapshot {
    pub fn new(
        sockets: Vec<ListeningSocket>,
        processes: HashMap<u32, ProcessLookup>,
        registry: RegistryState,
    ) -> Self {
        Self {
            sockets,
            processes,
            registry,
        }
    }

    /// Lookup for `pid`, treating PIDs that were never resolved as unknown.
    pub fn process(&self, pid: u32) -> ProcessLookup {
        self.processes
            .get(&pid)
            .cloned()
            .unwrap_or(ProcessLookup::Unknown { pid })
    }
}
