//! Listening socket model.

use serde::{Deserialize, Serialize};

/// Socket protocol as reported by the kernel, including the IP version.
///
/// The variant order is the display order in report headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Tcp6,
    Udp,
    Udp6,
}

/// Transport family of a protocol, ignoring the IP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Protocol {
    /// Build a protocol from its transport and IP version.
    pub fn new(transport: Transport, ipv6: bool) -> Self {
        match (transport, ipv6) {
            (Transport::Tcp, false) => Protocol::Tcp,
            (Transport::Tcp, true) => Protocol::Tcp6,
            (Transport::Udp, false) => Protocol::Udp,
            (Transport::Udp, true) => Protocol::Udp6,
        }
    }

    /// Normalize `tcp6` to `tcp` and `udp6` to `udp`.
    pub fn family(&self) -> Transport {
        match self {
            Protocol::Tcp | Protocol::Tcp6 => Transport::Tcp,
            Protocol::Udp | Protocol::Udp6 => Transport::Udp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Tcp6 => "tcp6",
            Protocol::Udp => "udp",
            Protocol::Udp6 => "udp6",
        }
    }
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }

    /// Parse a transport name such as `tcp` or `udp` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" => Some(Transport::Tcp),
            "udp" => Some(Transport::Udp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A bound socket in the listening state.
///
/// `pid` is `None` when the owner could not be seen, usually because the
/// caller lacks the privilege to inspect another user's sockets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListeningSocket {
    pub port: u16,
    pub protocol: Protocol,
    pub pid: Option<u32>,
    /// Local bind address (e.g. "0.0.0.0", "[::]", "*").
    pub address: String,
}

impl ListeningSocket {
    pub fn new(port: u16, protocol: Protocol, pid: Option<u32>) -> Self {
        Self {
            port,
            protocol,
            pid,
            address: String::new(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }
}
