pub struct Utils;

impl Utils {
    /// Parse an address:port string as printed by `ss`.
    ///
    /// Handles multiple address formats:
    /// - IPv4: "127.0.0.1:3000", "127.0.0.53%lo:53" or "*:8080"
    /// - IPv6: "\[::1]:3000", "\[fe80::1]%eth0:546" or "\[::ffff:127.0.0.1]:80"
    pub fn parse_address(address: &str) -> Option<(String, u16)> {
        let last_colon = address.rfind(':')?;
        let addr = &address[..last_colon];
        let port: u16 = address[last_colon + 1..].parse().ok()?;

        if addr.starts_with('[') && !addr.contains(']') {
            return None;
        }

        let addr = if addr.is_empty() { "*" } else { addr };
        Some((addr.to_string(), port))
    }

    /// Whether an `ss` local address belongs to an IPv6 socket.
    ///
    /// `ss` prints `*` for an IPv6 wildcard socket that also accepts IPv4.
    pub fn is_ipv6_address(addr: &str) -> bool {
        addr.starts_with('[') || addr == "*"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_address() {
        let (addr, port) = Utils::parse_address("127.0.0.1:3000").unwrap();
        assert_eq!(addr, "127.0.0.1");
        assert_eq!(port, 3000);

        let (addr, port) = Utils::parse_address("*:8080").unwrap();
        assert_eq!(addr, "*");
        assert_eq!(port, 8080);

        let (addr, port) = Utils::parse_address("127.0.0.53%lo:53").unwrap();
        assert_eq!(addr, "127.0.0.53%lo");
        assert_eq!(port, 53);
    }

    #[test]
    fn test_parse_ipv6_address() {
        let (addr, port) = Utils::parse_address("[::1]:3000").unwrap();
        assert_eq!(addr, "[::1]");
        assert_eq!(port, 3000);

        let (addr, port) = Utils::parse_address("[fe80::1]%eth0:546").unwrap();
        assert_eq!(addr, "[fe80::1]%eth0");
        assert_eq!(port, 546);
        assert!(Utils::is_ipv6_address(&addr));
    }

    #[test]
    fn test_parse_invalid_address() {
        assert!(Utils::parse_address("0.0.0.0:*").is_none());
        assert!(Utils::parse_address("[::1:80").is_none());
        assert!(Utils::parse_address("nonsense").is_none());
    }
}
