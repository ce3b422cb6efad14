//! Network prefix parsing
//!
//! A [`NetworkPrefix`] is a canonical CIDR block for either address family.
//! Host bits beyond the prefix length are always zero, whatever the input said.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a line is not a valid CIDR literal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed CIDR '{input}': {reason}")]
    MalformedInput { input: String, reason: String },
}

impl ParseError {
    fn malformed(input: &str, reason: impl Into<String>) -> Self {
        ParseError::MalformedInput {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Address family of a prefix or a query address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Detect the family of an address. IPv4-mapped IPv6 addresses stay IPv6.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Address width in bits
    pub fn max_len(&self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "ipv4"),
            AddressFamily::V6 => write!(f, "ipv6"),
        }
    }
}

/// A canonical network prefix (base address + prefix length)
///
/// Addresses are kept as host-order integers of the family's width so the
/// trie can walk them bit by bit from the most significant end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetworkPrefix {
    V4 { addr: u32, len: u8 },
    V6 { addr: u128, len: u8 },
}

impl NetworkPrefix {
    /// Build an IPv4 prefix, zeroing host bits. Lengths above 32 are rejected.
    pub fn v4(addr: Ipv4Addr, len: u8) -> Result<Self, ParseError> {
        if len > 32 {
            return Err(ParseError::malformed(
                &format!("{}/{}", addr, len),
                "prefix length exceeds 32",
            ));
        }
        Ok(NetworkPrefix::V4 {
            addr: u32::from(addr) & mask_u32(len),
            len,
        })
    }

    /// Build an IPv6 prefix, zeroing host bits. Lengths above 128 are rejected.
    pub fn v6(addr: Ipv6Addr, len: u8) -> Result<Self, ParseError> {
        if len > 128 {
            return Err(ParseError::malformed(
                &format!("{}/{}", addr, len),
                "prefix length exceeds 128",
            ));
        }
        Ok(NetworkPrefix::V6 {
            addr: u128::from(addr) & mask_u128(len),
            len,
        })
    }

    /// Parse one line of text (surrounding whitespace allowed) as a CIDR block.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(ParseError::malformed(line, "empty input"));
        }
        if !trimmed.contains('/') {
            return Err(ParseError::malformed(trimmed, "missing prefix length"));
        }
        let net = trimmed
            .parse::<IpNet>()
            .map_err(|e| ParseError::malformed(trimmed, e.to_string()))?;
        Ok(NetworkPrefix::from(net))
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            NetworkPrefix::V4 { .. } => AddressFamily::V4,
            NetworkPrefix::V6 { .. } => AddressFamily::V6,
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            NetworkPrefix::V4 { len, .. } | NetworkPrefix::V6 { len, .. } => *len,
        }
    }

    /// Network (base) address
    pub fn network(&self) -> IpAddr {
        match self {
            NetworkPrefix::V4 { addr, .. } => IpAddr::V4(Ipv4Addr::from(*addr)),
            NetworkPrefix::V6 { addr, .. } => IpAddr::V6(Ipv6Addr::from(*addr)),
        }
    }

    /// Whether `ip` falls inside this prefix. Addresses of the other family never match.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self, ip) {
            (NetworkPrefix::V4 { addr, len }, IpAddr::V4(q)) => {
                u32::from(*q) & mask_u32(*len) == *addr
            }
            (NetworkPrefix::V6 { addr, len }, IpAddr::V6(q)) => {
                u128::from(*q) & mask_u128(*len) == *addr
            }
            _ => false,
        }
    }

    pub fn to_ipnet(&self) -> IpNet {
        IpNet::from(*self)
    }
}

pub(crate) fn mask_u32(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(len.min(32)))
    }
}

pub(crate) fn mask_u128(len: u8) -> u128 {
    if len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(len.min(128)))
    }
}

impl From<IpNet> for NetworkPrefix {
    fn from(net: IpNet) -> Self {
        match net.trunc() {
            IpNet::V4(n) => NetworkPrefix::V4 {
                addr: u32::from(n.network()),
                len: n.prefix_len(),
            },
            IpNet::V6(n) => NetworkPrefix::V6 {
                addr: u128::from(n.network()),
                len: n.prefix_len(),
            },
        }
    }
}

impl From<NetworkPrefix> for IpNet {
    fn from(prefix: NetworkPrefix) -> Self {
        // lengths are validated on construction, so the fallbacks are unreachable
        match prefix {
            NetworkPrefix::V4 { addr, len } => Ipv4Net::new(Ipv4Addr::from(addr), len)
                .map(IpNet::V4)
                .unwrap_or_default(),
            NetworkPrefix::V6 { addr, len } => Ipv6Net::new(Ipv6Addr::from(addr), len)
                .map(IpNet::V6)
                .unwrap_or_default(),
        }
    }
}

impl FromStr for NetworkPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkPrefix::parse(s)
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len())
    }
}

impl Serialize for NetworkPrefix {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkPrefix {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NetworkPrefix::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v4() {
        let p = NetworkPrefix::parse("1.2.3.0/24").unwrap();
        assert_eq!(p.family(), AddressFamily::V4);
        assert_eq!(p.prefix_len(), 24);
        assert_eq!(p.to_string(), "1.2.3.0/24");
    }

    #[test]
    fn test_parse_v6() {
        let p = NetworkPrefix::parse("2001:db8::/32").unwrap();
        assert_eq!(p.family(), AddressFamily::V6);
        assert_eq!(p.prefix_len(), 32);
        assert_eq!(p.to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let p = NetworkPrefix::parse("  10.0.0.0/8\r\n").unwrap();
        assert_eq!(p.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_parse_canonicalizes_host_bits() {
        let p = NetworkPrefix::parse("10.1.2.3/8").unwrap();
        assert_eq!(p.to_string(), "10.0.0.0/8");

        let p = NetworkPrefix::parse("2001:db8::1/32").unwrap();
        assert_eq!(p.to_string(), "2001:db8::/32");

        let p = NetworkPrefix::parse("255.255.255.255/0").unwrap();
        assert_eq!(p.to_string(), "0.0.0.0/0");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in [
            "",
            "   ",
            "1.2.3.4",
            "1.2.3.0/",
            "1.2.3.0/33",
            "2001:db8::/129",
            "300.1.1.1/8",
            "not-a-cidr",
            "10.0.0.0/8 extra",
        ] {
            let res = NetworkPrefix::parse(input);
            assert!(
                matches!(res, Err(ParseError::MalformedInput { .. })),
                "expected error for {input:?}"
            );
        }
    }

    #[test]
    fn test_constructor_masks() {
        let p = NetworkPrefix::v4(Ipv4Addr::new(192, 168, 1, 77), 16).unwrap();
        assert_eq!(p.to_string(), "192.168.0.0/16");
        assert!(NetworkPrefix::v4(Ipv4Addr::new(1, 1, 1, 1), 33).is_err());
        assert!(NetworkPrefix::v6(Ipv6Addr::LOCALHOST, 129).is_err());
    }

    #[test]
    fn test_contains() {
        let p = NetworkPrefix::parse("10.1.0.0/16").unwrap();
        assert!(p.contains(&"10.1.255.255".parse().unwrap()));
        assert!(!p.contains(&"10.2.0.0".parse().unwrap()));
        // other family never matches
        assert!(!p.contains(&"::ffff:10.1.0.1".parse().unwrap()));

        let any = NetworkPrefix::parse("0.0.0.0/0").unwrap();
        assert!(any.contains(&"203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_ipnet_conversion() {
        let net: IpNet = "192.0.2.0/24".parse().unwrap();
        let p = NetworkPrefix::from(net);
        assert_eq!(p.to_ipnet(), net);
    }

    #[test]
    fn test_serde_as_string() {
        let p = NetworkPrefix::parse("2001:db8::/48").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"2001:db8::/48\"");
        let back: NetworkPrefix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
