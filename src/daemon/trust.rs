//! Trusted sender policy
//!
//! Broadcasts share the radio segment with every other device on the LAN, so
//! only datagrams from configured peers are handed to the parser.
//!
//! Accepted entry forms:
//! - exact address: `192.168.1.50`, `fe80::1`
//! - CIDR block: `192.168.1.0/24`, `fd00::/8`
//! - dotted IPv4 prefix: `192.168.1.` (same as `/24`), `10.` (same as `/8`)

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustedSender {
    Address(IpAddr),
    Subnet { network: IpAddr, prefix_len: u8 },
}

impl TrustedSender {
    pub fn parse(entry: &str) -> AppResult<Self> {
        let entry = entry.trim();
        let invalid = || AppError::invalid_value("listener.trusted_senders", entry);

        if let Some((network, len)) = entry.split_once('/') {
            let network: IpAddr = network.parse().map_err(|_| invalid())?;
            let prefix_len: u8 = len.parse().map_err(|_| invalid())?;
            let max = if network.is_ipv4() { 32 } else { 128 };
            if prefix_len > max {
                return Err(invalid());
            }
            return Ok(TrustedSender::Subnet { network, prefix_len });
        }

        if let Some(prefix) = entry.strip_suffix('.') {
            let octets = prefix
                .split('.')
                .map(|part| part.parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            if octets.is_empty() || octets.len() > 3 {
                return Err(invalid());
            }
            let mut full = [0u8; 4];
            full[..octets.len()].copy_from_slice(&octets);
            return Ok(TrustedSender::Subnet {
                network: IpAddr::V4(Ipv4Addr::from(full)),
                prefix_len: (octets.len() * 8) as u8,
            });
        }

        entry.parse().map(TrustedSender::Address).map_err(|_| invalid())
    }

    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            TrustedSender::Address(addr) => addr.to_canonical() == *ip,
            TrustedSender::Subnet { network, prefix_len } => match (network, ip) {
                (IpAddr::V4(net), IpAddr::V4(ip)) => {
                    let mask = match *prefix_len {
                        0 => 0,
                        len => u32::MAX << (32 - u32::from(len)),
                    };
                    u32::from(*net) & mask == u32::from(*ip) & mask
                }
                (IpAddr::V6(net), IpAddr::V6(ip)) => {
                    let mask = match *prefix_len {
                        0 => 0,
                        len => u128::MAX << (128 - u32::from(len)),
                    };
                    u128::from(*net) & mask == u128::from(*ip) & mask
                }
                _ => false,
            },
        }
    }
}

impl fmt::Display for TrustedSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustedSender::Address(addr) => write!(f, "{}", addr),
            TrustedSender::Subnet {
                network,
                prefix_len,
            } => write!(f, "{}/{}", network, prefix_len),
        }
    }
}

/// The full set of trusted senders. Empty trusts nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustPolicy {
    entries: Vec<TrustedSender>,
}

impl TrustPolicy {
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> AppResult<Self> {
        let entries = entries
            .iter()
            .map(|e| TrustedSender::parse(e.as_ref()))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn allows(&self, sender: &IpAddr) -> bool {
        let sender = sender.to_canonical();
        self.entries.iter().any(|entry| entry.matches(&sender))
    }

    pub fn entries(&self) -> &[TrustedSender] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_exact_address() {
        let policy = TrustPolicy::parse(&["192.168.1.50"]).unwrap();
        assert!(policy.allows(&ip("192.168.1.50")));
        assert!(!policy.allows(&ip("192.168.1.51")));
    }

    #[test]
    fn test_cidr_block() {
        let policy = TrustPolicy::parse(&["192.168.1.0/24"]).unwrap();
        assert!(policy.allows(&ip("192.168.1.1")));
        assert!(policy.allows(&ip("192.168.1.254")));
        assert!(!policy.allows(&ip("192.168.2.1")));
        assert!(!policy.allows(&ip("10.0.0.1")));
    }

    #[test]
    fn test_dotted_prefix() {
        let sender = TrustedSender::parse("192.168.").unwrap();
        assert_eq!(sender.to_string(), "192.168.0.0/16");

        let policy = TrustPolicy::parse(&["10."]).unwrap();
        assert!(policy.allows(&ip("10.200.3.4")));
        assert!(!policy.allows(&ip("11.0.0.1")));
    }

    #[test]
    fn test_ipv4_mapped_sender() {
        let policy = TrustPolicy::parse(&["127.0.0.1"]).unwrap();
        assert!(policy.allows(&ip("::ffff:127.0.0.1")));
    }

    #[test]
    fn test_ipv6_subnet() {
        let policy = TrustPolicy::parse(&["fd00::/8"]).unwrap();
        assert!(policy.allows(&ip("fd12:3456::1")));
        assert!(!policy.allows(&ip("fe80::1")));
        assert!(!policy.allows(&ip("192.168.1.1")));
    }

    #[test]
    fn test_empty_policy_trusts_nobody() {
        let policy = TrustPolicy::parse::<&str>(&[]).unwrap();
        assert!(!policy.allows(&ip("127.0.0.1")));
    }

    #[test]
    fn test_invalid_entries() {
        for entry in ["", "nursery", "192.168.1.0/33", "300.1.", "1.2.3.4.", "::1/200"] {
            assert!(TrustedSender::parse(entry).is_err(), "{entry} should be rejected");
        }
    }
}
