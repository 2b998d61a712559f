//! IP header decoding
//!
//! IPv4 is fully decoded. IPv6 exists as a variant of [`IpHeader`] so consumers
//! can match exhaustively, but the frame decoder never produces it.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IP Protocol numbers the transport dispatcher knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// ICMP (1)
    ICMP,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// Any other protocol number
    Other(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::Other(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IpProtocol::ICMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            val => IpProtocol::Other(val),
        }
    }
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpProtocol::ICMP => write!(f, "ICMP (1)"),
            IpProtocol::TCP => write!(f, "TCP (6)"),
            IpProtocol::UDP => write!(f, "UDP (17)"),
            IpProtocol::Other(val) => write!(f, "Other ({})", val),
        }
    }
}

/// Decoded IPv4 header fields
///
/// The header length is only used to find the transport payload and is
/// returned separately by [`Ipv4Header::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// IP version (always 4 for a decoded header)
    pub version: u8,
    /// Identification
    pub identification: u16,
    /// Time to Live
    pub ttl: u8,
    /// Protocol number
    pub protocol: u8,
    /// Source IP address
    pub source: Ipv4Addr,
    /// Destination IP address
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Minimum IPv4 header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Parse an IPv4 header from the start of `data`
    ///
    /// Returns the header and its length in bytes (IHL × 4). `None` when fewer
    /// than 20 bytes are available, the version nibble is not 4, or the IHL
    /// is below the 5-word minimum.
    pub fn parse(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }

        let version = data[0] >> 4;
        let header_len = ((data[0] & 0x0F) as usize) * 4;

        if version != 4 || header_len < Self::MIN_HEADER_SIZE {
            return None;
        }

        let identification = u16::from_be_bytes([data[4], data[5]]);
        let ttl = data[8];
        let protocol = data[9];
        let source = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let destination = Ipv4Addr::new(data[16], data[17], data[18], data[19]);

        Some((
            Ipv4Header {
                version,
                identification,
                ttl,
                protocol,
                source,
                destination,
            },
            header_len,
        ))
    }

    /// Classified protocol number
    pub fn ip_protocol(&self) -> IpProtocol {
        IpProtocol::from_u8(self.protocol)
    }
}

/// IPv6 header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    /// Source IP address
    pub source: Ipv6Addr,
    /// Destination IP address
    pub destination: Ipv6Addr,
    /// Next header (protocol number)
    pub next_header: u8,
    /// Hop limit
    pub hop_limit: u8,
}

/// Network layer header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpHeader {
    V4(Ipv4Header),
    V6(Ipv6Header),
}

impl IpHeader {
    /// Source address
    pub fn source(&self) -> IpAddr {
        match self {
            IpHeader::V4(h) => IpAddr::V4(h.source),
            IpHeader::V6(h) => IpAddr::V6(h.source),
        }
    }

    /// Destination address
    pub fn destination(&self) -> IpAddr {
        match self {
            IpHeader::V4(h) => IpAddr::V4(h.destination),
            IpHeader::V6(h) => IpAddr::V6(h.destination),
        }
    }

    /// Protocol number (next header for IPv6)
    pub fn protocol(&self) -> u8 {
        match self {
            IpHeader::V4(h) => h.protocol,
            IpHeader::V6(h) => h.next_header,
        }
    }

    /// TTL (hop limit for IPv6)
    pub fn ttl(&self) -> u8 {
        match self {
            IpHeader::V4(h) => h.ttl,
            IpHeader::V6(h) => h.hop_limit,
        }
    }

    pub fn version_str(&self) -> &'static str {
        match self {
            IpHeader::V4(_) => "IPv4",
            IpHeader::V6(_) => "IPv6",
        }
    }

    /// The IPv4 header, if this is one
    pub fn as_v4(&self) -> Option<&Ipv4Header> {
        match self {
            IpHeader::V4(h) => Some(h),
            IpHeader::V6(_) => None,
        }
    }
}

impl fmt::Display for IpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- IP Header ---")?;
        writeln!(f, "Version: {}", self.version_str())?;
        writeln!(f, "Source IP: {}", self.source())?;
        writeln!(f, "Destination IP: {}", self.destination())?;
        if let IpHeader::V4(h) = self {
            writeln!(f, "Identification: 0x{:04x}", h.identification)?;
        }
        writeln!(f, "TTL: {}", self.ttl())?;
        write!(f, "Protocol: {}", IpProtocol::from_u8(self.protocol()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Vec<u8> {
        vec![
            0x45, 0x00, 0x00, 0x1C, // version/IHL, ToS, total length
            0xBE, 0xEF, 0x40, 0x00, // identification, flags/fragment
            0x40, 0x11, 0x00, 0x00, // TTL 64, UDP, checksum
            192, 168, 1, 1, // source
            10, 0, 0, 2, // destination
        ]
    }

    #[test]
    fn test_ip_protocol_conversion() {
        assert_eq!(IpProtocol::TCP.to_u8(), 6);
        assert_eq!(IpProtocol::UDP.to_u8(), 17);
        assert_eq!(IpProtocol::from_u8(1), IpProtocol::ICMP);
        assert_eq!(IpProtocol::from_u8(47), IpProtocol::Other(47));
    }

    #[test]
    fn test_ipv4_parse() {
        let (header, header_len) = Ipv4Header::parse(&sample_header()).unwrap();
        assert_eq!(header_len, 20);
        assert_eq!(header.version, 4);
        assert_eq!(header.identification, 0xBEEF);
        assert_eq!(header.ttl, 64);
        assert_eq!(header.protocol, 17);
        assert_eq!(header.ip_protocol(), IpProtocol::UDP);
        assert_eq!(header.source, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(header.destination, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn test_ipv4_parse_reports_options_length() {
        let mut data = sample_header();
        data[0] = 0x46; // IHL = 6
        data.extend_from_slice(&[0x01, 0x01, 0x01, 0x00]);

        let (_, header_len) = Ipv4Header::parse(&data).unwrap();
        assert_eq!(header_len, 24);
    }

    #[test]
    fn test_ipv4_parse_rejects_bad_version() {
        let mut data = sample_header();
        data[0] = 0x65;
        assert!(Ipv4Header::parse(&data).is_none());
    }

    #[test]
    fn test_ipv4_parse_rejects_short_ihl() {
        let mut data = sample_header();
        data[0] = 0x44;
        assert!(Ipv4Header::parse(&data).is_none());
    }

    #[test]
    fn test_ipv4_parse_truncated() {
        assert!(Ipv4Header::parse(&sample_header()[..19]).is_none());
    }

    #[test]
    fn test_ip_header_accessors() {
        let (v4, _) = Ipv4Header::parse(&sample_header()).unwrap();
        let header = IpHeader::V4(v4);
        assert_eq!(header.source().to_string(), "192.168.1.1");
        assert_eq!(header.destination().to_string(), "10.0.0.2");
        assert_eq!(header.protocol(), 17);
        assert_eq!(header.ttl(), 64);
        assert_eq!(header.version_str(), "IPv4");
        assert!(header.as_v4().is_some());

        let v6 = IpHeader::V6(Ipv6Header {
            source: Ipv6Addr::LOCALHOST,
            destination: Ipv6Addr::LOCALHOST,
            next_header: 58,
            hop_limit: 255,
        });
        assert_eq!(v6.version_str(), "IPv6");
        assert_eq!(v6.ttl(), 255);
        assert!(v6.as_v4().is_none());
    }

    #[test]
    fn test_ip_header_display() {
        let (v4, _) = Ipv4Header::parse(&sample_header()).unwrap();
        let text = IpHeader::V4(v4).to_string();
        assert!(text.contains("Source IP: 192.168.1.1"));
        assert!(text.contains("Protocol: UDP (17)"));
    }
}
