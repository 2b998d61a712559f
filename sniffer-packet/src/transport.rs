//! Transport layer header variants

use std::fmt;

use crate::icmp::IcmpHeader;
use crate::tcp::TcpHeader;
use crate::udp::UdpHeader;

/// Transport layer header
///
/// The decoder only records a transport layer for protocol numbers it
/// recognizes; `Unknown` is available to consumers that build packets from
/// other sources and want to keep the protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHeader {
    Tcp(TcpHeader),
    Udp(UdpHeader),
    Icmp(IcmpHeader),
    Unknown(u8),
}

impl TransportHeader {
    pub fn protocol_name(&self) -> &'static str {
        match self {
            TransportHeader::Tcp(_) => "TCP",
            TransportHeader::Udp(_) => "UDP",
            TransportHeader::Icmp(_) => "ICMP",
            TransportHeader::Unknown(_) => "Unknown",
        }
    }

    /// Source and destination ports, for port-based protocols
    pub fn ports(&self) -> Option<(u16, u16)> {
        match self {
            TransportHeader::Tcp(h) => Some((h.source_port, h.destination_port)),
            TransportHeader::Udp(h) => Some((h.source_port, h.destination_port)),
            TransportHeader::Icmp(_) | TransportHeader::Unknown(_) => None,
        }
    }

    pub fn as_tcp(&self) -> Option<&TcpHeader> {
        match self {
            TransportHeader::Tcp(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_udp(&self) -> Option<&UdpHeader> {
        match self {
            TransportHeader::Udp(h) => Some(h),
            _ => None,
        }
    }
}

impl fmt::Display for TransportHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportHeader::Tcp(h) => fmt::Display::fmt(h, f),
            TransportHeader::Udp(h) => fmt::Display::fmt(h, f),
            TransportHeader::Icmp(h) => fmt::Display::fmt(h, f),
            TransportHeader::Unknown(proto) => {
                writeln!(f, "--- Transport Header ---")?;
                write!(f, "Protocol: {}", proto)
            }
        }
    }
}
