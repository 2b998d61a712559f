//! ICMP marker

use std::fmt;

/// ICMP is recognized but none of its fields are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IcmpHeader;

impl IcmpHeader {
    /// Type, code and checksum must be present for the marker to be recorded
    pub const MIN_HEADER_SIZE: usize = 4;

    pub fn parse(data: &[u8]) -> Option<Self> {
        (data.len() >= Self::MIN_HEADER_SIZE).then_some(IcmpHeader)
    }
}

impl fmt::Display for IcmpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- ICMP Header ---")?;
        write!(f, "Protocol: ICMP")
    }
}
