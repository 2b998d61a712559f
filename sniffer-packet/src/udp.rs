//! UDP header decoding

use std::fmt;

/// Decoded UDP header fields
///
/// `length` is the value declared on the wire; it is not checked against the
/// number of bytes actually captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Length (header + data) as declared
    pub length: u16,
}

impl UdpHeader {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Parse a UDP header from the start of `data`
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        Some(UdpHeader {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
        })
    }
}

impl fmt::Display for UdpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- UDP Header ---")?;
        writeln!(f, "Source Port: {}", self.source_port)?;
        writeln!(f, "Destination Port: {}", self.destination_port)?;
        write!(f, "Length: {} bytes", self.length)
    }
}
