//! TCP header decoding
//!
//! Only the fixed 20-byte part of the header is decoded; options are skipped.

use std::fmt;

/// TCP flags byte
///
/// Keeps the raw byte so every bit seen on the wire survives decoding,
/// including ECE and CWR which are not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    /// FIN - No more data from sender
    pub const FIN: TcpFlags = TcpFlags(0x01);
    /// SYN - Synchronize sequence numbers
    pub const SYN: TcpFlags = TcpFlags(0x02);
    /// RST - Reset the connection
    pub const RST: TcpFlags = TcpFlags(0x04);
    /// PSH - Push function
    pub const PSH: TcpFlags = TcpFlags(0x08);
    /// ACK - Acknowledgment field is significant
    pub const ACK: TcpFlags = TcpFlags(0x10);
    /// URG - Urgent pointer field is significant
    pub const URG: TcpFlags = TcpFlags(0x20);

    /// No flags set
    pub const NONE: TcpFlags = TcpFlags(0x00);

    /// Rendering order and labels
    const NAMED: [(TcpFlags, &'static str); 6] = [
        (Self::FIN, "FIN"),
        (Self::SYN, "SYN"),
        (Self::RST, "RST"),
        (Self::PSH, "PSH"),
        (Self::ACK, "ACK"),
        (Self::URG, "URG"),
    ];

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is set
    pub fn contains(self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn fin(self) -> bool {
        self.contains(Self::FIN)
    }

    pub fn syn(self) -> bool {
        self.contains(Self::SYN)
    }

    pub fn rst(self) -> bool {
        self.contains(Self::RST)
    }

    pub fn psh(self) -> bool {
        self.contains(Self::PSH)
    }

    pub fn ack(self) -> bool {
        self.contains(Self::ACK)
    }

    pub fn urg(self) -> bool {
        self.contains(Self::URG)
    }
}

impl std::ops::BitOr for TcpFlags {
    type Output = TcpFlags;

    fn bitor(self, rhs: TcpFlags) -> TcpFlags {
        TcpFlags(self.0 | rhs.0)
    }
}

/// Space separated flag names in FIN,SYN,RST,PSH,ACK,URG order, `NONE` if empty
impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

/// Decoded TCP header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Sequence number
    pub sequence_number: u32,
    /// Acknowledgment number
    pub acknowledgment_number: u32,
    /// TCP flags
    pub flags: TcpFlags,
}

impl TcpHeader {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Parse the fixed part of a TCP header
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }

        Some(TcpHeader {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            sequence_number: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            acknowledgment_number: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            flags: TcpFlags(data[13]),
        })
    }
}

impl fmt::Display for TcpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- TCP Header ---")?;
        writeln!(f, "Source Port: {}", self.source_port)?;
        writeln!(f, "Destination Port: {}", self.destination_port)?;
        writeln!(f, "Sequence Number: {}", self.sequence_number)?;
        writeln!(f, "Acknowledgment Number: {}", self.acknowledgment_number)?;
        write!(f, "Flags: {}", self.flags)
    }
}
