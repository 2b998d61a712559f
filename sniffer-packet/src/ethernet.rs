//! Ethernet II header decoding
//!
//! Only the fixed 14-byte header is decoded. The ether-type is classified for
//! display purposes; IPv4 is the only payload the decoder follows further.

use std::fmt;

/// Classification of the Ethernet type field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// IPv6 (0x86DD)
    IPv6,
    /// Anything else
    Unknown(u16),
}

impl EtherType {
    /// Convert EtherType to u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => 0x0800,
            EtherType::ARP => 0x0806,
            EtherType::IPv6 => 0x86DD,
            EtherType::Unknown(val) => val,
        }
    }

    /// Create EtherType from u16 value
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0800 => EtherType::IPv4,
            0x0806 => EtherType::ARP,
            0x86DD => EtherType::IPv6,
            val => EtherType::Unknown(val),
        }
    }

    /// Short protocol label
    pub fn name(self) -> &'static str {
        match self {
            EtherType::IPv4 => "IPv4",
            EtherType::ARP => "ARP",
            EtherType::IPv6 => "IPv6",
            EtherType::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    /// Zero MAC address (00:00:00:00:00:00)
    pub const ZERO: MacAddress = MacAddress([0x00; 6]);

    /// Create a new MAC address from a byte array
    pub fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Create a MAC address from a slice
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.try_into().ok()?;
        Some(MacAddress(bytes))
    }

    /// Get the MAC address as a byte array
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Check if this is a broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Check if this is a multicast address (bit 0 of first octet is 1)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

/// Decoded Ethernet II header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination MAC address
    pub destination: MacAddress,
    /// Source MAC address
    pub source: MacAddress,
    /// Raw type field, host order
    pub ether_type: u16,
}

impl EthernetHeader {
    /// Ethernet header size (dst + src + type)
    pub const SIZE: usize = 14;

    /// Parse the fixed header from the start of `data`
    ///
    /// Returns `None` when fewer than [`Self::SIZE`] bytes are available.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }

        let destination = MacAddress::from_slice(&data[0..6])?;
        let source = MacAddress::from_slice(&data[6..12])?;
        let ether_type = u16::from_be_bytes([data[12], data[13]]);

        Some(EthernetHeader {
            destination,
            source,
            ether_type,
        })
    }

    /// Classify the type field
    pub fn kind(&self) -> EtherType {
        EtherType::from_u16(self.ether_type)
    }
}

impl fmt::Display for EthernetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Ethernet Header ---")?;
        writeln!(f, "Source MAC: {}", self.source)?;
        writeln!(f, "Destination MAC: {}", self.destination)?;
        write!(f, "Type: 0x{:04x} ({})", self.ether_type, self.kind())
    }
}
