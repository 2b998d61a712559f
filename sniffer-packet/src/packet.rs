//! Decoded packet aggregate

use bytes::Bytes;
use sniffer_core::Timestamp;
use std::fmt;

use crate::ethernet::EthernetHeader;
use crate::ip::IpHeader;
use crate::transport::TransportHeader;

/// One captured frame and every layer that could be decoded from it
///
/// Layers are stacked: a higher layer is only ever present when all the
/// layers beneath it are. Values are built once by [`crate::decode`] and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPacket {
    timestamp: Timestamp,
    captured_length: u32,
    actual_length: u32,
    link_layer: Option<EthernetHeader>,
    network_layer: Option<IpHeader>,
    transport_layer: Option<TransportHeader>,
    raw_data: Bytes,
}

impl CapturedPacket {
    /// Metadata-only packet; layers are attached by the decoder
    pub(crate) fn new(timestamp: Timestamp, actual_length: u32, raw_data: Bytes) -> Self {
        let captured_length = raw_data.len() as u32;
        Self {
            timestamp,
            captured_length,
            actual_length: actual_length.max(captured_length),
            link_layer: None,
            network_layer: None,
            transport_layer: None,
            raw_data,
        }
    }

    pub(crate) fn with_link_layer(mut self, header: EthernetHeader) -> Self {
        self.link_layer = Some(header);
        self
    }

    pub(crate) fn with_network_layer(mut self, header: IpHeader) -> Self {
        debug_assert!(self.link_layer.is_some());
        self.network_layer = Some(header);
        self
    }

    pub(crate) fn with_transport_layer(mut self, header: TransportHeader) -> Self {
        debug_assert!(self.network_layer.is_some());
        self.transport_layer = Some(header);
        self
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Bytes actually copied into the buffer
    pub fn captured_length(&self) -> u32 {
        self.captured_length
    }

    /// Length of the frame on the wire
    pub fn actual_length(&self) -> u32 {
        self.actual_length
    }

    /// True when the snap length cut the frame short
    pub fn is_truncated(&self) -> bool {
        self.captured_length < self.actual_length
    }

    pub fn link_layer(&self) -> Option<&EthernetHeader> {
        self.link_layer.as_ref()
    }

    pub fn network_layer(&self) -> Option<&IpHeader> {
        self.network_layer.as_ref()
    }

    pub fn transport_layer(&self) -> Option<&TransportHeader> {
        self.transport_layer.as_ref()
    }

    /// The captured bytes, `captured_length` long
    pub fn raw_data(&self) -> &Bytes {
        &self.raw_data
    }

    /// Number of decoded layers (0 to 3)
    pub fn layer_count(&self) -> usize {
        self.link_layer.is_some() as usize
            + self.network_layer.is_some() as usize
            + self.transport_layer.is_some() as usize
    }

    /// One-line description of the highest decoded layers
    pub fn summary(&self) -> String {
        match (&self.link_layer, &self.network_layer, &self.transport_layer) {
            (_, Some(ip), Some(transport)) => match transport.ports() {
                Some((src_port, dst_port)) => format!(
                    "{}:{} -> {}:{} [{}]",
                    ip.source(),
                    src_port,
                    ip.destination(),
                    dst_port,
                    transport.protocol_name()
                ),
                None => format!(
                    "{} -> {} [{}]",
                    ip.source(),
                    ip.destination(),
                    transport.protocol_name()
                ),
            },
            (_, Some(ip), None) => format!(
                "{} -> {} [{}]",
                ip.source(),
                ip.destination(),
                ip.version_str()
            ),
            (Some(eth), None, _) => {
                format!("{} -> {} [{}]", eth.source, eth.destination, eth.kind())
            }
            (None, None, _) => "Packet without identified headers".to_string(),
        }
    }

    /// Table row for list-style front ends
    pub fn row(&self) -> PacketRow {
        let (source, destination) = match (&self.link_layer, &self.network_layer) {
            (_, Some(ip)) => (ip.source().to_string(), ip.destination().to_string()),
            (Some(eth), None) => (eth.source.to_string(), eth.destination.to_string()),
            (None, None) => ("?".to_string(), "?".to_string()),
        };

        let protocol = match (&self.link_layer, &self.network_layer, &self.transport_layer) {
            (_, _, Some(transport)) => transport.protocol_name(),
            (_, Some(ip), None) => ip.version_str(),
            (Some(eth), None, _) => eth.kind().name(),
            (None, None, _) => "-",
        };

        PacketRow {
            source,
            destination,
            protocol: protocol.to_string(),
            length: self.actual_length,
        }
    }
}

impl fmt::Display for CapturedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========== CAPTURED PACKET ==========")?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(f, "Captured length: {} bytes", self.captured_length)?;
        writeln!(f, "Actual length: {} bytes", self.actual_length)?;

        if let Some(eth) = &self.link_layer {
            writeln!(f, "\n{}", eth)?;
        }
        if let Some(ip) = &self.network_layer {
            writeln!(f, "\n{}", ip)?;
        }
        if let Some(transport) = &self.transport_layer {
            writeln!(f, "\n{}", transport)?;
        }

        write!(f, "=====================================")
    }
}

/// Source, destination, protocol and length of one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRow {
    pub source: String,
    pub destination: String,
    pub protocol: String,
    pub length: u32,
}
