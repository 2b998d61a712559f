//! Packet rendering for stdout

use chrono::SecondsFormat;
use serde::Serialize;
use sniffer_packet::{CapturedPacket, TransportHeader};

use crate::args::OutputFormat;

/// Flat, serializable view of one packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketRecord {
    /// RFC 3339 UTC time, or `secs.micros` if out of range
    pub timestamp: String,
    pub source: String,
    pub destination: String,
    pub protocol: String,
    /// On-wire length
    pub length: u32,
    pub captured_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_flags: Option<String>,
}

impl From<&CapturedPacket> for PacketRecord {
    fn from(packet: &CapturedPacket) -> Self {
        let row = packet.row();
        let ts = packet.timestamp();
        let ports = packet.transport_layer().and_then(TransportHeader::ports);

        PacketRecord {
            timestamp: ts
                .to_datetime()
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Micros, true))
                .unwrap_or_else(|| ts.to_string()),
            source: row.source,
            destination: row.destination,
            protocol: row.protocol,
            length: row.length,
            captured_length: packet.captured_length(),
            source_port: ports.map(|(src, _)| src),
            destination_port: ports.map(|(_, dst)| dst),
            ttl: packet.network_layer().map(|ip| ip.ttl()),
            tcp_flags: packet
                .transport_layer()
                .and_then(TransportHeader::as_tcp)
                .map(|tcp| tcp.flags.to_string()),
        }
    }
}

/// Render one packet in the requested format, without a trailing newline
pub fn render(packet: &CapturedPacket, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Summary => {
            let ts = packet.timestamp();
            let time = ts
                .to_datetime()
                .map(|dt| dt.format("%H:%M:%S%.6f").to_string())
                .unwrap_or_else(|| ts.to_string());
            Ok(format!(
                "{} {} len={}",
                time,
                packet.summary(),
                packet.actual_length()
            ))
        }
        OutputFormat::Detailed => Ok(packet.to_string()),
        OutputFormat::Json => serde_json::to_string(&PacketRecord::from(packet)),
    }
}
