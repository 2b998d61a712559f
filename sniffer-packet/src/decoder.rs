//! Raw frame → [`CapturedPacket`]
//!
//! Decoding walks the layers bottom-up and stops at the first layer that is
//! missing, truncated or not understood. Malformed content never fails the
//! call; it only yields fewer layers.

use bytes::Bytes;
use sniffer_core::{DecodeError, Timestamp};
use tracing::trace;

use crate::ethernet::{EtherType, EthernetHeader};
use crate::icmp::IcmpHeader;
use crate::ip::{IpHeader, IpProtocol, Ipv4Header};
use crate::packet::CapturedPacket;
use crate::tcp::TcpHeader;
use crate::transport::TransportHeader;
use crate::udp::UdpHeader;

/// Decode one captured frame
///
/// `captured_length` is clamped to the buffer size; `actual_length` is raised
/// to at least the captured length.
///
/// # Errors
///
/// [`DecodeError::EmptyFrame`] when there is nothing to decode.
pub fn decode(
    raw: &[u8],
    captured_length: u32,
    actual_length: u32,
    timestamp: Timestamp,
) -> Result<CapturedPacket, DecodeError> {
    let len = (captured_length as usize).min(raw.len());
    if len == 0 {
        return Err(DecodeError::EmptyFrame);
    }
    decode_bytes(Bytes::copy_from_slice(&raw[..len]), actual_length, timestamp)
}

/// Decode an owned buffer without copying it
///
/// The whole buffer is taken as the captured bytes.
pub fn decode_bytes(
    data: Bytes,
    actual_length: u32,
    timestamp: Timestamp,
) -> Result<CapturedPacket, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::EmptyFrame);
    }

    let packet = CapturedPacket::new(timestamp, actual_length, data.clone());

    let Some(ethernet) = EthernetHeader::parse(&data) else {
        trace!(len = data.len(), "frame shorter than an Ethernet header");
        return Ok(packet);
    };
    let packet = packet.with_link_layer(ethernet);

    if ethernet.kind() != EtherType::IPv4 {
        trace!(ether_type = ethernet.ether_type, "not following non-IPv4 payload");
        return Ok(packet);
    }

    let ip_data = &data[EthernetHeader::SIZE..];
    let Some((ipv4, header_len)) = Ipv4Header::parse(ip_data) else {
        trace!(remaining = ip_data.len(), "no decodable IPv4 header");
        return Ok(packet);
    };
    let packet = packet.with_network_layer(IpHeader::V4(ipv4));

    // IHL may point past the captured bytes
    let Some(segment) = ip_data.get(header_len..) else {
        trace!(header_len, "IPv4 header length exceeds captured data");
        return Ok(packet);
    };

    match decode_transport(ipv4.ip_protocol(), segment) {
        Some(transport) => Ok(packet.with_transport_layer(transport)),
        None => Ok(packet),
    }
}

fn decode_transport(protocol: IpProtocol, segment: &[u8]) -> Option<TransportHeader> {
    let transport = match protocol {
        IpProtocol::TCP => TcpHeader::parse(segment).map(TransportHeader::Tcp),
        IpProtocol::UDP => UdpHeader::parse(segment).map(TransportHeader::Udp),
        IpProtocol::ICMP => IcmpHeader::parse(segment).map(TransportHeader::Icmp),
        IpProtocol::Other(_) => return None,
    };
    if transport.is_none() {
        trace!(%protocol, remaining = segment.len(), "transport header truncated");
    }
    transport
}
