//! Synthetic frame construction
//!
//! Builds well-formed Ethernet/IPv4/TCP/UDP/ICMP frames with valid checksums.
//! The capture pipeline never writes to the wire; these frames feed tests,
//! demos and injected frame sources.

use bytes::{BufMut, BytesMut};
use sniffer_core::{Error, Result};
use std::net::Ipv4Addr;

use crate::checksum::{internet_checksum, transport_checksum};
use crate::ethernet::{EtherType, EthernetHeader, MacAddress};
use crate::ip::{IpProtocol, Ipv4Header};
use crate::tcp::{TcpFlags, TcpHeader};
use crate::udp::UdpHeader;

/// Minimum Ethernet frame size without FCS
const MIN_FRAME_SIZE: usize = 60;

#[derive(Debug, Clone, Copy)]
struct Link {
    src: MacAddress,
    dst: MacAddress,
    ether_type: EtherType,
}

#[derive(Debug, Clone)]
struct Network {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    ttl: u8,
    identification: u16,
    options: Vec<u8>,
    protocol: Option<u8>,
}

#[derive(Debug, Clone, Copy)]
enum Transport {
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Tcp {
        src_port: u16,
        dst_port: u16,
        seq: u32,
        ack: u32,
        flags: TcpFlags,
    },
    Icmp {
        icmp_type: u8,
        code: u8,
    },
}

impl Transport {
    fn protocol(&self) -> IpProtocol {
        match self {
            Transport::Udp { .. } => IpProtocol::UDP,
            Transport::Tcp { .. } => IpProtocol::TCP,
            Transport::Icmp { .. } => IpProtocol::ICMP,
        }
    }
}

/// Fluent builder for synthetic frames
///
/// ```
/// use std::net::Ipv4Addr;
/// use sniffer_packet::{EtherType, FrameBuilder, MacAddress};
///
/// let frame = FrameBuilder::new()
///     .ethernet(MacAddress([0, 1, 2, 3, 4, 5]), MacAddress::BROADCAST, EtherType::IPv4)
///     .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
///     .udp(53, 12345)
///     .build()
///     .unwrap();
/// assert_eq!(frame.len(), 14 + 20 + 8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    link: Option<Link>,
    network: Option<Network>,
    transport: Option<Transport>,
    payload: Vec<u8>,
    pad: bool,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the Ethernet layer
    pub fn ethernet(mut self, src: MacAddress, dst: MacAddress, ether_type: EtherType) -> Self {
        self.link = Some(Link {
            src,
            dst,
            ether_type,
        });
        self
    }

    /// Add an IPv4 layer with TTL 64 and no options
    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.network = Some(Network {
            src,
            dst,
            ttl: 64,
            identification: 0,
            options: Vec::new(),
            protocol: None,
        });
        self
    }

    /// Set the TTL. Must be called after `ipv4()`.
    pub fn ttl(mut self, ttl: u8) -> Self {
        if let Some(network) = self.network.as_mut() {
            network.ttl = ttl;
        }
        self
    }

    /// Set the identification. Must be called after `ipv4()`.
    pub fn identification(mut self, id: u16) -> Self {
        if let Some(network) = self.network.as_mut() {
            network.identification = id;
        }
        self
    }

    /// Set IPv4 options, zero-padded to a 4-byte boundary.
    /// Must be called after `ipv4()`.
    pub fn ip_options(mut self, options: Vec<u8>) -> Self {
        if let Some(network) = self.network.as_mut() {
            network.options = options;
        }
        self
    }

    /// Override the IPv4 protocol number. Must be called after `ipv4()`.
    pub fn ip_protocol(mut self, protocol: u8) -> Self {
        if let Some(network) = self.network.as_mut() {
            network.protocol = Some(protocol);
        }
        self
    }

    /// Add a UDP layer
    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.transport = Some(Transport::Udp { src_port, dst_port });
        self
    }

    /// Add a TCP layer with a 20-byte header
    pub fn tcp(mut self, src_port: u16, dst_port: u16, seq: u32, ack: u32, flags: TcpFlags) -> Self {
        self.transport = Some(Transport::Tcp {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
        });
        self
    }

    /// Add an ICMP layer (type, code, checksum, 4 zero bytes of rest-of-header)
    pub fn icmp(mut self, icmp_type: u8, code: u8) -> Self {
        self.transport = Some(Transport::Icmp { icmp_type, code });
        self
    }

    /// Set the innermost payload
    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Zero-pad the frame to the 60-byte Ethernet minimum
    pub fn pad_to_minimum(mut self) -> Self {
        self.pad = true;
        self
    }

    /// Assemble the frame
    ///
    /// # Errors
    ///
    /// Fails when a layer is missing the layer beneath it or when the IPv4
    /// options do not fit in the 4-bit IHL field.
    pub fn build(self) -> Result<Vec<u8>> {
        let link = self
            .link
            .ok_or_else(|| Error::frame_construction("Ethernet layer is required"))?;

        let mut body = self.payload;

        if let Some(transport) = self.transport {
            let network = self.network.as_ref().ok_or_else(|| {
                Error::frame_construction("Transport layer requires an IPv4 layer")
            })?;
            body = build_transport(transport, network, body);
        }

        if let Some(network) = self.network.as_ref() {
            let protocol = network
                .protocol
                .or_else(|| self.transport.map(|t| t.protocol().to_u8()))
                .unwrap_or(0);
            body = build_ipv4(network, protocol, body)?;
        }

        let mut frame = BytesMut::with_capacity(EthernetHeader::SIZE + body.len());
        frame.put_slice(link.dst.as_bytes());
        frame.put_slice(link.src.as_bytes());
        frame.put_u16(link.ether_type.to_u16());
        frame.put_slice(&body);

        let mut frame = frame.to_vec();
        if self.pad && frame.len() < MIN_FRAME_SIZE {
            frame.resize(MIN_FRAME_SIZE, 0);
        }
        Ok(frame)
    }
}

fn build_transport(transport: Transport, network: &Network, payload: Vec<u8>) -> Vec<u8> {
    let src = network.src.octets();
    let dst = network.dst.octets();

    let mut buf = match transport {
        Transport::Udp { src_port, dst_port } => {
            let mut buf = BytesMut::with_capacity(UdpHeader::HEADER_SIZE + payload.len());
            buf.put_u16(src_port);
            buf.put_u16(dst_port);
            buf.put_u16((UdpHeader::HEADER_SIZE + payload.len()) as u16);
            buf.put_u16(0);
            buf
        }
        Transport::Tcp {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
        } => {
            let mut buf = BytesMut::with_capacity(TcpHeader::MIN_HEADER_SIZE + payload.len());
            buf.put_u16(src_port);
            buf.put_u16(dst_port);
            buf.put_u32(seq);
            buf.put_u32(ack);
            buf.put_u8(5 << 4); // data offset, no options
            buf.put_u8(flags.bits());
            buf.put_u16(65535); // window
            buf.put_u16(0); // checksum
            buf.put_u16(0); // urgent pointer
            buf
        }
        Transport::Icmp { icmp_type, code } => {
            let mut buf = BytesMut::with_capacity(8 + payload.len());
            buf.put_u8(icmp_type);
            buf.put_u8(code);
            buf.put_u16(0);
            buf.put_u32(0);
            buf
        }
    };
    buf.put_slice(&payload);

    match transport {
        Transport::Udp { .. } => {
            // Zero means "no checksum" for UDP
            let sum = match transport_checksum(&src, &dst, 17, &buf) {
                0 => 0xFFFF,
                sum => sum,
            };
            buf[6..8].copy_from_slice(&sum.to_be_bytes());
        }
        Transport::Tcp { .. } => {
            let sum = transport_checksum(&src, &dst, 6, &buf);
            buf[16..18].copy_from_slice(&sum.to_be_bytes());
        }
        Transport::Icmp { .. } => {
            let sum = internet_checksum(&buf);
            buf[2..4].copy_from_slice(&sum.to_be_bytes());
        }
    }

    buf.to_vec()
}

fn build_ipv4(network: &Network, protocol: u8, payload: Vec<u8>) -> Result<Vec<u8>> {
    let mut options = network.options.clone();
    options.resize((options.len() + 3) & !3, 0);

    let header_len = Ipv4Header::MIN_HEADER_SIZE + options.len();
    if header_len > 60 {
        return Err(Error::frame_construction(format!(
            "IPv4 options too long: {} bytes (max 40)",
            options.len()
        )));
    }

    let total_length = header_len + payload.len();
    if total_length > u16::MAX as usize {
        return Err(Error::frame_construction("IPv4 packet exceeds 65535 bytes"));
    }

    let mut buf = BytesMut::with_capacity(total_length);
    buf.put_u8((4 << 4) | (header_len / 4) as u8);
    buf.put_u8(0); // ToS
    buf.put_u16(total_length as u16);
    buf.put_u16(network.identification);
    buf.put_u16(0x4000); // don't fragment
    buf.put_u8(network.ttl);
    buf.put_u8(protocol);
    buf.put_u16(0); // checksum
    buf.put_slice(&network.src.octets());
    buf.put_slice(&network.dst.octets());
    buf.put_slice(&options);

    let checksum = internet_checksum(&buf[..header_len]);
    buf[10..12].copy_from_slice(&checksum.to_be_bytes());

    buf.put_slice(&payload);
    Ok(buf.to_vec())
}
