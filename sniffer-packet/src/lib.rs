//! Frame decoding and synthesis for the sniffer workspace
//!
//! This crate turns raw link-layer frames into layered, typed headers:
//!
//! - **Ethernet II** with ether-type classification (IPv4, ARP, IPv6)
//! - **IPv4** with variable header length (IHL)
//! - **TCP**, **UDP** and **ICMP** on top of IPv4
//!
//! Decoding is a pure function: [`decode`] never performs I/O and never fails
//! on malformed content; it simply yields fewer layers.
//!
//! # Architecture
//!
//! - [`decoder`] - Raw bytes to [`CapturedPacket`]
//! - [`packet`] - The decoded aggregate, summaries and table rows
//! - [`ethernet`], [`ip`], [`tcp`], [`udp`], [`icmp`] - Per-layer headers
//! - [`transport`] - Closed set of transport headers
//! - [`builder`] - Synthetic frames with valid checksums
//! - [`checksum`] - Internet checksum calculation utilities
//!
//! # Quick Start
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use sniffer_core::Timestamp;
//! use sniffer_packet::{decode, EtherType, FrameBuilder, MacAddress, TcpFlags};
//!
//! let frame = FrameBuilder::new()
//!     .ethernet(MacAddress([0, 1, 2, 3, 4, 5]), MacAddress::BROADCAST, EtherType::IPv4)
//!     .ipv4(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2))
//!     .tcp(54321, 80, 1000, 0, TcpFlags::SYN)
//!     .build()
//!     .unwrap();
//!
//! let len = frame.len() as u32;
//! let packet = decode(&frame, len, len, Timestamp::now()).unwrap();
//! assert_eq!(packet.summary(), "192.168.1.1:54321 -> 192.168.1.2:80 [TCP]");
//! ```

pub mod builder;
pub mod checksum;
pub mod decoder;
pub mod ethernet;
pub mod icmp;
pub mod ip;
pub mod packet;
pub mod tcp;
pub mod transport;
pub mod udp;

// Re-export commonly used types for convenience
pub use builder::FrameBuilder;
pub use checksum::{internet_checksum, transport_checksum};
pub use decoder::{decode, decode_bytes};
pub use ethernet::{EtherType, EthernetHeader, MacAddress};
pub use icmp::IcmpHeader;
pub use ip::{IpHeader, IpProtocol, Ipv4Header, Ipv6Header};
pub use packet::{CapturedPacket, PacketRow};
pub use tcp::{TcpFlags, TcpHeader};
pub use transport::TransportHeader;
pub use udp::UdpHeader;
