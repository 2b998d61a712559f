//! Frame sources
//!
//! A [`FrameSource`] is whatever the capture worker pulls raw frames from.
//! Live captures use [`PcapSource`]; sessions accept any other source through
//! a [`SourceOpener`], which keeps the lifecycle testable without privileges.

use pcap::{Active, Capture, Device, Linktype};
use sniffer_core::{Error, OpenError, Result, Timestamp};
use sniffer_packet::EthernetHeader;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capture::CaptureConfig;
use crate::stats::SourceStats;

/// One frame as handed over by the capture library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub timestamp: Timestamp,
    /// Bytes copied into `data`
    pub captured_length: u32,
    /// Length on the wire
    pub actual_length: u32,
    pub data: Vec<u8>,
}

/// Blocking source of raw frames
///
/// Implementations must return from `next_frame` at least once per read
/// timeout so the worker can observe a stop request. The source is closed
/// when it is dropped.
pub trait FrameSource: Send {
    /// Wait for the next frame
    ///
    /// `Ok(None)` means the read timeout expired without a frame. Any error
    /// ends the capture loop.
    fn next_frame(&mut self) -> Result<Option<RawFrame>>;

    /// Drop counters, if the source keeps any
    fn stats(&mut self) -> Option<SourceStats> {
        None
    }
}

/// Opens a source for a device name
pub type SourceOpener = Arc<
    dyn Fn(&str, &CaptureConfig) -> std::result::Result<Box<dyn FrameSource>, OpenError>
        + Send
        + Sync,
>;

/// Opener that binds live libpcap handles
pub fn pcap_opener() -> SourceOpener {
    Arc::new(
        |device: &str,
         config: &CaptureConfig|
         -> std::result::Result<Box<dyn FrameSource>, OpenError> {
            let source = PcapSource::open(device, config)?;
            Ok(Box::new(source))
        },
    )
}

/// Linux cooked capture header: packet type, ARPHRD type, address length,
/// eight address bytes, protocol
const SLL_HEADER_LEN: usize = 16;
const SLL_ADDR_OFFSET: usize = 6;
const SLL_PROTOCOL_OFFSET: usize = 14;

/// Live libpcap handle
pub struct PcapSource {
    capture: Capture<Active>,
    linktype: Linktype,
}

impl PcapSource {
    /// Open a live capture on `device`
    pub fn open(device: &str, config: &CaptureConfig) -> std::result::Result<Self, OpenError> {
        debug!(
            device,
            snaplen = config.snaplen,
            timeout_ms = config.timeout_ms,
            promiscuous = config.promiscuous,
            "Opening pcap handle"
        );

        let mut capture = Capture::from_device(Device::from(device))
            .map_err(|e| OpenError::unavailable(format!("{}: {}", device, e)))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .immediate_mode(config.immediate_mode);

        if config.buffer_size > 0 {
            capture = capture.buffer_size(config.buffer_size);
        }

        let capture = capture
            .open()
            .map_err(|e| OpenError::unavailable(format!("{}: {}", device, e)))?;

        let linktype = capture.get_datalink();
        if linktype != Linktype::ETHERNET && linktype != Linktype::LINUX_SLL {
            warn!(
                "{} uses link type {:?}; frames will be decoded as Ethernet",
                device, linktype
            );
        }
        debug!(device, ?linktype, "Opened pcap handle");

        Ok(Self { capture, linktype })
    }

    /// Link-layer header type of the handle
    pub fn linktype(&self) -> Linktype {
        self.linktype
    }
}

/// Rewrite a Linux cooked header into an Ethernet header
///
/// The destination MAC is zeroed, the source MAC comes from the first six
/// address bytes and the protocol becomes the ether-type. Frames shorter than
/// a cooked header are left as they are.
fn cooked_to_ethernet(frame: &mut RawFrame) {
    if frame.data.len() < SLL_HEADER_LEN {
        return;
    }

    let mut header = [0u8; EthernetHeader::SIZE];
    header[6..12].copy_from_slice(&frame.data[SLL_ADDR_OFFSET..SLL_ADDR_OFFSET + 6]);
    header[12..14].copy_from_slice(&frame.data[SLL_PROTOCOL_OFFSET..SLL_HEADER_LEN]);
    frame.data = [&header[..], &frame.data[SLL_HEADER_LEN..]].concat();

    let shrink = (SLL_HEADER_LEN - EthernetHeader::SIZE) as u32;
    frame.captured_length = frame.captured_length.saturating_sub(shrink);
    frame.actual_length = frame.actual_length.saturating_sub(shrink);
}

impl FrameSource for PcapSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let header = packet.header;
                let mut frame = RawFrame {
                    timestamp: Timestamp::from_timeval(
                        header.ts.tv_sec as i64,
                        header.ts.tv_usec as i64,
                    ),
                    captured_length: header.caplen,
                    actual_length: header.len,
                    data: packet.data.to_vec(),
                };
                if self.linktype == Linktype::LINUX_SLL {
                    cooked_to_ethernet(&mut frame);
                }
                Ok(Some(frame))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(Error::capture(e.to_string())),
        }
    }

    fn stats(&mut self) -> Option<SourceStats> {
        self.capture.stats().ok().map(SourceStats::from)
    }
}

impl std::fmt::Debug for PcapSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcapSource")
            .field("linktype", &self.linktype)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sniffer_packet::{decode, EtherType, FrameBuilder, MacAddress, TransportHeader};
    use std::net::Ipv4Addr;

    /// UDP 53 -> 12345 as seen on the `any` device
    fn cooked_dns_reply() -> Vec<u8> {
        let ethernet = FrameBuilder::new()
            .ethernet(MacAddress::ZERO, MacAddress::ZERO, EtherType::IPv4)
            .ipv4(Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(192, 168, 0, 5))
            .udp(53, 12345)
            .build()
            .unwrap();

        let mut cooked = vec![
            0x00, 0x00, // incoming, addressed to us
            0x00, 0x01, // ARPHRD_ETHER
            0x00, 0x06, // address length
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x00, 0x00, // address, padded
            0x08, 0x00, // IPv4
        ];
        cooked.extend_from_slice(&ethernet[EthernetHeader::SIZE..]);
        cooked
    }

    #[test]
    fn test_cooked_frame_decodes_to_udp() {
        let data = cooked_dns_reply();
        let len = data.len() as u32;
        let mut frame = RawFrame {
            timestamp: Timestamp::new(0, 0),
            captured_length: len,
            actual_length: len,
            data,
        };

        cooked_to_ethernet(&mut frame);
        assert_eq!(frame.data.len(), len as usize - 2);
        assert_eq!(frame.captured_length, len - 2);
        assert_eq!(frame.actual_length, len - 2);

        let packet = decode(
            &frame.data,
            frame.captured_length,
            frame.actual_length,
            frame.timestamp,
        )
        .unwrap();
        let ethernet = packet.link_layer().unwrap();
        assert_eq!(ethernet.destination, MacAddress::ZERO);
        assert_eq!(ethernet.source, MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
        assert_eq!(ethernet.ether_type, 0x0800);

        match packet.transport_layer() {
            Some(TransportHeader::Udp(udp)) => {
                assert_eq!(udp.source_port, 53);
                assert_eq!(udp.destination_port, 12345);
            }
            other => panic!("Expected UDP, got {:?}", other),
        }
        assert_eq!(packet.summary(), "8.8.8.8:53 -> 192.168.0.5:12345 [UDP]");
    }

    #[test]
    fn test_short_cooked_frame_is_untouched() {
        let mut frame = RawFrame {
            timestamp: Timestamp::new(0, 0),
            captured_length: 10,
            actual_length: 10,
            data: vec![0xAB; 10],
        };
        cooked_to_ethernet(&mut frame);
        assert_eq!(frame.data, vec![0xAB; 10]);
        assert_eq!(frame.captured_length, 10);
    }

    #[test]
    fn test_open_nonexistent_device() {
        let result = PcapSource::open("nonexistent_interface_xyz", &CaptureConfig::default());
        match result {
            Err(OpenError::DeviceUnavailable(msg)) => {
                assert!(msg.starts_with("nonexistent_interface_xyz"));
            }
            Ok(_) => panic!("Expected DeviceUnavailable"),
        }
    }

    #[test]
    fn test_open_loopback() {
        let result = PcapSource::open("lo", &CaptureConfig::default())
            .or_else(|_| PcapSource::open("lo0", &CaptureConfig::default()));

        // This might fail if not running with permissions
        match result {
            Ok(mut source) => {
                let _ = source.stats();
            }
            Err(e) => println!("Could not open loopback (may need privileges): {}", e),
        }
    }
}
