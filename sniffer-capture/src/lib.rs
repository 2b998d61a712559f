//! Live packet capture for the sniffer workspace
//!
//! This crate binds libpcap handles to network devices and runs the blocking
//! acquisition loop on a dedicated thread, decoding every frame with
//! [`sniffer_packet::decode`] and handing the result to a [`PacketSink`].
//!
//! ## Features
//!
//! - **Device Directory**: list capturable interfaces, select by index or name
//! - **Capture Sessions**: start/stop lifecycle with prompt, deadlock-free stop
//! - **Statistics**: frame, byte, decode-error and drop counters
//!
//! ## Example
//!
//! ```no_run
//! use sniffer_capture::{CaptureSession, LoopExit};
//! use sniffer_packet::CapturedPacket;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = CaptureSession::open("any")?;
//!
//! let exit = session.start(|packet: CapturedPacket| {
//!     println!("{}", packet.summary());
//! })?;
//!
//! // Later, from any thread
//! session.stop();
//! assert_eq!(exit.recv()?, LoopExit::Stopped);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod interface;
pub mod sink;
pub mod source;
pub mod stats;

// Re-export main types
pub use capture::{CaptureConfig, CaptureSession, ExitReceiver, LoopExit, SessionState};
pub use interface::{get_device, list_devices, DeviceSelector, NetworkDevice, ANY_DEVICE};
pub use sink::{ChannelSink, PacketSink};
pub use source::{pcap_opener, FrameSource, PcapSource, RawFrame, SourceOpener};
pub use stats::{CaptureStats, SourceStats, StatsAccumulator};
