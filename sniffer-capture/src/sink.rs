//! Packet consumers

use crossbeam_channel::Sender;
use sniffer_packet::CapturedPacket;

/// Receives decoded packets on the capture worker thread, in arrival order
///
/// `accept` runs synchronously between two reads, so a slow sink delays
/// acquisition (and eventually shows up as kernel drops).
pub trait PacketSink: Send + 'static {
    fn accept(&mut self, packet: CapturedPacket);
}

impl<F> PacketSink for F
where
    F: FnMut(CapturedPacket) + Send + 'static,
{
    fn accept(&mut self, packet: CapturedPacket) {
        self(packet)
    }
}

/// Forwards packets over a channel to another thread
///
/// Packets are discarded once the receiving side is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<CapturedPacket>,
}

impl ChannelSink {
    pub fn new(sender: Sender<CapturedPacket>) -> Self {
        Self { sender }
    }
}

impl PacketSink for ChannelSink {
    fn accept(&mut self, packet: CapturedPacket) {
        let _ = self.sender.send(packet);
    }
}
