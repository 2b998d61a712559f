//! Capture statistics

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counters for one capture run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    /// Frames pulled from the capture source
    pub packets_received: u64,
    /// Frames delivered to the sink after decoding
    pub packets_delivered: u64,
    /// Frames the decoder rejected (empty buffers)
    pub decode_errors: u64,
    /// Captured bytes
    pub bytes_received: u64,
    /// Frames dropped by the kernel buffer
    pub packets_dropped: u64,
    /// Frames dropped by the interface or driver
    pub packets_if_dropped: u64,
    /// Time since the run started
    pub duration: Duration,
    pub packets_per_second: f64,
    pub bytes_per_second: f64,
}

impl CaptureStats {
    /// Kernel drops as a percentage of everything the kernel saw
    pub fn drop_rate(&self) -> f64 {
        let seen = self.total_packets();
        if seen == 0 {
            return 0.0;
        }
        (self.packets_dropped as f64 / seen as f64) * 100.0
    }

    /// Received plus kernel-dropped frames
    pub fn total_packets(&self) -> u64 {
        self.packets_received + self.packets_dropped
    }

    /// Multi-line report for the end of a capture
    pub fn format(&self) -> String {
        format!(
            "Frames: {} captured ({} bytes), {} delivered, {} undecodable\n\
             Drops: {} by kernel ({:.2}%), {} by interface\n\
             Elapsed: {:.2}s at {:.1} frames/s, {:.1} KiB/s",
            self.packets_received,
            self.bytes_received,
            self.packets_delivered,
            self.decode_errors,
            self.packets_dropped,
            self.drop_rate(),
            self.packets_if_dropped,
            self.duration.as_secs_f64(),
            self.packets_per_second,
            self.bytes_per_second / 1024.0
        )
    }
}

/// Drop counters reported by the capture library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Frames dropped because the kernel buffer was full
    pub dropped: u64,
    /// Frames dropped by the interface or driver
    pub if_dropped: u64,
}

impl From<pcap::Stat> for SourceStats {
    fn from(stat: pcap::Stat) -> Self {
        Self {
            dropped: stat.dropped as u64,
            if_dropped: stat.if_dropped as u64,
        }
    }
}

/// Thread-safe counters shared between a session and its worker
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    packets_received: Arc<AtomicU64>,
    packets_delivered: Arc<AtomicU64>,
    decode_errors: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    packets_dropped: Arc<AtomicU64>,
    packets_if_dropped: Arc<AtomicU64>,
    start_time: Arc<Mutex<Instant>>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self {
            packets_received: Arc::new(AtomicU64::new(0)),
            packets_delivered: Arc::new(AtomicU64::new(0)),
            decode_errors: Arc::new(AtomicU64::new(0)),
            bytes_received: Arc::new(AtomicU64::new(0)),
            packets_dropped: Arc::new(AtomicU64::new(0)),
            packets_if_dropped: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record a frame pulled from the source
    pub fn record_frame(&self, captured_bytes: usize) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(captured_bytes as u64, Ordering::Relaxed);
    }

    /// Record a packet handed to the sink
    pub fn record_delivery(&self) {
        self.packets_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame the decoder rejected
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Store the library's drop counters
    ///
    /// The library reports totals since the handle was opened, so these
    /// replace rather than add to the previous values.
    pub fn record_source_stats(&self, stats: SourceStats) {
        self.packets_dropped.store(stats.dropped, Ordering::Relaxed);
        self.packets_if_dropped
            .store(stats.if_dropped, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> CaptureStats {
        let packets_received = self.packets_received.load(Ordering::Relaxed);
        let bytes_received = self.bytes_received.load(Ordering::Relaxed);
        let duration = self.elapsed();

        let secs = duration.as_secs_f64();
        let (packets_per_second, bytes_per_second) = if secs > 0.0 {
            (packets_received as f64 / secs, bytes_received as f64 / secs)
        } else {
            (0.0, 0.0)
        };

        CaptureStats {
            packets_received,
            packets_delivered: self.packets_delivered.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            bytes_received,
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            packets_if_dropped: self.packets_if_dropped.load(Ordering::Relaxed),
            duration,
            packets_per_second,
            bytes_per_second,
        }
    }

    /// Zero every counter and restart the clock
    pub fn reset(&self) {
        for counter in [
            &self.packets_received,
            &self.packets_delivered,
            &self.decode_errors,
            &self.bytes_received,
            &self.packets_dropped,
            &self.packets_if_dropped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.start_time.lock() = Instant::now();
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    /// Time since creation or the last reset
    pub fn elapsed(&self) -> Duration {
        self.start_time.lock().elapsed()
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
