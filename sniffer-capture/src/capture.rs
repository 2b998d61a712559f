//! Capture session lifecycle
//!
//! A [`CaptureSession`] owns one capture handle and runs the acquisition loop
//! on a dedicated worker thread:
//!
//! ```text
//! Idle --start()--> Capturing --stop()--> Stopping --join--> Closed
//!   ^                   |                                      |
//!   |                   +--- read error -----------------------+
//!   +------------------------- reopen() (Opening) -------------+
//! ```
//!
//! The handle moves into the worker for the duration of a capture and is
//! handed back when the worker is joined, so only one thread ever touches
//! it. The worker never takes the control lock; `stop()` can therefore wait
//! for it while holding that lock without deadlocking.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use sniffer_core::{LoopTerminated, OpenError, Result, StartError};
use sniffer_packet::decode;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::sink::PacketSink;
use crate::source::{pcap_opener, FrameSource, SourceOpener};
use crate::stats::{CaptureStats, StatsAccumulator};

/// Default snapshot length (maximum bytes per packet)
const DEFAULT_SNAPLEN: i32 = 65535;

/// Default read timeout (milliseconds); bounds how long `stop()` can wait
const DEFAULT_TIMEOUT_MS: i32 = 1000;

/// Configuration for a capture handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Kernel buffer size in bytes (0 = library default)
    pub buffer_size: i32,
    /// Deliver packets as soon as they arrive instead of batching
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            buffer_size: 0,
            immediate_mode: true,
        }
    }
}

impl CaptureConfig {
    pub fn with_snaplen(mut self, snaplen: i32) -> Self {
        self.snaplen = snaplen;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_promiscuous(mut self, enable: bool) -> Self {
        self.promiscuous = enable;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: i32) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_immediate_mode(mut self, enable: bool) -> Self {
        self.immediate_mode = enable;
        self
    }

    /// The read timeout as a duration (negative values count as zero)
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(0) as u64)
    }
}

/// Lifecycle state of a [`CaptureSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Handle open, no worker running
    Idle,
    /// A handle is being bound to the device
    Opening,
    /// Worker running
    Capturing,
    /// Stop requested, worker not joined yet
    Stopping,
    /// Handle released
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Opening => "opening",
            SessionState::Capturing => "capturing",
            SessionState::Stopping => "stopping",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a capture loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// `stop()` was called
    Stopped,
    /// The capture source failed
    Terminated(LoopTerminated),
}

/// Receives exactly one [`LoopExit`] per successful `start()`
pub type ExitReceiver = Receiver<LoopExit>;

/// Stop signal shared with one worker
#[derive(Debug, Default)]
struct StopSignal {
    requested: AtomicBool,
    /// Set when the worker itself asked to stop; it then closes the handle
    /// because nobody will join it.
    detached: AtomicBool,
}

struct Worker {
    handle: JoinHandle<Option<Box<dyn FrameSource>>>,
    thread_id: ThreadId,
    signal: Arc<StopSignal>,
    exit_tx: Sender<LoopExit>,
}

impl Worker {
    fn is_current_thread(&self) -> bool {
        self.thread_id == thread::current().id()
    }
}

struct Control {
    /// Handle while no worker owns it
    source: Option<Box<dyn FrameSource>>,
    worker: Option<Worker>,
}

/// A live capture on one device
///
/// All methods take `&self`; share the session behind an `Arc` to stop it
/// from another thread.
pub struct CaptureSession {
    device: String,
    config: CaptureConfig,
    opener: SourceOpener,
    state: Arc<RwLock<SessionState>>,
    control: Mutex<Control>,
    stats: StatsAccumulator,
}

impl CaptureSession {
    /// Open a live capture with the default configuration
    pub fn open(device: &str) -> std::result::Result<Self, OpenError> {
        Self::open_with_config(device, CaptureConfig::default())
    }

    /// Open a live capture with custom configuration
    pub fn open_with_config(
        device: &str,
        config: CaptureConfig,
    ) -> std::result::Result<Self, OpenError> {
        Self::with_opener(device, config, pcap_opener())
    }

    /// Open a session whose handles come from `opener`
    pub fn with_opener(
        device: &str,
        config: CaptureConfig,
        opener: SourceOpener,
    ) -> std::result::Result<Self, OpenError> {
        let source = opener(device, &config).map_err(|e| {
            warn!("Failed to open {}: {}", device, e);
            e
        })?;

        info!("Opened capture on {}", device);

        Ok(Self {
            device: device.to_string(),
            config,
            opener,
            state: Arc::new(RwLock::new(SessionState::Idle)),
            control: Mutex::new(Control {
                source: Some(source),
                worker: None,
            }),
            stats: StatsAccumulator::new(),
        })
    }

    /// Bind a fresh handle to a closed session
    ///
    /// A no-op on an idle session. Fails while a capture is running or when
    /// the device cannot be opened, in which case the session stays closed.
    pub fn reopen(&self) -> Result<()> {
        let mut control = self.control.lock();
        {
            let mut state = self.state.write();
            match *state {
                SessionState::Idle => return Ok(()),
                SessionState::Closed => *state = SessionState::Opening,
                other => return Err(self.invalid_state(other).into()),
            }
        }

        if let Some(worker) = control.worker.take() {
            if !worker.is_current_thread() {
                let _ = worker.handle.join();
            }
        }

        match (self.opener)(&self.device, &self.config) {
            Ok(source) => {
                control.source = Some(source);
                *self.state.write() = SessionState::Idle;
                info!("Reopened capture on {}", self.device);
                Ok(())
            }
            Err(e) => {
                *self.state.write() = SessionState::Closed;
                warn!("Failed to reopen {}: {}", self.device, e);
                Err(e.into())
            }
        }
    }

    /// Start the acquisition loop, delivering every decoded packet to `sink`
    ///
    /// The returned receiver yields one [`LoopExit`] when the loop ends.
    pub fn start<S: PacketSink>(&self, sink: S) -> std::result::Result<ExitReceiver, StartError> {
        let mut control = self.control.lock();

        let source = {
            let mut state = self.state.write();
            if *state != SessionState::Idle {
                return Err(self.invalid_state(*state));
            }
            let Some(source) = control.source.take() else {
                return Err(self.invalid_state(*state));
            };
            *state = SessionState::Capturing;
            source
        };

        // Reap a worker that ended by itself in a previous run
        if let Some(previous) = control.worker.take() {
            if !previous.is_current_thread() {
                let _ = previous.handle.join();
            }
        }

        self.stats.reset();

        let (exit_tx, exit_rx) = crossbeam_channel::unbounded();
        let signal = Arc::new(StopSignal::default());
        let acquisition = Acquisition {
            device: self.device.clone(),
            state: Arc::clone(&self.state),
            stats: self.stats.clone(),
            signal: Arc::clone(&signal),
            exit_tx: exit_tx.clone(),
        };

        let spawned = thread::Builder::new()
            .name(format!("capture-{}", self.device))
            .spawn(move || acquisition.run(source, sink));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                // The closure and the handle inside it are already dropped
                *self.state.write() = SessionState::Closed;
                error!("Failed to spawn capture worker: {}", e);
                return Err(StartError::Spawn(e.to_string()));
            }
        };

        info!("Started capture on {}", self.device);

        control.worker = Some(Worker {
            thread_id: handle.thread().id(),
            handle,
            signal,
            exit_tx,
        });

        Ok(exit_rx)
    }

    /// Stop the acquisition loop and release the handle
    ///
    /// Returns once the worker has exited (at most one read timeout after the
    /// call). Does nothing unless capturing; a concurrent second call returns
    /// immediately. When called from inside the sink, the worker is only
    /// signalled and closes the handle itself after the current packet.
    pub fn stop(&self) {
        {
            let mut state = self.state.write();
            if *state != SessionState::Capturing {
                drop(state);
                self.reap_finished();
                return;
            }
            *state = SessionState::Stopping;
        }

        info!("Stopping capture on {}", self.device);

        let mut control = self.control.lock();
        let Some(worker) = control.worker.take() else {
            *self.state.write() = SessionState::Closed;
            return;
        };

        if worker.is_current_thread() {
            worker.signal.detached.store(true, Ordering::Release);
            worker.signal.requested.store(true, Ordering::Release);
            control.worker = Some(worker);
            return;
        }

        worker.signal.requested.store(true, Ordering::Release);

        let exit = match worker.handle.join() {
            Ok(Some(source)) => {
                drop(source);
                Some(LoopExit::Stopped)
            }
            // The loop failed first and already reported it
            Ok(None) => None,
            Err(_) => {
                error!("Capture worker on {} panicked", self.device);
                Some(LoopExit::Terminated(LoopTerminated {
                    device: self.device.clone(),
                    reason: "capture worker panicked".to_string(),
                }))
            }
        };

        *self.state.write() = SessionState::Closed;
        if let Some(exit) = exit {
            let _ = worker.exit_tx.send(exit);
        }

        info!("Capture on {} stopped", self.device);
    }

    /// Join a worker that already ended on its own, if the lock is free
    fn reap_finished(&self) {
        let Some(mut control) = self.control.try_lock() else {
            return;
        };
        let finished = control
            .worker
            .as_ref()
            .is_some_and(|w| w.handle.is_finished() && !w.is_current_thread());
        if finished {
            if let Some(worker) = control.worker.take() {
                let _ = worker.handle.join();
                debug!("Reaped finished capture worker on {}", self.device);
            }
        }
    }

    fn invalid_state(&self, state: SessionState) -> StartError {
        StartError::InvalidState {
            device: self.device.clone(),
            state: state.to_string(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_capturing(&self) -> bool {
        self.state() == SessionState::Capturing
    }

    /// Device name the session was opened on
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Counters for the current (or last) run
    pub fn stats(&self) -> CaptureStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.control.get_mut().worker.take() {
            if !worker.is_current_thread() {
                let _ = worker.handle.join();
            }
        }
    }
}

/// Everything the worker thread needs besides the handle and the sink
struct Acquisition {
    device: String,
    state: Arc<RwLock<SessionState>>,
    stats: StatsAccumulator,
    signal: Arc<StopSignal>,
    exit_tx: Sender<LoopExit>,
}

impl Acquisition {
    fn run<S: PacketSink>(
        self,
        mut source: Box<dyn FrameSource>,
        mut sink: S,
    ) -> Option<Box<dyn FrameSource>> {
        debug!("Capture worker started on {}", self.device);

        let outcome = self.pump(source.as_mut(), &mut sink);

        if let Some(source_stats) = source.stats() {
            self.stats.record_source_stats(source_stats);
        }

        match outcome {
            Ok(()) if self.signal.detached.load(Ordering::Acquire) => {
                drop(source);
                *self.state.write() = SessionState::Closed;
                let _ = self.exit_tx.send(LoopExit::Stopped);
                info!("Capture on {} stopped", self.device);
                None
            }
            Ok(()) => Some(source),
            Err(e) => {
                error!("Capture loop on {} terminated: {}", self.device, e);
                drop(source);
                {
                    let mut state = self.state.write();
                    if *state == SessionState::Capturing {
                        *state = SessionState::Closed;
                    }
                }
                let _ = self.exit_tx.send(LoopExit::Terminated(LoopTerminated {
                    device: self.device,
                    reason: e.to_string(),
                }));
                None
            }
        }
    }

    /// Read, decode and deliver until stopped or the source fails
    fn pump<S: PacketSink>(&self, source: &mut dyn FrameSource, sink: &mut S) -> Result<()> {
        loop {
            if self.signal.requested.load(Ordering::Acquire) {
                return Ok(());
            }

            let Some(frame) = source.next_frame()? else {
                continue;
            };

            self.stats.record_frame(frame.data.len());

            match decode(
                &frame.data,
                frame.captured_length,
                frame.actual_length,
                frame.timestamp,
            ) {
                Ok(packet) => {
                    sink.accept(packet);
                    self.stats.record_delivery();
                }
                Err(e) => {
                    self.stats.record_decode_error();
                    warn!("Skipping frame on {}: {}", self.device, e);
                }
            }
        }
    }
}
