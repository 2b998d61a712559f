//! Capture session lifecycle tests
//!
//! These drive the session through a scripted frame source so they run
//! without capture privileges.

use parking_lot::Mutex;
use sniffer_capture::{
    CaptureConfig, CaptureSession, ChannelSink, FrameSource, LoopExit, RawFrame, SessionState,
    SourceOpener,
};
use sniffer_core::{Error, OpenError, Result, StartError, Timestamp};
use sniffer_packet::{CapturedPacket, EtherType, FrameBuilder, MacAddress};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

type OpenResult = std::result::Result<Box<dyn FrameSource>, OpenError>;

const READ_TIMEOUT_MS: i32 = 50;

fn read_timeout() -> Duration {
    Duration::from_millis(READ_TIMEOUT_MS as u64)
}

/// Generous wait for frames and exit notices on a loaded test machine
fn stop_bound() -> Duration {
    read_timeout() * 10
}

/// One read timeout plus scheduling slack
fn stop_latency_bound() -> Duration {
    read_timeout() + Duration::from_millis(30)
}

#[derive(Debug, Clone)]
enum Step {
    Frame(Vec<u8>),
    Empty,
    Fail(&'static str),
}

#[derive(Debug, Default)]
struct Tracker {
    opens: AtomicUsize,
    closes: AtomicUsize,
    devices: Mutex<Vec<String>>,
}

impl Tracker {
    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct ScriptedSource {
    steps: VecDeque<Step>,
    timeout: Duration,
    tracker: Arc<Tracker>,
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        match self.steps.pop_front() {
            Some(Step::Frame(data)) => Ok(Some(RawFrame {
                timestamp: Timestamp::now(),
                captured_length: data.len() as u32,
                actual_length: data.len() as u32,
                data,
            })),
            Some(Step::Empty) => Ok(Some(RawFrame {
                timestamp: Timestamp::now(),
                captured_length: 0,
                actual_length: 0,
                data: Vec::new(),
            })),
            Some(Step::Fail(reason)) => Err(Error::capture(reason)),
            None => {
                thread::sleep(self.timeout);
                Ok(None)
            }
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.tracker.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opener handing out a fresh copy of `script` on every open
fn scripted_opener(script: Vec<Step>, tracker: Arc<Tracker>) -> SourceOpener {
    Arc::new(move |device: &str, config: &CaptureConfig| -> OpenResult {
        tracker.opens.fetch_add(1, Ordering::SeqCst);
        tracker.devices.lock().push(device.to_string());
        Ok(Box::new(ScriptedSource {
            steps: script.iter().cloned().collect(),
            timeout: config.read_timeout(),
            tracker: Arc::clone(&tracker),
        }) as Box<dyn FrameSource>)
    })
}

fn config() -> CaptureConfig {
    CaptureConfig::default().with_timeout_ms(READ_TIMEOUT_MS)
}

fn open(script: Vec<Step>) -> (CaptureSession, Arc<Tracker>) {
    let tracker = Arc::new(Tracker::default());
    let session =
        CaptureSession::with_opener("any", config(), scripted_opener(script, Arc::clone(&tracker)))
            .unwrap();
    (session, tracker)
}

fn dns_reply() -> Vec<u8> {
    FrameBuilder::new()
        .ethernet(
            MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            MacAddress([0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]),
            EtherType::IPv4,
        )
        .ipv4(Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(192, 168, 0, 42))
        .udp(53, 12345)
        .build()
        .unwrap()
}

#[test]
fn test_end_to_end_udp_on_any() {
    let (session, tracker) = open(vec![Step::Frame(dns_reply())]);
    assert_eq!(*tracker.devices.lock(), vec!["any".to_string()]);
    assert_eq!(session.device(), "any");

    let (tx, rx) = crossbeam_channel::unbounded();
    let exit = session.start(ChannelSink::new(tx)).unwrap();
    assert_eq!(session.state(), SessionState::Capturing);

    let packet = rx.recv_timeout(read_timeout()).unwrap();
    assert_eq!(packet.captured_length(), packet.actual_length());
    let udp = packet.transport_layer().unwrap().as_udp().unwrap();
    assert_eq!(udp.source_port, 53);
    assert_eq!(udp.destination_port, 12345);
    assert_eq!(udp.length, 8);

    session.stop();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(exit.recv_timeout(stop_bound()).unwrap(), LoopExit::Stopped);
    assert_eq!(tracker.closes(), 1);

    let stats = session.stats();
    assert_eq!(stats.packets_received, 1);
    assert_eq!(stats.packets_delivered, 1);
    assert_eq!(stats.decode_errors, 0);
}

#[test]
fn test_stop_before_start_is_noop() {
    let (session, tracker) = open(vec![]);

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(tracker.closes(), 0);

    // The handle is still usable
    let exit = session.start(|_p: CapturedPacket| {}).unwrap();
    session.stop();
    assert_eq!(exit.recv().unwrap(), LoopExit::Stopped);
    assert_eq!(tracker.closes(), 1);
}

#[test]
fn test_double_stop_equals_single_stop() {
    let (session, tracker) = open(vec![]);
    let exit = session.start(|_p: CapturedPacket| {}).unwrap();

    session.stop();
    session.stop();

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(tracker.closes(), 1);
    assert_eq!(exit.recv().unwrap(), LoopExit::Stopped);
    assert!(exit.try_recv().is_err());
}

#[test]
fn test_stop_from_another_thread_is_prompt() {
    let (session, tracker) = open(vec![]);
    let session = Arc::new(session);
    let exit = session.start(|_p: CapturedPacket| {}).unwrap();

    let stopper = Arc::clone(&session);
    let elapsed = thread::spawn(move || {
        let started = Instant::now();
        stopper.stop();
        started.elapsed()
    })
    .join()
    .unwrap();

    assert!(elapsed <= stop_latency_bound(), "stop took {:?}", elapsed);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(exit.recv().unwrap(), LoopExit::Stopped);
    assert_eq!(tracker.closes(), 1);
}

#[test]
fn test_concurrent_stops() {
    let (session, tracker) = open(vec![]);
    let session = Arc::new(session);
    let exit = session.start(|_p: CapturedPacket| {}).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.stop())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // A stop that lost the race may return before the winner finished
    assert_eq!(exit.recv_timeout(stop_bound()).unwrap(), LoopExit::Stopped);
    session.stop();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(tracker.closes(), 1);
}

#[test]
fn test_stop_racing_start() {
    for _ in 0..20 {
        let (session, tracker) = open(vec![]);
        let session = Arc::new(session);
        let barrier = Arc::new(Barrier::new(5));

        let starter = {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.start(|_p: CapturedPacket| {})
            })
        };
        let stoppers: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..10 {
                        session.stop();
                    }
                })
            })
            .collect();

        let exit = starter.join().unwrap().unwrap();
        for stopper in stoppers {
            stopper.join().unwrap();
        }

        // Every stop may have landed before the start
        session.stop();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(exit.recv_timeout(stop_bound()).unwrap(), LoopExit::Stopped);
        assert!(exit.try_recv().is_err());
        assert_eq!(tracker.closes(), 1);
    }
}

#[test]
fn test_loop_fault_is_reported_as_terminated() {
    let (session, tracker) = open(vec![Step::Fail("network is down")]);
    let exit = session.start(|_p: CapturedPacket| {}).unwrap();

    match exit.recv_timeout(stop_bound()).unwrap() {
        LoopExit::Terminated(terminated) => {
            assert_eq!(terminated.device, "any");
            assert!(terminated.reason.contains("network is down"));
        }
        LoopExit::Stopped => panic!("Expected Terminated"),
    }
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(tracker.closes(), 1);

    // Stopping a closed session does nothing
    session.stop();
    assert_eq!(tracker.closes(), 1);
    assert!(exit.try_recv().is_err());
}

#[test]
fn test_empty_frame_does_not_end_the_loop() {
    let (session, tracker) = open(vec![Step::Empty, Step::Frame(dns_reply())]);
    let (tx, rx) = crossbeam_channel::unbounded();
    let exit = session.start(ChannelSink::new(tx)).unwrap();

    let packet = rx.recv_timeout(stop_bound()).unwrap();
    assert_eq!(packet.layer_count(), 3);
    assert!(session.is_capturing());

    session.stop();
    assert_eq!(exit.recv().unwrap(), LoopExit::Stopped);
    let stats = session.stats();
    assert_eq!(stats.packets_received, 2);
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(stats.packets_delivered, 1);
    assert_eq!(tracker.closes(), 1);
}

#[test]
fn test_packets_arrive_in_order() {
    let frames: Vec<Step> = (1..=5u8)
        .map(|n| {
            let frame = FrameBuilder::new()
                .ethernet(MacAddress([n; 6]), MacAddress::BROADCAST, EtherType::IPv4)
                .ipv4(Ipv4Addr::new(10, 0, 0, n), Ipv4Addr::new(10, 0, 0, 254))
                .udp(1000 + n as u16, 53)
                .build()
                .unwrap();
            Step::Frame(frame)
        })
        .collect();
    let (session, _tracker) = open(frames);

    let (tx, rx) = crossbeam_channel::unbounded();
    let _exit = session.start(ChannelSink::new(tx)).unwrap();

    let ports: Vec<u16> = (0..5)
        .map(|_| {
            let packet = rx.recv_timeout(stop_bound()).unwrap();
            packet.transport_layer().unwrap().ports().unwrap().0
        })
        .collect();
    assert_eq!(ports, vec![1001, 1002, 1003, 1004, 1005]);
    session.stop();
}

#[test]
fn test_start_requires_idle() {
    let (session, _tracker) = open(vec![]);
    let _exit = session.start(|_p: CapturedPacket| {}).unwrap();

    let err = session.start(|_p: CapturedPacket| {}).unwrap_err();
    assert_eq!(
        err,
        StartError::InvalidState {
            device: "any".to_string(),
            state: "capturing".to_string(),
        }
    );

    session.stop();
    assert!(matches!(
        session.start(|_p: CapturedPacket| {}),
        Err(StartError::InvalidState { .. })
    ));
}

#[test]
fn test_reopen_and_restart() {
    let (session, tracker) = open(vec![Step::Frame(dns_reply())]);

    // Nothing to do while idle
    session.reopen().unwrap();
    assert_eq!(tracker.opens(), 1);

    let (tx, rx) = crossbeam_channel::unbounded();
    let exit = session.start(ChannelSink::new(tx.clone())).unwrap();
    rx.recv_timeout(stop_bound()).unwrap();
    assert!(matches!(session.reopen(), Err(Error::Start(_))));
    session.stop();
    assert_eq!(exit.recv().unwrap(), LoopExit::Stopped);

    session.reopen().unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(tracker.opens(), 2);

    let exit = session.start(ChannelSink::new(tx)).unwrap();
    let packet = rx.recv_timeout(stop_bound()).unwrap();
    assert_eq!(packet.transport_layer().unwrap().ports(), Some((53, 12345)));
    session.stop();
    assert_eq!(exit.recv().unwrap(), LoopExit::Stopped);
    assert_eq!(tracker.closes(), 2);
}

#[test]
fn test_reopen_after_fault() {
    let (session, tracker) = open(vec![Step::Fail("device removed")]);
    let exit = session.start(|_p: CapturedPacket| {}).unwrap();
    assert!(matches!(
        exit.recv_timeout(stop_bound()).unwrap(),
        LoopExit::Terminated(_)
    ));

    session.reopen().unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(tracker.opens(), 2);
}

#[test]
fn test_open_failure_is_reported() {
    let opener: SourceOpener = Arc::new(|device: &str, _config: &CaptureConfig| -> OpenResult {
        Err(OpenError::unavailable(format!(
            "{}: You don't have permission to capture on that device",
            device
        )))
    });

    let err = CaptureSession::with_opener("eth0", config(), opener).unwrap_err();
    assert!(err.to_string().contains("permission"));
}

#[test]
fn test_stop_from_inside_sink() {
    let (session, tracker) = open(vec![Step::Frame(dns_reply()), Step::Frame(dns_reply())]);
    let session = Arc::new(session);

    let delivered = Arc::new(AtomicUsize::new(0));
    let sink_session = Arc::clone(&session);
    let sink_delivered = Arc::clone(&delivered);
    let exit = session
        .start(move |_p: CapturedPacket| {
            sink_delivered.fetch_add(1, Ordering::SeqCst);
            sink_session.stop();
        })
        .unwrap();

    assert_eq!(exit.recv_timeout(stop_bound()).unwrap(), LoopExit::Stopped);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.closes(), 1);
}

#[test]
fn test_drop_while_capturing_stops() {
    let (session, tracker) = open(vec![]);
    let exit = session.start(|_p: CapturedPacket| {}).unwrap();

    drop(session);

    assert_eq!(tracker.closes(), 1);
    assert_eq!(exit.recv().unwrap(), LoopExit::Stopped);
}

#[test]
fn test_drop_idle_session_closes_handle() {
    let (session, tracker) = open(vec![]);
    drop(session);
    assert_eq!(tracker.closes(), 1);
}
