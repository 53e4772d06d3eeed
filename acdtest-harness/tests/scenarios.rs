//! End-to-end runs of the harness loop over scripted ARP traffic
//!
//! Frames are fed through the same channel the capture thread uses, with
//! tokio time paused so scheduler delays and run deadlines are exact.

use acdtest_arp::{ArpFrame, ArpOpcode, ConflictInjector, ObservedFrame};
use acdtest_core::{Error, FrameSender, MacAddr, Result, RunClock};
use acdtest_harness::{Harness, HarnessInput, Phase, Report, RunConfig, StopReason};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

const DEVICE: MacAddr = MacAddr::new([0x30, 0xed, 0xa0, 0xe3, 0x34, 0xc1]);
const ADVERSARY: MacAddr = MacAddr::new([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);

#[derive(Default)]
struct RecordingSender {
    frames: Mutex<Vec<ArpFrame>>,
}

impl RecordingSender {
    fn frames(&self) -> Vec<ArpFrame> {
        self.frames.lock().unwrap().clone()
    }
}

impl FrameSender for RecordingSender {
    fn send_frame(&self, frame: &[u8]) -> Result<()> {
        let parsed = ArpFrame::from_bytes(frame)?;
        self.frames.lock().unwrap().push(parsed);
        Ok(())
    }
}

/// A link that rejects every transmit
struct FailingSender;

impl FrameSender for FailingSender {
    fn send_frame(&self, _frame: &[u8]) -> Result<()> {
        Err(Error::transmit("link down"))
    }
}

fn protected_ip() -> Ipv4Addr {
    Ipv4Addr::new(172, 16, 82, 100)
}

fn config() -> RunConfig {
    RunConfig::new(protected_ip(), DEVICE, "eth0")
        .with_retry_delay_ms(10_000)
        .with_duration(Duration::from_secs(30))
}

fn probe(at: f64) -> HarnessInput {
    HarnessInput::Frame(ObservedFrame {
        timestamp: at,
        operation: ArpOpcode::Request,
        sender_ip: Ipv4Addr::UNSPECIFIED,
        target_ip: protected_ip(),
        sender_mac: DEVICE,
    })
}

fn defensive(at: f64) -> HarnessInput {
    HarnessInput::Frame(ObservedFrame {
        timestamp: at,
        operation: ArpOpcode::Reply,
        sender_ip: protected_ip(),
        target_ip: protected_ip(),
        sender_mac: DEVICE,
    })
}

struct Fixture {
    sender: Arc<RecordingSender>,
    clock: RunClock,
    tx: UnboundedSender<HarnessInput>,
    run: JoinHandle<Report>,
}

fn start(config: RunConfig) -> Fixture {
    start_with_shutdown(config, std::future::pending::<()>())
}

fn start_with_shutdown<S>(config: RunConfig, shutdown: S) -> Fixture
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let sender = Arc::new(RecordingSender::default());
    let injector = Arc::new(
        ConflictInjector::new(sender.clone(), config.protected_ip)
            .with_adversary_mac(ADVERSARY)
            .with_announce_op(config.announce_op),
    );
    let clock = RunClock::start();
    let (tx, rx) = mpsc::unbounded_channel();
    let harness = Harness::new(config, injector, clock, tx.clone());
    let run = tokio::spawn(harness.run(rx, shutdown));

    Fixture {
        sender,
        clock,
        tx,
        run,
    }
}

fn start_failing(config: RunConfig) -> (UnboundedSender<HarnessInput>, JoinHandle<Report>) {
    let injector = Arc::new(
        ConflictInjector::new(Arc::new(FailingSender), config.protected_ip)
            .with_adversary_mac(ADVERSARY),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    let harness = Harness::new(config, injector, RunClock::start(), tx.clone());
    let run = tokio::spawn(harness.run(rx, std::future::pending::<()>()));
    (tx, run)
}

#[tokio::test(start_paused = true)]
async fn test_retry_interval_within_tolerance() {
    let fx = start(config());

    for t in [0.0, 0.2, 10.3] {
        fx.tx.send(probe(t)).unwrap();
    }

    let report = fx.run.await.unwrap();
    assert_eq!(report.stop_reason, StopReason::DurationElapsed);
    assert_eq!(report.state.current_attempt, 2);
    assert_eq!(report.record.probes().len(), 3);

    let intervals = report.record.intervals();
    assert_eq!(intervals.len(), 1);
    assert!((intervals[0].interval_ms - 10_100.0).abs() < 1e-6);
    assert!(intervals[0].matched);

    // Every probe was answered with a unicast reply conflict
    let sent = fx.sender.frames();
    assert_eq!(sent.len(), 3);
    assert!(sent
        .iter()
        .all(|f| f.destination == DEVICE && f.arp.operation == ArpOpcode::Reply));
    assert_eq!(report.counters.conflicts_sent, 3);

    let text = report.to_string();
    assert!(text.contains("Interval 1: 10100ms [OK]"));
    assert!(text.contains("1/1 intervals match (100.0%)"));
    assert!(text.contains("[WARN] Only 2 attempts detected (expected 5)"));
}

#[tokio::test(start_paused = true)]
async fn test_stops_at_max_attempts() {
    let fx = start(config().with_max_attempts(3));

    for t in [0.0, 12.0, 24.0, 36.0] {
        fx.tx.send(probe(t)).unwrap();
    }

    let report = fx.run.await.unwrap();
    assert_eq!(report.stop_reason, StopReason::MaxAttemptsReached);
    assert_eq!(report.state.current_attempt, 3);
    // The run stopped before the fourth probe was read
    assert_eq!(report.record.probes().len(), 3);
    assert_eq!(report.record.intervals().len(), 2);

    let text = report.to_string();
    assert!(text.contains("Stop Reason: maximum attempts reached"));
    assert!(text.contains("[OK] Maximum attempts (3) reached as expected"));
}

#[tokio::test(start_paused = true)]
async fn test_ongoing_phase_retreat() {
    let fx = start(config().with_ongoing_test(true));

    fx.tx.send(probe(0.0)).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    fx.tx.send(defensive(fx.clock.now())).unwrap();
    tokio::time::sleep(Duration::from_secs(8)).await;
    fx.tx.send(probe(fx.clock.now())).unwrap();

    let report = fx.run.await.unwrap();
    assert_eq!(report.stop_reason, StopReason::DurationElapsed);
    assert!(report.state.retreat_detected);
    assert_eq!(report.state.phase, Phase::Probing);
    assert_eq!(report.state.defensive_arps, 1);
    assert_eq!(report.state.first_conflict_timestamp.map(f64::round), Some(7.0));
    assert!((report.record.acquisition_latency().unwrap() - 5.0).abs() < 1e-6);
    assert!((report.record.retreat_latency().unwrap() - 6.0).abs() < 1e-6);

    // Initial probe left unanswered, two broadcast claims, then a reply to the retreat probe
    let sent = fx.sender.frames();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].destination, MacAddr::broadcast());
    assert_eq!(sent[1].destination, MacAddr::broadcast());
    assert_eq!(sent[0].arp.sender_proto_addr, protected_ip());
    assert_eq!(sent[2].destination, DEVICE);
    assert_eq!(report.counters.announcements_sent, 2);
    assert_eq!(report.counters.conflicts_sent, 3);

    let text = report.to_string();
    assert!(text.contains("IP Acquired: Yes"));
    assert!(text.contains("Ongoing Conflicts Sent: 2"));
    assert!(text.contains("Time from First Conflict to Retreat: 6.0s"));
    assert!(text.contains("[OK] Retreat occurred within expected timeframe"));
}

#[tokio::test(start_paused = true)]
async fn test_no_probes_reports_no_data() {
    let fx = start(config().with_duration(Duration::from_secs(10)));

    fx.tx.send(defensive(1.0)).unwrap();

    let report = fx.run.await.unwrap();
    assert!(report.is_empty());
    assert_eq!(report.state.phase, Phase::Idle);
    assert!(fx.sender.frames().is_empty());

    let text = report.to_string();
    assert!(text.contains("No ARP probes detected"));
    assert!(text.contains("Possible issues:"));
    assert!(!text.contains("Retry Interval Statistics"));
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_stops_run() {
    let fx = start_with_shutdown(config(), tokio::time::sleep(Duration::from_secs(3)));

    fx.tx.send(probe(0.0)).unwrap();

    let report = fx.run.await.unwrap();
    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert!((report.elapsed - 3.0).abs() < 1e-6);
    assert!(report.to_string().contains("Stop Reason: interrupted by user"));
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_ends_run_with_partial_report() {
    let fx = start(config());

    fx.tx.send(probe(0.0)).unwrap();
    fx.tx
        .send(HarnessInput::CaptureFailed("interface went down".into()))
        .unwrap();

    let report = fx.run.await.unwrap();
    assert_eq!(
        report.stop_reason,
        StopReason::Failed("interface went down".into())
    );
    assert_eq!(report.record.probes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reply_transmit_failure_ends_run_with_partial_report() {
    let (tx, run) = start_failing(config());

    tx.send(probe(0.0)).unwrap();
    tx.send(probe(0.2)).unwrap();

    let report = run.await.unwrap();
    assert_eq!(
        report.stop_reason,
        StopReason::Failed("Transmit error: link down".into())
    );
    // The failed reply stopped the run before the second probe was read
    assert_eq!(report.record.probes().len(), 1);
    assert_eq!(report.counters.conflicts_sent, 0);
    assert!(report.to_string().contains("Stop Reason: failed"));
}

#[tokio::test(start_paused = true)]
async fn test_stimulus_failure_ends_run_with_partial_report() {
    let (tx, run) = start_failing(config().with_ongoing_test(true));

    // Unanswered in the ongoing test, so nothing is sent until acquisition
    tx.send(probe(0.0)).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    tx.send(defensive(5.0)).unwrap();

    let report = run.await.unwrap();
    assert_eq!(
        report.stop_reason,
        StopReason::Failed("Transmit error: link down".into())
    );
    assert_eq!(report.state.phase, Phase::Acquired);
    assert_eq!(report.state.first_conflict_timestamp, None);
    assert_eq!(report.record.probes().len(), 1);
    assert_eq!(report.counters.announcements_sent, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_duration_runs_until_interrupted() {
    let fx = start_with_shutdown(
        config().with_duration(Duration::from_secs(u64::MAX)),
        tokio::time::sleep(Duration::from_secs(3)),
    );

    fx.tx.send(probe(0.0)).unwrap();

    let report = fx.run.await.unwrap();
    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert_eq!(report.record.probes().len(), 1);
}
