//! The harness run loop
//!
//! A run owns the phase state and timing record. Captured frames and
//! scheduler notifications arrive on one ordered channel; each is classified,
//! pushed through [`PhaseState::apply`] and the resulting effects are carried
//! out before the next input is read.

use crate::config::RunConfig;
use crate::phase::{Effect, Input, PhasePolicy, PhaseState};
use crate::report::{InjectionCounters, Report, StopReason};
use crate::scheduler::StimulusScheduler;
use crate::timing::TimingRecord;
use acdtest_arp::{classify, ClassifyTarget, ConflictInjector, ObservedFrame};
use acdtest_capture::{filters, ArpCapture, CaptureEvent};
use acdtest_core::{Interface, Result, RunClock};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything the run loop consumes, in arrival order
#[derive(Debug)]
pub enum HarnessInput {
    /// A frame from the capture thread
    Frame(ObservedFrame),
    /// The scheduler's first conflict went out at `at`
    ConflictInjected { at: f64 },
    /// The scheduler could not transmit
    StimulusFailed(String),
    /// The capture thread stopped with an error
    CaptureFailed(String),
}

/// One harness run against one device
pub struct Harness {
    run_id: Uuid,
    config: RunConfig,
    target: ClassifyTarget,
    policy: PhasePolicy,
    clock: RunClock,
    state: PhaseState,
    record: TimingRecord,
    injector: Arc<ConflictInjector>,
    scheduler: StimulusScheduler,
    inputs: UnboundedSender<HarnessInput>,
}

impl Harness {
    /// `inputs` must feed the receiver later passed to [`Harness::run`]
    pub fn new(
        config: RunConfig,
        injector: Arc<ConflictInjector>,
        clock: RunClock,
        inputs: UnboundedSender<HarnessInput>,
    ) -> Self {
        let scheduler = StimulusScheduler::new(Arc::clone(&injector), clock, config.schedule);
        Self {
            run_id: Uuid::now_v7(),
            target: config.classify_target(),
            policy: config.policy(),
            record: TimingRecord::new(config.verifier()),
            state: PhaseState::new(),
            config,
            clock,
            injector,
            scheduler,
            inputs,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn record(&self) -> &TimingRecord {
        &self.record
    }

    /// Process one input; `Some` means the run must stop
    pub fn handle(&mut self, input: HarnessInput) -> Option<StopReason> {
        let input = match input {
            HarnessInput::Frame(frame) => Input::Event {
                event: classify(&frame, &self.target),
                at: frame.timestamp,
            },
            HarnessInput::ConflictInjected { at } => Input::ConflictInjected { at },
            HarnessInput::StimulusFailed(reason) | HarnessInput::CaptureFailed(reason) => {
                return Some(StopReason::Failed(reason));
            }
        };

        let step = self.state.apply(input, &self.policy);
        self.state = step.state;

        let mut stop = None;
        for effect in step.effects {
            if let Some(reason) = self.apply_effect(effect) {
                stop.get_or_insert(reason);
            }
        }
        stop
    }

    fn apply_effect(&mut self, effect: Effect) -> Option<StopReason> {
        match effect {
            Effect::Started { at } => {
                info!(run_id = %self.run_id, at_secs = at, "Initial attempt #1 detected");
            }
            Effect::ProbeRecorded { at, attempt } => {
                self.record.record_probe(at, attempt);
                debug!(
                    probe = self.record.probes().len(),
                    attempt,
                    at_secs = at,
                    "Probe recorded"
                );
            }
            Effect::AttemptBoundary {
                attempt,
                interval_ms,
            } => {
                let interval = self.record.record_interval(interval_ms);
                if interval.matched {
                    info!(
                        attempt,
                        interval_ms = interval_ms.round() as u64,
                        expected_ms = self.config.expected_retry_delay_ms,
                        "Retry attempt detected, timing matches"
                    );
                } else {
                    warn!(
                        attempt,
                        interval_ms = interval_ms.round() as u64,
                        expected_ms = self.config.expected_retry_delay_ms,
                        "Retry attempt detected, timing does not match"
                    );
                }
            }
            Effect::SendReplyConflict { to } => {
                if let Err(e) = self.injector.send_reply_conflict(to) {
                    return Some(StopReason::Failed(e.to_string()));
                }
                debug!(target_mac = %to, adversary = %self.injector.adversary_mac(), "Conflict reply sent");
            }
            Effect::Acquired { at, latency } => {
                if let Some(latency) = latency {
                    self.record.set_acquisition_latency(latency);
                }
                info!(at_secs = at, latency_secs = latency, "IP acquired, device entered ongoing phase");
                if self.config.test_ongoing
                    && self.scheduler.trigger(self.inputs.clone()).is_some()
                {
                    debug!("Ongoing phase stimulus scheduled");
                }
            }
            Effect::DefenseObserved { at } => {
                debug!(
                    at_secs = at,
                    defensive_arps = self.state.defensive_arps,
                    "Defensive ARP observed"
                );
            }
            Effect::Retreated { at, latency } => {
                if let Some(latency) = latency {
                    self.record.set_retreat_latency(latency);
                }
                info!(at_secs = at, latency_secs = latency, "Retreat detected, device is probing again");
            }
            Effect::MaxAttemptsReached { attempt } => {
                info!(attempt, "Maximum attempts reached");
                return Some(StopReason::MaxAttemptsReached);
            }
        }
        None
    }

    /// Consume inputs until the deadline, `shutdown`, or a stop condition
    pub async fn run<S>(mut self, mut inputs: UnboundedReceiver<HarnessInput>, shutdown: S) -> Report
    where
        S: Future<Output = ()>,
    {
        let deadline = self.clock.deadline_after(self.config.duration);
        tokio::pin!(shutdown);

        info!(
            run_id = %self.run_id,
            ip = %self.config.protected_ip,
            device = %self.config.device_mac,
            duration_secs = self.config.duration.as_secs(),
            "Waiting for ARP traffic from device"
        );

        let reason = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break StopReason::Interrupted,
                _ = tokio::time::sleep_until(deadline) => break StopReason::DurationElapsed,
                input = inputs.recv() => match input {
                    Some(input) => {
                        if let Some(reason) = self.handle(input) {
                            break reason;
                        }
                    }
                    None => break StopReason::CaptureEnded,
                },
            }
        };

        match &reason {
            StopReason::Failed(e) => error!(run_id = %self.run_id, error = %e, "Run failed"),
            other => info!(run_id = %self.run_id, reason = %other, "Run stopped"),
        }

        self.into_report(reason)
    }

    /// Snapshot the run as it stands
    pub fn into_report(self, stop_reason: StopReason) -> Report {
        let now = self.clock.now();
        let elapsed = self
            .state
            .run_start_timestamp
            .map(|start| now - start)
            .unwrap_or(0.0);

        Report {
            run_id: self.run_id,
            generated_at: Utc::now(),
            counters: InjectionCounters {
                conflicts_sent: self.injector.conflicts_sent(),
                announcements_sent: self.injector.announcements_sent(),
            },
            adversary_mac: self.injector.adversary_mac(),
            config: self.config,
            state: self.state,
            record: self.record,
            stop_reason,
            elapsed,
            capture_stats: None,
        }
    }
}

/// Run the harness against a live interface
///
/// Opens the raw sender and the pcap capture, bridges captured frames into
/// the run loop and stops on Ctrl+C, the deadline, or max attempts.
pub async fn run_on_interface(config: RunConfig) -> Result<Report> {
    config.validate()?;

    let interface = Interface::by_name(&config.interface)?;
    let sender = Arc::new(interface.create_sender()?);
    let injector = Arc::new(
        ConflictInjector::new(sender, config.protected_ip).with_announce_op(config.announce_op),
    );
    info!(adversary = %injector.adversary_mac(), "Conflict MAC selected");

    let clock = RunClock::start();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut capture = ArpCapture::new(&config.interface);
    capture.set_filter(&filters::device_arp_filter(&config.device_mac));

    let capture_tx = tx.clone();
    capture.start(clock, move |event| {
        let input = match event {
            CaptureEvent::Frame(frame) => HarnessInput::Frame(frame),
            CaptureEvent::Failed(e) => HarnessInput::CaptureFailed(e.to_string()),
        };
        let _ = capture_tx.send(input);
    })?;

    let harness = Harness::new(config, injector, clock, tx);
    let report = harness.run(rx, interrupted()).await;

    capture.stop();
    Ok(report.with_capture_stats(capture.stats()))
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
pub(crate) async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acdtest_arp::{ArpFrame, ArpOpcode, ArpPacket};
    use acdtest_core::{FrameSender, MacAddr};
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    const DEVICE: MacAddr = MacAddr::new([0x30, 0xed, 0xa0, 0xe3, 0x34, 0xc1]);

    #[derive(Default)]
    struct RecordingSender {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    impl FrameSender for RecordingSender {
        fn send_frame(&self, frame: &[u8]) -> Result<()> {
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    fn ip() -> Ipv4Addr {
        Ipv4Addr::new(172, 16, 82, 100)
    }

    fn harness(sender: Arc<RecordingSender>) -> Harness {
        let config = RunConfig::new(ip(), DEVICE, "eth0");
        let injector = Arc::new(ConflictInjector::new(sender, ip()));
        let (tx, _rx) = mpsc::unbounded_channel();
        Harness::new(config, injector, RunClock::start(), tx)
    }

    fn probe(at: f64) -> HarnessInput {
        HarnessInput::Frame(ObservedFrame {
            timestamp: at,
            operation: ArpOpcode::Request,
            sender_ip: Ipv4Addr::UNSPECIFIED,
            target_ip: ip(),
            sender_mac: DEVICE,
        })
    }

    #[tokio::test]
    async fn test_probe_is_answered_with_unicast_conflict() {
        let sender = Arc::new(RecordingSender::default());
        let mut h = harness(Arc::clone(&sender));

        assert_eq!(h.handle(probe(0.0)), None);

        let frames = sender.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let frame = ArpFrame::from_bytes(&frames[0]).unwrap();
        assert_eq!(frame.destination, DEVICE);
        assert_eq!(frame.arp.operation, ArpOpcode::Reply);
        assert_eq!(frame.arp.sender_proto_addr, ip());
        assert_eq!(frame.arp.target_proto_addr, ip());
        assert_eq!(frame.arp.target_hw_addr, DEVICE);
    }

    #[tokio::test]
    async fn test_irrelevant_frames_are_ignored() {
        let sender = Arc::new(RecordingSender::default());
        let mut h = harness(Arc::clone(&sender));

        let arp = ArpPacket::new_request(
            MacAddr::new([0x02, 1, 2, 3, 4, 5]),
            Ipv4Addr::new(172, 16, 82, 1),
            ip(),
        );
        let frame = ObservedFrame::from_arp(&arp, 1.0);
        assert_eq!(h.handle(HarnessInput::Frame(frame)), None);

        assert!(h.record().probes().is_empty());
        assert!(sender.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_stop_the_run() {
        let mut h = harness(Arc::new(RecordingSender::default()));
        assert_eq!(
            h.handle(HarnessInput::CaptureFailed("device went away".into())),
            Some(StopReason::Failed("device went away".into()))
        );
    }
}
