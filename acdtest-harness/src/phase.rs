//! Phase inference
//!
//! The device's ACD phase is never observed directly; it is inferred from the
//! classified event stream. All of that inference lives in one transition
//! function, [`PhaseState::apply`], which takes the current state and one
//! input and returns the next state plus the effects the run loop must carry
//! out. It never performs I/O.
//!
//! ```text
//!            Probe                 DefensiveAnnouncement
//!   Idle ───────────▶ Probing ─────────────────────────▶ Acquired
//!                        ▲                                   │
//!                        └────────── Probe (retreat) ────────┘
//! ```

use acdtest_arp::ClassifiedEvent;
use acdtest_core::MacAddr;

/// Inferred ACD phase of the device under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing seen from the device yet
    #[default]
    Idle,
    /// Device is sending probes for the address
    Probing,
    /// Device owns the address and defends it
    Acquired,
}

/// Static knobs the transition function reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasePolicy {
    /// Probe gap above which a new attempt starts
    pub attempt_boundary_ms: f64,
    /// Ongoing-phase test: let the first acquisition through unanswered
    pub ongoing_test: bool,
    /// Stop after this many attempts (0 = never)
    pub max_attempts: u32,
}

/// One input to the state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// A classified frame, stamped with its capture time
    Event { event: ClassifiedEvent, at: f64 },
    /// The scheduler put the first ongoing-phase conflict on the wire
    ConflictInjected { at: f64 },
}

/// Something the run loop must do as a result of a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// First probe of the run
    Started { at: f64 },
    /// Append a probe to the timing record
    ProbeRecorded { at: f64, attempt: u32 },
    /// A new attempt started `interval_ms` after the previous probe
    AttemptBoundary { attempt: u32, interval_ms: f64 },
    /// Answer the probe with a reply conflict
    SendReplyConflict { to: MacAddr },
    /// Device took the address
    Acquired { at: f64, latency: Option<f64> },
    /// Device defended the address it holds
    DefenseObserved { at: f64 },
    /// Device gave the address up and went back to probing
    Retreated { at: f64, latency: Option<f64> },
    MaxAttemptsReached { attempt: u32 },
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: PhaseState,
    pub effects: Vec<Effect>,
}

/// Everything the harness has inferred about the device so far
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseState {
    pub phase: Phase,
    /// 0 until the first probe, then 1-based
    pub current_attempt: u32,
    pub last_probe_timestamp: Option<f64>,
    pub run_start_timestamp: Option<f64>,
    /// Latest acquisition; set whenever `phase` is `Acquired`
    pub acquisition_timestamp: Option<f64>,
    pub first_conflict_timestamp: Option<f64>,
    pub retreat_detected: bool,
    pub defensive_arps: u64,
}

impl PhaseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device has held the address at least once this run
    pub fn ever_acquired(&self) -> bool {
        self.acquisition_timestamp.is_some()
    }

    /// Probes are recorded but left unanswered
    ///
    /// In ongoing mode the device must be allowed to acquire before any
    /// conflict is sent; once it acquires or retreats, probes are answered
    /// again.
    fn observe_only(&self, policy: &PhasePolicy) -> bool {
        policy.ongoing_test && !self.ever_acquired() && !self.retreat_detected
    }

    /// Apply one input and return the next state with its effects
    pub fn apply(self, input: Input, policy: &PhasePolicy) -> Step {
        let mut next = self;
        let mut effects = Vec::new();

        match input {
            Input::ConflictInjected { at } => {
                if next.first_conflict_timestamp.is_none() {
                    next.first_conflict_timestamp = Some(at);
                }
            }
            Input::Event { event, at } => match event {
                ClassifiedEvent::Probe { from_mac } => {
                    if next.phase == Phase::Acquired {
                        next.retreat_detected = true;
                        next.phase = Phase::Probing;
                        let latency = next.first_conflict_timestamp.map(|t| at - t);
                        effects.push(Effect::Retreated { at, latency });
                    }
                    next.on_probe(from_mac, at, policy, &mut effects);
                }
                ClassifiedEvent::DefensiveAnnouncement { .. } => match next.phase {
                    Phase::Idle => {}
                    Phase::Probing => {
                        next.phase = Phase::Acquired;
                        next.acquisition_timestamp = Some(at);
                        next.defensive_arps += 1;
                        let latency = next.run_start_timestamp.map(|t| at - t);
                        effects.push(Effect::Acquired { at, latency });
                    }
                    Phase::Acquired => {
                        next.defensive_arps += 1;
                        effects.push(Effect::DefenseObserved { at });
                    }
                },
                ClassifiedEvent::Irrelevant => {}
            },
        }

        Step {
            state: next,
            effects,
        }
    }

    /// Probe handling shared by Idle and Probing
    fn on_probe(&mut self, from: MacAddr, at: f64, policy: &PhasePolicy, effects: &mut Vec<Effect>) {
        match self.last_probe_timestamp {
            None => {
                self.phase = Phase::Probing;
                self.current_attempt = 1;
                self.run_start_timestamp = Some(at);
                effects.push(Effect::Started { at });
            }
            Some(last) => {
                self.phase = Phase::Probing;
                let gap_ms = (at - last) * 1000.0;
                if gap_ms > policy.attempt_boundary_ms {
                    self.current_attempt += 1;
                    effects.push(Effect::AttemptBoundary {
                        attempt: self.current_attempt,
                        interval_ms: gap_ms,
                    });
                }
            }
        }

        self.last_probe_timestamp = Some(at);
        effects.push(Effect::ProbeRecorded {
            at,
            attempt: self.current_attempt,
        });

        if !self.observe_only(policy) {
            effects.push(Effect::SendReplyConflict { to: from });
        }

        if policy.max_attempts > 0 && self.current_attempt >= policy.max_attempts {
            effects.push(Effect::MaxAttemptsReached {
                attempt: self.current_attempt,
            });
        }
    }
}
