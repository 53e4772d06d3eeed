//! Standalone conflict tools
//!
//! `announce` claims an address with gratuitous ARP announcements; `respond`
//! answers every probe for an address with a reply conflict. Both act as the
//! same synthetic adversary the timing harness uses, without any phase
//! inference.

use crate::run::interrupted;
use acdtest_arp::{ArpOpcode, ConflictInjector, ObservedFrame};
use acdtest_capture::{filters, ArpCapture, CaptureEvent};
use acdtest_core::{Error, Interface, MacAddr, Result, RunClock};
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

/// How many announcements to send and how far apart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnounceOptions {
    pub count: u32,
    pub interval: Duration,
    /// Ignore `count` and send until interrupted
    pub continuous: bool,
}

impl Default for AnnounceOptions {
    fn default() -> Self {
        Self {
            count: 1,
            interval: Duration::from_secs(2),
            continuous: false,
        }
    }
}

/// Open a raw sender on `interface` and wrap it in an injector
pub fn open_injector(
    interface: &str,
    ip: Ipv4Addr,
    mac: Option<MacAddr>,
    announce_op: ArpOpcode,
) -> Result<Arc<ConflictInjector>> {
    let sender = Arc::new(Interface::by_name(interface)?.create_sender()?);
    let mut injector = ConflictInjector::new(sender, ip).with_announce_op(announce_op);
    if let Some(mac) = mac {
        injector = injector.with_adversary_mac(mac);
    }
    info!(adversary = %injector.adversary_mac(), "Using conflict MAC");
    Ok(Arc::new(injector))
}

/// Send announcements until done or `shutdown` resolves; returns how many went out
pub async fn announce<S>(injector: &ConflictInjector, options: AnnounceOptions, shutdown: S) -> Result<u64>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut sent = 0u64;

    loop {
        injector.send_announcement_conflict()?;
        sent += 1;
        info!(
            n = sent,
            ip = %injector.protected_ip(),
            mac = %injector.adversary_mac(),
            "Sent ARP announcement"
        );

        if !options.continuous && sent >= u64::from(options.count) {
            break;
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!(sent, "Stopped by user");
                break;
            }
            _ = tokio::time::sleep(options.interval) => {}
        }
    }

    Ok(sent)
}

/// Probe for `ip` from any device
pub fn is_probe_for(frame: &ObservedFrame, ip: Ipv4Addr) -> bool {
    frame.operation == ArpOpcode::Request
        && frame.sender_ip.is_unspecified()
        && frame.target_ip == ip
}

/// Answer probes arriving on `events` until `duration` passes or `shutdown` resolves
///
/// Returns the number of probes answered.
pub async fn respond<S>(
    injector: &ConflictInjector,
    mut events: UnboundedReceiver<CaptureEvent>,
    duration: Duration,
    shutdown: S,
) -> Result<u64>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let deadline = tokio::time::Instant::now() + duration;
    let ip = injector.protected_ip();
    let mut answered = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(answered, "Stopped by user");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => break,
            event = events.recv() => match event {
                Some(CaptureEvent::Frame(frame)) => {
                    if is_probe_for(&frame, ip) {
                        answered += 1;
                        info!(n = answered, from = %frame.sender_mac, ip = %ip, "Detected ARP probe");
                        injector.send_reply_conflict(frame.sender_mac)?;
                    } else if frame.target_ip == ip {
                        debug!(sender_ip = %frame.sender_ip, "ARP request for target is not a probe");
                    }
                }
                Some(CaptureEvent::Failed(e)) => return Err(e),
                None => {
                    warn!("Capture ended");
                    break;
                }
            },
        }
    }

    info!(answered, "Probe response finished");
    Ok(answered)
}

/// `announce` on a live interface, stopping on Ctrl+C
pub async fn announce_on_interface(
    interface: &str,
    ip: Ipv4Addr,
    mac: Option<MacAddr>,
    announce_op: ArpOpcode,
    options: AnnounceOptions,
) -> Result<u64> {
    let injector = open_injector(interface, ip, mac, announce_op)?;
    announce(&injector, options, interrupted()).await
}

/// `respond` on a live interface, stopping on Ctrl+C
pub async fn respond_on_interface(
    interface: &str,
    ip: Ipv4Addr,
    mac: Option<MacAddr>,
    duration: Duration,
) -> Result<u64> {
    if duration.is_zero() {
        return Err(Error::invalid_parameter("duration", "must be greater than zero"));
    }

    let injector = open_injector(interface, ip, mac, ArpOpcode::Reply)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut capture = ArpCapture::new(interface);
    capture.set_filter(&filters::arp_filter());
    capture.start(RunClock::start(), move |event| {
        let _ = tx.send(event);
    })?;

    info!(ip = %ip, duration_secs = duration.as_secs(), "Listening for ARP probes");
    let result = respond(&injector, rx, duration, interrupted()).await;

    capture.stop();
    result
}
