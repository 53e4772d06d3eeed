//! Live ARP capture on top of pcap
//!
//! Frames are read on a dedicated thread and handed to a callback strictly in
//! arrival order, each stamped with the run clock at the moment it is read.
//! Nothing between pcap and the callback buffers, reorders or drops frames.

use acdtest_arp::ObservedFrame;
use acdtest_core::{Error, Result, RunClock};
use parking_lot::RwLock;
use pcap::{Active, Capture, Device};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, trace};

use crate::stats::{CaptureStats, StatsAccumulator};

/// Default snapshot length (ARP frames are tiny)
const DEFAULT_SNAPLEN: i32 = 256;

/// Read timeout, bounds how long a stop request can go unnoticed
const DEFAULT_TIMEOUT_MS: i32 = 100;

/// Configuration for packet capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Enable immediate mode (deliver packets immediately)
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            immediate_mode: true,
        }
    }
}

/// State of packet capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Capture is not running
    Stopped,
    /// Capture is actively running
    Running,
}

/// What the capture thread delivers
#[derive(Debug)]
pub enum CaptureEvent {
    /// A parsed ARP frame
    Frame(ObservedFrame),
    /// The capture failed; no further events follow
    Failed(Error),
}

/// ARP capture on one interface
pub struct ArpCapture {
    /// Interface name
    interface: String,
    /// Capture configuration
    config: CaptureConfig,
    /// Current BPF filter
    filter: Option<String>,
    /// Current capture state
    state: Arc<RwLock<CaptureState>>,
    /// Statistics accumulator
    stats: StatsAccumulator,
}

impl ArpCapture {
    /// Create a capture for the named interface
    ///
    /// The interface is not validated here; opening the pcap handle in
    /// [`ArpCapture::start`] is what fails if it does not exist.
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
            config: CaptureConfig::default(),
            filter: None,
            state: Arc::new(RwLock::new(CaptureState::Stopped)),
            stats: StatsAccumulator::new(),
        }
    }

    /// Set the BPF filter applied when the capture starts
    pub fn set_filter(&mut self, bpf: &str) {
        debug!("Setting BPF filter: {}", bpf);
        self.filter = Some(bpf.to_string());
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Get current capture state
    pub fn state(&self) -> CaptureState {
        *self.state.read()
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.state() == CaptureState::Running
    }

    /// Get current statistics
    pub fn stats(&self) -> CaptureStats {
        self.stats.snapshot()
    }

    /// Open and configure the pcap handle
    fn init_capture(&self) -> Result<Capture<Active>> {
        debug!("Initializing pcap capture on {}", self.interface);

        let device = Device::from(self.interface.as_str());
        let mut capture = Capture::from_device(device)
            .map_err(|e| Error::Capture(format!("Failed to create capture: {}", e)))?
            .promisc(self.config.promiscuous)
            .snaplen(self.config.snaplen)
            .timeout(self.config.timeout_ms)
            .immediate_mode(self.config.immediate_mode)
            .open()
            .map_err(|e| Error::Capture(format!("Failed to open capture: {}", e)))?;

        if let Some(filter) = self.filter.as_ref() {
            capture
                .filter(filter, true)
                .map_err(|e| Error::Capture(format!("Invalid BPF filter '{}': {}", filter, e)))?;
            debug!("Applied filter: {}", filter);
        }

        info!("Capture initialized on {}", self.interface);
        Ok(capture)
    }

    /// Start capturing; `callback` sees every ARP frame in arrival order
    ///
    /// Opening the handle happens before this returns, so permission and
    /// missing-interface errors surface here rather than on the thread.
    pub fn start<F>(&mut self, clock: RunClock, mut callback: F) -> Result<()>
    where
        F: FnMut(CaptureEvent) + Send + 'static,
    {
        if self.is_running() {
            return Err(Error::Capture("Capture already running".to_string()));
        }

        let mut capture = self.init_capture()?;
        *self.state.write() = CaptureState::Running;

        info!("Starting packet capture on {}", self.interface);

        let state = Arc::clone(&self.state);
        let stats = self.stats.clone();

        thread::spawn(move || {
            loop {
                if *state.read() == CaptureState::Stopped {
                    debug!("Capture stopped");
                    break;
                }

                match capture.next_packet() {
                    Ok(packet) => {
                        let timestamp = clock.now();
                        match ObservedFrame::from_ethernet(packet.data, timestamp) {
                            Ok(frame) => {
                                stats.record_frame(packet.data.len(), true);
                                callback(CaptureEvent::Frame(frame));
                            }
                            Err(e) => {
                                stats.record_frame(packet.data.len(), false);
                                trace!(error = %e, "Skipping unparsable frame");
                            }
                        }
                    }
                    Err(pcap::Error::TimeoutExpired) => continue,
                    Err(e) => {
                        error!("Packet capture error: {}", e);
                        callback(CaptureEvent::Failed(Error::Capture(e.to_string())));
                        break;
                    }
                }
            }

            *state.write() = CaptureState::Stopped;
            info!("Capture thread finished");
        });

        Ok(())
    }

    /// Ask the capture thread to stop; it exits within one read timeout
    pub fn stop(&mut self) {
        if self.is_running() {
            info!("Stopping packet capture on {}", self.interface);
            *self.state.write() = CaptureState::Stopped;
        }
    }
}

impl Drop for ArpCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
