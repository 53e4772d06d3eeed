//! Conflict injection
//!
//! Builds ARP frames in which a synthetic third-party device claims the
//! protected address, and puts them on the wire through a [`FrameSender`].

use crate::frame::ArpFrame;
use crate::packet::{ArpOpcode, ArpPacket};
use acdtest_core::{FrameSender, MacAddr, Result};
use rand::Rng;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Random locally administered unicast MAC (02:xx:xx:xx:xx:xx)
pub fn random_adversary_mac() -> MacAddr {
    let mut bytes = [0x02u8, 0, 0, 0, 0, 0];
    rand::thread_rng().fill(&mut bytes[1..]);
    MacAddr(bytes)
}

/// Sends conflicting ARP traffic on behalf of one synthetic adversary
///
/// The adversary MAC is fixed at construction so every conflict of a run
/// appears to come from the same device.
pub struct ConflictInjector {
    sender: Arc<dyn FrameSender>,
    protected_ip: Ipv4Addr,
    adversary_mac: MacAddr,
    announce_op: ArpOpcode,
    conflicts_sent: AtomicU64,
    announcements_sent: AtomicU64,
}

impl ConflictInjector {
    /// Create an injector with a fresh random adversary MAC
    pub fn new(sender: Arc<dyn FrameSender>, protected_ip: Ipv4Addr) -> Self {
        Self {
            sender,
            protected_ip,
            adversary_mac: random_adversary_mac(),
            announce_op: ArpOpcode::Reply,
            conflicts_sent: AtomicU64::new(0),
            announcements_sent: AtomicU64::new(0),
        }
    }

    /// Use a fixed adversary MAC instead of a random one
    pub fn with_adversary_mac(mut self, mac: MacAddr) -> Self {
        self.adversary_mac = mac;
        self
    }

    /// Opcode used for announcement conflicts (reply by default)
    pub fn with_announce_op(mut self, op: ArpOpcode) -> Self {
        self.announce_op = op;
        self
    }

    pub fn adversary_mac(&self) -> MacAddr {
        self.adversary_mac
    }

    pub fn protected_ip(&self) -> Ipv4Addr {
        self.protected_ip
    }

    /// Total conflict frames sent (replies and announcements)
    pub fn conflicts_sent(&self) -> u64 {
        self.conflicts_sent.load(Ordering::SeqCst)
    }

    /// Announcement conflicts sent
    pub fn announcements_sent(&self) -> u64 {
        self.announcements_sent.load(Ordering::SeqCst)
    }

    /// Answer a probe with "address already in use", unicast to `target_mac`
    pub fn send_reply_conflict(&self, target_mac: MacAddr) -> Result<()> {
        let arp = ArpPacket::new_reply(
            self.adversary_mac,
            self.protected_ip,
            target_mac,
            self.protected_ip,
        );
        self.transmit(ArpFrame::new(target_mac, self.adversary_mac, arp))?;

        debug!(
            target = %target_mac,
            adversary = %self.adversary_mac,
            ip = %self.protected_ip,
            "Sent reply conflict"
        );
        Ok(())
    }

    /// Broadcast a gratuitous announcement claiming the protected address
    pub fn send_announcement_conflict(&self) -> Result<()> {
        let arp = ArpPacket::new_announcement(self.adversary_mac, self.protected_ip, self.announce_op);
        self.transmit(ArpFrame::new(MacAddr::broadcast(), self.adversary_mac, arp))?;
        self.announcements_sent.fetch_add(1, Ordering::SeqCst);

        debug!(
            adversary = %self.adversary_mac,
            ip = %self.protected_ip,
            op = ?self.announce_op,
            "Sent announcement conflict"
        );
        Ok(())
    }

    fn transmit(&self, frame: ArpFrame) -> Result<()> {
        if let Err(e) = self.sender.send_frame(&frame.to_bytes()) {
            error!(error = %e, ip = %self.protected_ip, "Failed to send conflict frame");
            return Err(e);
        }
        self.conflicts_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
