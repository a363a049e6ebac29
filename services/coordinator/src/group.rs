//! Shared group state and its critical sections.
//!
//! The membership table and the message log live behind a single mutex.  The
//! two compound operations below are the reason: a multicast must append its
//! entry and capture the online snapshot atomically, and a reconnect must
//! flip the member online and compute its replay slice atomically.  Under
//! that discipline a multicast either sees a member online and attempts
//! delivery, or sees it offline and only stores.
//!
//! Network I/O never happens while the lock is held; callers dispatch from
//! the returned snapshot after the guard is dropped.

use crate::membership::{MembershipError, MembershipTable};
use crate::retention::MessageLog;
use gc_protocol::Delivery;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

pub type SharedGroup = Arc<Mutex<GroupState>>;

/// Seconds since the Unix epoch on the coordinator's clock, which is
/// authoritative for acceptance and offline instants.
pub fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Membership table + retained log, always mutated together under one lock.
#[derive(Debug)]
pub struct GroupState {
    pub members: MembershipTable,
    pub log: MessageLog,
}

impl GroupState {
    pub fn new(window_secs: u64) -> Self {
        GroupState {
            members: MembershipTable::new(),
            log: MessageLog::new(window_secs),
        }
    }

    pub fn shared(window_secs: u64) -> SharedGroup {
        Arc::new(Mutex::new(Self::new(window_secs)))
    }

    /// Accept a multicast: append to the log and capture the online
    /// snapshot in one step.
    ///
    /// The snapshot is exactly the set of online members at the instant the
    /// entry was appended; every member in it gets one delivery attempt.
    /// A multicast from an unknown sender mutates nothing.
    pub fn accept_multicast(
        &mut self,
        sender_id: &str,
        message: &str,
        now: f64,
    ) -> Result<(Delivery, Vec<(String, SocketAddr)>), MembershipError> {
        if !self.members.contains(sender_id) {
            return Err(MembershipError::NotRegistered(sender_id.to_owned()));
        }
        self.log.append(sender_id, message, now);
        let recipients = self.members.snapshot_online();
        let payload = Delivery::Multicast {
            sender_id: sender_id.to_owned(),
            message: message.to_owned(),
            timestamp: now,
        };
        Ok((payload, recipients))
    }

    /// Accept a reconnect: flip the member online, update its address, and
    /// compute its replay slice in one step.
    ///
    /// A multicast accepted before this transition lands in the slice (the
    /// member was offline for its snapshot); one accepted after it is
    /// delivered live instead.  No message is delivered both ways.
    pub fn accept_reconnect(
        &mut self,
        id: &str,
        addr: SocketAddr,
        now: f64,
    ) -> Result<Vec<Delivery>, MembershipError> {
        let disconnected_at = self.members.reconnect(id, addr)?;
        let replay = self
            .log
            .replay_for(disconnected_at, now)
            .into_iter()
            .map(|e| Delivery::Multicast {
                sender_id: e.sender_id,
                message: e.body,
                timestamp: e.accepted_at,
            })
            .collect();
        Ok(replay)
    }
}
