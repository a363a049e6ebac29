//! Membership table: the coordinator's authoritative view of the group.
//!
//! One record per registered participant.  A record exists iff the
//! participant has registered and not yet deregistered; its receiver address
//! is meaningful only while the record is `Online`.  Every online→offline
//! transition stamps `last_offline_at`, which is what the replay engine uses
//! as the per-participant cutoff on reconnect.
//!
//! The table itself is not synchronized; callers hold it inside the group
//! mutex (see `group`).

use std::collections::HashMap;
use std::net::SocketAddr;

/// Coordinator's view of a member's reachability.
///
/// Independent of the participant's own local state: dispatch failure can
/// demote a member that still believes it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Online,
    Offline,
}

/// One membership record, keyed by participant id in the table.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    /// Current receiver endpoint; updated on each register/reconnect.
    pub addr: SocketAddr,
    pub status: MemberStatus,
    /// Instant of the most recent online→offline transition, in seconds
    /// since the Unix epoch.  `None` until the record first goes offline.
    pub last_offline_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("participant '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("participant '{0}' is not registered")]
    NotRegistered(String),
    #[error("participant '{0}' is not online")]
    NotOnline(String),
    #[error("participant '{0}' is not offline")]
    NotOffline(String),
}

/// Authoritative lookup and update of participant records.
#[derive(Debug, Default)]
pub struct MembershipTable {
    members: HashMap<String, MemberRecord>,
}

impl MembershipTable {
    pub fn new() -> Self {
        MembershipTable {
            members: HashMap::new(),
        }
    }

    /// Insert a fresh record in `Online` with no prior offline instant.
    ///
    /// Rejected while any record for `id` exists, regardless of its status.
    pub fn register(&mut self, id: &str, addr: SocketAddr) -> Result<(), MembershipError> {
        if self.members.contains_key(id) {
            return Err(MembershipError::AlreadyRegistered(id.to_owned()));
        }
        self.members.insert(
            id.to_owned(),
            MemberRecord {
                addr,
                status: MemberStatus::Online,
                last_offline_at: None,
            },
        );
        Ok(())
    }

    /// Remove the record entirely.  Retained messages are unaffected; the id
    /// may re-register later as a fresh member with no replay history.
    pub fn deregister(&mut self, id: &str) -> Result<(), MembershipError> {
        self.members
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MembershipError::NotRegistered(id.to_owned()))
    }

    /// Voluntary online→offline transition; stamps `last_offline_at`.
    pub fn disconnect(&mut self, id: &str, now: f64) -> Result<(), MembershipError> {
        let record = self
            .members
            .get_mut(id)
            .ok_or_else(|| MembershipError::NotRegistered(id.to_owned()))?;
        if record.status != MemberStatus::Online {
            return Err(MembershipError::NotOnline(id.to_owned()));
        }
        record.status = MemberStatus::Offline;
        record.last_offline_at = Some(now);
        Ok(())
    }

    /// Offline→online transition.  Updates the receiver address and returns
    /// the previous `last_offline_at` as the replay context.
    pub fn reconnect(&mut self, id: &str, addr: SocketAddr) -> Result<Option<f64>, MembershipError> {
        let record = self
            .members
            .get_mut(id)
            .ok_or_else(|| MembershipError::NotRegistered(id.to_owned()))?;
        if record.status != MemberStatus::Offline {
            return Err(MembershipError::NotOffline(id.to_owned()));
        }
        record.status = MemberStatus::Online;
        record.addr = addr;
        Ok(record.last_offline_at)
    }

    /// Ordered list of (id, address) for every online member.
    ///
    /// Sorted by id so dispatch order is deterministic.
    pub fn snapshot_online(&self) -> Vec<(String, SocketAddr)> {
        let mut online: Vec<(String, SocketAddr)> = self
            .members
            .iter()
            .filter(|(_, r)| r.status == MemberStatus::Online)
            .map(|(id, r)| (id.clone(), r.addr))
            .collect();
        online.sort_by(|a, b| a.0.cmp(&b.0));
        online
    }

    /// Demote a member after a dispatch failure.
    ///
    /// Idempotent: no effect when the record is already offline or absent.
    /// `at` is the acceptance instant of the delivery that failed, so the
    /// undelivered message stays inside the replay cutoff (closed bound).
    pub fn mark_offline(&mut self, id: &str, at: f64) {
        if let Some(record) = self.members.get_mut(id) {
            if record.status == MemberStatus::Online {
                record.status = MemberStatus::Offline;
                record.last_offline_at = Some(at);
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&MemberRecord> {
        self.members.get(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
