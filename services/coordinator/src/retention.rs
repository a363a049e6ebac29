//! Retained message log and replay selection.
//!
//! Every accepted multicast is appended here in acceptance order and kept
//! until it falls outside the persistence window.  Replay on reconnect is a
//! pure selection over the log: everything at or after the later of the
//! participant's offline instant and the window cutoff, in log order.

/// A record of one accepted multicast.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedMessage {
    pub sender_id: String,
    pub body: String,
    /// Acceptance instant stamped by the coordinator's clock, in seconds
    /// since the Unix epoch.  Entries may share a timestamp; ties keep
    /// append order.
    pub accepted_at: f64,
}

/// Append-only log with window-bounded retention.
#[derive(Debug)]
pub struct MessageLog {
    window_secs: u64,
    entries: Vec<RetainedMessage>,
}

impl MessageLog {
    pub fn new(window_secs: u64) -> Self {
        MessageLog {
            window_secs,
            entries: Vec::new(),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Append a new entry.  `accepted_at` is stamped by the coordinator, not
    /// the sender.  Entries that fell out of the window are pruned here;
    /// nothing older than the cutoff can ever become eligible again.
    pub fn append(&mut self, sender_id: &str, body: &str, accepted_at: f64) {
        self.prune(accepted_at);
        self.entries.push(RetainedMessage {
            sender_id: sender_id.to_owned(),
            body: body.to_owned(),
            accepted_at,
        });
    }

    /// Select the entries a reconnecting participant must receive.
    ///
    /// `disconnected_at == None` means the participant has never been
    /// offline; a first-time register receives no history.  Otherwise every
    /// entry with `accepted_at >= max(disconnected_at, now - window)` is
    /// returned in log order.  The lower bound is closed: an entry accepted
    /// exactly at the cutoff instant is included.
    pub fn replay_for(&self, disconnected_at: Option<f64>, now: f64) -> Vec<RetainedMessage> {
        let Some(disconnected_at) = disconnected_at else {
            return Vec::new();
        };
        let cutoff = disconnected_at.max(now - self.window_secs as f64);
        self.entries
            .iter()
            .filter(|e| e.accepted_at >= cutoff)
            .cloned()
            .collect()
    }

    /// Drop entries whose acceptance instant predates the window.
    fn prune(&mut self, now: f64) {
        let cutoff = now - self.window_secs as f64;
        self.entries.retain(|e| e.accepted_at >= cutoff);
    }

    /// The retained entries, oldest first.
    pub fn entries(&self) -> &[RetainedMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
