//! Local log sink for received multicasts.
//!
//! One line per delivery, `[YYYY-MM-DD HH:MM:SS] From <sender>: <message>`,
//! with the coordinator's acceptance timestamp rendered in the local zone.
//! The file is append-only; writes are serialized under a mutex so
//! concurrent deliveries never interleave.  A write failure goes to stderr
//! and the delivery still counts as received.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tokio::sync::Mutex;

/// Render one log line (without the trailing newline).
///
/// `timestamp` is the coordinator's `accepted_at` in epoch seconds.  Clock
/// skew affects only this displayed string, never replay eligibility.
pub fn format_line(sender_id: &str, message: &str, timestamp: f64) -> String {
    let secs = timestamp.floor() as i64;
    let nanos = ((timestamp - timestamp.floor()) * 1e9) as u32;
    let stamp = DateTime::from_timestamp(secs, nanos)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");
    format!("[{stamp}] From {sender_id}: {message}")
}

/// Append-only log file shared by all delivery handlers.
#[derive(Debug)]
pub struct MessageSink {
    file: Mutex<File>,
}

impl MessageSink {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(MessageSink {
            file: Mutex::new(file),
        })
    }

    /// Record one received multicast: append to the file and echo to stdout.
    pub async fn record(&self, sender_id: &str, message: &str, timestamp: f64) {
        let line = format_line(sender_id, message, timestamp);
        {
            let mut file = self.file.lock().await;
            if let Err(e) = writeln!(file, "{line}") {
                eprintln!("Error writing to log file: {e}");
            }
        }
        println!("Received multicast: {line}");
    }
}
