//! Participant configuration loading.
//!
//! The config file is plain text, three lines:
//! 1. participant id
//! 2. local log-file path
//! 3. `<coordinator_ip> <coordinator_port>` separated by whitespace
//!
//! The path is supplied as the binary's sole positional argument.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ParticipantConfig {
    pub participant_id: String,
    pub log_path: PathBuf,
    pub coordinator_addr: SocketAddr,
}

/// Load participant config from a file path.
pub fn load_config_from_path(path: &Path) -> Result<ParticipantConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&text)
}

/// Load participant config from the raw file contents.
pub fn load_config_from_str(text: &str) -> Result<ParticipantConfig, ConfigError> {
    let mut lines = text.lines();

    let participant_id = lines
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ConfigError::MissingField("participant id (line 1)".to_owned()))?
        .to_owned();

    let log_path = lines
        .next()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ConfigError::MissingField("log-file path (line 2)".to_owned()))?;

    let coordinator_line = lines
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ConfigError::MissingField("coordinator address (line 3)".to_owned()))?;

    let mut parts = coordinator_line.split_whitespace();
    let ip = parts
        .next()
        .ok_or_else(|| ConfigError::MissingField("coordinator ip (line 3)".to_owned()))?
        .parse::<IpAddr>()
        .map_err(|_| ConfigError::InvalidValue(format!("coordinator ip in '{coordinator_line}'")))?;
    let port = parts
        .next()
        .ok_or_else(|| ConfigError::MissingField("coordinator port (line 3)".to_owned()))?
        .parse::<u16>()
        .map_err(|_| {
            ConfigError::InvalidValue(format!("coordinator port in '{coordinator_line}'"))
        })?;

    Ok(ParticipantConfig {
        participant_id,
        log_path: PathBuf::from(log_path),
        coordinator_addr: SocketAddr::new(ip, port),
    })
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    MissingField(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {}", s),
            ConfigError::MissingField(s) => write!(f, "Missing required field: {}", s),
            ConfigError::InvalidValue(s) => write!(f, "Invalid config value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}
