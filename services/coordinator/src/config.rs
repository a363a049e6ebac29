//! Coordinator configuration loading.
//!
//! The config file is plain text, two lines:
//! 1. listening port (integer)
//! 2. persistence window in seconds (integer)
//!
//! The path is supplied as the binary's sole positional argument.  An
//! unreadable or malformed file is fatal at startup.

use std::path::Path;

/// Runtime configuration of the coordinator process.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub port: u16,
    /// Upper bound on how far back replay reaches on reconnect.
    pub persistence_window_secs: u64,
}

/// Load coordinator config from a file path.
pub fn load_config_from_path(path: &Path) -> Result<CoordinatorConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&text)
}

/// Load coordinator config from the raw file contents.
pub fn load_config_from_str(text: &str) -> Result<CoordinatorConfig, ConfigError> {
    let mut lines = text.lines();

    let port_line = lines
        .next()
        .ok_or_else(|| ConfigError::MissingField("listening port (line 1)".to_owned()))?;
    let port = port_line
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidValue(format!("listening port '{}'", port_line.trim())))?;

    let window_line = lines
        .next()
        .ok_or_else(|| ConfigError::MissingField("persistence window (line 2)".to_owned()))?;
    let persistence_window_secs = window_line.trim().parse::<u64>().map_err(|_| {
        ConfigError::InvalidValue(format!("persistence window '{}'", window_line.trim()))
    })?;

    Ok(CoordinatorConfig {
        port,
        persistence_window_secs,
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
