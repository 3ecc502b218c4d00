//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve slot database location, generator settings, and log level.
//! - Keep env parsing pure (`from_lookup`) so it is testable without
//!   mutating process state.
//!
//! # Invariants
//! - Blank env values are treated as unset.
//! - Generation timeout is bounded to `1..=MAX_TIMEOUT_SECS`.

use crate::generator::gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::generator::GeminiSettings;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "HABITMANTRA_DB_PATH";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";
pub const ENV_GEMINI_MODEL: &str = "HABITMANTRA_GEMINI_MODEL";
pub const ENV_GEMINI_BASE_URL: &str = "HABITMANTRA_GEMINI_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "HABITMANTRA_GENERATE_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "HABITMANTRA_LOG_LEVEL";

const DEFAULT_DB_FILE_NAME: &str = "habitmantra.sqlite3";
const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidTimeout { raw: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimeout { raw } => write!(
                f,
                "{ENV_TIMEOUT_SECS} must be an integer in 1..={MAX_TIMEOUT_SECS}, got `{raw}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub gemini: GeminiSettings,
    pub log_level: String,
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));

        let timeout_secs = match read(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if (1..=MAX_TIMEOUT_SECS).contains(&secs) => secs,
                _ => return Err(ConfigError::InvalidTimeout { raw }),
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let gemini = GeminiSettings {
            api_key: read(ENV_GEMINI_API_KEY).or_else(|| read(ENV_API_KEY_FALLBACK)),
            model: read(ENV_GEMINI_MODEL).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: read(ENV_GEMINI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            db_path,
            gemini,
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
        })
    }
}
