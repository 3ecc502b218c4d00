//! Mantra generation boundary.
//!
//! # Responsibility
//! - Define the single async call the session depends on.
//! - Provide the Gemini-backed production implementation.
//!
//! # Invariants
//! - One invocation yields exactly one outcome; implementations do not retry.
//! - A successful result has all three mantra parts present.
//! - Failures are reported, never replaced by templated content.

use crate::model::habit::MantraParts;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod gemini;

pub use gemini::{GeminiMantraGenerator, GeminiSettings};

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Reasons a generation call did not produce a usable mantra.
#[derive(Debug)]
pub enum GenerationError {
    /// No credential configured for the upstream service.
    MissingApiKey,
    /// Goal was empty after trimming.
    EmptyGoal,
    /// Request could not be sent or the body could not be read.
    Transport(reqwest::Error),
    /// Upstream answered with a non-success status.
    Status { status: u16, message: String },
    /// Upstream answered but the body did not contain a well-formed mantra.
    MalformedResponse(String),
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is missing"),
            Self::EmptyGoal => write!(f, "goal must not be empty"),
            Self::Transport(err) => write!(f, "generation request failed: {err}"),
            Self::Status { status, message } => {
                write!(f, "generation service returned {status}: {message}")
            }
            Self::MalformedResponse(details) => {
                write!(f, "malformed generation response: {details}")
            }
        }
    }
}

impl Error for GenerationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

/// Maps a free-text goal to a micro-habit mantra.
#[async_trait]
pub trait MantraGenerator: Send + Sync {
    /// Short label for logging.
    fn name(&self) -> &'static str;

    /// Generates a mantra for `goal`.
    ///
    /// This is the only suspension point of a session.
    async fn generate(&self, goal: &str) -> GenerationResult<MantraParts>;
}
