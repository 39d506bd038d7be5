//! Error types shared across povtrim crates.

use std::path::PathBuf;

/// Top-level error type for povtrim operations.
///
/// Every engine failure is its own variant so callers can match on the
/// outcome instead of parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum PovError {
    #[error("No player matches '{token}'. Available players: {}", available.join(", "))]
    NotFound {
        token: String,
        available: Vec<String>,
    },

    #[error("'{token}' matches several players: {}", candidates.join(", "))]
    Ambiguous {
        token: String,
        candidates: Vec<String>,
    },

    #[error("Malformed match record: {message}")]
    MalformedRecord { message: String },

    #[error("Player '{player}' is never alive in this match")]
    NoAliveTime { player: String },

    #[error("Nothing to keep: every alive interval was dropped by the trim policy")]
    NothingToKeep,

    #[error("Contradictory correspondence points: {message}")]
    NonMonotonicCorrespondence { message: String },

    #[error("Keep segments are not sorted at index {index}: {message}")]
    SegmentsUnsorted { index: usize, message: String },

    #[error("Keep segments overlap at index {index}: [{prev_start:.3}, {prev_end:.3}) and [{start:.3}, {end:.3})")]
    SegmentsOverlap {
        index: usize,
        prev_start: f64,
        prev_end: f64,
        start: f64,
        end: f64,
    },

    #[error("No safe cut point for segment {index} [{start:.3}, {end:.3}): {message}")]
    NoSafeCutPoint {
        index: usize,
        start: f64,
        end: f64,
        message: String,
    },

    #[error("{program} failed ({status}): {stderr}")]
    ProcessFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {timeout_secs:.1}s: {stderr}")]
    ProcessTimeout {
        program: String,
        timeout_secs: f64,
        stderr: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PovError.
pub type PovResult<T> = Result<T, PovError>;

impl PovError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: msg.into(),
        }
    }

    pub fn non_monotonic(msg: impl Into<String>) -> Self {
        Self::NonMonotonicCorrespondence {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the failure came from an external process rather than
    /// from the engine's own inputs.
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            Self::ProcessFailed { .. } | Self::ProcessTimeout { .. } | Self::NoSafeCutPoint { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_names_every_candidate() {
        let err = PovError::Ambiguous {
            token: "a".to_string(),
            candidates: vec!["Alpha".to_string(), "Adam".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("Alpha"));
        assert!(message.contains("Adam"));
    }

    #[test]
    fn test_process_failure_classification() {
        let timeout = PovError::ProcessTimeout {
            program: "ffmpeg".to_string(),
            timeout_secs: 1.0,
            stderr: String::new(),
        };
        assert!(timeout.is_process_failure());
        assert!(!PovError::NothingToKeep.is_process_failure());
    }
}
