//! Error types for the filter engine.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while filtering, or while managing presets and history.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A column filter violates a structural invariant.
    #[error("malformed filter on column '{column}': {reason}")]
    MalformedFilter {
        /// The offending column.
        column: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No preset matches the given id or name.
    #[error("{}", format_not_found(identifier, suggestion.as_deref()))]
    PresetNotFound {
        /// The id or name that was searched for.
        identifier: String,
        /// A similarly named preset, if one exists.
        suggestion: Option<String>,
    },

    /// Evaluation delegated to the worker failed.
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    /// An exported filter model could not be imported.
    #[error("invalid format: {0}")]
    ImportFormat(String),

    /// Preset persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A model or export envelope could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Creates a malformed filter error.
    pub fn malformed(column: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::MalformedFilter {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Creates a preset-not-found error.
    pub fn preset_not_found(identifier: impl Into<String>, suggestion: Option<String>) -> Self {
        EngineError::PresetNotFound {
            identifier: identifier.into(),
            suggestion,
        }
    }
}

fn format_not_found(identifier: &str, suggestion: Option<&str>) -> String {
    let base = format!("preset '{}' not found", identifier);
    match suggestion {
        Some(s) => format!("{}. Did you mean '{}'?", base, s),
        None => base,
    }
}

/// Errors from the parallel evaluation worker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker did not answer within the configured timeout.
    #[error("worker evaluation timed out after {}ms (request {request_id})", timeout.as_millis())]
    Timeout {
        /// The correlation id of the request.
        request_id: u64,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The worker task is gone or dropped the reply channel.
    #[error("worker channel disconnected")]
    Disconnected,

    /// The worker answered a different request than the one awaited.
    #[error("stale worker response: expected request {expected}, received {received}")]
    StaleResponse {
        /// The request id that was sent.
        expected: u64,
        /// The request id carried by the response.
        received: u64,
    },

    /// Evaluation itself failed on the worker.
    #[error("worker evaluation failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_not_found_message_with_suggestion() {
        let err = EngineError::preset_not_found("adlts", Some("adults".to_string()));
        assert_eq!(
            err.to_string(),
            "preset 'adlts' not found. Did you mean 'adults'?"
        );
    }

    #[test]
    fn test_preset_not_found_message_without_suggestion() {
        let err = EngineError::preset_not_found("zzz", None);
        assert_eq!(err.to_string(), "preset 'zzz' not found");
    }

    #[test]
    fn test_worker_timeout_message() {
        let err = WorkerError::Timeout {
            request_id: 7,
            timeout: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "worker evaluation timed out after 250ms (request 7)"
        );
    }

    #[test]
    fn test_worker_error_converts_into_engine_error() {
        let err: EngineError = WorkerError::Disconnected.into();
        assert!(matches!(err, EngineError::Worker(WorkerError::Disconnected)));
    }
}
