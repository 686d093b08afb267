// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Types
//!
//! `PipelineError` is the single error type returned by every stage, domain
//! service and repository port in this crate. It is intentionally coarse: the
//! five variants match the five error kinds the orchestrator and retry
//! subsystem need to branch on.

use thiserror::Error;

/// The single domain error type.
///
/// Each variant carries a `service` tag identifying which collaborator raised
/// it (`"embedding"`, `"vision"`, `"scrape"`, `"database"`, `"object_store"`,
/// `"extractor"`, `"classifier"`, ...), so the retry subsystem can look up the
/// right [`RetryPolicy`](crate::entities::retry_policy::RetryPolicy) without
/// string-matching the message.
#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    /// A dependent service failed in a way that is expected to clear up on
    /// its own: timeouts, connection resets, 5xx responses, rate limiting.
    #[error("transient error in {service}: {message}")]
    TransientServiceError { service: &'static str, message: String },

    /// A dependent service rejected the request in a way retrying will not
    /// fix: 4xx responses (other than rate limiting), auth failures,
    /// malformed requests.
    #[error("permanent error in {service}: {message}")]
    PermanentServiceError { service: &'static str, message: String },

    /// Input failed a domain validation rule (e.g. a `Chunk` invariant, a
    /// `product_type` outside the closed vocabulary).
    #[error("validation error: {message}")]
    ValidationError { message: String },

    /// The raw input itself is unusable: a zero-byte file, a PDF that fails
    /// to parse at all, a file with no extractable text.
    #[error("input error: {message}")]
    InputError { message: String },

    /// A domain invariant was violated in a way that indicates a bug, not bad
    /// input (e.g. a stage completing out of order, a negative retry count).
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },
}

impl PipelineError {
    pub fn transient(service: &'static str, message: impl Into<String>) -> Self {
        Self::TransientServiceError {
            service,
            message: message.into(),
        }
    }

    pub fn permanent(service: &'static str, message: impl Into<String>) -> Self {
        Self::PermanentServiceError {
            service,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError { message: message.into() }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError { message: message.into() }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation { message: message.into() }
    }

    /// Whether the retry subsystem should schedule another attempt.
    ///
    /// Only transient service errors are recoverable; everything else is a
    /// permanent failure of either the input or the program itself.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::TransientServiceError { .. })
    }

    /// Short, stable category tag used for metrics labels and exit-code
    /// mapping (see `krai_pipeline_bootstrap::exit_code::map_error_to_exit_code`).
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::TransientServiceError { .. } => "transient_service",
            PipelineError::PermanentServiceError { .. } => "permanent_service",
            PipelineError::ValidationError { .. } => "validation",
            PipelineError::InputError { .. } => "input",
            PipelineError::InvariantViolation { .. } => "invariant_violation",
        }
    }

    /// The `service` tag, when this error originated from a dependent service.
    pub fn service(&self) -> Option<&'static str> {
        match self {
            PipelineError::TransientServiceError { service, .. } => Some(service),
            PipelineError::PermanentServiceError { service, .. } => Some(service),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::input(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::validation(format!("malformed JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_recoverable() {
        assert!(PipelineError::transient("embedding", "timeout").is_recoverable());
        assert!(!PipelineError::permanent("embedding", "bad request").is_recoverable());
        assert!(!PipelineError::validation("bad input").is_recoverable());
        assert!(!PipelineError::input("empty file").is_recoverable());
        assert!(!PipelineError::invariant("stage out of order").is_recoverable());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(PipelineError::transient("embedding", "x").category(), "transient_service");
        assert_eq!(PipelineError::validation("x").category(), "validation");
    }

    #[test]
    fn test_service_tag_only_on_service_errors() {
        assert_eq!(PipelineError::transient("vision", "x").service(), Some("vision"));
        assert_eq!(PipelineError::validation("x").service(), None);
    }
}
