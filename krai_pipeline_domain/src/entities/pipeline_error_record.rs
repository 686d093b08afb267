// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Error Record Entity
//!
//! The durable audit trail the Retry Subsystem writes to: one row per
//! `(correlation_id, stage_name)`, updated in place as retries happen.
//! Distinct from [`PipelineError`](crate::error::PipelineError), the
//! in-process Rust error type this struct is built from.

use crate::error::PipelineError;
use crate::value_objects::ids::{DocumentId, PipelineErrorId};
use crate::value_objects::stage::StageName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Transient,
    Permanent,
    Configuration,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorRecordStatus {
    Open,
    Retrying,
    Resolved,
    GaveUp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineErrorRecord {
    pub error_id: PipelineErrorId,
    pub document_id: Option<DocumentId>,
    pub stage_name: StageName,
    pub error_type: String,
    pub error_category: ErrorCategory,
    pub error_message: String,
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub status: ErrorRecordStatus,
    pub is_transient: bool,
    pub correlation_id: Uuid,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
}

impl PipelineErrorRecord {
    /// Opens a new error record from a live [`PipelineError`], classifying
    /// `error_category`/`is_transient` from its `category()`.
    pub fn from_pipeline_error(
        document_id: Option<DocumentId>,
        stage_name: StageName,
        error: &PipelineError,
        correlation_id: Uuid,
        max_retries: u32,
    ) -> Self {
        let (error_category, is_transient) = match error.category() {
            "transient_service" => (ErrorCategory::Transient, true),
            "validation" => (ErrorCategory::Validation, false),
            "input" => (ErrorCategory::Configuration, false),
            _ => (ErrorCategory::Permanent, false),
        };

        Self {
            error_id: PipelineErrorId::new(),
            document_id,
            stage_name,
            error_type: error.category().to_string(),
            error_category,
            error_message: error.to_string(),
            stack_trace: None,
            context: serde_json::Map::new(),
            retry_count: 0,
            max_retries,
            status: ErrorRecordStatus::Open,
            is_transient,
            correlation_id,
            next_retry_at: None,
            resolved_at: None,
            resolution_notes: None,
        }
    }

    /// Records another retry attempt, transitioning to `gave_up` once
    /// `max_retries` is exhausted.
    pub fn record_retry(&mut self, next_retry_at: DateTime<Utc>) {
        self.retry_count += 1;
        if self.retry_count >= self.max_retries {
            self.status = ErrorRecordStatus::GaveUp;
            self.next_retry_at = None;
        } else {
            self.status = ErrorRecordStatus::Retrying;
            self.next_retry_at = Some(next_retry_at);
        }
    }

    pub fn resolve(&mut self, notes: Option<String>) {
        self.status = ErrorRecordStatus::Resolved;
        self.resolved_at = Some(Utc::now());
        self.resolution_notes = notes;
        self.next_retry_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_transient_service_error() {
        let error = PipelineError::transient("embedding", "timeout");
        let record = PipelineErrorRecord::from_pipeline_error(None, StageName::EmbeddingAndSearch, &error, Uuid::nil(), 3);
        assert!(record.is_transient);
        assert_eq!(record.error_category, ErrorCategory::Transient);
        assert_eq!(record.status, ErrorRecordStatus::Open);
    }

    #[test]
    fn test_retry_exhaustion_gives_up() {
        let error = PipelineError::transient("scrape", "connection reset");
        let mut record = PipelineErrorRecord::from_pipeline_error(None, StageName::Classification, &error, Uuid::nil(), 2);
        record.record_retry(Utc::now());
        assert_eq!(record.status, ErrorRecordStatus::Retrying);
        record.record_retry(Utc::now());
        assert_eq!(record.status, ErrorRecordStatus::GaveUp);
        assert!(record.next_retry_at.is_none());
    }

    #[test]
    fn test_resolve_clears_pending_retry() {
        let error = PipelineError::validation("bad product_type");
        let mut record = PipelineErrorRecord::from_pipeline_error(None, StageName::Classification, &error, Uuid::nil(), 3);
        record.resolve(Some("manually corrected".into()));
        assert_eq!(record.status, ErrorRecordStatus::Resolved);
        assert!(record.resolved_at.is_some());
    }
}
