// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Error Repository Port
//!
//! `SPEC_FULL.md` §4.8: "Every retry writes/updates one `PipelineError` row
//! (keyed by `(correlation_id, stage_name)`)."

use crate::entities::pipeline_error_record::PipelineErrorRecord;
use crate::error::PipelineError;
use crate::value_objects::ids::PipelineErrorId;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait PipelineErrorRepository: Send + Sync {
    async fn upsert(&self, record: &PipelineErrorRecord) -> Result<(), PipelineError>;

    /// Looked up by the `retry` CLI command against a single `error_id`.
    async fn find_by_id(&self, error_id: PipelineErrorId) -> Result<Option<PipelineErrorRecord>, PipelineError>;

    async fn find_by_correlation(&self, correlation_id: Uuid) -> Result<Vec<PipelineErrorRecord>, PipelineError>;

    /// Open or retrying records whose `next_retry_at` has elapsed, for the
    /// retry scheduler to pick up.
    async fn find_due_for_retry(&self) -> Result<Vec<PipelineErrorRecord>, PipelineError>;

    /// Every record not yet `resolved` — `open`, `retrying`, or `gave_up` —
    /// so the automatic `run` driver can gate re-ingestion on backoff and
    /// give-up state per `SPEC_FULL.md` §4.8, not just on what's due right
    /// now.
    async fn find_unresolved(&self) -> Result<Vec<PipelineErrorRecord>, PipelineError>;
}
