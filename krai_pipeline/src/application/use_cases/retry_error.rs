// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Error Use Case
//!
//! Backs the `retry` CLI command. Scheduling a retry here only advances the
//! `pipeline_errors` bookkeeping (`retry_count`, `next_retry_at`, `status`);
//! actual re-execution of the failed stage happens when the `run` driver's
//! retry-subsystem poll picks up the record via
//! [`PipelineErrorRepository::find_due_for_retry`].

use std::sync::Arc;

use chrono::Utc;

use krai_pipeline_domain::entities::pipeline_error_record::ErrorRecordStatus;
use krai_pipeline_domain::entities::retry_policy::{RetryPolicy, RetryableService};
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::pipeline_error_repository::PipelineErrorRepository;
use krai_pipeline_domain::value_objects::ids::PipelineErrorId;
use krai_pipeline_domain::value_objects::stage::StageName;

#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    Scheduled { next_retry_at: chrono::DateTime<Utc> },
    GaveUp,
    AlreadyResolved,
}

/// Maps a stage to the retryable-service policy bucket its external calls
/// fall under. Stages with no external dependency (`TableExtraction`) still
/// need a policy in case their upstream data read transiently fails, so they
/// fall back to the database bucket.
fn policy_for_stage(stage: StageName, max_retries: u32) -> Result<RetryPolicy, PipelineError> {
    let service = match stage {
        StageName::EmbeddingAndSearch => RetryableService::Embedder,
        StageName::ImageProcessing => RetryableService::Vision,
        StageName::Upload => RetryableService::ObjectStore,
        StageName::TextExtraction | StageName::TableExtraction | StageName::Classification | StageName::PartsExtraction | StageName::SeriesDetection => {
            RetryableService::Database
        }
    };
    RetryPolicy::new(service, max_retries, 1.0, 60.0, 2.0, true)
}

pub struct RetryErrorUseCase {
    errors: Arc<dyn PipelineErrorRepository>,
}

impl RetryErrorUseCase {
    pub fn new(errors: Arc<dyn PipelineErrorRepository>) -> Self {
        Self { errors }
    }

    #[tracing::instrument(skip(self), fields(error_id = %error_id))]
    pub async fn execute(&self, error_id: PipelineErrorId) -> Result<RetryOutcome, PipelineError> {
        let mut record = self
            .errors
            .find_by_id(error_id)
            .await?
            .ok_or_else(|| PipelineError::input(format!("no pipeline error found with id {error_id}")))?;

        if record.status == ErrorRecordStatus::Resolved {
            return Ok(RetryOutcome::AlreadyResolved);
        }

        let policy = policy_for_stage(record.stage_name, record.max_retries)?;
        if policy.should_give_up(record.retry_count) {
            record.status = ErrorRecordStatus::GaveUp;
            self.errors.upsert(&record).await?;
            return Ok(RetryOutcome::GaveUp);
        }

        let jitter_fraction = rand::random::<f64>() * 2.0 - 1.0;
        let delay = policy.delay_for_retry(record.retry_count, jitter_fraction);
        let next_retry_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        record.record_retry(next_retry_at);
        self.errors.upsert(&record).await?;

        Ok(RetryOutcome::Scheduled { next_retry_at })
    }
}
