// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Pipeline Error Repository
//!
//! `pipeline_errors` is keyed by `(correlation_id, stage_name)`
//! (`SPEC_FULL.md` §4.8); `upsert` relies on that unique constraint.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use krai_pipeline_domain::entities::pipeline_error_record::{ErrorCategory, ErrorRecordStatus, PipelineErrorRecord};
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::pipeline_error_repository::PipelineErrorRepository;
use krai_pipeline_domain::value_objects::ids::{DocumentId, PipelineErrorId};
use krai_pipeline_domain::value_objects::stage::StageName;

pub struct SqlitePipelineErrorRepository {
    pool: SqlitePool,
}

impl SqlitePipelineErrorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> PipelineError {
    PipelineError::transient("database", e.to_string())
}

fn category_str(c: ErrorCategory) -> &'static str {
    match c {
        ErrorCategory::Transient => "transient",
        ErrorCategory::Permanent => "permanent",
        ErrorCategory::Configuration => "configuration",
        ErrorCategory::Validation => "validation",
    }
}

fn parse_category(s: &str) -> ErrorCategory {
    match s {
        "transient" => ErrorCategory::Transient,
        "configuration" => ErrorCategory::Configuration,
        "validation" => ErrorCategory::Validation,
        _ => ErrorCategory::Permanent,
    }
}

fn status_str(s: ErrorRecordStatus) -> &'static str {
    match s {
        ErrorRecordStatus::Open => "open",
        ErrorRecordStatus::Retrying => "retrying",
        ErrorRecordStatus::Resolved => "resolved",
        ErrorRecordStatus::GaveUp => "gave_up",
    }
}

fn parse_status(s: &str) -> ErrorRecordStatus {
    match s {
        "retrying" => ErrorRecordStatus::Retrying,
        "resolved" => ErrorRecordStatus::Resolved,
        "gave_up" => ErrorRecordStatus::GaveUp,
        _ => ErrorRecordStatus::Open,
    }
}

fn stage_from_str(s: &str) -> Result<StageName, PipelineError> {
    StageName::ALL
        .into_iter()
        .find(|stage| stage.as_str() == s)
        .ok_or_else(|| PipelineError::invariant(format!("unknown stage_name in pipeline_errors row: {s}")))
}

fn parse_rfc3339(s: &str) -> Result<chrono::DateTime<chrono::Utc>, PipelineError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| PipelineError::validation(e.to_string()))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PipelineErrorRecord, PipelineError> {
    let error_id: String = row.try_get("error_id").map_err(db_err)?;
    let document_id: Option<String> = row.try_get("document_id").map_err(db_err)?;
    let stage_name: String = row.try_get("stage_name").map_err(db_err)?;
    let context: String = row.try_get("context").map_err(db_err)?;
    let correlation_id: String = row.try_get("correlation_id").map_err(db_err)?;
    let next_retry_at: Option<String> = row.try_get("next_retry_at").map_err(db_err)?;
    let resolved_at: Option<String> = row.try_get("resolved_at").map_err(db_err)?;

    Ok(PipelineErrorRecord {
        error_id: PipelineErrorId::from_str(&error_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        document_id: document_id
            .map(|s| DocumentId::from_str(&s))
            .transpose()
            .map_err(|e| PipelineError::validation(e.to_string()))?,
        stage_name: stage_from_str(&stage_name)?,
        error_type: row.try_get("error_type").map_err(db_err)?,
        error_category: parse_category(&row.try_get::<String, _>("error_category").map_err(db_err)?),
        error_message: row.try_get("error_message").map_err(db_err)?,
        stack_trace: row.try_get("stack_trace").map_err(db_err)?,
        context: serde_json::from_str(&context)?,
        retry_count: row.try_get::<i64, _>("retry_count").map_err(db_err)? as u32,
        max_retries: row.try_get::<i64, _>("max_retries").map_err(db_err)? as u32,
        status: parse_status(&row.try_get::<String, _>("status").map_err(db_err)?),
        is_transient: row.try_get::<i64, _>("is_transient").map_err(db_err)? != 0,
        correlation_id: Uuid::parse_str(&correlation_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        next_retry_at: next_retry_at.map(|s| parse_rfc3339(&s)).transpose()?,
        resolved_at: resolved_at.map(|s| parse_rfc3339(&s)).transpose()?,
        resolution_notes: row.try_get("resolution_notes").map_err(db_err)?,
    })
}

#[async_trait]
impl PipelineErrorRepository for SqlitePipelineErrorRepository {
    async fn upsert(&self, record: &PipelineErrorRecord) -> Result<(), PipelineError> {
        let context = serde_json::to_string(&record.context)?;

        sqlx::query(
            "INSERT INTO pipeline_errors (error_id, document_id, stage_name, error_type, error_category, error_message, stack_trace, context, retry_count, max_retries, status, is_transient, correlation_id, next_retry_at, resolved_at, resolution_notes) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (correlation_id, stage_name) DO UPDATE SET \
                error_type = excluded.error_type, error_category = excluded.error_category, error_message = excluded.error_message, \
                stack_trace = excluded.stack_trace, context = excluded.context, retry_count = excluded.retry_count, \
                status = excluded.status, is_transient = excluded.is_transient, next_retry_at = excluded.next_retry_at, \
                resolved_at = excluded.resolved_at, resolution_notes = excluded.resolution_notes",
        )
        .bind(record.error_id.to_string())
        .bind(record.document_id.map(|id| id.to_string()))
        .bind(record.stage_name.as_str())
        .bind(&record.error_type)
        .bind(category_str(record.error_category))
        .bind(&record.error_message)
        .bind(&record.stack_trace)
        .bind(context)
        .bind(record.retry_count as i64)
        .bind(record.max_retries as i64)
        .bind(status_str(record.status))
        .bind(record.is_transient as i64)
        .bind(record.correlation_id.to_string())
        .bind(record.next_retry_at.map(|t| t.to_rfc3339()))
        .bind(record.resolved_at.map(|t| t.to_rfc3339()))
        .bind(&record.resolution_notes)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, error_id: PipelineErrorId) -> Result<Option<PipelineErrorRecord>, PipelineError> {
        let row = sqlx::query("SELECT * FROM pipeline_errors WHERE error_id = ?")
            .bind(error_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_correlation(&self, correlation_id: Uuid) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM pipeline_errors WHERE correlation_id = ?")
            .bind(correlation_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn find_due_for_retry(&self) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        let rows = sqlx::query(
            "SELECT * FROM pipeline_errors WHERE status IN ('open', 'retrying') AND (next_retry_at IS NULL OR next_retry_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn find_unresolved(&self) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM pipeline_errors WHERE status != 'resolved'")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::schema::initialize_database;

    async fn pool() -> SqlitePool {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let url = format!("sqlite://{}", temp.path().to_str().unwrap());
        drop(temp);
        initialize_database(&url).await.unwrap()
    }

    fn sample_record(correlation_id: Uuid) -> PipelineErrorRecord {
        let error = PipelineError::transient("embedder", "timeout");
        PipelineErrorRecord::from_pipeline_error(None, StageName::EmbeddingAndSearch, &error, correlation_id, 3)
    }

    #[tokio::test]
    async fn test_upsert_then_find_by_correlation() {
        let repo = SqlitePipelineErrorRepository::new(pool().await);
        let correlation_id = Uuid::new_v4();
        repo.upsert(&sample_record(correlation_id)).await.unwrap();

        let found = repo.find_by_correlation(correlation_id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_transient);
    }

    #[tokio::test]
    async fn test_find_by_id_returns_matching_record() {
        let repo = SqlitePipelineErrorRepository::new(pool().await);
        let correlation_id = Uuid::new_v4();
        let record = sample_record(correlation_id);
        let error_id = record.error_id;
        repo.upsert(&record).await.unwrap();

        let found = repo.find_by_id(error_id).await.unwrap();
        assert_eq!(found.unwrap().error_id, error_id);
        assert!(repo.find_by_id(PipelineErrorId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_due_for_retry_includes_fresh_open_record() {
        let repo = SqlitePipelineErrorRepository::new(pool().await);
        let correlation_id = Uuid::new_v4();
        repo.upsert(&sample_record(correlation_id)).await.unwrap();

        let due = repo.find_due_for_retry().await.unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_same_correlation_and_stage_updates_in_place() {
        let repo = SqlitePipelineErrorRepository::new(pool().await);
        let correlation_id = Uuid::new_v4();
        let mut record = sample_record(correlation_id);
        repo.upsert(&record).await.unwrap();

        record.record_retry(chrono::Utc::now());
        repo.upsert(&record).await.unwrap();

        let found = repo.find_by_correlation(correlation_id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].retry_count, 1);
    }
}
