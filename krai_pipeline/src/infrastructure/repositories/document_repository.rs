// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Document Repository
//!
//! Backs [`DocumentRepository`] against the `documents` table. `stage_status`
//! and `models` are stored as JSON text columns and (de)serialized here.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use krai_pipeline_domain::entities::document::{Document, DocumentType, ProcessingStatus};
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::document_repository::DocumentRepository;
use krai_pipeline_domain::value_objects::ids::{DocumentId, ManufacturerId};
use krai_pipeline_domain::value_objects::stage::{merge_stage_status, StageName, StageStatus, StageStatusMap};

pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn document_type_str(t: DocumentType) -> &'static str {
    match t {
        DocumentType::ServiceManual => "service_manual",
        DocumentType::PartsCatalog => "parts_catalog",
        DocumentType::TroubleshootingGuide => "troubleshooting_guide",
        DocumentType::UserManual => "user_manual",
        DocumentType::Other => "other",
    }
}

fn parse_document_type(s: &str) -> DocumentType {
    match s {
        "service_manual" => DocumentType::ServiceManual,
        "parts_catalog" => DocumentType::PartsCatalog,
        "troubleshooting_guide" => DocumentType::TroubleshootingGuide,
        "user_manual" => DocumentType::UserManual,
        _ => DocumentType::Other,
    }
}

fn processing_status_str(s: ProcessingStatus) -> &'static str {
    match s {
        ProcessingStatus::Pending => "pending",
        ProcessingStatus::Processing => "processing",
        ProcessingStatus::Completed => "completed",
        ProcessingStatus::Failed => "failed",
    }
}

fn parse_processing_status(s: &str) -> ProcessingStatus {
    match s {
        "processing" => ProcessingStatus::Processing,
        "completed" => ProcessingStatus::Completed,
        "failed" => ProcessingStatus::Failed,
        _ => ProcessingStatus::Pending,
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let manufacturer_id: Option<String> = row.try_get("manufacturer_id").map_err(db_err)?;
    let models: String = row.try_get("models").map_err(db_err)?;
    let stage_status: String = row.try_get("stage_status").map_err(db_err)?;

    Ok(Document {
        id: DocumentId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        file_hash: row.try_get("file_hash").map_err(db_err)?,
        filename: row.try_get("filename").map_err(db_err)?,
        file_size: row.try_get::<i64, _>("file_size").map_err(db_err)? as u64,
        page_count: row.try_get::<i64, _>("page_count").map_err(db_err)? as u32,
        document_type: parse_document_type(&row.try_get::<String, _>("document_type").map_err(db_err)?),
        manufacturer_id: manufacturer_id
            .map(|s| ManufacturerId::from_str(&s))
            .transpose()
            .map_err(|e| PipelineError::validation(e.to_string()))?,
        series: row.try_get("series").map_err(db_err)?,
        models: serde_json::from_str(&models)?,
        language: row.try_get("language").map_err(db_err)?,
        processing_status: parse_processing_status(&row.try_get::<String, _>("processing_status").map_err(db_err)?),
        stage_status: serde_json::from_str(&stage_status)?,
        error_message: row.try_get("error_message").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> PipelineError {
    PipelineError::transient("database", e.to_string())
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn upsert(&self, document: &Document) -> Result<DocumentId, PipelineError> {
        if let Some(existing) = self.find_by_file_hash(&document.file_hash).await? {
            return Ok(existing.id);
        }

        let models = serde_json::to_string(&document.models)?;
        let stage_status = serde_json::to_string(&document.stage_status)?;

        sqlx::query(
            "INSERT INTO documents (id, file_hash, filename, file_size, page_count, document_type, manufacturer_id, series, models, language, processing_status, stage_status, error_message) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(document.id.to_string())
        .bind(&document.file_hash)
        .bind(&document.filename)
        .bind(document.file_size as i64)
        .bind(document.page_count as i64)
        .bind(document_type_str(document.document_type))
        .bind(document.manufacturer_id.map(|id| id.to_string()))
        .bind(&document.series)
        .bind(models)
        .bind(&document.language)
        .bind(processing_status_str(document.processing_status))
        .bind(stage_status)
        .bind(&document.error_message)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(document.id)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, PipelineError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn find_by_file_hash(&self, file_hash: &str) -> Result<Option<Document>, PipelineError> {
        let row = sqlx::query("SELECT * FROM documents WHERE file_hash = ?")
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn update_stage_status(&self, id: DocumentId, stage: StageName, status: StageStatus) -> Result<(), PipelineError> {
        let Some(document) = self.find_by_id(id).await? else {
            return Err(PipelineError::invariant(format!("update_stage_status: document {id} not found")));
        };

        let mut stage_status: StageStatusMap = document.stage_status;
        merge_stage_status(&mut stage_status, stage, status);
        let encoded = serde_json::to_string(&stage_status)?;

        sqlx::query("UPDATE documents SET stage_status = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?")
            .bind(encoded)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_classification(
        &self,
        id: DocumentId,
        document_type: DocumentType,
        manufacturer_id: Option<ManufacturerId>,
        series: Option<String>,
        models: std::collections::BTreeSet<String>,
    ) -> Result<(), PipelineError> {
        let models = serde_json::to_string(&models)?;

        sqlx::query(
            "UPDATE documents SET document_type = ?, manufacturer_id = ?, series = ?, models = ?, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
        )
        .bind(document_type_str(document_type))
        .bind(manufacturer_id.map(|id| id.to_string()))
        .bind(&series)
        .bind(models)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn mark_failed(&self, id: DocumentId, error_message: String) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE documents SET processing_status = 'failed', error_message = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
        )
        .bind(error_message)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_incomplete(&self) -> Result<Vec<Document>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM documents WHERE processing_status NOT IN ('completed', 'failed')")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_document).collect()
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

    #[tokio::test]
    async fn test_upsert_is_idempotent_on_file_hash() {
        let repo = SqliteDocumentRepository::new(pool().await);
        let document = Document::new("a".repeat(64), "manual.pdf".into(), 1024, 10).unwrap();

        let first = repo.upsert(&document).await.unwrap();
        let second = repo.upsert(&document).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_stage_status_merges_without_clobbering() {
        let repo = SqliteDocumentRepository::new(pool().await);
        let document = Document::new("b".repeat(64), "manual.pdf".into(), 1024, 10).unwrap();
        let id = repo.upsert(&document).await.unwrap();

        repo.update_stage_status(id, StageName::Upload, StageStatus::completed(None, chrono::Utc::now())).await.unwrap();
        let reloaded = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.stage_status.len(), 8);
        assert!(reloaded.all_stages_completed() == false);
    }

    #[tokio::test]
    async fn test_update_classification_persists_manufacturer_and_models() {
        let repo = SqliteDocumentRepository::new(pool().await);
        let document = Document::new("d".repeat(64), "manual.pdf".into(), 1024, 10).unwrap();
        let id = repo.upsert(&document).await.unwrap();

        let manufacturer_id = ManufacturerId::new();
        let models = std::collections::BTreeSet::from(["M404dn".to_string()]);
        repo.update_classification(id, DocumentType::ServiceManual, Some(manufacturer_id), Some("LaserJet".into()), models.clone())
            .await
            .unwrap();

        let reloaded = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.document_type, DocumentType::ServiceManual);
        assert_eq!(reloaded.manufacturer_id, Some(manufacturer_id));
        assert_eq!(reloaded.series, Some("LaserJet".into()));
        assert_eq!(reloaded.models, models);
    }

    #[tokio::test]
    async fn test_mark_failed_sets_status_and_message() {
        let repo = SqliteDocumentRepository::new(pool().await);
        let document = Document::new("c".repeat(64), "manual.pdf".into(), 1024, 10).unwrap();
        let id = repo.upsert(&document).await.unwrap();

        repo.mark_failed(id, "parser crashed".into()).await.unwrap();
        let reloaded = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.processing_status, ProcessingStatus::Failed);
        assert_eq!(reloaded.error_message.as_deref(), Some("parser crashed"));
    }
}
