// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Stage Completion Marker Repository

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use krai_pipeline_domain::entities::stage_completion_marker::StageCompletionMarker;
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::stage_marker_repository::StageMarkerRepository;
use krai_pipeline_domain::value_objects::ids::DocumentId;
use krai_pipeline_domain::value_objects::stage::StageName;

pub struct SqliteStageMarkerRepository {
    pool: SqlitePool,
}

impl SqliteStageMarkerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> PipelineError {
    PipelineError::transient("database", e.to_string())
}

#[async_trait]
impl StageMarkerRepository for SqliteStageMarkerRepository {
    async fn upsert(&self, marker: StageCompletionMarker) -> Result<(), PipelineError> {
        let metadata = serde_json::to_string(&marker.metadata)?;

        sqlx::query(
            "INSERT INTO stage_completion_markers (document_id, stage_name, completed_at, data_hash, metadata) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (document_id, stage_name) DO UPDATE SET completed_at = excluded.completed_at, data_hash = excluded.data_hash, metadata = excluded.metadata",
        )
        .bind(marker.document_id.to_string())
        .bind(marker.stage_name.as_str())
        .bind(marker.completed_at.to_rfc3339())
        .bind(&marker.data_hash)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<StageCompletionMarker>, PipelineError> {
        let row = sqlx::query("SELECT * FROM stage_completion_markers WHERE document_id = ? AND stage_name = ?")
            .bind(document_id.to_string())
            .bind(stage_name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some(row) = row else { return Ok(None) };

        let document_id_str: String = row.try_get("document_id").map_err(db_err)?;
        let completed_at: String = row.try_get("completed_at").map_err(db_err)?;
        let metadata: String = row.try_get("metadata").map_err(db_err)?;

        Ok(Some(StageCompletionMarker {
            document_id: DocumentId::from_str(&document_id_str).map_err(|e| PipelineError::validation(e.to_string()))?,
            stage_name,
            completed_at: chrono::DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| PipelineError::validation(e.to_string()))?
                .with_timezone(&chrono::Utc),
            data_hash: row.try_get("data_hash").map_err(db_err)?,
            metadata: serde_json::from_str(&metadata)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::document_repository::SqliteDocumentRepository;
    use crate::infrastructure::repositories::schema::initialize_database;
    use krai_pipeline_domain::entities::document::Document;
    use krai_pipeline_domain::repositories::document_repository::DocumentRepository;

    async fn pool() -> SqlitePool {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let url = format!("sqlite://{}", temp.path().to_str().unwrap());
        drop(temp);
        initialize_database(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_then_find_roundtrips() {
        let pool = pool().await;
        let documents = SqliteDocumentRepository::new(pool.clone());
        let document_id = documents.upsert(&Document::new("d".repeat(64), "m.pdf".into(), 1, 1).unwrap()).await.unwrap();

        let repo = SqliteStageMarkerRepository::new(pool);
        repo.upsert(StageCompletionMarker::new(document_id, StageName::Upload, "hash1".into())).await.unwrap();

        let marker = repo.find(document_id, StageName::Upload).await.unwrap().unwrap();
        assert_eq!(marker.data_hash, "hash1");
    }

    #[tokio::test]
    async fn test_upsert_twice_overwrites_hash() {
        let pool = pool().await;
        let documents = SqliteDocumentRepository::new(pool.clone());
        let document_id = documents.upsert(&Document::new("e".repeat(64), "m.pdf".into(), 1, 1).unwrap()).await.unwrap();

        let repo = SqliteStageMarkerRepository::new(pool);
        repo.upsert(StageCompletionMarker::new(document_id, StageName::Upload, "hash1".into())).await.unwrap();
        repo.upsert(StageCompletionMarker::new(document_id, StageName::Upload, "hash2".into())).await.unwrap();

        let marker = repo.find(document_id, StageName::Upload).await.unwrap().unwrap();
        assert_eq!(marker.data_hash, "hash2");
    }
}
