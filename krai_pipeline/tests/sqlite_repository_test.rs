// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Integration tests against a real (tempfile-backed) SQLite database,
//! exercising the `SPEC_FULL.md` §8 invariants that only show up once the
//! real repositories and migrations are involved: idempotent upload and
//! stage-marker skip-on-rerun.

use std::sync::Arc;

use krai_pipeline::infrastructure::repositories::document_repository::SqliteDocumentRepository;
use krai_pipeline::infrastructure::repositories::schema;
use krai_pipeline::infrastructure::repositories::stage_marker_repository::SqliteStageMarkerRepository;
use krai_pipeline::infrastructure::runtime::orchestrator::StageOrchestrator;
use krai_pipeline_domain::entities::document::Document;
use krai_pipeline_domain::entities::pipeline_error_record::PipelineErrorRecord;
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::document_repository::DocumentRepository;
use krai_pipeline_domain::repositories::pipeline_error_repository::PipelineErrorRepository;
use krai_pipeline_domain::value_objects::ids::DocumentId;
use krai_pipeline_domain::value_objects::stage::StageName;
use sqlx::SqlitePool;
use uuid::Uuid;

struct NoopErrors;

#[async_trait::async_trait]
impl PipelineErrorRepository for NoopErrors {
    async fn upsert(&self, _record: &PipelineErrorRecord) -> Result<(), PipelineError> {
        Ok(())
    }
    async fn find_by_id(&self, _error_id: krai_pipeline_domain::value_objects::ids::PipelineErrorId) -> Result<Option<PipelineErrorRecord>, PipelineError> {
        Ok(None)
    }
    async fn find_by_correlation(&self, _correlation_id: Uuid) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        Ok(Vec::new())
    }
    async fn find_due_for_retry(&self) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        Ok(Vec::new())
    }
    async fn find_unresolved(&self) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        Ok(Vec::new())
    }
}

async fn fresh_pool() -> SqlitePool {
    let temp = tempfile::NamedTempFile::new().unwrap();
    let url = format!("sqlite://{}", temp.path().display());
    schema::create_database_if_missing(&url).await.unwrap();
    let pool = schema::initialize_database(&url).await.unwrap();
    std::mem::forget(temp); // keep the backing file alive for the pool's lifetime
    pool
}

/// A syntactically valid (64 lowercase hex chars) stand-in file hash, distinct per `seed`.
fn fake_hash(seed: u8) -> String {
    format!("{seed:02x}").repeat(32)
}

#[tokio::test]
async fn test_duplicate_upload_reuses_document_id_and_row() {
    let pool = fresh_pool().await;
    let documents = SqliteDocumentRepository::new(pool.clone());
    let hash = fake_hash(0xde);

    let first = Document::new(hash.clone(), "sample.pdf".into(), 1024, 3).unwrap();
    let first_id = documents.upsert(&first).await.unwrap();

    let second = Document::new(hash.clone(), "sample.pdf".into(), 1024, 3).unwrap();
    let second_id = documents.upsert(&second).await.unwrap();

    assert_eq!(first_id, second_id);

    let row_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE file_hash = ?")
        .bind(&hash)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row_count, 1);
}

#[tokio::test]
async fn test_distinct_bytes_produce_distinct_documents() {
    let pool = fresh_pool().await;
    let documents = SqliteDocumentRepository::new(pool);

    let a = Document::new(fake_hash(0xaa), "a.pdf".into(), 10, 1).unwrap();
    let b = Document::new(fake_hash(0xbb), "b.pdf".into(), 20, 1).unwrap();

    let id_a = documents.upsert(&a).await.unwrap();
    let id_b = documents.upsert(&b).await.unwrap();
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn test_orchestrator_skips_completed_stage_with_unchanged_data_hash() {
    let pool = fresh_pool().await;
    let documents = Arc::new(SqliteDocumentRepository::new(pool.clone()));
    let markers = Arc::new(SqliteStageMarkerRepository::new(pool));
    let orchestrator = StageOrchestrator::new(documents.clone(), markers, Arc::new(NoopErrors));

    let document = Document::new(fake_hash(0xcc), "c.pdf".into(), 10, 1).unwrap();
    let document_id = documents.upsert(&document).await.unwrap();

    assert!(!orchestrator.skip_if_complete(document_id, StageName::TextExtraction, "v1").await.unwrap());
    orchestrator.start_stage(document_id, StageName::TextExtraction).await.unwrap();
    orchestrator.complete_stage(document_id, StageName::TextExtraction, "v1".to_string()).await.unwrap();

    assert!(orchestrator.skip_if_complete(document_id, StageName::TextExtraction, "v1").await.unwrap());
}

#[tokio::test]
async fn test_orchestrator_reruns_stage_when_data_hash_changes() {
    let pool = fresh_pool().await;
    let documents = Arc::new(SqliteDocumentRepository::new(pool.clone()));
    let markers = Arc::new(SqliteStageMarkerRepository::new(pool));
    let orchestrator = StageOrchestrator::new(documents.clone(), markers, Arc::new(NoopErrors));

    let document = Document::new(fake_hash(0xdd), "d.pdf".into(), 10, 1).unwrap();
    let document_id = documents.upsert(&document).await.unwrap();

    orchestrator.start_stage(document_id, StageName::TextExtraction).await.unwrap();
    orchestrator.complete_stage(document_id, StageName::TextExtraction, "v1".to_string()).await.unwrap();

    assert!(!orchestrator.skip_if_complete(document_id, StageName::TextExtraction, "v2").await.unwrap());
}

#[tokio::test]
async fn test_find_by_file_hash_round_trips() {
    let pool = fresh_pool().await;
    let documents = SqliteDocumentRepository::new(pool);
    let hash = fake_hash(0xee);

    let document = Document::new(hash.clone(), "e.pdf".into(), 512, 2).unwrap();
    let document_id = documents.upsert(&document).await.unwrap();

    let found = documents.find_by_file_hash(&hash).await.unwrap().unwrap();
    assert_eq!(found.id, document_id);
    assert_eq!(found.page_count, 2);

    assert!(documents.find_by_file_hash(&fake_hash(0xff)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_by_id_unknown_document_returns_none() {
    let pool = fresh_pool().await;
    let documents = SqliteDocumentRepository::new(pool);
    assert!(documents.find_by_id(DocumentId::new()).await.unwrap().is_none());
}
