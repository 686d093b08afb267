// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Orchestrator
//!
//! `SPEC_FULL.md` §4.1: the sole writer of `documents.processing_status` and
//! `pipeline_errors` rows. Built over injected repository ports, following
//! the construction-with-injected-services pattern of
//! `adaptive_pipeline/src/infrastructure/runtime/stage_executor.rs`'s
//! `BasicStageExecutor`, generalized from that crate's compression/
//! encryption/checksum stages to this crate's eight-stage document pipeline.

use std::sync::Arc;
use uuid::Uuid;

use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::document_repository::DocumentRepository;
use krai_pipeline_domain::repositories::pipeline_error_repository::PipelineErrorRepository;
use krai_pipeline_domain::repositories::stage_marker_repository::StageMarkerRepository;
use krai_pipeline_domain::value_objects::ids::DocumentId;
use krai_pipeline_domain::value_objects::stage::{StageName, StageState, StageStatus};
use krai_pipeline_domain::{entities::pipeline_error_record::PipelineErrorRecord, entities::stage_completion_marker::StageCompletionMarker};

/// Outcome of a successfully completed stage, carrying whatever metadata the
/// caller wants recorded against the stage's `StageStatus`.
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `SPEC_FULL.md` §4.1: "ok, transient-error, permanent-error".
#[derive(Debug, Clone)]
pub enum StageFailure {
    Transient(PipelineError),
    Permanent(PipelineError),
}

impl StageFailure {
    pub fn into_inner(self) -> PipelineError {
        match self {
            StageFailure::Transient(e) | StageFailure::Permanent(e) => e,
        }
    }
}

pub type StageResult = Result<StageOutcome, StageFailure>;

/// Coordinates one document's progress through the eight canonical stages,
/// backed by a transaction-per-mutation SQL write pattern (`SPEC_FULL.md`
/// §5: "per-connection transaction scope is a single stage mutation").
pub struct StageOrchestrator {
    documents: Arc<dyn DocumentRepository>,
    markers: Arc<dyn StageMarkerRepository>,
    errors: Arc<dyn PipelineErrorRepository>,
}

impl StageOrchestrator {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        markers: Arc<dyn StageMarkerRepository>,
        errors: Arc<dyn PipelineErrorRepository>,
    ) -> Self {
        Self { documents, markers, errors }
    }

    /// Returns `true` (and logs a skip) if a completion marker already
    /// matches `data_hash`, so the caller can avoid reprocessing.
    #[tracing::instrument(skip(self, data_hash), fields(document_id = %document_id, stage = %stage))]
    pub async fn skip_if_complete(&self, document_id: DocumentId, stage: StageName, data_hash: &str) -> Result<bool, PipelineError> {
        let Some(marker) = self.markers.find(document_id, stage).await? else {
            return Ok(false);
        };
        let fresh = marker.is_fresh_for(data_hash);
        if fresh {
            tracing::debug!("stage already complete, skipping");
        }
        Ok(fresh)
    }

    /// Looks up `stage`'s current recorded state for `document_id`, or
    /// `None` if the document has no status yet for that stage.
    async fn current_stage_state(&self, document_id: DocumentId, stage: StageName) -> Result<Option<StageState>, PipelineError> {
        Ok(self
            .documents
            .find_by_id(document_id)
            .await?
            .and_then(|document| document.stage_status.get(&stage).map(|status| status.status)))
    }

    /// `SPEC_FULL.md` §4.1: must not overwrite a `completed` status; moves
    /// to `processing` only if the prior status is absent or `failed`.
    #[tracing::instrument(skip(self), fields(document_id = %document_id, stage = %stage))]
    pub async fn start_stage(&self, document_id: DocumentId, stage: StageName) -> Result<(), PipelineError> {
        match self.current_stage_state(document_id, stage).await? {
            Some(StageState::Completed) => {
                tracing::debug!("stage already completed, not overwriting with processing");
                return Ok(());
            }
            Some(StageState::Processing) => {
                tracing::debug!("stage already processing, leaving status untouched");
                return Ok(());
            }
            None | Some(StageState::Pending) | Some(StageState::Failed) => {}
        }
        tracing::info!("starting stage");
        self.documents.update_stage_status(document_id, stage, StageStatus::started(chrono::Utc::now())).await
    }

    #[tracing::instrument(skip(self), fields(document_id = %document_id, stage = %stage))]
    pub async fn update_stage_progress(&self, document_id: DocumentId, stage: StageName, progress: u8) -> Result<(), PipelineError> {
        let mut status = StageStatus::started(chrono::Utc::now());
        status.status = StageState::Processing;
        status.progress = progress.min(100);
        self.documents.update_stage_status(document_id, stage, status).await
    }

    /// `SPEC_FULL.md` §4.1: completing an already-completed stage is a no-op.
    #[tracing::instrument(skip(self, data_hash), fields(document_id = %document_id, stage = %stage))]
    pub async fn complete_stage(&self, document_id: DocumentId, stage: StageName, data_hash: String) -> Result<(), PipelineError> {
        if let Some(StageState::Completed) = self.current_stage_state(document_id, stage).await? {
            tracing::debug!("stage already completed, ignoring duplicate completion");
            return Ok(());
        }
        let now = chrono::Utc::now();
        self.documents.update_stage_status(document_id, stage, StageStatus::completed(Some(now), now)).await?;
        self.markers.upsert(StageCompletionMarker::new(document_id, stage, data_hash)).await?;
        tracing::info!("stage completed");
        Ok(())
    }

    /// Records a stage failure: updates the document's stage status and
    /// writes a `PipelineErrorRecord`, upserted by `(correlation_id, stage)`.
    #[tracing::instrument(skip(self, failure), fields(document_id = %document_id, stage = %stage, correlation_id = %correlation_id))]
    pub async fn fail_stage(
        &self,
        document_id: DocumentId,
        stage: StageName,
        failure: StageFailure,
        correlation_id: Uuid,
        max_retries: u32,
    ) -> Result<(), PipelineError> {
        let is_transient = matches!(failure, StageFailure::Transient(_));
        let error = failure.into_inner();
        let now = chrono::Utc::now();

        self.documents
            .update_stage_status(document_id, stage, StageStatus::failed(Some(now), now, error.to_string()))
            .await?;

        if !is_transient {
            self.documents.mark_failed(document_id, error.to_string()).await?;
        }

        let record = PipelineErrorRecord::from_pipeline_error(Some(document_id), stage, &error, correlation_id, max_retries);
        self.errors.upsert(&record).await?;

        tracing::warn!(transient = is_transient, "stage failed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use krai_pipeline_domain::entities::document::Document;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDocuments {
        statuses: Mutex<Vec<(DocumentId, StageName, StageState)>>,
        failed: Mutex<Vec<DocumentId>>,
        current: Mutex<std::collections::HashMap<(DocumentId, StageName), StageStatus>>,
    }

    #[async_trait]
    impl DocumentRepository for FakeDocuments {
        async fn upsert(&self, _document: &Document) -> Result<DocumentId, PipelineError> {
            Ok(DocumentId::new())
        }
        async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, PipelineError> {
            let current = self.current.lock().unwrap();
            if !current.keys().any(|(doc_id, _)| *doc_id == id) {
                return Ok(None);
            }
            let mut document = Document::new("a".repeat(64), "manual.pdf".to_string(), 1, 1).unwrap();
            for ((doc_id, stage), status) in current.iter() {
                if *doc_id == id {
                    document.stage_status.insert(*stage, status.clone());
                }
            }
            Ok(Some(document))
        }
        async fn find_by_file_hash(&self, _file_hash: &str) -> Result<Option<Document>, PipelineError> {
            Ok(None)
        }
        async fn update_stage_status(&self, id: DocumentId, stage: StageName, status: StageStatus) -> Result<(), PipelineError> {
            self.statuses.lock().unwrap().push((id, stage, status.status));
            self.current.lock().unwrap().insert((id, stage), status);
            Ok(())
        }
        async fn update_classification(
            &self,
            _id: DocumentId,
            _document_type: krai_pipeline_domain::entities::document::DocumentType,
            _manufacturer_id: Option<krai_pipeline_domain::value_objects::ids::ManufacturerId>,
            _series: Option<String>,
            _models: std::collections::BTreeSet<String>,
        ) -> Result<(), PipelineError> {
            Ok(())
        }
        async fn mark_failed(&self, id: DocumentId, _error_message: String) -> Result<(), PipelineError> {
            self.failed.lock().unwrap().push(id);
            Ok(())
        }
        async fn find_incomplete(&self) -> Result<Vec<Document>, PipelineError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeMarkers {
        markers: Mutex<Vec<StageCompletionMarker>>,
    }

    #[async_trait]
    impl StageMarkerRepository for FakeMarkers {
        async fn upsert(&self, marker: StageCompletionMarker) -> Result<(), PipelineError> {
            self.markers.lock().unwrap().push(marker);
            Ok(())
        }
        async fn find(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<StageCompletionMarker>, PipelineError> {
            Ok(self
                .markers
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.document_id == document_id && m.stage_name == stage_name)
                .cloned())
        }
    }

    #[derive(Default)]
    struct FakeErrors {
        records: Mutex<Vec<PipelineErrorRecord>>,
    }

    #[async_trait]
    impl PipelineErrorRepository for FakeErrors {
        async fn upsert(&self, record: &PipelineErrorRecord) -> Result<(), PipelineError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn find_by_id(
            &self,
            error_id: krai_pipeline_domain::value_objects::ids::PipelineErrorId,
        ) -> Result<Option<PipelineErrorRecord>, PipelineError> {
            Ok(self.records.lock().unwrap().iter().find(|r| r.error_id == error_id).cloned())
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

    fn orchestrator() -> (StageOrchestrator, Arc<FakeDocuments>, Arc<FakeMarkers>, Arc<FakeErrors>) {
        let documents = Arc::new(FakeDocuments::default());
        let markers = Arc::new(FakeMarkers::default());
        let errors = Arc::new(FakeErrors::default());
        (
            StageOrchestrator::new(documents.clone(), markers.clone(), errors.clone()),
            documents,
            markers,
            errors,
        )
    }

    #[tokio::test]
    async fn test_complete_stage_writes_status_and_marker() {
        let (orchestrator, documents, markers, _errors) = orchestrator();
        let document_id = DocumentId::new();

        orchestrator.complete_stage(document_id, StageName::Upload, "hash1".to_string()).await.unwrap();

        assert_eq!(documents.statuses.lock().unwrap().len(), 1);
        assert_eq!(markers.markers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_if_complete_detects_fresh_marker() {
        let (orchestrator, _documents, _markers, _errors) = orchestrator();
        let document_id = DocumentId::new();

        orchestrator.complete_stage(document_id, StageName::Upload, "hash1".to_string()).await.unwrap();

        assert!(orchestrator.skip_if_complete(document_id, StageName::Upload, "hash1").await.unwrap());
        assert!(!orchestrator.skip_if_complete(document_id, StageName::Upload, "hash2").await.unwrap());
    }

    #[tokio::test]
    async fn test_permanent_failure_marks_document_failed() {
        let (orchestrator, documents, _markers, errors) = orchestrator();
        let document_id = DocumentId::new();

        orchestrator
            .fail_stage(
                document_id,
                StageName::Classification,
                StageFailure::Permanent(PipelineError::permanent("classifier", "bad input")),
                Uuid::nil(),
                3,
            )
            .await
            .unwrap();

        assert_eq!(documents.failed.lock().unwrap().len(), 1);
        assert_eq!(errors.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_does_not_mark_document_failed() {
        let (orchestrator, documents, _markers, errors) = orchestrator();
        let document_id = DocumentId::new();

        orchestrator
            .fail_stage(
                document_id,
                StageName::EmbeddingAndSearch,
                StageFailure::Transient(PipelineError::transient("embedder", "timeout")),
                Uuid::nil(),
                3,
            )
            .await
            .unwrap();

        assert!(documents.failed.lock().unwrap().is_empty());
        assert_eq!(errors.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_stage_does_not_overwrite_completed_stage() {
        let (orchestrator, documents, _markers, _errors) = orchestrator();
        let document_id = DocumentId::new();

        orchestrator.complete_stage(document_id, StageName::Upload, "hash1".to_string()).await.unwrap();
        let writes_before = documents.statuses.lock().unwrap().len();

        orchestrator.start_stage(document_id, StageName::Upload).await.unwrap();

        assert_eq!(documents.statuses.lock().unwrap().len(), writes_before, "completed status must not be overwritten");
        let status = orchestrator.current_stage_state(document_id, StageName::Upload).await.unwrap();
        assert_eq!(status, Some(StageState::Completed));
    }

    #[tokio::test]
    async fn test_complete_stage_is_a_no_op_when_already_completed() {
        let (orchestrator, documents, markers, _errors) = orchestrator();
        let document_id = DocumentId::new();

        orchestrator.complete_stage(document_id, StageName::Upload, "hash1".to_string()).await.unwrap();
        orchestrator.complete_stage(document_id, StageName::Upload, "hash2".to_string()).await.unwrap();

        assert_eq!(documents.statuses.lock().unwrap().len(), 1, "duplicate completion must not write again");
        assert_eq!(markers.markers.lock().unwrap().len(), 1, "duplicate completion must not upsert another marker");
    }

    #[tokio::test]
    async fn test_start_stage_transitions_a_failed_stage_to_processing() {
        let (orchestrator, documents, _markers, _errors) = orchestrator();
        let document_id = DocumentId::new();

        orchestrator
            .fail_stage(
                document_id,
                StageName::Classification,
                StageFailure::Transient(PipelineError::transient("classifier", "timeout")),
                Uuid::nil(),
                3,
            )
            .await
            .unwrap();

        orchestrator.start_stage(document_id, StageName::Classification).await.unwrap();

        let status = orchestrator.current_stage_state(document_id, StageName::Classification).await.unwrap();
        assert_eq!(status, Some(StageState::Processing));
        assert_eq!(documents.statuses.lock().unwrap().len(), 2, "failed -> processing must write a new status");
    }
}
