// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Driver Use Case
//!
//! Backs the long-running `run` CLI command: polls `input_dir` for new
//! service manuals and drives each one through [`IngestDocumentUseCase`].
//! A file that fails is left in place — `StageOrchestrator::skip_if_complete`
//! makes re-ingestion on the next poll resume from the first incomplete
//! stage rather than redo finished work. Before re-ingesting a file already
//! seen, `poll_once` consults its document's `pipeline_errors` rows so that
//! backoff (`next_retry_at`) and give-up (`ErrorRecordStatus::GaveUp`) from
//! `SPEC_FULL.md` §4.8 actually gate re-execution, instead of every poll
//! tick blindly retrying every failed file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use krai_pipeline_domain::entities::pipeline_error_record::{ErrorRecordStatus, PipelineErrorRecord};
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::pipeline_error_repository::PipelineErrorRepository;
use krai_pipeline_domain::value_objects::ids::DocumentId;

use super::ingest_document::IngestDocumentUseCase;

/// Per-document gating state derived from `pipeline_errors`, computed once
/// per poll tick from `PipelineErrorRepository::find_unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryGate {
    GaveUp,
    NotDueYet,
}

/// Pure core of [`RunDriverUseCase::retry_gates`]: reduces `records` into
/// the strictest gate per document, `now` injected so it's deterministic
/// to test.
fn compute_retry_gates(records: Vec<PipelineErrorRecord>, now: chrono::DateTime<Utc>) -> HashMap<DocumentId, RetryGate> {
    let mut gates = HashMap::new();
    for record in records {
        let Some(document_id) = record.document_id else { continue };
        match record.status {
            ErrorRecordStatus::GaveUp => {
                gates.insert(document_id, RetryGate::GaveUp);
            }
            ErrorRecordStatus::Open | ErrorRecordStatus::Retrying => {
                if let Some(next_retry_at) = record.next_retry_at {
                    if next_retry_at > now && !matches!(gates.get(&document_id), Some(RetryGate::GaveUp)) {
                        gates.insert(document_id, RetryGate::NotDueYet);
                    }
                }
            }
            ErrorRecordStatus::Resolved => {}
        }
    }
    gates
}

const INGESTIBLE_EXTENSIONS: [&str; 2] = ["pdf", "pdfz"];

pub struct RunDriverUseCase {
    ingest: Arc<IngestDocumentUseCase>,
    errors: Arc<dyn PipelineErrorRepository>,
    input_dir: PathBuf,
    processed_dir: PathBuf,
    poll_interval: Duration,
}

impl RunDriverUseCase {
    pub fn new(
        ingest: Arc<IngestDocumentUseCase>,
        errors: Arc<dyn PipelineErrorRepository>,
        input_dir: PathBuf,
        processed_dir: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self { ingest, errors, input_dir, processed_dir, poll_interval }
    }

    /// Runs until `cancellation` fires. Each tick scans `input_dir` once and
    /// ingests every file it finds there that isn't currently gated by its
    /// document's retry/give-up state.
    pub async fn execute(&self, cancellation: CancellationToken) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.processed_dir).await?;

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    tracing::info!("run driver received cancellation, stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    self.poll_once().await;
                }
            }
        }
    }

    async fn poll_once(&self) {
        let gates = self.retry_gates().await;

        match self.discover_files().await {
            Ok(files) => {
                for file in files {
                    self.ingest_if_due(&file, &gates).await;
                }
            }
            Err(error) => tracing::error!(%error, dir = %self.input_dir.display(), "failed to scan input directory"),
        }
    }

    /// Builds the `document_id -> RetryGate` map for this tick from every
    /// unresolved `pipeline_errors` row. A document with no row at all (or
    /// whose only rows are `open`/`retrying` and due) has no entry and is
    /// free to run.
    async fn retry_gates(&self) -> HashMap<DocumentId, RetryGate> {
        match self.errors.find_unresolved().await {
            Ok(records) => compute_retry_gates(records, Utc::now()),
            Err(error) => {
                tracing::error!(%error, "failed to query unresolved pipeline errors, proceeding without retry gating");
                HashMap::new()
            }
        }
    }

    /// Ingests `file` unless it already resolves to a document that has
    /// given up or isn't due for retry yet.
    async fn ingest_if_due(&self, file: &Path, gates: &HashMap<DocumentId, RetryGate>) {
        match self.ingest.resolve_existing_document(file).await {
            Ok(Some(document_id)) => match gates.get(&document_id) {
                Some(RetryGate::GaveUp) => {
                    tracing::warn!(%document_id, file = %file.display(), "document has given up retrying, leaving file untouched");
                    return;
                }
                Some(RetryGate::NotDueYet) => {
                    tracing::debug!(%document_id, file = %file.display(), "document not due for retry yet, skipping this tick");
                    return;
                }
                None => {}
            },
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, file = %file.display(), "failed to resolve existing document for retry gating, ingesting anyway"),
        }

        self.ingest_one(file).await;
    }

    async fn discover_files(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut entries = tokio::fs::read_dir(&self.input_dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_ingestible(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn ingest_one(&self, file: &Path) {
        match self.ingest.execute(file).await {
            Ok(document_id) => {
                tracing::info!(%document_id, file = %file.display(), "ingested document");
                if let Err(error) = self.move_to_processed(file).await {
                    tracing::error!(%error, file = %file.display(), "ingested but failed to move file to processed_dir");
                }
            }
            Err(error) => tracing::error!(%error, file = %file.display(), "ingest failed, leaving file for the next poll"),
        }
    }

    async fn move_to_processed(&self, file: &Path) -> Result<(), PipelineError> {
        let Some(name) = file.file_name() else { return Ok(()) };
        let destination = self.processed_dir.join(name);
        tokio::fs::rename(file, destination).await?;
        Ok(())
    }
}

fn is_ingestible(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| INGESTIBLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use krai_pipeline_domain::error::PipelineError;
    use krai_pipeline_domain::value_objects::stage::StageName;
    use uuid::Uuid;

    #[test]
    fn test_is_ingestible_accepts_pdf_and_pdfz_case_insensitively() {
        assert!(is_ingestible(Path::new("/tmp/manual.PDF")));
        assert!(is_ingestible(Path::new("/tmp/manual.pdfz")));
        assert!(!is_ingestible(Path::new("/tmp/manual.txt")));
        assert!(!is_ingestible(Path::new("/tmp/no_extension")));
    }

    fn record_for(document_id: DocumentId, status: ErrorRecordStatus, next_retry_at: Option<chrono::DateTime<Utc>>) -> PipelineErrorRecord {
        let error = PipelineError::transient("embedder", "timeout");
        let mut record = PipelineErrorRecord::from_pipeline_error(Some(document_id), StageName::EmbeddingAndSearch, &error, Uuid::new_v4(), 3);
        record.status = status;
        record.next_retry_at = next_retry_at;
        record
    }

    #[test]
    fn test_gave_up_document_is_gated() {
        let document_id = DocumentId::new();
        let now = Utc::now();
        let gates = compute_retry_gates(vec![record_for(document_id, ErrorRecordStatus::GaveUp, None)], now);
        assert_eq!(gates.get(&document_id), Some(&RetryGate::GaveUp));
    }

    #[test]
    fn test_retrying_document_not_yet_due_is_gated() {
        let document_id = DocumentId::new();
        let now = Utc::now();
        let future = now + chrono::Duration::seconds(60);
        let gates = compute_retry_gates(vec![record_for(document_id, ErrorRecordStatus::Retrying, Some(future))], now);
        assert_eq!(gates.get(&document_id), Some(&RetryGate::NotDueYet));
    }

    #[test]
    fn test_retrying_document_past_next_retry_at_has_no_gate() {
        let document_id = DocumentId::new();
        let now = Utc::now();
        let past = now - chrono::Duration::seconds(60);
        let gates = compute_retry_gates(vec![record_for(document_id, ErrorRecordStatus::Retrying, Some(past))], now);
        assert_eq!(gates.get(&document_id), None);
    }

    #[test]
    fn test_open_record_with_no_next_retry_at_has_no_gate() {
        let document_id = DocumentId::new();
        let now = Utc::now();
        let gates = compute_retry_gates(vec![record_for(document_id, ErrorRecordStatus::Open, None)], now);
        assert_eq!(gates.get(&document_id), None);
    }

    #[test]
    fn test_resolved_record_has_no_gate() {
        let document_id = DocumentId::new();
        let now = Utc::now();
        let gates = compute_retry_gates(vec![record_for(document_id, ErrorRecordStatus::Resolved, None)], now);
        assert_eq!(gates.get(&document_id), None);
    }
}
