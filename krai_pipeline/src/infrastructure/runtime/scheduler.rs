// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage-Parallel Scheduler
//!
//! `SPEC_FULL.md` §4.2: one bounded channel per stage, a worker pool per
//! channel sized by `worker_count`, and an advisory lock keeping a single
//! `(document, stage)` pair from running twice concurrently. This is the
//! cross-document, per-stage concurrency cap; `resource_manager.rs` is a
//! separate, process-wide CPU/IO governor that individual stage
//! implementations can layer on top when a stage's work is itself
//! CPU- or IO-heavy. Cancellation is cooperative: every worker loop selects
//! on the `CancellationToken` handed down from `krai_pipeline_bootstrap`'s
//! shutdown coordinator.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::value_objects::ids::DocumentId;
use krai_pipeline_domain::value_objects::stage::StageName;

/// The actual async work one stage job performs, boxed so jobs for every
/// stage can share one channel item type.
pub type StageWork = Pin<Box<dyn Future<Output = Result<(), PipelineError>> + Send>>;

/// A unit of work handed to a stage worker: which document, at which stage,
/// under which correlation id (so failures can be traced back to one run of
/// the pipeline driver across every stage they touch), plus the work itself
/// and a channel the submitter awaits for its result.
pub struct StageJob {
    pub document_id: DocumentId,
    pub stage: StageName,
    pub correlation_id: uuid::Uuid,
    work: StageWork,
    reply: oneshot::Sender<Result<(), PipelineError>>,
}

/// Per-stage worker pool sizing. Stages bound by an external LLM/vision call
/// get fewer workers than CPU-bound stages; `SPEC_FULL.md` §4.2's table.
fn worker_count(stage: StageName) -> usize {
    match stage {
        StageName::Upload => 2,
        StageName::TextExtraction => 4,
        StageName::TableExtraction => 4,
        StageName::ImageProcessing => 2,
        StageName::Classification => 2,
        StageName::PartsExtraction => 4,
        StageName::SeriesDetection => 2,
        StageName::EmbeddingAndSearch => 2,
    }
}

type InFlightSet = Arc<SyncMutex<HashSet<(DocumentId, StageName)>>>;

/// Fans `StageJob`s out across one bounded channel per `StageName`, holding
/// an advisory lock so a `(document, stage)` pair is never run twice at
/// once, and stopping all workers cooperatively when cancellation fires.
pub struct StageScheduler {
    senders: HashMap<StageName, mpsc::Sender<StageJob>>,
    in_flight: InFlightSet,
    workers: JoinSet<()>,
}

impl StageScheduler {
    /// Spins up one worker pool per stage, each pulling from a shared
    /// bounded queue behind a `tokio::sync::Mutex`. Each job carries its own
    /// work closure; the worker's only responsibility is running it and
    /// relaying the result back to the submitter.
    pub fn start(channel_capacity: usize, cancellation: CancellationToken) -> Self {
        let in_flight: InFlightSet = Arc::new(SyncMutex::new(HashSet::new()));
        let mut senders = HashMap::new();
        let mut workers = JoinSet::new();

        for stage in StageName::ALL {
            let (tx, rx) = mpsc::channel::<StageJob>(channel_capacity);
            senders.insert(stage, tx);

            let rx = Arc::new(AsyncMutex::new(rx));
            for _ in 0..worker_count(stage) {
                workers.spawn(Self::run_worker(rx.clone(), in_flight.clone(), cancellation.clone()));
            }
        }

        Self { senders, in_flight, workers }
    }

    /// Enqueues `work` on `stage`'s lane and awaits its result. Backpressures
    /// (waits) if the lane is already at `channel_capacity` rather than
    /// dropping work, so this call may block a while under load — that's the
    /// point: it caps how many documents run this stage at once to
    /// `worker_count(stage)`.
    #[tracing::instrument(skip(self, work), fields(document_id = %document_id, stage = %stage))]
    pub async fn submit_and_await(&self, document_id: DocumentId, stage: StageName, correlation_id: uuid::Uuid, work: StageWork) -> Result<(), PipelineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = StageJob { document_id, stage, correlation_id, work, reply: reply_tx };

        let sender = self.senders.get(&stage).expect("StageScheduler::start registers a sender for every StageName");
        sender
            .send(job)
            .await
            .map_err(|_| PipelineError::permanent("scheduler", "stage worker pool has shut down"))?;

        reply_rx.await.map_err(|_| PipelineError::permanent("scheduler", "stage worker dropped its reply channel"))?
    }

    /// Closes every lane and waits for in-flight jobs to drain (or for
    /// cancellation to have already stopped the workers).
    pub async fn shutdown(mut self) {
        self.senders.clear();
        while self.workers.join_next().await.is_some() {}
    }

    async fn run_worker(rx: Arc<AsyncMutex<mpsc::Receiver<StageJob>>>, in_flight: InFlightSet, cancellation: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = cancellation.cancelled() => break,
                job = Self::next_job(&rx) => job,
            };
            let Some(job) = job else { break };

            let key = (job.document_id, job.stage);
            if !in_flight.lock().insert(key) {
                // Another worker already owns this (document, stage) pair;
                // re-enqueue is the caller's job, here we just reject it.
                tracing::warn!(document_id = %job.document_id, stage = %job.stage, "stage job already in flight, rejecting duplicate");
                let _ = job.reply.send(Err(PipelineError::transient("scheduler", "stage already in flight for this document")));
                continue;
            }

            let result = job.work.await;
            in_flight.lock().remove(&key);
            let _ = job.reply.send(result);
        }
    }

    async fn next_job(rx: &Arc<AsyncMutex<mpsc::Receiver<StageJob>>>) -> Option<StageJob> {
        rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_submit_and_await_runs_work_and_returns_its_result() {
        let cancellation = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = StageScheduler::start(8, cancellation.clone());

        let counter_clone = counter.clone();
        scheduler
            .submit_and_await(
                DocumentId::new(),
                StageName::Upload,
                uuid::Uuid::nil(),
                Box::pin(async move {
                    counter_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);

        cancellation.cancel();
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_and_await_propagates_work_error() {
        let cancellation = CancellationToken::new();
        let scheduler = StageScheduler::start(4, cancellation.clone());

        let error = scheduler
            .submit_and_await(
                DocumentId::new(),
                StageName::Classification,
                uuid::Uuid::nil(),
                Box::pin(async move { Err(krai_pipeline_domain::error::PipelineError::input("bad page")) }),
            )
            .await
            .unwrap_err();

        assert_eq!(error.category(), "input");

        cancellation.cancel();
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_same_stage_jobs_for_different_documents_run_concurrently() {
        let cancellation = CancellationToken::new();
        let scheduler = Arc::new(StageScheduler::start(8, cancellation.clone()));
        let in_flight_peak = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let scheduler = scheduler.clone();
            let in_flight_peak = in_flight_peak.clone();
            let current = current.clone();
            handles.push(tokio::spawn(async move {
                scheduler
                    .submit_and_await(
                        DocumentId::new(),
                        StageName::TextExtraction,
                        uuid::Uuid::nil(),
                        Box::pin(async move {
                            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                            in_flight_peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                            current.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        }),
                    )
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(in_flight_peak.load(Ordering::SeqCst) > 1, "TextExtraction jobs for distinct documents should overlap");

        cancellation.cancel();
        Arc::try_unwrap(scheduler).ok().unwrap().shutdown().await;
    }

    #[tokio::test]
    async fn test_cancellation_stops_workers() {
        let cancellation = CancellationToken::new();
        let scheduler = StageScheduler::start(4, cancellation.clone());

        cancellation.cancel();
        scheduler.shutdown().await;
    }
}
