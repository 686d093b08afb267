// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Krai Pipeline
//!
//! Ingests manufacturer service manuals (PDF) into a structured knowledge
//! base: text and table chunks, rendered images with OCR/vision
//! descriptions, classified manufacturer/product/series metadata, extracted
//! error codes and parts, and embeddings for semantic search.
//!
//! ## Architecture
//!
//! Clean Architecture, split the same way across crates as within this one:
//!
//! ```text
//! krai_pipeline_bootstrap  (CLI parsing, shutdown, signals, exit codes)
//!            │
//! krai_pipeline            (this crate: use cases + infrastructure)
//!            │
//! krai_pipeline_domain      (entities, value objects, repository ports)
//! ```
//!
//! Within this crate:
//!
//! - [`application`] — one use case per CLI command (`run`, `ingest`,
//!   `status`, `retry`, `validate-config`), composed over domain ports.
//! - [`infrastructure`] — the sqlx/SQLite repository adapters, the
//!   filesystem object store, the `reqwest`-backed embedding/vision/scrape
//!   clients, the `lopdf`-backed PDF backend, and the stage orchestrator and
//!   scheduler that drive documents through the eight pipeline stages.
//!
//! ## Stages
//!
//! Every document passes through `StageName::ALL`, in order: upload, text
//! extraction, table extraction, image processing, classification, parts
//! extraction, series detection, embedding and search. The
//! `infrastructure::runtime::orchestrator` is the sole writer of stage
//! status and pipeline error rows; the `infrastructure::runtime::scheduler`
//! fans work out across a bounded channel and worker pool per stage.
//!
//! ## Error Handling
//!
//! Domain errors (`krai_pipeline_domain::error::PipelineError`) distinguish
//! transient service failures (worth retrying) from permanent ones. The
//! retry subsystem (the `pipeline_error_repository` adapter) tracks
//! per-service backoff via the `retry_policies` table.
//!
//! ## Testing
//!
//! Unit tests live alongside the code they test; integration tests against a
//! real (tempfile-backed) SQLite database live under `tests/`.

pub mod application;
pub mod infrastructure;

pub use krai_pipeline_domain::error::PipelineError;
