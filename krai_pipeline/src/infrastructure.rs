// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure
//!
//! Everything that talks to the outside world: sqlx/SQLite repository
//! adapters, the filesystem object store, `reqwest`-backed service clients,
//! the `lopdf` PDF text backend, the stage orchestrator/scheduler/resource
//! manager, configuration loading, logging and metrics.

pub mod clients;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod pdf;
pub mod repositories;
pub mod runtime;
