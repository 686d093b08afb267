// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime
//!
//! The concurrency substrate: the Stage Orchestrator (`SPEC_FULL.md` §4.1),
//! the Stage-Parallel Scheduler (§4.2), and the two-level resource governor
//! they share (§5), following `adaptive_pipeline/src/infrastructure/runtime/`'s
//! split between `stage_executor` and `resource_manager`.

pub mod orchestrator;
pub mod resource_manager;
pub mod scheduler;
