// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging
//!
//! Structured logging via `tracing`, with per-module level overrides read
//! from `RUST_LOG` (falling back to `info`). Every stage mutation emitted by
//! `infrastructure::runtime::orchestrator` carries `document_id`/`stage`/
//! `correlation_id` fields so a single document's run can be grepped out of
//! the log stream.

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. Must be called once, early
/// in `main()`, before any stage work begins.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_does_not_panic() {
        // Subsequent calls in other tests will hit the "already set" branch
        // of tracing's global dispatcher; ignore that, we only care this
        // doesn't panic on first use.
        let _ = std::panic::catch_unwind(init_tracing);
    }
}
