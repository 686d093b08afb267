// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rayon Thread Pool Configuration
//!
//! Global Rayon thread pools for the CPU-bound halves of the pipeline: chunk
//! splitting and content hashing (`krai_pipeline_domain::services::chunker`),
//! invoked from within an async stage body per `SPEC_FULL.md` §5.

use krai_pipeline_domain::error::PipelineError;
use std::sync::Arc;

/// Rayon thread pool manager for the pipeline's CPU-bound work.
pub struct RayonPoolManager {
    cpu_bound_pool: Arc<rayon::ThreadPool>,
    mixed_workload_pool: Arc<rayon::ThreadPool>,
}

impl RayonPoolManager {
    /// Creates a new Rayon pool manager.
    ///
    /// **CPU-bound pool**: one thread per available core, for chunk
    /// splitting/hashing. **Mixed workload pool**: half the cores, for work
    /// interleaved with I/O (e.g. PDF page rendering feeding the vision
    /// client).
    pub fn new() -> Result<Self, PipelineError> {
        let available_cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

        let cpu_bound_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(available_cores)
            .thread_name(|i| format!("rayon-cpu-{i}"))
            .build()
            .map_err(|e| PipelineError::permanent("runtime", format!("failed to create CPU-bound pool: {e}")))?;

        let mixed_worker_count = (available_cores / 2).max(1);
        let mixed_workload_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(mixed_worker_count)
            .thread_name(|i| format!("rayon-mixed-{i}"))
            .build()
            .map_err(|e| PipelineError::permanent("runtime", format!("failed to create mixed workload pool: {e}")))?;

        Ok(Self {
            cpu_bound_pool: Arc::new(cpu_bound_pool),
            mixed_workload_pool: Arc::new(mixed_workload_pool),
        })
    }

    /// Pool for chunk splitting, content hashing, and other pure CPU work.
    pub fn cpu_bound_pool(&self) -> &Arc<rayon::ThreadPool> {
        &self.cpu_bound_pool
    }

    /// Pool for work that shares a thread with ongoing I/O.
    pub fn mixed_workload_pool(&self) -> &Arc<rayon::ThreadPool> {
        &self.mixed_workload_pool
    }

    pub fn cpu_thread_count(&self) -> usize {
        self.cpu_bound_pool.current_num_threads()
    }

    pub fn mixed_thread_count(&self) -> usize {
        self.mixed_workload_pool.current_num_threads()
    }
}

/// Global Rayon pool manager, initialized once at program startup.
#[allow(clippy::expect_used)]
pub static RAYON_POOLS: std::sync::LazyLock<RayonPoolManager> =
    std::sync::LazyLock::new(|| RayonPoolManager::new().expect("failed to initialize Rayon pools"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rayon_pool_creation() {
        let manager = RayonPoolManager::new().unwrap();
        assert!(manager.cpu_thread_count() > 0);
        assert!(manager.mixed_thread_count() > 0);
    }

    #[test]
    fn test_global_pool_access() {
        let cpu_pool = RAYON_POOLS.cpu_bound_pool();
        assert!(cpu_pool.current_num_threads() > 0);

        let mixed_pool = RAYON_POOLS.mixed_workload_pool();
        assert!(mixed_pool.current_num_threads() > 0);
    }
}
