// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics
//!
//! Prometheus counters/histograms for the pipeline driver (`SPEC_FULL.md`
//! §4.9's `BatchMetrics`) and the stage scheduler, registered against a
//! process-wide `prometheus::Registry` so `krai_pipeline_bootstrap` (or a
//! future HTTP exporter) can scrape them.

use prometheus::{ exponential_buckets, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry };

/// Metrics for one run of the pipeline driver (`SPEC_FULL.md` §4.9).
pub struct PipelineMetrics {
    pub files_found: IntCounterVec,
    pub stage_completed: IntCounterVec,
    pub stage_failed: IntCounterVec,
    pub stage_duration_seconds: HistogramVec,
    pub stage_queue_depth: IntGaugeVec,
    pub retries_attempted: IntCounterVec,
}

impl PipelineMetrics {
    /// Registers every metric against `registry`. Call once at start-up;
    /// registering twice against the same registry returns an error from
    /// Prometheus, which callers should treat as a programming error.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let files_found = IntCounterVec::new(Opts::new("krai_pipeline_files_found_total", "PDF files discovered by the driver"), &["watch_dir"])?;
        let stage_completed = IntCounterVec::new(Opts::new("krai_pipeline_stage_completed_total", "Stages completed successfully"), &["stage"])?;
        let stage_failed = IntCounterVec::new(Opts::new("krai_pipeline_stage_failed_total", "Stages that ended in failure"), &["stage", "category"])?;
        let stage_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("krai_pipeline_stage_duration_seconds", "Stage wall-clock duration")
                .buckets(exponential_buckets(0.05, 2.0, 12)?),
            &["stage"],
        )?;
        let stage_queue_depth = IntGaugeVec::new(Opts::new("krai_pipeline_stage_queue_depth", "Jobs waiting in a stage's channel"), &["stage"])?;
        let retries_attempted = IntCounterVec::new(Opts::new("krai_pipeline_retries_attempted_total", "Retry attempts recorded against pipeline errors"), &["service"])?;

        registry.register(Box::new(files_found.clone()))?;
        registry.register(Box::new(stage_completed.clone()))?;
        registry.register(Box::new(stage_failed.clone()))?;
        registry.register(Box::new(stage_duration_seconds.clone()))?;
        registry.register(Box::new(stage_queue_depth.clone()))?;
        registry.register(Box::new(retries_attempted.clone()))?;

        Ok(Self { files_found, stage_completed, stage_failed, stage_duration_seconds, stage_queue_depth, retries_attempted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_succeeds_once_per_registry() {
        let registry = Registry::new();
        let metrics = PipelineMetrics::register(&registry).unwrap();
        metrics.files_found.with_label_values(&["/srv/manuals/incoming"]).inc();
        assert_eq!(metrics.files_found.with_label_values(&["/srv/manuals/incoming"]).get(), 1);
    }

    #[test]
    fn test_register_twice_on_same_registry_errors() {
        let registry = Registry::new();
        PipelineMetrics::register(&registry).unwrap();
        assert!(PipelineMetrics::register(&registry).is_err());
    }
}
