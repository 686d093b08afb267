// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Policy Entity
//!
//! Per-service exponential-backoff-with-jitter policy, looked up by the
//! Retry Subsystem (`SPEC_FULL.md` §4.8) from the `service` tag carried by
//! every [`PipelineError`](crate::error::PipelineError).

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryableService {
    Scrape,
    Database,
    Embedder,
    Vision,
    ObjectStore,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub service: RetryableService,
    pub max_retries: u32,
    pub base_delay_seconds: f64,
    pub max_delay_seconds: f64,
    pub exponential_base: f64,
    pub jitter_enabled: bool,
}

impl RetryPolicy {
    pub fn new(
        service: RetryableService,
        max_retries: u32,
        base_delay_seconds: f64,
        max_delay_seconds: f64,
        exponential_base: f64,
        jitter_enabled: bool,
    ) -> Result<Self, PipelineError> {
        if base_delay_seconds <= 0.0 || max_delay_seconds < base_delay_seconds {
            return Err(PipelineError::validation(
                "retry policy requires 0 < base_delay_seconds <= max_delay_seconds",
            ));
        }
        if exponential_base <= 1.0 {
            return Err(PipelineError::validation("exponential_base must be > 1.0"));
        }
        Ok(Self {
            service,
            max_retries,
            base_delay_seconds,
            max_delay_seconds,
            exponential_base,
            jitter_enabled,
        })
    }

    /// `delay = min(max_delay, base_delay * exponential_base^retry) ± jitter`.
    ///
    /// `jitter_fraction` is a caller-supplied value in `[-1.0, 1.0]`
    /// (typically from an RNG) so this method stays deterministic and
    /// testable; it is ignored when `jitter_enabled` is false.
    pub fn delay_for_retry(&self, retry: u32, jitter_fraction: f64) -> std::time::Duration {
        let raw = self.base_delay_seconds * self.exponential_base.powi(retry as i32);
        let capped = raw.min(self.max_delay_seconds);
        let delay = if self.jitter_enabled {
            (capped * (1.0 + jitter_fraction.clamp(-1.0, 1.0) * 0.25)).max(0.0)
        } else {
            capped
        };
        std::time::Duration::from_secs_f64(delay)
    }

    pub fn should_give_up(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(RetryableService::Embedder, 5, 1.0, 30.0, 2.0, false).unwrap()
    }

    #[test]
    fn test_rejects_inverted_delay_bounds() {
        assert!(RetryPolicy::new(RetryableService::Scrape, 3, 10.0, 5.0, 2.0, false).is_err());
    }

    #[test]
    fn test_delay_grows_exponentially_until_capped() {
        let policy = policy();
        assert_eq!(policy.delay_for_retry(0, 0.0).as_secs_f64(), 1.0);
        assert_eq!(policy.delay_for_retry(1, 0.0).as_secs_f64(), 2.0);
        assert_eq!(policy.delay_for_retry(2, 0.0).as_secs_f64(), 4.0);
        assert_eq!(policy.delay_for_retry(10, 0.0).as_secs_f64(), 30.0);
    }

    #[test]
    fn test_give_up_at_max_retries() {
        let policy = policy();
        assert!(!policy.should_give_up(4));
        assert!(policy.should_give_up(5));
    }
}
