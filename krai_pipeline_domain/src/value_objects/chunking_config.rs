// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunking Configuration
//!
//! Validated configuration for the hierarchical chunker, grounded in the
//! validated-value-object pattern the teacher crate uses for its own
//! `ChunkSize` (construct-time validation, no invalid instance can exist).

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Split on detected headings first, falling back to size-based splitting
    /// within any section that still exceeds `max_size`.
    Hierarchical,
    /// Ignore heading structure; split purely on target size with overlap.
    FixedSize,
}

/// Validated chunking parameters, all measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub strategy: ChunkingStrategy,
    pub target_size: usize,
    pub overlap: usize,
    pub min_size: usize,
    pub max_size: usize,
}

impl ChunkingConfig {
    pub fn new(
        strategy: ChunkingStrategy,
        target_size: usize,
        overlap: usize,
        min_size: usize,
        max_size: usize,
    ) -> Result<Self, PipelineError> {
        if overlap >= target_size {
            return Err(PipelineError::validation(format!(
                "chunk overlap ({overlap}) must be smaller than target_size ({target_size})"
            )));
        }
        if !(min_size <= target_size && target_size <= max_size) {
            return Err(PipelineError::validation(format!(
                "chunk sizes must satisfy min_size <= target_size <= max_size, got {min_size} <= {target_size} <= {max_size}"
            )));
        }
        Ok(Self {
            strategy,
            target_size,
            overlap,
            min_size,
            max_size,
        })
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::new(ChunkingStrategy::Hierarchical, 1000, 150, 200, 2000).expect("default chunking config is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_must_be_smaller_than_target() {
        assert!(ChunkingConfig::new(ChunkingStrategy::FixedSize, 500, 500, 100, 1000).is_err());
    }

    #[test]
    fn test_sizes_must_be_ordered() {
        assert!(ChunkingConfig::new(ChunkingStrategy::FixedSize, 1000, 100, 2000, 500).is_err());
    }

    #[test]
    fn test_default_is_valid() {
        let cfg = ChunkingConfig::default();
        assert!(cfg.overlap < cfg.target_size);
        assert!(cfg.min_size <= cfg.target_size && cfg.target_size <= cfg.max_size);
    }
}
