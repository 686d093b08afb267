// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Embedding Entity
//!
//! One dense vector per chunk, produced by the Embedding & Search Indexing
//! stage via an [`EmbeddingClient`](crate::services::embedding_client::EmbeddingClient).

use crate::error::PipelineError;
use crate::value_objects::ids::ChunkId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Unique: one embedding per chunk.
    pub chunk_id: ChunkId,
    pub vector: Vec<f32>,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    /// Builds an embedding, checking it against the provider's declared dimension.
    pub fn new(chunk_id: ChunkId, vector: Vec<f32>, model_name: String, expected_dimension: usize) -> Result<Self, PipelineError> {
        if vector.len() != expected_dimension {
            return Err(PipelineError::validation(format!(
                "embedding for chunk {chunk_id} has dimension {}, expected {expected_dimension}",
                vector.len()
            )));
        }
        Ok(Self {
            chunk_id,
            vector,
            model_name,
            created_at: Utc::now(),
        })
    }

    /// Cosine similarity against another embedding's vector. Assumes both
    /// vectors are the same dimension; callers only compare embeddings from
    /// the same model, per the policy in `SPEC_FULL.md` §4.7.
    pub fn cosine_similarity(&self, other: &[f32]) -> f32 {
        let dot: f32 = self.vector.iter().zip(other.iter()).map(|(a, b)| a * b).sum();
        let norm_a: f32 = self.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_dimension() {
        let result = Embedding::new(ChunkId::new(), vec![0.1, 0.2], "test-model".into(), 3);
        assert!(result.is_err());
    }

    #[test]
    fn test_identical_vectors_have_similarity_one() {
        let embedding = Embedding::new(ChunkId::new(), vec![1.0, 0.0, 0.0], "test-model".into(), 3).unwrap();
        let similarity = embedding.cosine_similarity(&[1.0, 0.0, 0.0]);
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_have_similarity_zero() {
        let embedding = Embedding::new(ChunkId::new(), vec![1.0, 0.0], "test-model".into(), 2).unwrap();
        let similarity = embedding.cosine_similarity(&[0.0, 1.0]);
        assert!(similarity.abs() < 1e-6);
    }
}
