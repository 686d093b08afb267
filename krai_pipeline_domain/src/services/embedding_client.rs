// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Embedding Client Port
//!
//! `SPEC_FULL.md` §4.7: chunks are submitted in batches; a failure fails the
//! batch without rolling back earlier batches, so this port exposes a
//! single `embed_batch` call rather than a per-item one.

use crate::error::PipelineError;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embeds a batch of already-normalized text, returning one vector per
    /// input in the same order. The whole batch fails together on error.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// The fixed vector length this client produces, used to validate
    /// [`Embedding::new`](crate::entities::Embedding::new) results.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDimensionStub(usize);

    #[async_trait]
    impl EmbeddingClient for FixedDimensionStub {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(texts.iter().map(|_| vec![0.0; self.0]).collect())
        }

        fn dimension(&self) -> usize {
            self.0
        }

        fn model_name(&self) -> &str {
            "stub-embedder"
        }
    }

    #[test]
    fn test_batch_preserves_order_and_dimension() {
        futures::executor::block_on(async {
            let client = FixedDimensionStub(8);
            let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
            let vectors = client.embed_batch(&texts).await.unwrap();
            assert_eq!(vectors.len(), 3);
            assert!(vectors.iter().all(|v| v.len() == client.dimension()));
        });
    }
}
