//! A deterministic, offline embedding function.
//!
//! [`ConsistentHashEmbeddingFunction`] derives a vector from the SHA-256 digest of each
//! input. It carries no semantic meaning and exists so collections can be populated
//! without an external provider.

use sha2::{Digest, Sha256};

use crate::embed::{DenseEmbeddingFunction, EmbeddingFunctionError};

/// Dimensionality of vectors produced by [`ConsistentHashEmbeddingFunction`].
pub const DEFAULT_DIMENSION: usize = 378;

/// Maps each input to a fixed vector derived from its SHA-256 digest.
#[derive(Clone, Debug)]
pub struct ConsistentHashEmbeddingFunction {
    dimension: usize,
}

impl Default for ConsistentHashEmbeddingFunction {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl ConsistentHashEmbeddingFunction {
    /// Produces vectors of the given dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, input: &str) -> Vec<f32> {
        let digest = Sha256::digest(input.as_bytes());
        digest
            .iter()
            .cycle()
            .take(self.dimension)
            .map(|byte| *byte as f32 / u8::MAX as f32)
            .collect()
    }
}

#[async_trait::async_trait]
impl DenseEmbeddingFunction for ConsistentHashEmbeddingFunction {
    async fn embed_strs(&self, batches: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError> {
        Ok(batches.iter().map(|input| self.embed_one(input)).collect())
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}
