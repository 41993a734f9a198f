//! Embedding functions for converting text to vector representations.
//!
//! When a collection is cloned with an embedding function, the source embeddings are
//! discarded and every document is re-embedded through a [`DenseEmbeddingFunction`]
//! before it is inserted into the destination.

pub mod cohere;
pub mod hash;
pub mod huggingface;
pub mod ollama;
pub mod openai;

use cohere::CohereEmbeddingFunction;
use hash::ConsistentHashEmbeddingFunction;
use huggingface::HuggingFaceEmbeddingFunction;
use ollama::OllamaEmbeddingFunction;
use openai::OpenAIEmbeddingFunction;

/// Errors that occur while resolving or calling an embedding function.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingFunctionError {
    /// Network request to the embedding provider failed.
    #[error("request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization or deserialization of JSON data failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    /// The provider returned a different number of embeddings than inputs.
    #[error("expected {expected} embeddings, provider returned {actual}")]
    UnexpectedEmbeddingCount {
        /// Number of inputs sent.
        expected: usize,
        /// Number of embeddings received.
        actual: usize,
    },
    /// A provider needs an API key that is not set.
    #[error("environment variable {0} must be set")]
    MissingApiKey(String),
    /// The identifier does not name a known embedding function.
    #[error("unknown embedding function: {0} (expected one of openai, cohere, hf, ollama, hash)")]
    UnknownEmbeddingFunction(String),
}

/// Transforms text strings into dense embeddings.
///
/// Implementations return embeddings in the same order as the inputs.
#[async_trait::async_trait]
pub trait DenseEmbeddingFunction: Send + Sync {
    /// Converts a batch of text strings into embeddings.
    async fn embed_strs(&self, batches: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError>;

    /// Identifier accepted by [`embedding_function_from_name`].
    fn name(&self) -> &'static str;
}

pub(crate) fn check_embedding_count(
    expected: usize,
    embeddings: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError> {
    if embeddings.len() != expected {
        return Err(EmbeddingFunctionError::UnexpectedEmbeddingCount {
            expected,
            actual: embeddings.len(),
        });
    }
    Ok(embeddings)
}

/// Resolves an embedding function by identifier, reading credentials from the process
/// environment.
pub fn embedding_function_from_name(
    name: &str,
) -> Result<Box<dyn DenseEmbeddingFunction>, EmbeddingFunctionError> {
    embedding_function_from_lookup(name, |key| std::env::var(key).ok())
}

/// Resolves an embedding function by identifier, reading settings through `lookup`.
///
/// Recognized identifiers are `openai`, `cohere`, `hf`, `ollama` and `hash`.
pub fn embedding_function_from_lookup(
    name: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn DenseEmbeddingFunction>, EmbeddingFunctionError> {
    let require = |key: &str| {
        lookup(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| EmbeddingFunctionError::MissingApiKey(key.to_string()))
    };

    let function: Box<dyn DenseEmbeddingFunction> = match name {
        "openai" => {
            let mut function = OpenAIEmbeddingFunction::new(require("OPENAI_API_KEY")?);
            if let Some(model) = lookup("OPENAI_MODEL") {
                function = function.with_model(model);
            }
            Box::new(function)
        }
        "cohere" => Box::new(CohereEmbeddingFunction::new(require("COHERE_API_KEY")?)),
        "hf" => {
            let mut function = HuggingFaceEmbeddingFunction::new(require("HF_API_KEY")?);
            if let Some(model) = lookup("HF_MODEL") {
                function = function.with_model(model);
            }
            Box::new(function)
        }
        "ollama" => Box::new(OllamaEmbeddingFunction::new(
            lookup("OLLAMA_HOST").unwrap_or_else(|| ollama::DEFAULT_HOST.to_string()),
            lookup("OLLAMA_MODEL").unwrap_or_else(|| ollama::DEFAULT_MODEL.to_string()),
        )),
        "hash" => Box::new(ConsistentHashEmbeddingFunction::default()),
        other => {
            return Err(EmbeddingFunctionError::UnknownEmbeddingFunction(
                other.to_string(),
            ))
        }
    };
    Ok(function)
}
