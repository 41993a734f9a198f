//! Hugging Face inference API, feature-extraction pipeline.

use serde::Serialize;

use crate::embed::{check_embedding_count, DenseEmbeddingFunction, EmbeddingFunctionError};

/// Endpoint used unless overridden with [`HuggingFaceEmbeddingFunction::with_base_url`].
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
/// Model used when `HF_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-MiniLM-L6-v2";

/// Generates embeddings with a hosted sentence-transformers model.
pub struct HuggingFaceEmbeddingFunction {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct FeatureExtractionOptions {
    wait_for_model: bool,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [&'a str],
    options: FeatureExtractionOptions,
}

impl HuggingFaceEmbeddingFunction {
    /// Uses [`DEFAULT_MODEL`] against the public inference API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Selects a different model, e.g. `sentence-transformers/all-MiniLM-L6-v2`.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the function at a different inference host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl DenseEmbeddingFunction for HuggingFaceEmbeddingFunction {
    async fn embed_strs(&self, batches: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError> {
        let embeddings = self
            .client
            .post(format!(
                "{}/pipeline/feature-extraction/{}",
                self.base_url, self.model
            ))
            .bearer_auth(&self.api_key)
            .json(&FeatureExtractionRequest {
                inputs: batches,
                options: FeatureExtractionOptions {
                    wait_for_model: true,
                },
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Vec<f32>>>()
            .await?;
        check_embedding_count(batches.len(), embeddings)
    }

    fn name(&self) -> &'static str {
        "hf"
    }
}
