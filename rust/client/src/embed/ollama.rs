//! Ollama embedding function for local model inference.
//!
//! [`OllamaEmbeddingFunction`] posts inputs to `{host}/api/embed` on a running Ollama
//! instance. The model must already be pulled with `ollama pull <model>`.

use reqwest::RequestBuilder;

use crate::embed::{check_embedding_count, DenseEmbeddingFunction, EmbeddingFunctionError};

/// Host used when `OLLAMA_HOST` is not set.
pub const DEFAULT_HOST: &str = "http://localhost:11434";
/// Model used when `OLLAMA_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Generates embeddings using a locally running Ollama instance.
pub struct OllamaEmbeddingFunction {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl OllamaEmbeddingFunction {
    /// Constructs a new Ollama embedding function. No request is made until the first embed.
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    async fn embed(&self, batches: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError> {
        let model = &self.model;
        let input = batches;
        let req = EmbedRequest { model, input };
        let resp = req
            .make_request(self)
            .send()
            .await?
            .error_for_status()?
            .json::<EmbedResponse>()
            .await?;
        tracing::trace!(
            model = %resp.model,
            count = resp.embeddings.len(),
            "Ollama embeddings received"
        );
        check_embedding_count(batches.len(), resp.embeddings)
    }
}

#[async_trait::async_trait]
impl DenseEmbeddingFunction for OllamaEmbeddingFunction {
    async fn embed_strs(&self, batches: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError> {
        self.embed(batches).await
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

/////////////////////////////////////////// EmbedRequest ///////////////////////////////////////////

/// A request to embed multiple input documents.
#[derive(Clone, Debug, serde::Serialize)]
pub struct EmbedRequest<'a> {
    /// The name of the model to use for embedding.
    pub model: &'a str,
    /// The input texts to embed.
    pub input: &'a [&'a str],
}

impl EmbedRequest<'_> {
    /// Create a new RequestBuilder for this embed request.
    pub fn make_request(&self, ef: &OllamaEmbeddingFunction) -> RequestBuilder {
        ef.client.post(format!("{}/api/embed", ef.host)).json(self)
    }
}

/////////////////////////////////////////// EmbedResponse //////////////////////////////////////////

/// The response to an embed request.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct EmbedResponse {
    /// The name of the model used to generate the response.
    pub model: String,
    /// The embeddings of the input, in the same order.
    pub embeddings: Vec<Vec<f32>>,
}
