//! Cohere embed API.

use serde::{Deserialize, Serialize};

use crate::embed::{check_embedding_count, DenseEmbeddingFunction, EmbeddingFunctionError};

/// Endpoint used unless overridden with [`CohereEmbeddingFunction::with_base_url`].
pub const DEFAULT_BASE_URL: &str = "https://api.cohere.ai/v1";
/// Model sent with every request unless overridden.
pub const DEFAULT_MODEL: &str = "embed-english-v2.0";

/// Generates embeddings with the Cohere `/embed` endpoint.
pub struct CohereEmbeddingFunction {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereEmbeddingFunction {
    /// Uses [`DEFAULT_MODEL`] against the public API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Selects a different embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the function at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl DenseEmbeddingFunction for CohereEmbeddingFunction {
    async fn embed_strs(&self, batches: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError> {
        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model,
                texts: batches,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<EmbedResponse>()
            .await?;
        check_embedding_count(batches.len(), response.embeddings)
    }

    fn name(&self) -> &'static str {
        "cohere"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    #[tokio::test]
    #[test_log::test]
    async fn test_embeds_texts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/embed")
                    .header("authorization", "Bearer co-test")
                    .json_body(serde_json::json!({
                        "model": "embed-english-v2.0",
                        "texts": ["one"],
                    }));
                then.status(200).json_body(serde_json::json!({
                    "id": "abc",
                    "texts": ["one"],
                    "embeddings": [[0.25, 0.5]],
                }));
            })
            .await;

        let function = CohereEmbeddingFunction::new("co-test").with_base_url(server.base_url());
        let embeddings = function.embed_strs(&["one"]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(embeddings, vec![vec![0.25, 0.5]]);
    }
}
