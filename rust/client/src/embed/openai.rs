//! OpenAI embeddings API.

use serde::{Deserialize, Serialize};

use crate::embed::{check_embedding_count, DenseEmbeddingFunction, EmbeddingFunctionError};

/// Endpoint used unless overridden with [`OpenAIEmbeddingFunction::with_base_url`].
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Model used when `OPENAI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Generates embeddings with the OpenAI `/embeddings` endpoint.
pub struct OpenAIEmbeddingFunction {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl OpenAIEmbeddingFunction {
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

    /// Points the function at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl DenseEmbeddingFunction for OpenAIEmbeddingFunction {
    async fn embed_strs(&self, batches: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingFunctionError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: batches,
        };
        let mut response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<EmbeddingResponse>()
            .await?;
        // Entries carry their input position and are not guaranteed to be ordered.
        response.data.sort_by_key(|data| data.index);
        check_embedding_count(
            batches.len(),
            response.data.into_iter().map(|data| data.embedding).collect(),
        )
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    #[tokio::test]
    #[test_log::test]
    async fn test_orders_embeddings_by_index() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .json_body(serde_json::json!({
                        "model": "text-embedding-3-small",
                        "input": ["first", "second"],
                    }));
                then.status(200).json_body(serde_json::json!({
                    "object": "list",
                    "data": [
                        {"object": "embedding", "index": 1, "embedding": [2.0, 2.0]},
                        {"object": "embedding", "index": 0, "embedding": [1.0, 1.0]},
                    ],
                    "model": "text-embedding-3-small",
                }));
            })
            .await;

        let function = OpenAIEmbeddingFunction::new("sk-test")
            .with_model("text-embedding-3-small")
            .with_base_url(server.base_url());
        let embeddings = function.embed_strs(&["first", "second"]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(embeddings, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_propagates_http_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/embeddings");
                then.status(401).body(r#"{"error": {"message": "bad key"}}"#);
            })
            .await;

        let function = OpenAIEmbeddingFunction::new("sk-bad").with_base_url(server.base_url());
        let err = function.embed_strs(&["x"]).await.unwrap_err();
        assert!(matches!(err, EmbeddingFunctionError::Reqwest(_)));
    }
}
