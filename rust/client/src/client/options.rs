use std::time::Duration;

use backon::ExponentialBuilder;
use base64::prelude::{Engine, BASE64_STANDARD};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION};

/// Retry policy for idempotent requests and rate-limited responses.
#[derive(Clone, Debug)]
pub struct ChromaRetryOptions {
    /// Maximum number of retries after the first attempt.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Randomize delays to avoid synchronized retries.
    pub jitter: bool,
}

impl Default for ChromaRetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl ChromaRetryOptions {
    /// Every request is attempted exactly once.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

impl From<ChromaRetryOptions> for ExponentialBuilder {
    fn from(options: ChromaRetryOptions) -> Self {
        let mut builder = ExponentialBuilder::new()
            .with_max_times(options.max_retries)
            .with_min_delay(options.min_delay)
            .with_max_delay(options.max_delay);
        if options.jitter {
            builder = builder.with_jitter();
        }
        builder
    }
}

/// How requests authenticate against the server.
#[derive(Debug, Clone)]
pub enum ChromaAuthMethod {
    /// No credentials are sent.
    None,
    /// A single header is attached to every request.
    HeaderAuth {
        /// Header name.
        header: HeaderName,
        /// Header value, marked sensitive.
        value: HeaderValue,
    },
}

impl ChromaAuthMethod {
    fn header_auth(header: HeaderName, value: &str) -> Result<Self, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(value)?;
        value.set_sensitive(true);
        Ok(ChromaAuthMethod::HeaderAuth { header, value })
    }

    /// `Authorization: Basic ...` from a `user:password` credential.
    pub fn basic(credential: &str) -> Result<Self, InvalidHeaderValue> {
        let encoded = BASE64_STANDARD.encode(credential);
        Self::header_auth(AUTHORIZATION, &format!("Basic {}", encoded))
    }

    /// `Authorization: Bearer ...`.
    pub fn bearer_token(token: &str) -> Result<Self, InvalidHeaderValue> {
        Self::header_auth(AUTHORIZATION, &format!("Bearer {}", token))
    }

    /// `X-Chroma-Token: ...`, also used by Chroma Cloud API keys.
    pub fn x_chroma_token(token: &str) -> Result<Self, InvalidHeaderValue> {
        Self::header_auth(HeaderName::from_static("x-chroma-token"), token)
    }
}

/// Errors raised while building client options.
#[derive(Debug, thiserror::Error)]
pub enum ChromaHttpClientOptionsError {
    /// A credential could not be encoded as a header value.
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
    /// The endpoint is not a valid URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:8000";

/// Configuration for [`crate::ChromaHttpClient`].
#[derive(Debug, Clone)]
pub struct ChromaHttpClientOptions {
    /// Base URL of the server, e.g. `http://localhost:8000`.
    pub endpoint: reqwest::Url,
    /// Credentials attached to every request.
    pub auth_method: ChromaAuthMethod,
    /// Retry policy for GET requests and 429 responses.
    pub retry_options: ChromaRetryOptions,
    /// Will be automatically resolved at request time if not provided
    pub tenant_id: Option<String>,
    /// Will be automatically resolved at request time if not provided. It can only be resolved automatically if this client has access to exactly one database.
    pub database_name: Option<String>,
}

impl Default for ChromaHttpClientOptions {
    fn default() -> Self {
        ChromaHttpClientOptions {
            endpoint: DEFAULT_LOCAL_ENDPOINT.parse().expect("valid URL"),
            auth_method: ChromaAuthMethod::None,
            retry_options: ChromaRetryOptions::default(),
            tenant_id: None,
            database_name: None,
        }
    }
}

impl ChromaHttpClientOptions {
    /// Reads `CHROMA_ENDPOINT`, `CHROMA_TENANT` and `CHROMA_DATABASE`, falling back to a
    /// local server with the default tenant and database.
    pub fn from_env() -> Result<Self, ChromaHttpClientOptionsError> {
        let endpoint = std::env::var("CHROMA_ENDPOINT")
            .map(|s| s.parse())
            .unwrap_or(Ok(ChromaHttpClientOptions::default().endpoint))
            .map_err(|err| ChromaHttpClientOptionsError::InvalidEndpoint(err.to_string()))?;

        let tenant_id = std::env::var("CHROMA_TENANT").unwrap_or("default_tenant".to_string());
        let database_name =
            std::env::var("CHROMA_DATABASE").unwrap_or("default_database".to_string());

        Ok(ChromaHttpClientOptions {
            database_name: Some(database_name),
            tenant_id: Some(tenant_id),
            endpoint,
            ..Default::default()
        })
    }

    /// Parses an endpoint URL such as `https://api.trychroma.com:443`.
    pub fn parse_endpoint(endpoint: &str) -> Result<reqwest::Url, ChromaHttpClientOptionsError> {
        reqwest::Url::parse(endpoint)
            .map_err(|err| ChromaHttpClientOptionsError::InvalidEndpoint(err.to_string()))
    }

    pub(crate) fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match &self.auth_method {
            ChromaAuthMethod::HeaderAuth { header, value } => {
                headers.insert(header.clone(), value.clone());
            }
            ChromaAuthMethod::None => {}
        }
        headers
    }
}
