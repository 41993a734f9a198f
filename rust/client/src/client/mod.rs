//! Client configuration and connection management.
//!
//! This module contains:
//! - [`ChromaHttpClient`] - The main client handle for tenant, database and collection operations
//! - [`ChromaHttpClientOptions`] - Configuration for client initialization
//! - [`ChromaAuthMethod`] - Authentication strategy enumeration
//! - [`ChromaRetryOptions`] - Retry behavior configuration
//! - [`ChromaHttpClientError`] - Error type for client operations

mod chroma_http_client;
mod options;

pub use chroma_http_client::*;
pub use options::*;
