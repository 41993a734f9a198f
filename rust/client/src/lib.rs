//! HTTP client for administering a Chroma server.
//!
//! [`ChromaHttpClient`] covers server, tenant, database and collection management.
//! [`ChromaCollection`] covers the record operations needed to copy data between
//! collections. The [`embed`] module provides embedding functions used to re-embed
//! documents while copying.
//!
//! ```no_run
//! use chromactl_client::{ChromaHttpClient, ChromaHttpClientOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChromaHttpClient::new(ChromaHttpClientOptions::from_env()?);
//! println!("server version {}", client.version().await?);
//! for collection in client.list_all_collections().await? {
//!     println!("{}", collection.name);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
mod collection;
pub mod embed;

pub use client::ChromaHttpClient;
pub use client::ChromaHttpClientError;
pub use client::ChromaHttpClientOptions;
pub use collection::ChromaCollection;
