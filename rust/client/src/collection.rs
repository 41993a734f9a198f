//! Record-level operations on a single collection.
//!
//! A [`ChromaCollection`] is obtained from [`ChromaHttpClient::collection`] or one of the
//! create calls. It supports the read and write operations needed to copy records:
//! [`count()`](ChromaCollection::count), [`get()`](ChromaCollection::get) and
//! [`add()`](ChromaCollection::add).

use std::sync::Arc;

use chromactl_types::{
    AddCollectionRecordsPayload, Collection, GetRequestPayload, GetResponse, IncludeList,
    RecordBatch,
};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};

use crate::{client::ChromaHttpClientError, ChromaHttpClient};

/// Handle to a collection bound to the client that fetched it.
#[derive(Clone)]
pub struct ChromaCollection {
    pub(crate) client: ChromaHttpClient,
    pub(crate) collection: Arc<Collection>,
}

impl std::fmt::Debug for ChromaCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaCollection")
            .field("database", &self.collection.database)
            .field("tenant", &self.collection.tenant)
            .field("name", &self.collection.name)
            .field("collection_id", &self.collection.collection_id)
            .finish()
    }
}

impl ChromaCollection {
    /// Collection name.
    pub fn name(&self) -> &str {
        &self.collection.name
    }

    /// The underlying description.
    pub fn description(&self) -> &Collection {
        &self.collection
    }

    /// Number of records in the collection.
    pub async fn count(&self) -> Result<u32, ChromaHttpClientError> {
        self.send::<(), u32>("count", "count", Method::GET, None)
            .await
    }

    /// Fetches one page of records ordered by insertion.
    pub async fn get(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
        include: Option<IncludeList>,
    ) -> Result<GetResponse, ChromaHttpClientError> {
        let request = GetRequestPayload {
            limit,
            offset: offset.unwrap_or_default(),
            include: include.unwrap_or_else(IncludeList::default_get),
        };
        self.send("get", "get", Method::POST, Some(request)).await
    }

    /// Fetches one page and checks that its parallel sequences line up.
    pub async fn get_batch(
        &self,
        offset: u32,
        limit: u32,
        include: IncludeList,
    ) -> Result<RecordBatch, ChromaHttpClientError> {
        let response = self.get(Some(limit), Some(offset), Some(include)).await?;
        Ok(RecordBatch::try_from(response)?)
    }

    /// Inserts records. Without embeddings the server computes them from the documents.
    pub async fn add(&self, records: RecordBatch) -> Result<(), ChromaHttpClientError> {
        records.validate()?;
        let payload = AddCollectionRecordsPayload::from(records);
        // Returns empty map ({}) or true depending on server version
        self.send::<_, serde_json::Value>("add", "add", Method::POST, Some(payload))
            .await?;
        Ok(())
    }

    async fn send<Body: Serialize, Response: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        method: Method,
        body: Option<Body>,
    ) -> Result<Response, ChromaHttpClientError> {
        let operation_name = format!("collection_{operation}");
        let path = format!(
            "/api/v2/tenants/{}/databases/{}/collections/{}/{}",
            self.collection.tenant, self.collection.database, self.collection.collection_id, path
        );
        let path = path.trim_end_matches("/");

        self.client
            .send(&operation_name, method, path, body, None::<()>)
            .await
    }
}
