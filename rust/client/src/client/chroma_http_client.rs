use backon::ExponentialBuilder;
use backon::Retryable;
use chromactl_types::{
    Collection, Database, ErrorResponse, HeartbeatResponse, Metadata, RecordBatchError, Tenant,
    UserIdentity,
};
use parking_lot::Mutex;
use reqwest::Method;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::client::ChromaHttpClientOptions;
use crate::collection::ChromaCollection;

const USER_AGENT: &str = concat!("chromactl v", env!("CARGO_PKG_VERSION"));

/// Page size used by [`ChromaHttpClient::list_all_collections`].
pub const LIST_COLLECTIONS_PAGE_SIZE: usize = 100;

/// Errors that originate from the Chroma client during request execution.
#[derive(Error, Debug)]
pub enum ChromaHttpClientError {
    /// Network-level HTTP request failed.
    #[error("Request error: {0:?}")]
    RequestError(#[from] reqwest::Error),
    /// Chroma API returned an error status with a structured error message.
    ///
    /// Contains the error message from the server and the HTTP status code that triggered the error.
    #[error("API error: {0:?} ({1})")]
    ApiError(String, reqwest::StatusCode),
    /// Client lacks access to a unique database or cannot determine which database to use.
    #[error("Could not resolve database ID: {0}")]
    CouldNotResolveDatabaseId(String),
    /// JSON serialization or deserialization of request/response bodies failed.
    #[error("Serialization/Deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    /// A response carried records whose parallel sequences disagree in length.
    #[error("Validation error: {0}")]
    ValidationError(#[from] RecordBatchError),
}

/// Client handle for a single Chroma server.
///
/// Tenant and database are fixed at construction time when known, otherwise they are
/// resolved once from `/api/v2/auth/identity` and cached.
///
/// `Clone` shares the connection pool but not the cached tenant and database.
#[derive(Debug)]
pub struct ChromaHttpClient {
    base_url: reqwest::Url,
    client: reqwest::Client,
    retry_policy: ExponentialBuilder,
    tenant_id: Arc<Mutex<Option<String>>>,
    database_name: Arc<Mutex<Option<String>>>,
    resolve_tenant_or_database_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Default for ChromaHttpClient {
    fn default() -> Self {
        Self::new(ChromaHttpClientOptions::default())
    }
}

impl Clone for ChromaHttpClient {
    fn clone(&self) -> Self {
        ChromaHttpClient {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            retry_policy: self.retry_policy,
            tenant_id: Arc::new(Mutex::new(self.tenant_id.lock().clone())),
            database_name: Arc::new(Mutex::new(self.database_name.lock().clone())),
            resolve_tenant_or_database_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

impl ChromaHttpClient {
    /// Constructs a client from explicit configuration options.
    pub fn new(options: ChromaHttpClientOptions) -> Self {
        let mut headers = options.headers();
        headers.append(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to initialize TLS backend");

        ChromaHttpClient {
            base_url: options.endpoint.clone(),
            client,
            retry_policy: options.retry_options.into(),
            tenant_id: Arc::new(Mutex::new(options.tenant_id)),
            database_name: Arc::new(Mutex::new(options.database_name)),
            resolve_tenant_or_database_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Base URL every request path is joined onto.
    pub fn endpoint(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// Overrides the tenant used for subsequent database and collection requests.
    pub fn set_tenant_id(&self, tenant_id: impl AsRef<str>) {
        let mut lock = self.tenant_id.lock();
        *lock = Some(tenant_id.as_ref().to_string());
    }

    /// Resolves the database name for collection operations.
    ///
    /// Falls back to the identity endpoint, which must grant access to exactly one
    /// database.
    pub async fn get_database_name(&self) -> Result<String, ChromaHttpClientError> {
        self.cached_or_resolve(&self.database_name, |identity| {
            match identity.databases.as_slice() {
                [database_name] => Ok(database_name.clone()),
                [] => Err(ChromaHttpClientError::CouldNotResolveDatabaseId(
                    "Client has access to no databases".to_string(),
                )),
                _ => Err(ChromaHttpClientError::CouldNotResolveDatabaseId(
                    "Client has access to multiple databases; please provide a database_name"
                        .to_string(),
                )),
            }
        })
        .await
    }

    /// Resolves the tenant ID for the authenticated user.
    pub async fn get_tenant_id(&self) -> Result<String, ChromaHttpClientError> {
        self.cached_or_resolve(&self.tenant_id, |identity| Ok(identity.tenant))
            .await
    }

    async fn cached_or_resolve(
        &self,
        slot: &Mutex<Option<String>>,
        pick: impl FnOnce(UserIdentity) -> Result<String, ChromaHttpClientError>,
    ) -> Result<String, ChromaHttpClientError> {
        let cached = slot.lock().clone();
        if let Some(value) = cached {
            return Ok(value);
        }

        let _guard = self.resolve_tenant_or_database_lock.lock().await;
        // Resolved by another caller while this one waited.
        let cached = slot.lock().clone();
        if let Some(value) = cached {
            return Ok(value);
        }

        let value = pick(self.get_auth_identity().await?)?;
        *slot.lock() = Some(value.clone());
        Ok(value)
    }

    /// Returns the identity associated with the configured credentials.
    pub async fn get_auth_identity(&self) -> Result<UserIdentity, ChromaHttpClientError> {
        self.send::<(), (), _>(
            "get_auth_identity",
            Method::GET,
            "/api/v2/auth/identity",
            None,
            None,
        )
        .await
    }

    /// Checks that the server is reachable.
    pub async fn heartbeat(&self) -> Result<HeartbeatResponse, ChromaHttpClientError> {
        self.send::<(), (), _>("heartbeat", Method::GET, "/api/v2/heartbeat", None, None)
            .await
    }

    /// Returns the server version string, e.g. `1.0.0`.
    pub async fn version(&self) -> Result<String, ChromaHttpClientError> {
        self.send::<(), (), _>("version", Method::GET, "/api/v2/version", None, None)
            .await
    }

    /// Creates a tenant.
    pub async fn create_tenant(&self, name: impl AsRef<str>) -> Result<(), ChromaHttpClientError> {
        // Returns empty map ({})
        self.send::<_, (), serde_json::Value>(
            "create_tenant",
            Method::POST,
            "/api/v2/tenants",
            Some(serde_json::json!({ "name": name.as_ref() })),
            None,
        )
        .await?;

        Ok(())
    }

    /// Fetches a tenant by name.
    pub async fn get_tenant(&self, name: impl AsRef<str>) -> Result<Tenant, ChromaHttpClientError> {
        self.send::<(), (), _>(
            "get_tenant",
            Method::GET,
            format!("/api/v2/tenants/{}", name.as_ref()),
            None,
            None,
        )
        .await
    }

    /// Creates a database in the current tenant.
    pub async fn create_database(
        &self,
        name: impl AsRef<str>,
    ) -> Result<(), ChromaHttpClientError> {
        // Returns empty map ({})
        self.send::<_, (), serde_json::Value>(
            "create_database",
            Method::POST,
            format!("/api/v2/tenants/{}/databases", self.get_tenant_id().await?),
            Some(serde_json::json!({ "name": name.as_ref() })),
            None,
        )
        .await?;

        Ok(())
    }

    /// Lists the databases of the current tenant.
    pub async fn list_databases(&self) -> Result<Vec<Database>, ChromaHttpClientError> {
        let tenant_id = self.get_tenant_id().await?;

        self.send::<(), (), _>(
            "list_databases",
            Method::GET,
            format!("/api/v2/tenants/{}/databases", tenant_id),
            None,
            None,
        )
        .await
    }

    /// Deletes a database of the current tenant.
    pub async fn delete_database(
        &self,
        database_name: impl AsRef<str>,
    ) -> Result<(), ChromaHttpClientError> {
        // Returns empty map ({})
        self.send::<(), (), serde_json::Value>(
            "delete_database",
            Method::DELETE,
            format!(
                "/api/v2/tenants/{}/databases/{}",
                self.get_tenant_id().await?,
                database_name.as_ref()
            ),
            None,
            None,
        )
        .await?;

        Ok(())
    }

    /// Creates a collection, failing with a conflict if the name is taken.
    pub async fn create_collection(
        &self,
        name: impl AsRef<str>,
        metadata: Option<Metadata>,
    ) -> Result<ChromaCollection, ChromaHttpClientError> {
        self.common_create_collection(name, metadata, false).await
    }

    /// Creates a collection or returns the existing one with the same name.
    pub async fn get_or_create_collection(
        &self,
        name: impl AsRef<str>,
        metadata: Option<Metadata>,
    ) -> Result<ChromaCollection, ChromaHttpClientError> {
        self.common_create_collection(name, metadata, true).await
    }

    /// Deletes a collection by name.
    pub async fn delete_collection(
        &self,
        name: impl AsRef<str>,
    ) -> Result<(), ChromaHttpClientError> {
        let tenant_id = self.get_tenant_id().await?;
        let database_name = self.get_database_name().await?;

        self.send::<(), (), serde_json::Value>(
            "delete_collection",
            Method::DELETE,
            format!(
                "/api/v2/tenants/{}/databases/{}/collections/{}",
                tenant_id,
                database_name,
                name.as_ref()
            ),
            None,
            None,
        )
        .await?;

        Ok(())
    }

    /// Lists one page of collections.
    pub async fn list_collections(
        &self,
        limit: usize,
        offset: Option<usize>,
    ) -> Result<Vec<Collection>, ChromaHttpClientError> {
        let tenant_id = self.get_tenant_id().await?;
        let database_name = self.get_database_name().await?;

        #[derive(Serialize)]
        struct QueryParams {
            limit: usize,
            #[serde(skip_serializing_if = "Option::is_none")]
            offset: Option<usize>,
        }

        self.send::<(), _, Vec<Collection>>(
            "list_collections",
            Method::GET,
            format!(
                "/api/v2/tenants/{}/databases/{}/collections",
                tenant_id, database_name
            ),
            None,
            Some(QueryParams { limit, offset }),
        )
        .await
    }

    /// Lists every collection by walking pages until a short page is returned.
    pub async fn list_all_collections(&self) -> Result<Vec<Collection>, ChromaHttpClientError> {
        let mut collections = Vec::new();
        loop {
            let page = self
                .list_collections(LIST_COLLECTIONS_PAGE_SIZE, Some(collections.len()))
                .await?;
            let exhausted = page.len() < LIST_COLLECTIONS_PAGE_SIZE;
            collections.extend(page);
            if exhausted {
                return Ok(collections);
            }
        }
    }

    /// Wraps a collection description in a handle bound to this client.
    pub fn collection(&self, collection: Collection) -> ChromaCollection {
        ChromaCollection {
            client: self.clone(),
            collection: Arc::new(collection),
        }
    }

    async fn common_create_collection(
        &self,
        name: impl AsRef<str>,
        metadata: Option<Metadata>,
        get_or_create: bool,
    ) -> Result<ChromaCollection, ChromaHttpClientError> {
        let tenant_id = self.get_tenant_id().await?;
        let database_name = self.get_database_name().await?;

        let collection: Collection = self
            .send(
                "create_collection",
                Method::POST,
                format!(
                    "/api/v2/tenants/{}/databases/{}/collections",
                    tenant_id, database_name
                ),
                Some(serde_json::json!({
                    "name": name.as_ref(),
                    "metadata": metadata,
                    "get_or_create": get_or_create,
                })),
                None::<()>,
            )
            .await?;

        Ok(self.collection(collection))
    }

    pub(crate) async fn send<
        Body: Serialize,
        QueryParams: Serialize,
        Response: DeserializeOwned,
    >(
        &self,
        operation_name: &str,
        method: Method,
        path: impl AsRef<str>,
        body: Option<Body>,
        query_params: Option<QueryParams>,
    ) -> Result<Response, ChromaHttpClientError> {
        let url = self.base_url.join(path.as_ref()).expect(
            "The base URL is valid and we control all path construction, so this should never fail",
        );

        let attempt = || async {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(body) = &body {
                request = request.json(body);
            }
            if let Some(query_params) = &query_params {
                request = request.query(query_params);
            }

            tracing::trace!(
                url = %url,
                method =? method,
                operation = operation_name,
                "Sending request"
            );

            let response = request.send().await.map_err(|err| (err, None))?;

            if let Err(err) = response.error_for_status_ref() {
                return Err((err, Some(response)));
            }

            Ok::<reqwest::Response, (reqwest::Error, Option<reqwest::Response>)>(response)
        };

        let response = attempt
            .retry(&self.retry_policy)
            .notify(|(err, _), delay| {
                tracing::warn!(
                    url = %url,
                    method =? method,
                    status =? err.status(),
                    ?delay,
                    "Retrying {operation_name}",
                );
            })
            .when(|(err, _)| is_retryable(&method, err))
            .await;

        let response = match response {
            Ok(response) => response,
            Err((err, Some(response))) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                tracing::trace!(
                    url = %url,
                    method =? method,
                    %status,
                    body = %text,
                    "Received error response"
                );
                return Err(decode_error(status, &text)
                    .unwrap_or(ChromaHttpClientError::RequestError(err)));
            }
            Err((err, None)) => return Err(ChromaHttpClientError::RequestError(err)),
        };

        let json = response.json::<serde_json::Value>().await?;
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(
                url = %url,
                method =? method,
                "Received response: {}",
                serde_json::to_string_pretty(&json)
                    .unwrap_or_else(|_| "<failed to serialize>".to_string())
            );
        }

        Ok(serde_json::from_value::<Response>(json)?)
    }
}

/// 429 is always retried. Server errors and transport failures only for GET.
fn is_retryable(method: &Method, err: &reqwest::Error) -> bool {
    match err.status() {
        Some(StatusCode::TOO_MANY_REQUESTS) => true,
        Some(status) => *method == Method::GET && status.is_server_error(),
        None => *method == Method::GET,
    }
}

/// Turns an error body into an [`ChromaHttpClientError::ApiError`]. Returns `None` for a
/// JSON body that is not an [`ErrorResponse`].
fn decode_error(status: StatusCode, text: &str) -> Option<ChromaHttpClientError> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => serde_json::from_value::<ErrorResponse>(json)
            .ok()
            .map(|body| {
                ChromaHttpClientError::ApiError(format!("{}: {}", body.error, body.message), status)
            }),
        Err(_) => Some(ChromaHttpClientError::ApiError(
            format!("Non-JSON error response: {}", text),
            status,
        )),
    }
}
