use crate::config::{AuthType, Target};
use crate::utils::CliError;
use async_trait::async_trait;
use chromactl_client::client::{ChromaAuthMethod, ChromaHttpClientOptionsError, ChromaRetryOptions};
use chromactl_client::{ChromaHttpClient, ChromaHttpClientError, ChromaHttpClientOptions};
use chromactl_types::{Collection, Database, IncludeList, Metadata, RecordBatch};

/// Collection-level operations the commands and the clone workflow depend on.
#[async_trait]
pub trait CollectionService: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<Collection>, ChromaHttpClientError>;

    async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Metadata>,
        get_or_create: bool,
    ) -> Result<Collection, ChromaHttpClientError>;

    async fn delete_collection(&self, name: &str) -> Result<(), ChromaHttpClientError>;

    async fn count(&self, collection: &Collection) -> Result<u32, ChromaHttpClientError>;

    async fn get_records(
        &self,
        collection: &Collection,
        offset: u32,
        limit: u32,
        include: IncludeList,
    ) -> Result<RecordBatch, ChromaHttpClientError>;

    async fn insert_records(
        &self,
        collection: &Collection,
        records: RecordBatch,
    ) -> Result<(), ChromaHttpClientError>;
}

/// Server, tenant and database administration.
#[async_trait]
pub trait AdminService: Send + Sync {
    async fn version(&self) -> Result<String, ChromaHttpClientError>;
    async fn create_tenant(&self, name: &str) -> Result<(), ChromaHttpClientError>;
    async fn create_database(&self, name: &str) -> Result<(), ChromaHttpClientError>;
    async fn list_databases(&self) -> Result<Vec<Database>, ChromaHttpClientError>;
    async fn delete_database(&self, name: &str) -> Result<(), ChromaHttpClientError>;
}

#[async_trait]
impl CollectionService for ChromaHttpClient {
    async fn list_collections(&self) -> Result<Vec<Collection>, ChromaHttpClientError> {
        self.list_all_collections().await
    }

    async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Metadata>,
        get_or_create: bool,
    ) -> Result<Collection, ChromaHttpClientError> {
        let collection = if get_or_create {
            self.get_or_create_collection(name, metadata).await?
        } else {
            ChromaHttpClient::create_collection(self, name, metadata).await?
        };
        Ok(collection.description().clone())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), ChromaHttpClientError> {
        ChromaHttpClient::delete_collection(self, name).await
    }

    async fn count(&self, collection: &Collection) -> Result<u32, ChromaHttpClientError> {
        self.collection(collection.clone()).count().await
    }

    async fn get_records(
        &self,
        collection: &Collection,
        offset: u32,
        limit: u32,
        include: IncludeList,
    ) -> Result<RecordBatch, ChromaHttpClientError> {
        self.collection(collection.clone())
            .get_batch(offset, limit, include)
            .await
    }

    async fn insert_records(
        &self,
        collection: &Collection,
        records: RecordBatch,
    ) -> Result<(), ChromaHttpClientError> {
        self.collection(collection.clone()).add(records).await
    }
}

#[async_trait]
impl AdminService for ChromaHttpClient {
    async fn version(&self) -> Result<String, ChromaHttpClientError> {
        ChromaHttpClient::version(self).await
    }

    async fn create_tenant(&self, name: &str) -> Result<(), ChromaHttpClientError> {
        ChromaHttpClient::create_tenant(self, name).await
    }

    async fn create_database(&self, name: &str) -> Result<(), ChromaHttpClientError> {
        ChromaHttpClient::create_database(self, name).await
    }

    async fn list_databases(&self) -> Result<Vec<Database>, ChromaHttpClientError> {
        ChromaHttpClient::list_databases(self).await
    }

    async fn delete_database(&self, name: &str) -> Result<(), ChromaHttpClientError> {
        ChromaHttpClient::delete_database(self, name).await
    }
}

fn auth_method(target: &Target) -> Result<ChromaAuthMethod, ChromaHttpClientOptionsError> {
    let Some(auth) = &target.profile.auth else {
        return Ok(ChromaAuthMethod::None);
    };
    let method = match auth.auth_type {
        AuthType::None => ChromaAuthMethod::None,
        AuthType::Basic => ChromaAuthMethod::basic(&auth.credential)?,
        AuthType::Token => ChromaAuthMethod::bearer_token(&auth.credential)?,
        AuthType::XToken => ChromaAuthMethod::x_chroma_token(&auth.credential)?,
    };
    Ok(method)
}

/// Builds a client for the target. Remote errors are never retried.
pub fn connect(target: &Target) -> Result<ChromaHttpClient, CliError> {
    let endpoint = ChromaHttpClientOptions::parse_endpoint(&target.profile.endpoint())?;
    let options = ChromaHttpClientOptions {
        endpoint,
        auth_method: auth_method(target)?,
        retry_options: ChromaRetryOptions::disabled(),
        tenant_id: Some(target.tenant.clone()),
        database_name: Some(target.database.clone()),
    };
    tracing::debug!(
        alias = %target.alias,
        endpoint = %options.endpoint,
        tenant = %target.tenant,
        database = %target.database,
        "Connecting"
    );
    Ok(ChromaHttpClient::new(options))
}
