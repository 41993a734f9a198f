//! Collection cloning: precondition checks, configuration resolution and a batched
//! record copy from one collection into a newly created one.

mod copy;
mod guard;
mod merger;
mod resolver;

pub use copy::copy_records;
pub use guard::{check_preconditions, find_collection, CheckedSource};
pub use merger::merge_metadata;
pub use resolver::{resolve, resolve_index_parameters, resolve_space};

use crate::client::CollectionService;
use chromactl_client::embed::{DenseEmbeddingFunction, EmbeddingFunctionError};
use chromactl_client::ChromaHttpClientError;
use chromactl_types::{
    CollectionConfiguration, IndexParameterOverrides, InvalidDistanceFunction, MetadataTokenError,
};
use indicatif::ProgressBar;
use thiserror::Error;

pub const DEFAULT_CLONE_BATCH_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("Source collection '{0}' not found")]
    SourceNotFound(String),
    #[error("Source collection '{0}' is empty, nothing to clone")]
    EmptySource(String),
    #[error("Destination collection '{0}' already exists")]
    DestinationAlreadyExists(String),
    #[error("{0}")]
    InvalidDistanceFunction(#[from] InvalidDistanceFunction),
    #[error("{0}")]
    InvalidMetadataFormat(#[from] MetadataTokenError),
    #[error("Invalid value '{value}' for {key}")]
    InvalidNumericFlag { key: String, value: String },
    #[error("Embedding function error: {0}")]
    EmbeddingFunction(#[from] EmbeddingFunctionError),
    #[error("Record '{0}' has no document to embed")]
    MissingDocument(String),
    #[error("{0}")]
    Client(#[from] ChromaHttpClientError),
    #[error("Clone failed after copying {copied} records into '{destination}' (the destination was not removed): {source}")]
    PartialCopy {
        destination: String,
        copied: u32,
        source: Box<CloneError>,
    },
}

/// One clone invocation, built fresh from parsed arguments.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub source: String,
    pub destination: String,
    pub batch_size: u32,
    pub space: Option<String>,
    pub overrides: IndexParameterOverrides,
    pub metadata: Vec<String>,
    pub embedding_function: Option<String>,
}

impl CloneRequest {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        CloneRequest {
            source: source.into(),
            destination: destination.into(),
            batch_size: DEFAULT_CLONE_BATCH_SIZE,
            space: None,
            overrides: IndexParameterOverrides::default(),
            metadata: Vec::new(),
            embedding_function: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloneSummary {
    pub source: String,
    pub destination: String,
    pub copied: u32,
}

/// Clones `request.source` into a new collection named `request.destination`.
///
/// Every validation happens before the destination is created. Once it exists, a
/// failure leaves it in place with whatever was copied so far.
pub async fn clone_collection<S, F>(
    service: &S,
    request: &CloneRequest,
    embedding_function: F,
    progress: &ProgressBar,
) -> Result<CloneSummary, CloneError>
where
    S: CollectionService + ?Sized,
    F: FnOnce(&str) -> Result<Box<dyn DenseEmbeddingFunction>, EmbeddingFunctionError>,
{
    if request.batch_size == 0 {
        return Err(CloneError::InvalidNumericFlag {
            key: "clone-batch-size".to_string(),
            value: request.batch_size.to_string(),
        });
    }

    let CheckedSource { collection: source, count } =
        check_preconditions(service, &request.source, &request.destination).await?;

    let source_metadata = source.metadata.as_ref();
    let configuration = CollectionConfiguration {
        space: resolve_space(request.space.as_deref(), source_metadata)?,
        index_parameters: resolve_index_parameters(&request.overrides, source_metadata)?,
        metadata: merge_metadata(source_metadata, &request.metadata)?,
    };

    let embedder = request
        .embedding_function
        .as_deref()
        .map(embedding_function)
        .transpose()?;

    tracing::info!(
        source = %request.source,
        destination = %request.destination,
        records = count,
        space = %configuration.space,
        embedding_function = embedder.as_ref().map(|embedder| embedder.name()),
        "Cloning collection"
    );

    let destination = service
        .create_collection(
            &request.destination,
            Some(configuration.into_metadata()),
            false,
        )
        .await?;

    let copied = copy_records(
        service,
        &source,
        &destination,
        count,
        request.batch_size,
        embedder.as_deref(),
        progress,
    )
    .await?;

    Ok(CloneSummary {
        source: request.source.clone(),
        destination: request.destination.clone(),
        copied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{sample_records, Call, MockCollectionService};
    use chromactl_client::embed::embedding_function_from_lookup;
    use chromactl_client::embed::hash::ConsistentHashEmbeddingFunction;
    use chromactl_types::{
        DistanceFunction, Metadata, MetadataValue, HNSW_CONSTRUCTION_EF, HNSW_M,
        HNSW_NUM_THREADS, HNSW_RESIZE_FACTOR, HNSW_SPACE,
    };

    fn no_embedding_function(
        name: &str,
    ) -> Result<Box<dyn DenseEmbeddingFunction>, EmbeddingFunctionError> {
        embedding_function_from_lookup(name, |_| None)
    }

    fn source_metadata() -> Metadata {
        Metadata::from([
            ("topic".to_string(), MetadataValue::Str("science".to_string())),
            ("version".to_string(), MetadataValue::Int(2)),
            ("indexed_at".to_string(), MetadataValue::Int(1_700_000_000_123)),
            ("quality".to_string(), MetadataValue::Float(0.123456789)),
            (HNSW_SPACE.to_string(), MetadataValue::Str("cosine".to_string())),
            (HNSW_M.to_string(), MetadataValue::Int(32)),
            (HNSW_CONSTRUCTION_EF.to_string(), MetadataValue::Int(200)),
            (HNSW_RESIZE_FACTOR.to_string(), MetadataValue::Float(1.5)),
        ])
    }

    async fn clone_with(
        service: &MockCollectionService,
        request: &CloneRequest,
    ) -> Result<CloneSummary, CloneError> {
        clone_collection(service, request, no_embedding_function, &ProgressBar::hidden()).await
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_clone_preserves_records_and_configuration() {
        let records = sample_records(25);
        let service = MockCollectionService::default().with_collection(
            "docs",
            Some(source_metadata()),
            records.clone(),
        );
        let mut request = CloneRequest::new("docs", "docs-copy");
        request.batch_size = 10;

        let summary = clone_with(&service, &request).await.unwrap();

        assert_eq!(
            summary,
            CloneSummary {
                source: "docs".to_string(),
                destination: "docs-copy".to_string(),
                copied: 25,
            }
        );
        assert_eq!(service.records("docs-copy"), records);

        let metadata = service.collection("docs-copy").unwrap().metadata.unwrap();
        let mut expected = source_metadata();
        expected.insert("hnsw:search_ef".to_string(), MetadataValue::Int(10));
        expected.insert("hnsw:batch_size".to_string(), MetadataValue::Int(100));
        expected.insert("hnsw:sync_threshold".to_string(), MetadataValue::Int(1000));
        assert_eq!(metadata, expected);
        assert!(!metadata.contains_key(HNSW_NUM_THREADS));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_clone_keeps_wide_metadata_values_exact() {
        let service = MockCollectionService::default().with_collection(
            "docs",
            Some(source_metadata()),
            sample_records(8),
        );
        let mut request = CloneRequest::new("docs", "docs-copy");
        request.batch_size = 3;

        clone_with(&service, &request).await.unwrap();

        let copied = service.records("docs-copy");
        let first = copied.metadatas[0].as_ref().unwrap();
        assert_eq!(first["created_at"], MetadataValue::Int(1_700_000_000_123));
        assert_eq!(first["offset"], MetadataValue::Int(-3_000_000_000));
        assert_eq!(first["score"], MetadataValue::Float(0.123456789));
        assert_eq!(first["archived"], MetadataValue::Bool(true));
        assert_eq!(copied.metadatas[3], None);
        assert_eq!(
            copied.metadatas[5].as_ref().unwrap()["created_at"],
            MetadataValue::Int(1_700_000_000_128)
        );
        assert_eq!(copied, sample_records(8));

        let metadata = service.collection("docs-copy").unwrap().metadata.unwrap();
        assert_eq!(metadata["indexed_at"], MetadataValue::Int(1_700_000_000_123));
        assert_eq!(metadata["quality"], MetadataValue::Float(0.123456789));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_overrides_win_over_source() {
        let service = MockCollectionService::default().with_collection(
            "docs",
            Some(source_metadata()),
            sample_records(3),
        );
        let mut request = CloneRequest::new("docs", "docs-copy");
        request.space = Some("ip".to_string());
        request.overrides.m = Some(8);
        request.overrides.num_threads = Some(4);
        request.metadata = vec!["topic=math".to_string(), "reviewed=true".to_string()];

        clone_with(&service, &request).await.unwrap();

        let metadata = service.collection("docs-copy").unwrap().metadata.unwrap();
        assert_eq!(
            metadata.get(HNSW_SPACE),
            Some(&MetadataValue::Str(DistanceFunction::Ip.to_string()))
        );
        assert_eq!(metadata.get(HNSW_M), Some(&MetadataValue::Int(8)));
        assert_eq!(metadata.get(HNSW_CONSTRUCTION_EF), Some(&MetadataValue::Int(200)));
        assert_eq!(metadata.get(HNSW_NUM_THREADS), Some(&MetadataValue::Int(4)));
        assert_eq!(
            metadata.get("topic"),
            Some(&MetadataValue::Str("math".to_string()))
        );
        assert_eq!(metadata.get("reviewed"), Some(&MetadataValue::Bool(true)));
        assert_eq!(metadata.get("version"), Some(&MetadataValue::Int(2)));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_empty_source_creates_nothing() {
        let service =
            MockCollectionService::default().with_collection("docs", None, sample_records(0));
        let err = clone_with(&service, &CloneRequest::new("docs", "copy"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::EmptySource(_)));
        assert!(service.writes().is_empty());
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_existing_destination_writes_nothing() {
        let service = MockCollectionService::default()
            .with_collection("docs", None, sample_records(5))
            .with_collection("copy", None, sample_records(2));
        let err = clone_with(&service, &CloneRequest::new("docs", "copy"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::DestinationAlreadyExists(_)));
        assert!(service.writes().is_empty());
        assert_eq!(service.records("copy"), sample_records(2));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_validation_fails_before_create() {
        let service =
            MockCollectionService::default().with_collection("docs", None, sample_records(5));

        let mut bad_space = CloneRequest::new("docs", "copy");
        bad_space.space = Some("euclid".to_string());
        let err = clone_with(&service, &bad_space).await.unwrap_err();
        assert!(matches!(err, CloneError::InvalidDistanceFunction(_)));

        let mut bad_token = CloneRequest::new("docs", "copy");
        bad_token.metadata = vec!["novalue".to_string()];
        let err = clone_with(&service, &bad_token).await.unwrap_err();
        assert!(matches!(err, CloneError::InvalidMetadataFormat(_)));
        assert!(err.to_string().contains("novalue"));

        let mut unknown_ef = CloneRequest::new("docs", "copy");
        unknown_ef.embedding_function = Some("word2vec".to_string());
        let err = clone_with(&service, &unknown_ef).await.unwrap_err();
        assert!(matches!(
            err,
            CloneError::EmbeddingFunction(EmbeddingFunctionError::UnknownEmbeddingFunction(_))
        ));

        let mut missing_key = CloneRequest::new("docs", "copy");
        missing_key.embedding_function = Some("openai".to_string());
        let err = clone_with(&service, &missing_key).await.unwrap_err();
        assert!(matches!(
            err,
            CloneError::EmbeddingFunction(EmbeddingFunctionError::MissingApiKey(_))
        ));

        let mut zero_batch = CloneRequest::new("docs", "copy");
        zero_batch.batch_size = 0;
        let err = clone_with(&service, &zero_batch).await.unwrap_err();
        assert!(matches!(err, CloneError::InvalidNumericFlag { .. }));

        assert!(service.writes().is_empty());
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_create_failure_copies_nothing() {
        let service = MockCollectionService::default()
            .with_collection("docs", None, sample_records(5))
            .failing_create();
        let err = clone_with(&service, &CloneRequest::new("docs", "copy"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::Client(_)));
        assert!(!service
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Get { .. } | Call::Insert { .. })));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_partial_copy_leaves_destination() {
        let service = MockCollectionService::default()
            .with_collection("docs", None, sample_records(35))
            .failing_insert_at(3);
        let mut request = CloneRequest::new("docs", "copy");
        request.batch_size = 10;

        let err = clone_with(&service, &request).await.unwrap_err();

        assert!(matches!(err, CloneError::PartialCopy { copied: 30, .. }));
        assert!(err.to_string().contains("was not removed"));
        assert!(service.collection("copy").is_some());
        assert_eq!(service.records("copy").len(), 30);
        assert!(!service
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Delete(_))));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_clone_with_embedding_function() {
        let service =
            MockCollectionService::default().with_collection("docs", None, sample_records(4));
        let mut request = CloneRequest::new("docs", "copy");
        request.embedding_function = Some("hash".to_string());

        let summary = clone_collection(
            &service,
            &request,
            |name: &str| -> Result<Box<dyn DenseEmbeddingFunction>, EmbeddingFunctionError> {
                assert_eq!(name, "hash");
                Ok(Box::new(ConsistentHashEmbeddingFunction::with_dimension(3)))
            },
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        assert_eq!(summary.copied, 4);
        let embeddings = service.records("copy").embeddings.unwrap();
        assert_eq!(embeddings.len(), 4);
        assert!(embeddings.iter().all(|embedding| embedding.len() == 3));
        assert_ne!(Some(embeddings), sample_records(4).embeddings);
    }
}
