use crate::Metadata;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Include {
    #[serde(rename = "documents")]
    Document,
    #[serde(rename = "embeddings")]
    Embedding,
    #[serde(rename = "metadatas")]
    Metadata,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IncludeList(pub Vec<Include>);

impl IncludeList {
    pub fn default_get() -> Self {
        Self(vec![Include::Document, Include::Metadata])
    }

    /// Everything needed to re-insert a record elsewhere.
    pub fn all_records() -> Self {
        Self(vec![Include::Metadata, Include::Document, Include::Embedding])
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GetRequestPayload {
    pub limit: Option<u32>,
    pub offset: u32,
    pub include: IncludeList,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct GetResponse {
    pub ids: Vec<String>,
    #[serde(default)]
    pub embeddings: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    pub documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AddCollectionRecordsPayload {
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Vec<f32>>>,
    pub documents: Option<Vec<Option<String>>>,
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(Error, Debug, PartialEq)]
pub enum RecordBatchError {
    #[error("Record batch has {ids} ids but {len} {field}")]
    LengthMismatch {
        field: &'static str,
        ids: usize,
        len: usize,
    },
}

/// One page of records. The four sequences are positional: `ids[i]` belongs with
/// `documents[i]`, `metadatas[i]` and `embeddings[i]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordBatch {
    pub ids: Vec<String>,
    pub documents: Vec<Option<String>>,
    pub metadatas: Vec<Option<Metadata>>,
    pub embeddings: Option<Vec<Vec<f32>>>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn validate(&self) -> Result<(), RecordBatchError> {
        let ids = self.ids.len();
        let check = |field: &'static str, len: usize| {
            if len != ids {
                Err(RecordBatchError::LengthMismatch { field, ids, len })
            } else {
                Ok(())
            }
        };
        check("documents", self.documents.len())?;
        check("metadatas", self.metadatas.len())?;
        if let Some(embeddings) = &self.embeddings {
            check("embeddings", embeddings.len())?;
        }
        Ok(())
    }
}

impl TryFrom<GetResponse> for RecordBatch {
    type Error = RecordBatchError;

    fn try_from(response: GetResponse) -> Result<Self, Self::Error> {
        let len = response.ids.len();
        let batch = RecordBatch {
            ids: response.ids,
            documents: response.documents.unwrap_or_else(|| vec![None; len]),
            metadatas: response.metadatas.unwrap_or_else(|| vec![None; len]),
            embeddings: response.embeddings,
        };
        batch.validate()?;
        Ok(batch)
    }
}

impl From<RecordBatch> for AddCollectionRecordsPayload {
    fn from(batch: RecordBatch) -> Self {
        AddCollectionRecordsPayload {
            ids: batch.ids,
            embeddings: batch.embeddings,
            documents: Some(batch.documents),
            metadatas: Some(batch.metadatas),
        }
    }
}
