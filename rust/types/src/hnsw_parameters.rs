use crate::{Metadata, MetadataValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const HNSW_SPACE: &str = "hnsw:space";
pub const HNSW_M: &str = "hnsw:M";
pub const HNSW_CONSTRUCTION_EF: &str = "hnsw:construction_ef";
pub const HNSW_SEARCH_EF: &str = "hnsw:search_ef";
pub const HNSW_BATCH_SIZE: &str = "hnsw:batch_size";
pub const HNSW_SYNC_THRESHOLD: &str = "hnsw:sync_threshold";
pub const HNSW_NUM_THREADS: &str = "hnsw:num_threads";
pub const HNSW_RESIZE_FACTOR: &str = "hnsw:resize_factor";

/// Every metadata key that configures the index rather than describing the collection.
pub const HNSW_KEYS: [&str; 8] = [
    HNSW_SPACE,
    HNSW_M,
    HNSW_CONSTRUCTION_EF,
    HNSW_SEARCH_EF,
    HNSW_BATCH_SIZE,
    HNSW_SYNC_THRESHOLD,
    HNSW_NUM_THREADS,
    HNSW_RESIZE_FACTOR,
];

pub const DEFAULT_M: i32 = 16;
pub const DEFAULT_CONSTRUCTION_EF: i32 = 100;
pub const DEFAULT_SEARCH_EF: i32 = 10;
pub const DEFAULT_BATCH_SIZE: i32 = 100;
pub const DEFAULT_SYNC_THRESHOLD: i32 = 1000;
/// Non-positive thread counts leave the choice to the server.
pub const DEFAULT_NUM_THREADS: i32 = -1;
pub const DEFAULT_RESIZE_FACTOR: f32 = 1.2;

#[derive(Error, Debug, PartialEq)]
#[error("Invalid distance function {0}, expected one of l2, cosine, ip")]
pub struct InvalidDistanceFunction(pub String);

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceFunction {
    #[default]
    #[serde(rename = "l2")]
    L2,
    #[serde(rename = "cosine")]
    Cosine,
    #[serde(rename = "ip")]
    Ip,
}

impl DistanceFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceFunction::L2 => "l2",
            DistanceFunction::Cosine => "cosine",
            DistanceFunction::Ip => "ip",
        }
    }
}

impl FromStr for DistanceFunction {
    type Err = InvalidDistanceFunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l2" => Ok(DistanceFunction::L2),
            "cosine" => Ok(DistanceFunction::Cosine),
            "ip" => Ok(DistanceFunction::Ip),
            other => Err(InvalidDistanceFunction(other.to_string())),
        }
    }
}

impl fmt::Display for DistanceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index parameters explicitly supplied by the user. `None` means the flag was not given.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexParameterOverrides {
    pub m: Option<i32>,
    pub construction_ef: Option<i32>,
    pub search_ef: Option<i32>,
    pub batch_size: Option<i32>,
    pub sync_threshold: Option<i32>,
    pub num_threads: Option<i32>,
    pub resize_factor: Option<f32>,
}

impl IndexParameterOverrides {
    /// Metadata entries for the parameters that were supplied, in `hnsw:` form.
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        let ints = [
            (HNSW_M, self.m),
            (HNSW_CONSTRUCTION_EF, self.construction_ef),
            (HNSW_SEARCH_EF, self.search_ef),
            (HNSW_BATCH_SIZE, self.batch_size),
            (HNSW_SYNC_THRESHOLD, self.sync_threshold),
            (HNSW_NUM_THREADS, self.num_threads.filter(|threads| *threads > 0)),
        ];
        for (key, value) in ints {
            if let Some(value) = value {
                metadata.insert(key.to_string(), MetadataValue::Int(value.into()));
            }
        }
        if let Some(resize_factor) = self.resize_factor {
            metadata.insert(
                HNSW_RESIZE_FACTOR.to_string(),
                MetadataValue::from_f32(resize_factor),
            );
        }
        metadata
    }
}

/// Fully resolved index parameters for a collection about to be created.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexParameters {
    pub m: i32,
    pub construction_ef: i32,
    pub search_ef: i32,
    pub batch_size: i32,
    pub sync_threshold: i32,
    /// Omitted from the request when `None`.
    pub num_threads: Option<i32>,
    pub resize_factor: f32,
}

impl Default for IndexParameters {
    fn default() -> Self {
        IndexParameters {
            m: DEFAULT_M,
            construction_ef: DEFAULT_CONSTRUCTION_EF,
            search_ef: DEFAULT_SEARCH_EF,
            batch_size: DEFAULT_BATCH_SIZE,
            sync_threshold: DEFAULT_SYNC_THRESHOLD,
            num_threads: None,
            resize_factor: DEFAULT_RESIZE_FACTOR,
        }
    }
}

impl IndexParameters {
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(HNSW_M.to_string(), MetadataValue::Int(self.m.into()));
        metadata.insert(
            HNSW_CONSTRUCTION_EF.to_string(),
            MetadataValue::Int(self.construction_ef.into()),
        );
        metadata.insert(
            HNSW_SEARCH_EF.to_string(),
            MetadataValue::Int(self.search_ef.into()),
        );
        metadata.insert(
            HNSW_BATCH_SIZE.to_string(),
            MetadataValue::Int(self.batch_size.into()),
        );
        metadata.insert(
            HNSW_SYNC_THRESHOLD.to_string(),
            MetadataValue::Int(self.sync_threshold.into()),
        );
        if let Some(num_threads) = self.num_threads {
            metadata.insert(
                HNSW_NUM_THREADS.to_string(),
                MetadataValue::Int(num_threads.into()),
            );
        }
        metadata.insert(
            HNSW_RESIZE_FACTOR.to_string(),
            MetadataValue::from_f32(self.resize_factor),
        );
        metadata
    }
}

/// Everything needed to create a collection: distance function, index parameters and
/// free-form metadata. On the wire all three travel in the collection metadata map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionConfiguration {
    pub space: DistanceFunction,
    pub index_parameters: IndexParameters,
    pub metadata: Metadata,
}

impl CollectionConfiguration {
    /// Builds the create-collection metadata. Index parameters win over same-named
    /// entries in the free-form map.
    pub fn into_metadata(self) -> Metadata {
        let mut metadata = self.metadata;
        metadata.insert(
            HNSW_SPACE.to_string(),
            MetadataValue::Str(self.space.to_string()),
        );
        metadata.extend(self.index_parameters.to_metadata());
        metadata
    }
}
