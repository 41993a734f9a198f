use crate::{Metadata, MetadataValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CollectionUuid = Uuid;

/// A collection as returned by the remote service.
///
/// Index configuration travels inside `metadata` under the `hnsw:` keys; see
/// [`crate::HNSW_KEYS`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Collection {
    #[serde(rename = "id")]
    pub collection_id: CollectionUuid,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub database: String,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            collection_id: Uuid::new_v4(),
            name: "".to_string(),
            metadata: None,
            tenant: "".to_string(),
            database: "".to_string(),
        }
    }
}

impl Collection {
    pub fn metadata_value(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.as_ref().and_then(|metadata| metadata.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_deserialize_ignores_unknown_fields() {
        let json = r#"{
            "id": "6a3b1c5e-3a3e-4c1a-9a53-0f3c8f6f1d22",
            "name": "docs",
            "metadata": {"hnsw:space": "cosine", "owner": "me"},
            "configuration_json": {},
            "dimension": 384,
            "tenant": "default_tenant",
            "database": "default_database",
            "log_position": 0,
            "version": 0
        }"#;
        let collection: Collection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.name, "docs");
        assert_eq!(
            collection.metadata_value("hnsw:space"),
            Some(&MetadataValue::Str("cosine".to_string()))
        );
        assert_eq!(collection.metadata_value("missing"), None);
    }

    #[test]
    fn test_collection_metadata_keeps_wide_numbers() {
        let json = r#"{
            "id": "6a3b1c5e-3a3e-4c1a-9a53-0f3c8f6f1d22",
            "name": "docs",
            "metadata": {"created_at": 1700000000123, "quality": 0.123456789}
        }"#;
        let collection: Collection = serde_json::from_str(json).unwrap();
        assert_eq!(
            collection.metadata_value("created_at"),
            Some(&MetadataValue::Int(1_700_000_000_123))
        );
        assert_eq!(
            collection.metadata_value("quality"),
            Some(&MetadataValue::Float(0.123456789))
        );
    }

    #[test]
    fn test_collection_null_metadata() {
        let json = r#"{"id": "6a3b1c5e-3a3e-4c1a-9a53-0f3c8f6f1d22", "name": "docs", "metadata": null}"#;
        let collection: Collection = serde_json::from_str(json).unwrap();
        assert!(collection.metadata.is_none());
        assert_eq!(collection.metadata_value("hnsw:M"), None);
    }
}
