use crate::clone::CloneError;
use chromactl_types::{parse_metadata_token, Metadata, HNSW_KEYS};

/// Builds the free-form metadata of the destination: the source metadata without the
/// `hnsw:` keys, overlaid with the `key=value` tokens in order.
pub fn merge_metadata(
    source: Option<&Metadata>,
    tokens: &[String],
) -> Result<Metadata, CloneError> {
    let mut merged = source.cloned().unwrap_or_default();
    merged.retain(|key, _| !HNSW_KEYS.contains(&key.as_str()));

    for token in tokens {
        let (key, value) = parse_metadata_token(token)?;
        merged.insert(key, value);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromactl_types::{MetadataValue, HNSW_M, HNSW_SPACE};

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn test_strips_index_keys_and_keeps_the_rest() {
        let source = Metadata::from([
            (HNSW_SPACE.to_string(), MetadataValue::Str("cosine".to_string())),
            (HNSW_M.to_string(), MetadataValue::Int(32)),
            ("owner".to_string(), MetadataValue::Str("search".to_string())),
        ]);
        let merged = merge_metadata(Some(&source), &[]).unwrap();
        assert_eq!(
            merged,
            Metadata::from([("owner".to_string(), MetadataValue::Str("search".to_string()))])
        );
    }

    #[test]
    fn test_tokens_are_typed_and_win() {
        let source = Metadata::from([
            ("a".to_string(), MetadataValue::Str("inherited".to_string())),
            ("keep".to_string(), MetadataValue::Bool(false)),
        ]);
        let merged = merge_metadata(
            Some(&source),
            &tokens(&["a=true", "b=10", "c=10.5", "d=hello", "e=10.0", "f=1e10"]),
        )
        .unwrap();

        assert_eq!(merged["a"], MetadataValue::Bool(true));
        assert_eq!(merged["b"], MetadataValue::Int(10));
        assert_eq!(merged["c"], MetadataValue::Float(10.5));
        assert_eq!(merged["d"], MetadataValue::Str("hello".to_string()));
        assert_eq!(merged["e"], MetadataValue::Float(10.0));
        assert_eq!(merged["f"], MetadataValue::Str("1e10".to_string()));
        assert_eq!(merged["keep"], MetadataValue::Bool(false));
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["novalue", "a=b=c", "=value"] {
            let err = merge_metadata(None, &tokens(&[token])).unwrap_err();
            assert!(
                matches!(err, CloneError::InvalidMetadataFormat(_)),
                "{token} should be rejected"
            );
            assert!(err.to_string().contains(token));
        }
    }

    #[test]
    fn test_later_tokens_override_earlier_ones() {
        let merged = merge_metadata(None, &tokens(&["a=1", "a=2"])).unwrap();
        assert_eq!(merged["a"], MetadataValue::Int(2));
    }
}
