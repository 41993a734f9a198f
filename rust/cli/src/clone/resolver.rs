use crate::clone::CloneError;
use chromactl_types::{
    DistanceFunction, IndexParameterOverrides, IndexParameters, InvalidDistanceFunction, Metadata,
    MetadataValue, MetadataValueConversionError, DEFAULT_BATCH_SIZE, DEFAULT_CONSTRUCTION_EF,
    DEFAULT_M, DEFAULT_NUM_THREADS, DEFAULT_RESIZE_FACTOR, DEFAULT_SEARCH_EF,
    DEFAULT_SYNC_THRESHOLD, HNSW_BATCH_SIZE, HNSW_CONSTRUCTION_EF, HNSW_M, HNSW_NUM_THREADS,
    HNSW_RESIZE_FACTOR, HNSW_SEARCH_EF, HNSW_SPACE, HNSW_SYNC_THRESHOLD,
};

/// Picks the explicit value, then the source value, then the default.
pub fn resolve<T>(cli: Option<T>, source: Option<T>, default: T) -> T {
    cli.or(source).unwrap_or(default)
}

fn source_value<T>(source: Option<&Metadata>, key: &str) -> Result<Option<T>, CloneError>
where
    T: for<'a> TryFrom<&'a MetadataValue, Error = MetadataValueConversionError>,
{
    let Some(value) = source.and_then(|metadata| metadata.get(key)) else {
        return Ok(None);
    };
    T::try_from(value)
        .map(Some)
        .map_err(|_| CloneError::InvalidNumericFlag {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn resolve_parameter<T>(
    cli: Option<T>,
    source: Option<&Metadata>,
    key: &str,
    default: T,
) -> Result<T, CloneError>
where
    T: for<'a> TryFrom<&'a MetadataValue, Error = MetadataValueConversionError>,
{
    // Source metadata is only consulted, and only has to be well formed, when no flag was given.
    let inherited = match cli {
        Some(_) => None,
        None => source_value(source, key)?,
    };
    Ok(resolve(cli, inherited, default))
}

/// Resolves the distance function. Both the flag and the inherited value must name a
/// known function.
pub fn resolve_space(
    cli: Option<&str>,
    source: Option<&Metadata>,
) -> Result<DistanceFunction, CloneError> {
    if let Some(space) = cli {
        return Ok(space.parse::<DistanceFunction>()?);
    }
    match source.and_then(|metadata| metadata.get(HNSW_SPACE)) {
        Some(MetadataValue::Str(space)) => Ok(space.parse::<DistanceFunction>()?),
        Some(other) => Err(InvalidDistanceFunction(other.to_string()).into()),
        None => Ok(DistanceFunction::default()),
    }
}

/// Resolves all seven index parameters. A `num_threads` that resolves to zero or less is
/// left unset so the server picks its own value.
pub fn resolve_index_parameters(
    overrides: &IndexParameterOverrides,
    source: Option<&Metadata>,
) -> Result<IndexParameters, CloneError> {
    let num_threads = resolve_parameter(
        overrides.num_threads,
        source,
        HNSW_NUM_THREADS,
        DEFAULT_NUM_THREADS,
    )?;

    Ok(IndexParameters {
        m: resolve_parameter(overrides.m, source, HNSW_M, DEFAULT_M)?,
        construction_ef: resolve_parameter(
            overrides.construction_ef,
            source,
            HNSW_CONSTRUCTION_EF,
            DEFAULT_CONSTRUCTION_EF,
        )?,
        search_ef: resolve_parameter(
            overrides.search_ef,
            source,
            HNSW_SEARCH_EF,
            DEFAULT_SEARCH_EF,
        )?,
        batch_size: resolve_parameter(
            overrides.batch_size,
            source,
            HNSW_BATCH_SIZE,
            DEFAULT_BATCH_SIZE,
        )?,
        sync_threshold: resolve_parameter(
            overrides.sync_threshold,
            source,
            HNSW_SYNC_THRESHOLD,
            DEFAULT_SYNC_THRESHOLD,
        )?,
        num_threads: Some(num_threads).filter(|threads| *threads > 0),
        resize_factor: resolve_parameter(
            overrides.resize_factor,
            source,
            HNSW_RESIZE_FACTOR,
            DEFAULT_RESIZE_FACTOR,
        )?,
    })
}
