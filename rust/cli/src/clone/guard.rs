use crate::client::CollectionService;
use crate::clone::CloneError;
use chromactl_types::Collection;

/// Looks a collection up by scanning the full listing.
pub async fn find_collection<S>(service: &S, name: &str) -> Result<Option<Collection>, CloneError>
where
    S: CollectionService + ?Sized,
{
    Ok(service
        .list_collections()
        .await?
        .into_iter()
        .find(|collection| collection.name == name))
}

/// A source collection that passed every precondition.
#[derive(Debug, Clone)]
pub struct CheckedSource {
    pub collection: Collection,
    pub count: u32,
}

/// Checks, in order, that the source exists, that it holds records and that the
/// destination name is free. Nothing is written.
pub async fn check_preconditions<S>(
    service: &S,
    source: &str,
    destination: &str,
) -> Result<CheckedSource, CloneError>
where
    S: CollectionService + ?Sized,
{
    let collection = find_collection(service, source)
        .await?
        .ok_or_else(|| CloneError::SourceNotFound(source.to_string()))?;

    let count = service.count(&collection).await?;
    if count == 0 {
        return Err(CloneError::EmptySource(source.to_string()));
    }

    if find_collection(service, destination).await?.is_some() {
        return Err(CloneError::DestinationAlreadyExists(destination.to_string()));
    }

    Ok(CheckedSource { collection, count })
}
