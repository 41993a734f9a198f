use crate::client::CollectionService;
use crate::clone::CloneError;
use chromactl_client::embed::DenseEmbeddingFunction;
use chromactl_types::{Collection, IncludeList, RecordBatch};
use indicatif::ProgressBar;

/// Copies `total` records from `source` into `destination` in windows of `batch_size`.
///
/// With an embedder the fetched embeddings are discarded and recomputed from the
/// documents. Any failure stops the copy and reports how many records were already
/// inserted; inserted batches are not rolled back.
pub async fn copy_records<S>(
    service: &S,
    source: &Collection,
    destination: &Collection,
    total: u32,
    batch_size: u32,
    embedder: Option<&dyn DenseEmbeddingFunction>,
    progress: &ProgressBar,
) -> Result<u32, CloneError>
where
    S: CollectionService + ?Sized,
{
    let mut copied: u32 = 0;
    for start in (0..total).step_by(batch_size as usize) {
        let limit = batch_size.min(total - start);
        let inserted = copy_batch(service, source, destination, start, limit, embedder)
            .await
            .map_err(|err| CloneError::PartialCopy {
                destination: destination.name.clone(),
                copied,
                source: Box::new(err),
            })?;
        copied += inserted;

        tracing::debug!(
            source = %source.name,
            destination = %destination.name,
            offset = start,
            inserted,
            copied,
            total,
            "Copied batch"
        );
        progress.set_message(format!(
            "Copying {} to {} ({}/{} records)",
            source.name, destination.name, copied, total
        ));
    }
    Ok(copied)
}

async fn copy_batch<S>(
    service: &S,
    source: &Collection,
    destination: &Collection,
    offset: u32,
    limit: u32,
    embedder: Option<&dyn DenseEmbeddingFunction>,
) -> Result<u32, CloneError>
where
    S: CollectionService + ?Sized,
{
    let mut batch = service
        .get_records(source, offset, limit, IncludeList::all_records())
        .await?;

    if let Some(embedder) = embedder {
        batch.embeddings = Some(embed_documents(&batch, embedder).await?);
    }

    let inserted = batch.len() as u32;
    service.insert_records(destination, batch).await?;
    Ok(inserted)
}

async fn embed_documents(
    batch: &RecordBatch,
    embedder: &dyn DenseEmbeddingFunction,
) -> Result<Vec<Vec<f32>>, CloneError> {
    let documents = batch
        .ids
        .iter()
        .zip(&batch.documents)
        .map(|(id, document)| {
            document
                .as_deref()
                .ok_or_else(|| CloneError::MissingDocument(id.clone()))
        })
        .collect::<Result<Vec<&str>, _>>()?;
    Ok(embedder.embed_strs(&documents).await?)
}
