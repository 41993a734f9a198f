use crate::client::CollectionService;
use crate::clone::{clone_collection, CloneRequest, DEFAULT_CLONE_BATCH_SIZE};
use crate::commands::TargetArgs;
use crate::utils::CliError;
use chromactl_client::embed::{
    embedding_function_from_name, DenseEmbeddingFunction, EmbeddingFunctionError,
};
use chromactl_types::{
    parse_metadata_token, DistanceFunction, IndexParameterOverrides, Metadata, MetadataValue,
    HNSW_SPACE,
};
use clap::{Args, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::time::Duration;

/// Index configuration flags shared by `create` and `clone`. Unset flags stay `None`.
#[derive(Args, Debug, Clone, Default)]
pub struct IndexArgs {
    #[clap(short = 'p', long, help = "Distance function: l2, cosine or ip")]
    space: Option<String>,
    #[clap(short = 'm', long = "m", help = "HNSW max neighbours per node")]
    m: Option<i32>,
    #[clap(short = 'u', long = "construction-ef")]
    construction_ef: Option<i32>,
    #[clap(short = 'f', long = "search-ef")]
    search_ef: Option<i32>,
    #[clap(short = 'b', long = "batch-size", help = "HNSW batch size")]
    batch_size: Option<i32>,
    #[clap(short = 'k', long = "sync-threshold")]
    sync_threshold: Option<i32>,
    #[clap(
        short = 'n',
        long = "threads",
        allow_negative_numbers = true,
        help = "HNSW thread count, values below 1 let the server decide"
    )]
    threads: Option<i32>,
    #[clap(short = 'r', long = "resize-factor")]
    resize_factor: Option<f32>,
    #[clap(short = 'a', long = "meta", help = "Collection metadata as key=value, repeatable")]
    meta: Vec<String>,
}

impl IndexArgs {
    fn overrides(&self) -> IndexParameterOverrides {
        IndexParameterOverrides {
            m: self.m,
            construction_ef: self.construction_ef,
            search_ef: self.search_ef,
            batch_size: self.batch_size,
            sync_threshold: self.sync_threshold,
            num_threads: self.threads,
            resize_factor: self.resize_factor,
        }
    }

    /// Metadata for a new collection holding only what was given on the command line.
    fn create_metadata(&self) -> Result<Option<Metadata>, CliError> {
        let mut metadata = Metadata::new();
        for token in &self.meta {
            let (key, value) = parse_metadata_token(token)?;
            metadata.insert(key, value);
        }
        if let Some(space) = &self.space {
            let space: DistanceFunction = space.parse()?;
            metadata.insert(HNSW_SPACE.to_string(), MetadataValue::Str(space.to_string()));
        }
        metadata.extend(self.overrides().to_metadata());
        Ok((!metadata.is_empty()).then_some(metadata))
    }
}

#[derive(Args, Debug, Clone)]
pub struct CreateCollectionArgs {
    name: String,
    #[clap(flatten)]
    index: IndexArgs,
    #[clap(long, help = "Succeed if the collection already exists")]
    ensure: bool,
    #[clap(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ListCollectionsArgs {
    #[clap(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteCollectionArgs {
    name: String,
    #[clap(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CloneArgs {
    #[clap(help = "Collection to copy from")]
    source: String,
    #[clap(help = "Name of the new collection")]
    destination: String,
    #[clap(
        long = "clone-batch-size",
        default_value_t = DEFAULT_CLONE_BATCH_SIZE,
        help = "Records fetched and inserted per round trip"
    )]
    clone_batch_size: u32,
    #[clap(flatten)]
    index: IndexArgs,
    #[clap(
        short = 'e',
        long = "embedding-function",
        help = "Recompute embeddings with openai, cohere, hf, ollama or hash"
    )]
    embedding_function: Option<String>,
    #[clap(flatten)]
    pub target: TargetArgs,
}

impl CloneArgs {
    fn request(self) -> CloneRequest {
        CloneRequest {
            source: self.source,
            destination: self.destination,
            batch_size: self.clone_batch_size,
            space: self.index.space.clone(),
            overrides: self.index.overrides(),
            metadata: self.index.meta,
            embedding_function: self.embedding_function,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CollectionCommand {
    #[clap(about = "Create a collection")]
    Create(CreateCollectionArgs),
    #[clap(about = "List collections", visible_alias = "ls")]
    List(ListCollectionsArgs),
    #[clap(about = "Delete a collection", visible_alias = "rm")]
    Delete(DeleteCollectionArgs),
    #[clap(
        about = "Copy a collection and its records into a new collection",
        visible_alias = "cp"
    )]
    Clone(CloneArgs),
}

impl CollectionCommand {
    pub fn target(&self) -> &TargetArgs {
        match self {
            CollectionCommand::Create(args) => &args.target,
            CollectionCommand::List(args) => &args.target,
            CollectionCommand::Delete(args) => &args.target,
            CollectionCommand::Clone(args) => &args.target,
        }
    }
}

async fn create<W: Write, S: CollectionService + ?Sized>(
    writer: &mut W,
    service: &S,
    args: CreateCollectionArgs,
) -> Result<(), CliError> {
    let metadata = args.index.create_metadata()?;
    let collection = service
        .create_collection(&args.name, metadata, args.ensure)
        .await?;
    let message = format!("Collection created: {}", collection.name);
    writeln!(writer, "{}", message.green())?;
    Ok(())
}

async fn list<W: Write, S: CollectionService + ?Sized>(
    writer: &mut W,
    service: &S,
) -> Result<(), CliError> {
    let collections = service.list_collections().await?;
    if collections.is_empty() {
        writeln!(writer, "No collections found")?;
        return Ok(());
    }
    writeln!(writer, "{}", "Collections:".blue().bold())?;
    for collection in collections {
        writeln!(
            writer,
            "{} {} ({})",
            ">".yellow(),
            collection.name,
            collection.collection_id
        )?;
    }
    Ok(())
}

async fn delete<W: Write, S: CollectionService + ?Sized>(
    writer: &mut W,
    service: &S,
    args: DeleteCollectionArgs,
) -> Result<(), CliError> {
    service.delete_collection(&args.name).await?;
    let message = format!("Collection '{}' deleted", args.name);
    writeln!(writer, "{}", message.green())?;
    Ok(())
}

fn clone_progress() -> ProgressBar {
    if !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

async fn clone<W: Write, S: CollectionService + ?Sized, F>(
    writer: &mut W,
    service: &S,
    args: CloneArgs,
    embedding_function: F,
    progress: &ProgressBar,
) -> Result<(), CliError>
where
    F: FnOnce(&str) -> Result<Box<dyn DenseEmbeddingFunction>, EmbeddingFunctionError>,
{
    let request = args.request();
    progress.set_message(format!(
        "Cloning {} to {}",
        request.source, request.destination
    ));

    let result = clone_collection(service, &request, embedding_function, progress).await;
    progress.finish_and_clear();
    let summary = result?;

    let message = format!(
        "Collection '{}' successfully cloned to '{}' ({} records copied)",
        summary.source, summary.destination, summary.copied
    );
    writeln!(writer, "{}", message.green())?;
    Ok(())
}

pub async fn collection_command<W: Write, S: CollectionService + ?Sized>(
    writer: &mut W,
    service: &S,
    command: CollectionCommand,
) -> Result<(), CliError> {
    match command {
        CollectionCommand::Create(args) => create(writer, service, args).await,
        CollectionCommand::List(_) => list(writer, service).await,
        CollectionCommand::Delete(args) => delete(writer, service, args).await,
        CollectionCommand::Clone(args) => {
            let progress = clone_progress();
            clone(
                writer,
                service,
                args,
                embedding_function_from_name,
                &progress,
            )
            .await
        }
    }
}
