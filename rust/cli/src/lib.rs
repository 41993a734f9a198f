mod client;
mod clone;
mod commands;
mod config;
mod utils;

use crate::client::connect;
use crate::commands::collection::{collection_command, CollectionCommand};
use crate::commands::database::{database_command, DatabaseCommand};
use crate::commands::server::{server_command, use_command, ServerCommand, UseArgs};
use crate::commands::tenant::{tenant_command, TenantCommand};
use crate::commands::version::{version_command, VersionArgs};
use crate::commands::TargetArgs;
use crate::config::{ConfigStore, FileConfigStore, Target};
use crate::utils::{block_on, CliError};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand, about = "Manage configured servers", visible_alias = "s")]
    Server(ServerCommand),
    #[command(about = "Switch the active server, tenant and database")]
    Use(UseArgs),
    #[command(about = "Print the server version", visible_alias = "v")]
    Version(VersionArgs),
    #[command(subcommand, about = "Manage tenants", visible_alias = "t")]
    Tenant(TenantCommand),
    #[command(subcommand, about = "Manage databases", visible_alias = "db")]
    Database(DatabaseCommand),
    #[command(subcommand, about = "Manage collections", visible_alias = "c")]
    Collection(CollectionCommand),
}

#[derive(Parser, Debug)]
#[command(name = "chromactl")]
#[command(version)]
#[command(about = "Administer Chroma servers from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn resolve_target<C: ConfigStore + ?Sized>(
    store: &C,
    args: &TargetArgs,
) -> Result<Target, CliError> {
    Ok(store.load()?.target(args.alias.as_deref())?)
}

fn run<W: Write, C: ConfigStore + ?Sized>(
    writer: &mut W,
    store: &C,
    command: Command,
) -> Result<(), CliError> {
    match command {
        Command::Server(command) => server_command(writer, store, command),
        Command::Use(args) => use_command(writer, store, args),
        Command::Version(args) => {
            let client = connect(&resolve_target(store, &args.target)?)?;
            block_on(version_command(writer, &client))?
        }
        Command::Tenant(command) => {
            let client = connect(&resolve_target(store, command.target())?)?;
            block_on(tenant_command(writer, &client, command))?
        }
        Command::Database(command) => {
            let mut target = resolve_target(store, command.target())?;
            if let Some(tenant) = command.tenant() {
                target.tenant = tenant.to_string();
            }
            let client = connect(&target)?;
            block_on(database_command(writer, &client, &target.tenant, command))?
        }
        Command::Collection(command) => {
            let client = connect(&resolve_target(store, command.target())?)?;
            block_on(collection_command(writer, &client, command))?
        }
    }
}

/// Runs the command line and returns the process exit code. Everything, errors
/// included, is written to stdout.
pub fn chromactl_cli(args: Vec<String>) -> i32 {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = write!(out, "{}", err.render());
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
        }
    };

    let result = FileConfigStore::from_env()
        .map_err(CliError::from)
        .and_then(|store| run(&mut out, &store, cli.command));
    match result {
        Ok(()) => 0,
        Err(err) => {
            let message = format!("Error: {}", err);
            let _ = writeln!(out, "{}", message.red());
            1
        }
    }
}
