use crate::client::AdminService;
use crate::commands::TargetArgs;
use crate::utils::CliError;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::io::Write;

#[derive(Args, Debug, Clone)]
pub struct CreateDatabaseArgs {
    name: String,
    #[clap(short = 't', long, help = "Tenant to create the database in")]
    tenant: Option<String>,
    #[clap(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ListDatabasesArgs {
    #[clap(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteDatabaseArgs {
    name: String,
    #[clap(flatten)]
    pub target: TargetArgs,
}

#[derive(Subcommand, Debug)]
pub enum DatabaseCommand {
    #[clap(about = "Create a database", visible_alias = "c")]
    Create(CreateDatabaseArgs),
    #[clap(about = "List databases in the tenant", visible_alias = "ls")]
    List(ListDatabasesArgs),
    #[clap(about = "Delete a database", visible_alias = "rm")]
    Delete(DeleteDatabaseArgs),
}

impl DatabaseCommand {
    pub fn target(&self) -> &TargetArgs {
        match self {
            DatabaseCommand::Create(args) => &args.target,
            DatabaseCommand::List(args) => &args.target,
            DatabaseCommand::Delete(args) => &args.target,
        }
    }

    /// Tenant given on the command line, overriding the target's.
    pub fn tenant(&self) -> Option<&str> {
        match self {
            DatabaseCommand::Create(args) => args.tenant.as_deref(),
            _ => None,
        }
    }
}

/// Runs a database command against `service`, which must already be scoped to `tenant`.
pub async fn database_command<W: Write, S: AdminService + ?Sized>(
    writer: &mut W,
    service: &S,
    tenant: &str,
    command: DatabaseCommand,
) -> Result<(), CliError> {
    match command {
        DatabaseCommand::Create(args) => {
            service.create_database(&args.name).await?;
            let message = format!("Database '{}' created in tenant '{}'", args.name, tenant);
            writeln!(writer, "{}", message.green())?;
        }
        DatabaseCommand::List(_) => {
            let databases = service.list_databases().await?;
            if databases.is_empty() {
                writeln!(writer, "Tenant '{}' has no databases", tenant)?;
                return Ok(());
            }
            let header = format!("Databases in tenant '{}':", tenant);
            writeln!(writer, "{}", header.blue().bold())?;
            for database in databases {
                writeln!(writer, "{} {}", ">".yellow(), database.name)?;
            }
        }
        DatabaseCommand::Delete(args) => {
            service.delete_database(&args.name).await?;
            let message = format!("Database '{}' deleted", args.name);
            writeln!(writer, "{}", message.green())?;
        }
    }
    Ok(())
}
