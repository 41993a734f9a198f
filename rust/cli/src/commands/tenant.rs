use crate::client::AdminService;
use crate::commands::TargetArgs;
use crate::utils::CliError;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::io::Write;

#[derive(Args, Debug, Clone)]
pub struct CreateTenantArgs {
    name: String,
    #[clap(flatten)]
    pub target: TargetArgs,
}

#[derive(Subcommand, Debug)]
pub enum TenantCommand {
    #[clap(about = "Create a tenant", visible_alias = "c")]
    Create(CreateTenantArgs),
}

impl TenantCommand {
    pub fn target(&self) -> &TargetArgs {
        match self {
            TenantCommand::Create(args) => &args.target,
        }
    }
}

pub async fn tenant_command<W: Write, S: AdminService + ?Sized>(
    writer: &mut W,
    service: &S,
    command: TenantCommand,
) -> Result<(), CliError> {
    match command {
        TenantCommand::Create(args) => {
            service.create_tenant(&args.name).await?;
            let message = format!("Tenant '{}' created", args.name);
            writeln!(writer, "{}", message.green())?;
        }
    }
    Ok(())
}
