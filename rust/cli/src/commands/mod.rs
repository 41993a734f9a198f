pub mod collection;
pub mod database;
pub mod server;
pub mod tenant;
pub mod version;

use clap::Args;

/// Selects the server a command talks to.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    #[clap(
        short = 's',
        long = "alias",
        help = "Alias of the server to use instead of the active one"
    )]
    pub alias: Option<String>,
}
