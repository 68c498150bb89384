//! Main commands enum and subcommands.

use clap::Subcommand;

/// Available commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Relay one source item to its destinations
    Relay {
        /// Fetchable locator of the source item (e.g. an http(s) URL)
        locator: String,
        /// Deduplication key for the item (defaults to the locator)
        #[arg(long)]
        id: Option<String>,
        /// Destination id to upload to; repeatable. Defaults to every configured destination
        #[arg(
            short,
            long = "dest",
            env = "MEDIARELAY_DESTINATIONS",
            value_delimiter = ','
        )]
        destinations: Vec<String>,
        /// Relay even if the item was relayed before
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect or reset the relay history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum HistoryCommand {
    /// Forget every previously relayed item
    Clear,
    /// Print how many items were relayed
    Count,
}
