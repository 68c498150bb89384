//! CLI entry point.
//!
//! Parses arguments, installs logging, bootstraps the relay and dispatches
//! to handlers. Errors are mapped to exit codes here.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use mediarelay_cli::handlers::{self, relay::RelayArgs};
use mediarelay_cli::{Cli, CliConfig, CliError, Commands, bootstrap};

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads MEDIARELAY_* defaults
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Relay {
            locator,
            id,
            destinations,
            force,
        } => {
            let ctx = bootstrap(CliConfig::new(cli.destinations_file, cli.history_file))?;
            let args = RelayArgs {
                locator: &locator,
                id: id.as_deref(),
                destinations: &destinations,
                force,
            };
            handlers::relay::execute(&ctx, args).await?;
        }
        Commands::History { command } => {
            handlers::history::execute(&cli.history_file, &command)?;
        }
    }

    Ok(())
}
