use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use exchanger::cli::setup::{setup, setup_at_path};
use exchanger::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for exchanger::AppCommand {
    fn from(cmd: Commands) -> exchanger::AppCommand {
        match cmd {
            Commands::Rates => exchanger::AppCommand::Rates,
            Commands::Balances => exchanger::AppCommand::Balances,
            Commands::Convert {
                sell,
                receive,
                amount,
            } => exchanger::AppCommand::Convert {
                sell,
                receive,
                amount,
            },
            Commands::Session => exchanger::AppCommand::Session,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the latest exchange rates
    Rates,
    /// Display balances and remaining free conversions
    Balances,
    /// Convert an amount from one currency to another
    Convert {
        /// Currency to sell, e.g. EUR
        sell: String,
        /// Currency to receive, e.g. USD
        receive: String,
        /// Amount to sell; ',' is accepted as decimal separator
        amount: String,
    },
    /// Start an interactive exchange session
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => setup_at_path(path),
            None => setup(),
        },
        Some(cmd) => exchanger::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
