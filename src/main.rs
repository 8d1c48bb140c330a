use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use moneystack::core::TransactionKind;
use moneystack::core::convert::Direction;
use moneystack::core::log::init_logging;

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

impl From<Commands> for moneystack::AppCommand {
    fn from(cmd: Commands) -> moneystack::AppCommand {
        match cmd {
            Commands::Rate => moneystack::AppCommand::Rate,
            Commands::Convert { amount, to_local } => moneystack::AppCommand::Convert {
                amount,
                direction: if to_local {
                    Direction::ToLocal
                } else {
                    Direction::ToForeign
                },
            },
            Commands::List => moneystack::AppCommand::List,
            Commands::Add {
                name,
                initial,
                foreign,
            } => moneystack::AppCommand::Add {
                name,
                initial,
                foreign,
            },
            Commands::Deposit {
                name,
                amount,
                note,
                foreign,
            } => moneystack::AppCommand::Record {
                name,
                kind: TransactionKind::Add,
                amount,
                note,
                foreign,
            },
            Commands::Withdraw {
                name,
                amount,
                note,
                foreign,
            } => moneystack::AppCommand::Record {
                name,
                kind: TransactionKind::Subtract,
                amount,
                note,
                foreign,
            },
            Commands::History { name } => moneystack::AppCommand::History { name },
            Commands::Remove { name } => moneystack::AppCommand::Remove { name },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the current exchange rate
    Rate,
    /// Convert an amount between the local and the foreign currency
    Convert {
        amount: f64,
        /// Amount is in the foreign currency, convert it to the local one
        #[arg(long)]
        to_local: bool,
    },
    /// List categories with their balances
    List,
    /// Create a category
    Add {
        name: String,
        /// Starting balance
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        initial: f64,
        /// The starting balance is in the foreign currency
        #[arg(long)]
        foreign: bool,
    },
    /// Add money to a category
    Deposit {
        name: String,
        amount: f64,
        #[arg(long)]
        note: Option<String>,
        /// The amount is in the foreign currency
        #[arg(long)]
        foreign: bool,
    },
    /// Subtract money from a category
    Withdraw {
        name: String,
        amount: f64,
        #[arg(long)]
        note: Option<String>,
        /// The amount is in the foreign currency
        #[arg(long)]
        foreign: bool,
    },
    /// Show the transactions of a category
    History { name: String },
    /// Delete a category
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => moneystack::cli::setup::setup(),
        Some(cmd) => moneystack::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
