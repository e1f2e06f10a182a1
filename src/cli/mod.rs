pub mod analyze;
pub mod completions;
pub mod config;
pub mod explain;
pub mod schema;

use clap::{Parser, Subcommand};

use ledgerlens::filter::StatusFilter;
use ledgerlens::pipeline::Pipeline;
use ledgerlens::scorer::ScorerHandle;
use ledgerlens::settings::{shellexpand_path, Settings};

/// Build a pipeline around the model at `model`, or the configured model path.
pub(crate) fn pipeline_for(model: Option<&str>, settings: &Settings) -> Pipeline {
    let path = shellexpand_path(model.unwrap_or(settings.model_path.as_str()));
    Pipeline::new(ScorerHandle::load(std::path::Path::new(&path)))
}

#[derive(Parser)]
#[command(
    name = "ledgerlens",
    version,
    about = "Flag anomalous transactions and summarize spending from a CSV ledger."
)]
pub struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a CSV ledger (columns: Date, Description, Amount, Category).
    Analyze {
        /// Path to the CSV file
        file: String,
        /// Model artifact (default: configured model path)
        #[arg(long)]
        model: Option<String>,
        /// Print the full JSON payload instead of tables
        #[arg(long)]
        json: bool,
        /// Which transactions to list
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        only: StatusFilter,
        /// Only list transactions whose description, category or amount contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Explain why each anomalous transaction was flagged.
    Explain {
        /// Path to the CSV file
        file: String,
        /// Model artifact (default: configured model path)
        #[arg(long)]
        model: Option<String>,
    },
    /// Show the feature columns the model expects.
    Schema {
        /// Model artifact (default: configured model path)
        #[arg(long)]
        model: Option<String>,
    },
    /// View or change settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print shell completions.
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print current settings.
    Show,
    /// Set the default model artifact path.
    SetModel {
        /// Path to the model JSON
        path: String,
    },
    /// Set the currency symbol used in reports.
    SetCurrency {
        /// Symbol, e.g. '$' or '₹'
        symbol: String,
    },
}
