mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};

fn init_logging(verbose: bool) {
    let default = if verbose { "ledgerlens=debug" } else { "ledgerlens=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            file,
            model,
            json,
            only,
            search,
        } => cli::analyze::run(&file, model.as_deref(), json, only, search.as_deref()),
        Commands::Explain { file, model } => cli::explain::run(&file, model.as_deref()),
        Commands::Schema { model } => cli::schema::run(model.as_deref()),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::SetModel { path } => cli::config::set_model(&path),
            ConfigCommands::SetCurrency { symbol } => cli::config::set_currency(&symbol),
        },
        Commands::Completions { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        // 1 for bad input, 2 for server-side failures (no model, internal errors)
        std::process::exit(if e.is_client_error() { 1 } else { 2 });
    }
}
