mod analyzer;
mod cli;
mod csv_input;
mod db;
mod error;
mod export;
mod fmt;
mod mapping;
mod models;
mod money;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::analyze::AnalyzeArgs;
use cli::{Cli, Commands, DealersCommands, MappingCommands, OutcomeCommands};

/// `DSM_LOG` wins; otherwise `-v` raises the default level.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("DSM_LOG").unwrap_or_else(|_| EnvFilter::new(default));
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
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Dealers { command } => match command {
            DealersCommands::Add { name } => cli::dealers::add(&name),
            DealersCommands::List => cli::dealers::list(),
        },
        Commands::Analyze {
            ro_csv,
            lines_csv,
            combined_csv,
            dealer,
            out_dir,
            top,
        } => cli::analyze::run(AnalyzeArgs {
            ro_csv,
            lines_csv,
            combined_csv,
            dealer,
            out_dir,
            top,
        }),
        Commands::Mapping { command } => match command {
            MappingCommands::Headers { file } => cli::mapping::headers(&file),
            MappingCommands::Set { dealer, kind, pairs } => cli::mapping::set(&dealer, &kind, &pairs),
            MappingCommands::Show { dealer, kind } => cli::mapping::show(&dealer, &kind),
        },
        Commands::Outcome { command } => match command {
            OutcomeCommands::Set {
                dealer,
                ro_number,
                status,
                notes,
                next_follow_up,
            } => cli::outcome::set(
                &dealer,
                &ro_number,
                &status,
                notes.as_deref(),
                next_follow_up.as_deref(),
            ),
            OutcomeCommands::Get { dealer, ro_number } => cli::outcome::get(&dealer, &ro_number),
        },
        Commands::Runs { dealer } => cli::runs::list(dealer.as_deref()),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
