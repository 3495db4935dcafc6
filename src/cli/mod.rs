pub mod analyze;
pub mod dealers;
pub mod init;
pub mod mapping;
pub mod outcome;
pub mod runs;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dsm",
    version,
    about = "Declined Service Miner: find repair orders with declined work worth a callback."
)]
pub struct Cli {
    /// Log more detail to stderr (repeat for debug output).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for dsm data (default: ~/Documents/Declined Service Miner)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage dealers.
    Dealers {
        #[command(subcommand)]
        command: DealersCommands,
    },
    /// Analyze RO header and declined line CSV exports.
    Analyze {
        /// RO headers CSV
        #[arg(long = "ro-csv", requires = "lines_csv", conflicts_with = "combined_csv")]
        ro_csv: Option<String>,
        /// Declined line items CSV
        #[arg(long = "lines-csv", requires = "ro_csv")]
        lines_csv: Option<String>,
        /// Single export holding both RO and line columns
        #[arg(long = "combined-csv", required_unless_present = "ro_csv")]
        combined_csv: Option<String>,
        /// Dealer whose saved mappings apply; the run is recorded under this dealer
        #[arg(long)]
        dealer: Option<String>,
        /// Output directory for callback_list.csv, report.html and meta.json
        #[arg(long = "out-dir")]
        out_dir: Option<String>,
        /// Number of rows to print (default from settings)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Inspect headers and manage per-dealer field mappings.
    Mapping {
        #[command(subcommand)]
        command: MappingCommands,
    },
    /// Track follow-up outcomes for repair orders.
    Outcome {
        #[command(subcommand)]
        command: OutcomeCommands,
    },
    /// List recorded analysis runs.
    Runs {
        /// Only runs for this dealer
        #[arg(long)]
        dealer: Option<String>,
    },
    /// Show current data directory and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum DealersCommands {
    /// Add a dealer.
    Add {
        /// Dealer name, e.g. 'Main Street Motors'
        name: String,
    },
    /// List all dealers.
    List,
}

#[derive(Subcommand)]
pub enum MappingCommands {
    /// Print the header names of a CSV file.
    Headers {
        /// Path to CSV file
        file: String,
    },
    /// Save a field mapping for a dealer.
    Set {
        #[arg(long)]
        dealer: String,
        /// Mapping kind: ro, lines, combined
        #[arg(long)]
        kind: String,
        /// Pairs of canonical=Source Header, e.g. 'ro_number=RO #'
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Show a dealer's saved mapping and any missing required fields.
    Show {
        #[arg(long)]
        dealer: String,
        /// Mapping kind: ro, lines, combined
        #[arg(long)]
        kind: String,
    },
}

#[derive(Subcommand)]
pub enum OutcomeCommands {
    /// Record or update the follow-up outcome for a repair order.
    Set {
        #[arg(long)]
        dealer: String,
        /// RO number
        ro_number: String,
        /// Outcome status, e.g. called, booked, no_answer
        #[arg(long)]
        status: String,
        #[arg(long)]
        notes: Option<String>,
        /// Next follow-up date: YYYY-MM-DD
        #[arg(long = "next-follow-up")]
        next_follow_up: Option<String>,
    },
    /// Show the recorded outcome for a repair order.
    Get {
        #[arg(long)]
        dealer: String,
        /// RO number
        ro_number: String,
    },
}

/// Open the database in the configured data directory, creating it on first use.
pub(crate) fn open_db() -> crate::error::Result<rusqlite::Connection> {
    let base = crate::settings::ensure_base_dir()?;
    let conn = crate::db::get_connection(&base.join(crate::settings::DB_FILE))?;
    crate::db::init_db(&conn)?;
    Ok(conn)
}
