use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser, Debug)]
#[command(name = "kryptopit")]
#[command(
    version,
    about = "Polish PIT-38 calculator for cryptocurrency gains"
)]
#[command(
    long_about = "Import transaction exports from crypto exchanges (Binance, Kraken, Coinbase or any CSV/XLSX with recognizable columns), convert amounts to PLN with NBP reference rates, and compute revenue, costs, income, tax and carry-forward costs per year."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Never query NBP; convert with approximate built-in rates
    #[arg(long = "offline", global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse exchange exports and preview the transactions found
    Import {
        /// CSV or spreadsheet files (format is auto-detected)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Compute PIT-38 figures for every year in the given files
    Calculate {
        /// CSV or spreadsheet files (format is auto-detected)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Unused costs from years before the first imported one (PLN)
        #[arg(long, default_value = "0")]
        carry_forward: String,

        /// Label for this calculation
        #[arg(long)]
        name: Option<String>,

        /// Store the result in the history database
        #[arg(long)]
        save: bool,
    },

    /// Saved calculations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Show the NBP rate a transaction on DATE would use
    Rates {
        /// Currency code (e.g., USD, EUR)
        currency: String,

        /// Transaction date (YYYY-MM-DD)
        date: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List saved calculations
    List,

    /// Show a saved calculation
    Show {
        /// Calculation id
        id: String,
    },

    /// Delete a saved calculation
    Delete {
        /// Calculation id
        id: String,
    },
}
