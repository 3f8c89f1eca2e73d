use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

/// Report output format.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a transaction file and output JSON
    Parse {
        /// Input file path
        #[arg(required_unless_present = "schema")]
        file: Option<PathBuf>,

        /// Output JSON schema
        #[arg(long)]
        schema: bool,
    },
    /// Validate a transaction file without calculating a report
    Validate {
        /// Input file path
        file: PathBuf,

        /// Additional SPLIT/UNSPLIT events as a DSL file, checked against
        /// inline SPLIT/UNSPLIT transactions for duplicate ratios
        #[arg(long)]
        splits: Option<PathBuf>,
    },
    /// Generate tax report
    Report {
        /// Input file path
        file: PathBuf,

        /// Restrict the report to a single tax year start (e.g. 2023 for 2023/24)
        #[arg(long)]
        year: Option<u16>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,

        /// Skip loading bundled FX rates (non-GBP transactions are left unpriced)
        #[arg(long)]
        no_fx: bool,

        /// Additional SPLIT/UNSPLIT events as a DSL file, applied on top of
        /// any found inline in the transaction file
        #[arg(long)]
        splits: Option<PathBuf>,
    },
}
