use anyhow::{Context, Result};
use cgt_core::calculator::calculate;
use cgt_core::parser::parse_file;
use cgt_core::splits::{self, SplitEvent};
use cgt_core::{Transaction, validate};
use clap::Parser;
use cgt_money::FxCache;
mod commands;
use commands::{Commands, OutputFormat};
use schemars::schema_for;
use std::fs;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Parse { file, schema } => {
            if *schema {
                let schema = schema_for!(Vec<Transaction>);
                println!("{}", serde_json::to_string_pretty(&schema)?);
                return Ok(());
            }

            if let Some(path) = file {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let transactions = parse_file(&content)?;
                let json = serde_json::to_string_pretty(&transactions)?;
                println!("{}", json);
            }
        }
        Commands::Validate {
            file,
            splits: splits_path,
        } => {
            let content =
                fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
            let transactions = parse_file(&content)?;

            let external_splits: Vec<SplitEvent> = match splits_path {
                Some(path) => {
                    let content = fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let split_transactions = parse_file(&content)?;
                    let (_, events) = splits::extract_registry(split_transactions);
                    events
                }
                None => Vec::new(),
            };

            let result = validate(&transactions, &external_splits);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_valid() {
                std::process::exit(1);
            }
        }
        Commands::Report {
            file,
            year,
            format,
            no_fx,
            splits: splits_path,
        } => {
            let content =
                fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
            let transactions = parse_file(&content)?;

            let fx_cache: Option<FxCache> = if *no_fx {
                None
            } else {
                Some(cgt_money::load_default_cache().context("loading bundled FX rates")?)
            };

            let external_splits: Vec<SplitEvent> = match splits_path {
                Some(path) => {
                    let content = fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let split_transactions = parse_file(&content)?;
                    let (_, events) = splits::extract_registry(split_transactions);
                    events
                }
                None => Vec::new(),
            };

            let report = calculate(
                transactions.clone(),
                *year,
                fx_cache.as_ref(),
                external_splits,
            )?;

            match format {
                OutputFormat::Plain => {
                    print!("{}", cgt_formatter_plain::format(&report, &transactions)?);
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
    }

    Ok(())
}
