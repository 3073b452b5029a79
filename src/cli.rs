use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{numeric::DecimalSymbol, store::StoreKind};

#[derive(Debug, Parser)]
#[command(author, version, about = "Typed dataset engine for tabular data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer column data types, measure types and levels for a CSV file
    Inspect(InspectArgs),
    /// Import a CSV file and show its first rows as typed values
    Preview(PreviewArgs),
    /// Import a CSV file into a backing store through the write buffer
    Import(ImportArgs),
}

/// Options shared by every command that reads and types a CSV file.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Decimal symbol used by numbers in the file ('.' or ',')
    #[arg(long = "decimal-symbol")]
    pub decimal_symbol: Option<DecimalSymbol>,
    /// Literal that marks a missing value (defaults to NA)
    #[arg(long = "missing-token")]
    pub missing_token: Option<String>,
    /// Distinct values a column may hold before it stops being nominal
    #[arg(long = "max-uniques")]
    pub max_uniques: Option<usize>,
    /// Engine settings YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Write the inferred column schema to this YAML file
    #[arg(short, long)]
    pub meta: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Column schema YAML to apply over the inferred types
    #[arg(short, long)]
    pub meta: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Backing store receiving the committed cells
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,
    /// Journal file for the journal store
    #[arg(long)]
    pub journal: Option<PathBuf>,
    /// Maximum staged writes before the buffer commits
    #[arg(long = "buffer-size")]
    pub buffer_size: Option<usize>,
    /// Column schema YAML to apply over the inferred types
    #[arg(short, long)]
    pub meta: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
