pub mod buffer;
pub mod cache;
pub mod cli;
pub mod coerce;
pub mod column;
pub mod dataset;
pub mod error;
pub mod import;
pub mod inference;
pub mod io_utils;
pub mod levels;
pub mod missing;
pub mod numeric;
pub mod preview;
pub mod inspect;
pub mod session;
pub mod settings;
pub mod store;
pub mod table;
pub mod value;

pub use buffer::WriteBuffer;
pub use cache::DataCache;
pub use coerce::ChangeOutcome;
pub use column::{Cells, Column, FValue};
pub use dataset::{ColumnSchema, Dataset, DatasetSchema};
pub use error::{DatasetError, StoreError};
pub use levels::{Level, LevelTable};
pub use missing::{MissingRule, MissingValues};
pub use numeric::{DecimalSymbol, NumericLiteral, calc_dps, parse_decimal_comma, parse_numeric};
pub use session::Session;
pub use settings::EngineSettings;
pub use store::{
    BackingStore, CellWrite, ColumnId, DatasetHandle, JournalStore, MemoryStore, Store, StoreKind,
};
pub use value::{CellValue, ColumnType, DataType, MISSING_INT, MeasureType};

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, InputArgs},
    import::CsvOptions,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("statsheet", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect(args) => inspect::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Import(args) => handle_import(&args),
    }
}

pub(crate) fn resolve_settings(args: &InputArgs) -> Result<EngineSettings> {
    let mut settings = EngineSettings::load_or_default(args.config.as_deref())
        .with_context(|| format!("Loading settings from {:?}", args.config))?;
    if let Some(symbol) = args.decimal_symbol {
        settings.import.decimal_symbol = symbol;
    }
    if let Some(token) = &args.missing_token {
        settings.import.missing_token = token.clone();
    }
    if let Some(max_uniques) = args.max_uniques {
        settings.import.max_uniques = max_uniques;
    }
    settings.validate()?;
    Ok(settings)
}

pub(crate) fn load_dataset(
    args: &InputArgs,
    meta: Option<&Path>,
) -> Result<(Dataset, EngineSettings)> {
    let settings = resolve_settings(args)?;
    info!(
        "Reading '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(io_utils::resolve_input_delimiter(&args.input, args.delimiter))
    );
    let options = CsvOptions {
        delimiter: args.delimiter,
        encoding: args.input_encoding.clone(),
    };
    let mut dataset = import::import_csv(&args.input, &options, &settings.import)?;
    if let Some(path) = meta {
        let schema = DatasetSchema::load(path)
            .with_context(|| format!("Loading schema from {path:?}"))?;
        let applied = dataset.apply_schema(&schema)?;
        debug!("Applied schema to {applied} column(s)");
    }
    Ok((dataset, settings))
}

fn handle_import(args: &cli::ImportArgs) -> Result<()> {
    let (dataset, settings) = load_dataset(&args.input, args.meta.as_deref())?;
    let kind = args.store.unwrap_or(settings.store.kind);
    let journal = args.journal.clone().or_else(|| settings.store.path.clone());
    let max_items = args.buffer_size.unwrap_or(settings.write_buffer.max_items);

    let store = Store::open(kind, journal.as_deref())
        .with_context(|| format!("Opening {kind} store"))?;
    let rows = dataset.row_count();
    let columns = dataset.column_count();
    let mut session = Session::from_dataset(dataset, store, max_items)?;
    session.commit()?;
    let commits = session.buffer().commit_count();
    session.close()?;

    info!("Imported {rows} row(s) x {columns} column(s) into the {kind} store in {commits} commit(s)");
    println!("Imported {rows} row(s) x {columns} column(s) into the {kind} store in {commits} commit(s)");
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
