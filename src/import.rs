use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    dataset::Dataset,
    inference::infer_dataset,
    io_utils::{self, decode_headers, decode_record},
    settings::ImportSettings,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    pub delimiter: Option<u8>,
    pub encoding: Option<String>,
}

pub fn read_table(path: &Path, options: &CsvOptions) -> Result<RawTable> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let encoding = io_utils::resolve_encoding(options.encoding.as_deref())?;
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;

    let mut table = RawTable::default();
    let mut record = csv::ByteRecord::new();
    let mut line = 0usize;
    let mut replaced_records = 0usize;
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("Reading record {} of {path:?}", line + 1))?
    {
        line += 1;
        let replaced = if line == 1 {
            let (header, replaced) = decode_headers(&record, encoding);
            table.header = header;
            replaced
        } else {
            let (row, replaced) = decode_record(&record, encoding);
            table.rows.push(row);
            replaced
        };
        if replaced {
            replaced_records += 1;
        }
    }
    if replaced_records > 0 {
        warn!(
            "{replaced_records} record(s) of {path:?} held bytes invalid for {}; replaced with U+FFFD",
            encoding.name()
        );
    }
    Ok(table)
}

pub fn import_csv(path: &Path, options: &CsvOptions, settings: &ImportSettings) -> Result<Dataset> {
    let table = read_table(path, options)?;
    let dataset = infer_dataset(&table.header, &table.rows, settings)
        .with_context(|| format!("Inferring column types for {path:?}"))?;
    info!(
        "Imported {} column(s) and {} row(s) from {:?}",
        dataset.column_count(),
        dataset.row_count(),
        path
    );
    Ok(dataset)
}
