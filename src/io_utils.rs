//! CSV input plumbing: delimiter and encoding resolution, reader
//! construction and record decoding. Bytes the encoding cannot decode are
//! replaced with U+FFFD rather than failing the read.
//!
//! Readers are flexible (ragged rows are allowed) and never consume a
//! header row themselves; the import driver treats the first record as the
//! header so an empty file still yields a well-formed dataset. The `-` path
//! reads standard input.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const BYTE_ORDER_MARK: char = '\u{feff}';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

/// Decodes with replacement: malformed sequences become U+FFFD. The flag
/// reports whether anything was replaced.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> (String, bool) {
    let (text, _, had_errors) = encoding.decode(bytes);
    (text.into_owned(), had_errors)
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> (Vec<String>, bool) {
    let mut replaced = false;
    let fields = record
        .iter()
        .map(|field| {
            let (text, had_errors) = decode_bytes(field, encoding);
            replaced |= had_errors;
            text
        })
        .collect();
    (fields, replaced)
}

pub fn decode_headers(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> (Vec<String>, bool) {
    let (mut headers, replaced) = decode_record(record, encoding);
    if let Some(first) = headers.first_mut()
        && first.starts_with(BYTE_ORDER_MARK)
    {
        *first = first.trim_start_matches(BYTE_ORDER_MARK).to_string();
    }
    (headers, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_extension_selects_tab() {
        assert_eq!(resolve_input_delimiter(Path::new("a.TSV"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        assert!(resolve_encoding(Some("klingon")).is_err());
        assert_eq!(resolve_encoding(Some("latin1")).unwrap().name(), "windows-1252");
    }

    #[test]
    fn headers_lose_byte_order_mark() {
        let record = csv::ByteRecord::from(vec!["\u{feff}id", "name"]);
        let (headers, replaced) = decode_headers(&record, UTF_8);
        assert_eq!(headers, vec!["id", "name"]);
        assert!(!replaced);
    }

    #[test]
    fn malformed_bytes_are_replaced() {
        let record = csv::ByteRecord::from(vec![&b"caf\xe9"[..], &b"ok"[..]]);
        let (fields, replaced) = decode_record(&record, UTF_8);
        assert_eq!(fields, vec!["caf\u{fffd}", "ok"]);
        assert!(replaced);
    }
}
