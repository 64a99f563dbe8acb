//! I/O utilities for CSV reading, encoding and delimiter resolution.
//!
//! All input flows through this module:
//!
//! - **Encoding**: fields are decoded with `encoding_rs`, defaulting to UTF-8.
//!   A leading byte-order mark is stripped from the header.
//! - **Delimiter resolution**: an explicit delimiter wins; otherwise the first
//!   2048 characters are sniffed for `,` `;` `|` or tab, falling back to comma.
//! - **Reading**: records are read with a flexible reader (ragged rows are
//!   allowed) and materialized as [`Row`]s keyed by header name.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::rows::Row;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const SNIFF_CANDIDATES: &[u8] = b",;|\t";
const SNIFF_SAMPLE_CHARS: usize = 2048;
const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(
    path: &Path,
    provided: Option<u8>,
    encoding: &'static Encoding,
) -> Result<u8> {
    match provided {
        Some(delimiter) => Ok(delimiter),
        None => sniff_delimiter(path, encoding),
    }
}

/// Picks the candidate delimiter that splits every complete sample line into
/// the same non-zero number of separators.
pub fn sniff_delimiter(path: &Path, encoding: &'static Encoding) -> Result<u8> {
    let mut bytes = Vec::new();
    File::open(path)
        .with_context(|| format!("Opening input file {path:?}"))?
        .take((SNIFF_SAMPLE_CHARS * 4) as u64)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Reading sample from {path:?}"))?;
    let (text, _, _) = encoding.decode(&bytes);
    let sample = text.chars().take(SNIFF_SAMPLE_CHARS).collect::<String>();
    let delimiter = sniff_sample(&sample).unwrap_or(DEFAULT_CSV_DELIMITER);
    debug!(
        "Sniffed delimiter '{}' for {:?}",
        crate::printable_delimiter(delimiter),
        path
    );
    Ok(delimiter)
}

pub fn sniff_sample(sample: &str) -> Option<u8> {
    let mut lines = sample.lines().collect::<Vec<_>>();
    // A sample cut mid-line would skew the counts.
    if lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    lines.retain(|line| !line.trim().is_empty());
    if lines.is_empty() {
        return None;
    }
    SNIFF_CANDIDATES.iter().copied().find(|&candidate| {
        let counts = lines
            .iter()
            .map(|line| count_unquoted(line, candidate as char))
            .collect::<Vec<_>>();
        counts[0] > 0 && counts.iter().all(|&count| count == counts[0])
    })
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => count += 1,
            _ => {}
        }
    }
    count
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<BufReader<File>>> {
    let reader =
        BufReader::new(File::open(path).with_context(|| format!("Opening input file {path:?}"))?);
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    let mut decoded = decode_record(&headers, encoding)?;
    if let Some(first) = decoded.first_mut() {
        if let Some(stripped) = first.strip_prefix(BOM) {
            *first = stripped.to_string();
        }
    }
    Ok(decoded)
}

/// Reads the header and every record of `reader` into memory.
pub fn read_table<R>(reader: &mut csv::Reader<R>, encoding: &'static Encoding) -> Result<CsvTable>
where
    R: Read,
{
    let headers = reader_headers(reader, encoding)?;
    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let values = decode_record(&record, encoding)
            .with_context(|| format!("Decoding record on line {line}"))?;
        rows.push(Row::from_record(&headers, &values));
    }
    Ok(CsvTable { headers, rows })
}

pub fn read_rows(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<CsvTable> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    read_table(&mut reader, encoding).with_context(|| format!("Reading CSV rows from {path:?}"))
}
