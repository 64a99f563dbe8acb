use std::path::PathBuf;

use clap::Parser;

use crate::emit::{
    DEFAULT_CHUNK_SIZE, DEFAULT_ID_COLUMN, DEFAULT_OUT_BASE, DEFAULT_TABLE, EmitConfig,
};

pub const DEFAULT_CSV_FILE: &str = "File-Name.csv";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Convert a CSV file into chunked SQL Server INSERT scripts",
    long_about = None
)]
pub struct Cli {
    /// Input CSV file path
    #[arg(long = "csv", default_value = DEFAULT_CSV_FILE)]
    pub csv: PathBuf,
    /// Target table name
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,
    /// Output .sql filename base (`-part-NNN.sql` is appended)
    #[arg(long = "out-base", default_value = DEFAULT_OUT_BASE)]
    pub out_base: String,
    /// Maximum number of rows per .sql file
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE as i64, allow_negative_numbers = true)]
    pub chunk_size: i64,
    /// Column that receives generated UUIDs (empty string disables)
    #[arg(long = "id-column", default_value = DEFAULT_ID_COLUMN)]
    pub id_column: String,
    /// Keep the CSV values of the id column instead of generating UUIDs
    #[arg(long = "no-generate-uuid")]
    pub no_generate_uuid: bool,
    /// Column names to exclude entirely (exact match)
    #[arg(long = "exclude-columns", num_args = 0.., default_values_t = [String::from("RowVersion")])]
    pub exclude_columns: Vec<String>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long)]
    pub encoding: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'); sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

impl Cli {
    pub fn emit_config(&self) -> EmitConfig {
        EmitConfig {
            table: self.table.clone(),
            out_base: self.out_base.clone(),
            chunk_size: usize::try_from(self.chunk_size).unwrap_or(0),
            id_column: Some(self.id_column.clone()),
            generate_ids: !self.no_generate_uuid,
            excludes: self.exclude_columns.clone(),
        }
        .normalized()
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
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
