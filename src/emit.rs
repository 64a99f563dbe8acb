//! Chunked emission of `INSERT` scripts.
//!
//! Rows are partitioned into contiguous chunks of at most `chunk_size` rows and
//! every chunk becomes one self-contained, transaction-wrapped script named
//! `<out_base>-part-NNN.sql`. Chunks are rendered and written strictly in
//! order; each file is fully written and flushed before the next one starts,
//! so a failure part-way leaves every earlier file intact.

use std::{
    fs::File,
    io::{BufWriter, Write},
    ops::Range,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info};
use uuid::Uuid;

use crate::{columns::ColumnSet, literal, rows::Row};

pub const DEFAULT_TABLE: &str = "dbo.Table_Name";
pub const DEFAULT_OUT_BASE: &str = "File-Name-inserts";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_ID_COLUMN: &str = "Id";
pub const DEFAULT_EXCLUDES: &[&str] = &["RowVersion"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitConfig {
    pub table: String,
    pub out_base: String,
    pub chunk_size: usize,
    pub id_column: Option<String>,
    pub generate_ids: bool,
    pub excludes: Vec<String>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            out_base: DEFAULT_OUT_BASE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            id_column: Some(DEFAULT_ID_COLUMN.to_string()),
            generate_ids: true,
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EmitConfig {
    /// Clamps the chunk size to at least one row and disables id generation
    /// when no key column is named.
    pub fn normalized(mut self) -> Self {
        self.chunk_size = self.chunk_size.max(1);
        self.id_column = self
            .id_column
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.generate_ids = self.generate_ids && self.id_column.is_some();
        self
    }

    /// Key column whose values are replaced by generated ids, if any.
    pub fn generated_key(&self) -> Option<&str> {
        self.id_column
            .as_deref()
            .map(str::trim)
            .filter(|key| self.generate_ids && !key.is_empty())
    }

    /// Column Set for `header`, finalized against the normalized key policy.
    pub fn columns_for(&self, header: &[String]) -> ColumnSet {
        let config = self.clone().normalized();
        ColumnSet::finalize(
            header,
            &config.excludes,
            config.id_column.as_deref(),
            config.generate_ids,
        )
    }
}

/// Source of fresh identifiers for the synthetic key column.
pub trait IdGenerator {
    fn next_id(&mut self) -> Uuid;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

impl<F> IdGenerator for F
where
    F: FnMut() -> Uuid,
{
    fn next_id(&mut self) -> Uuid {
        self()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub total_rows: usize,
    pub chunks: usize,
    pub paths: Vec<PathBuf>,
}

pub fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let size = chunk_size.max(1);
    (0..total.div_ceil(size))
        .map(|i| {
            let start = i * size;
            start..(start + size).min(total)
        })
        .collect()
}

pub fn part_path(out_base: &str, index: usize) -> PathBuf {
    PathBuf::from(format!("{out_base}-part-{index:03}.sql"))
}

pub fn render_value<G>(row: &Row, column: &str, config: &EmitConfig, ids: &mut G) -> String
where
    G: IdGenerator + ?Sized,
{
    if config.generated_key() == Some(column) {
        format!("'{}'", ids.next_id())
    } else {
        literal::render(Some(row.value_or_empty(column)))
    }
}

pub fn render_chunk<G>(
    index: usize,
    rows: &[Row],
    columns: &ColumnSet,
    config: &EmitConfig,
    ids: &mut G,
) -> String
where
    G: IdGenerator + ?Sized,
{
    let column_list = columns.joined();
    let mut out = format!(
        "-- Generated from chunk {index}\n-- Table: {}\n-- Columns: {column_list}\n-- Rows in this file: {}\n\n",
        config.table,
        rows.len()
    );
    out.push_str("BEGIN TRAN;\n");
    for row in rows {
        let values = columns
            .iter()
            .map(|column| render_value(row, column, config, &mut *ids))
            .join(", ");
        out.push_str(&format!(
            "INSERT INTO {} ({column_list}) VALUES ({values});\n",
            config.table
        ));
    }
    out.push_str("COMMIT TRAN;\nGO\n");
    out
}

/// Writes one script per chunk and reports what was produced. An empty row
/// set produces no files.
pub fn emit<G>(
    rows: &[Row],
    columns: &ColumnSet,
    config: EmitConfig,
    ids: &mut G,
) -> Result<EmitSummary>
where
    G: IdGenerator + ?Sized,
{
    let config = config.normalized();
    let ranges = chunk_ranges(rows.len(), config.chunk_size);
    debug!(
        "Emitting {} row(s) as {} chunk(s) of up to {} row(s)",
        rows.len(),
        ranges.len(),
        config.chunk_size
    );

    let mut paths = Vec::with_capacity(ranges.len());
    for (i, range) in ranges.iter().enumerate() {
        let index = i + 1;
        let chunk = &rows[range.clone()];
        let path = part_path(&config.out_base, index);
        let script = render_chunk(index, chunk, columns, &config, &mut *ids);
        write_script(&path, &script)?;
        info!("Wrote {} row(s) to {:?}", chunk.len(), path);
        paths.push(path);
    }

    Ok(EmitSummary {
        total_rows: rows.len(),
        chunks: paths.len(),
        paths,
    })
}

fn write_script(path: &Path, script: &str) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(script.as_bytes())
        .with_context(|| format!("Writing output file {path:?}"))?;
    writer
        .flush()
        .with_context(|| format!("Flushing output file {path:?}"))
}
