pub mod cli;
pub mod columns;
pub mod emit;
pub mod io_utils;
pub mod literal;
pub mod rows;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::Cli,
    emit::{EmitSummary, IdGenerator, RandomIds},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_inserts", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let summary = convert(&cli, &mut RandomIds)?;
    report(&summary);
    Ok(())
}

/// Reads the CSV named by `cli` and writes its chunked INSERT scripts.
pub fn convert<G>(cli: &Cli, ids: &mut G) -> Result<EmitSummary>
where
    G: IdGenerator + ?Sized,
{
    let config = cli.emit_config();
    let encoding = io_utils::resolve_encoding(cli.encoding.as_deref())?;
    let delimiter = io_utils::resolve_delimiter(&cli.csv, cli.delimiter, encoding)
        .with_context(|| format!("Resolving delimiter for {:?}", cli.csv))?;
    info!(
        "Converting '{}' into '{}' (delimiter '{}', {} row(s) per file)",
        cli.csv.display(),
        config.table,
        printable_delimiter(delimiter),
        config.chunk_size
    );

    let table = io_utils::read_rows(&cli.csv, delimiter, encoding)?;
    let columns = config.columns_for(&table.headers);
    debug!("Column set: {}", columns.joined());
    if let Some(key) = config.generated_key() {
        debug!("Generating ids for key column '{key}'");
    }

    emit::emit(&table.rows, &columns, config, ids)
}

fn report(summary: &EmitSummary) {
    if summary.total_rows == 0 {
        println!("CSV appears to be empty. Nothing to do.");
        return;
    }
    println!(
        "Done: {} rows, {} file(s) generated.",
        summary.total_rows, summary.chunks
    );
    for path in &summary.paths {
        println!(" - {}", path.display());
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
