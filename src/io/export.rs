//! CSV export of analysis results and raw records.
//!
//! Typed rows are written with Serde through the `csv` crate: the header row
//! is the field names of the record type in declaration order, `None` cells
//! are written empty, and a field is quoted only when it contains a comma, a
//! quote or a line break (internal quotes doubled). That is the same rule
//! [`escape_field`](crate::io::tokenizer::escape_field) implements for
//! header repair, so exported files ingest back unchanged.

use crate::io::compression::auto_detect_writer;
use crate::records::RawRecord;
use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;

fn writer<W: Write>(sink: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .has_headers(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(sink)
}

fn write_rows<T: Serialize, W: Write>(sink: W, rows: &[T]) -> Result<()> {
    let mut wtr = writer(sink);
    for (i, row) in rows.iter().enumerate() {
        wtr.serialize(row)
            .with_context(|| format!("serialize CSV row #{}", i + 1))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render typed rows as a CSV document.
///
/// An empty slice renders as an empty string (there is no first record to
/// take the header from).
///
/// # Errors
/// Returns an error if a row cannot be serialized as a flat record.
pub fn to_csv_string<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut buf = Vec::new();
    write_rows(&mut buf, rows)?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// Write typed rows to `path`, creating parent directories.
///
/// The output is compressed when the extension asks for it (`.gz`, `.zst`).
///
/// # Returns
/// The number of rows written.
///
/// # Errors
/// Returns an error if the file/dirs cannot be created or any row fails to
/// serialize.
pub fn write_csv_records<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))?;
    write_rows(w, rows).with_context(|| format!("write {}", path.display()))?;
    Ok(rows.len())
}

/// Render raw records with their source header row.
///
/// # Errors
/// Returns an error if the in-memory writer fails.
pub fn raw_records_to_csv<S: AsRef<str>>(headers: &[S], rows: &[RawRecord]) -> Result<String> {
    let mut wtr = writer(Vec::new());
    wtr.write_record(headers.iter().map(|h| h.as_ref()))?;
    for row in rows {
        wtr.write_record(row.values())?;
    }
    let buf = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush CSV buffer: {}", e.error()))?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}
