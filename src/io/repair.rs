//! Rewriting of blank header names.
//!
//! Spreadsheet exports often leave the header cell above an index column
//! empty. Ingestion refuses such files but flags them with
//! [`IngestResult::has_empty_headers`]; [`repair_headers`] fills each blank
//! name with a `Column_<n>` placeholder so the document can be ingested
//! again.

use crate::io::ingest::{IngestOptions, IngestResult, ingest_str};
use crate::io::tokenizer::{join_fields, tokenize_line};
use tracing::info;

/// Placeholder for the blank header at 1-based `position`.
#[must_use]
pub fn placeholder_name(position: usize) -> String {
    format!("Column_{position}")
}

/// Byte range of the first non-blank line of `text`, terminator excluded.
fn header_span(text: &str) -> Option<(usize, usize)> {
    let mut start = 0;
    while start <= text.len() {
        let rest = &text[start..];
        let len = rest.find(['\r', '\n']).unwrap_or(rest.len());
        if !rest[..len].trim().is_empty() {
            return Some((start, start + len));
        }
        if len == rest.len() {
            return None;
        }
        start += len + 1;
    }
    None
}

/// Replace blank header names with placeholders.
///
/// Only the header line changes; every other byte of `text`, line endings
/// included, is preserved. A document without blank names comes back
/// unchanged.
#[must_use]
pub fn repair_headers(text: &str) -> String {
    let Some((start, end)) = header_span(text) else {
        return text.to_string();
    };

    let header_line = &text[start..end];
    let header_line = header_line.strip_prefix('\u{feff}').unwrap_or(header_line);
    let mut names = tokenize_line(header_line);
    let mut replaced = 0usize;
    for (i, name) in names.iter_mut().enumerate() {
        if name.trim().is_empty() {
            *name = placeholder_name(i + 1);
            replaced += 1;
        }
    }
    if replaced == 0 {
        return text.to_string();
    }
    info!(replaced, "repaired blank header names");

    let mut out = String::with_capacity(text.len() + replaced * 10);
    out.push_str(&text[..start]);
    out.push_str(&join_fields(&names));
    out.push_str(&text[end..]);
    out
}

/// Repair the header line and ingest the result in memory.
///
/// Ingestion re-validates the repaired header, so a placeholder colliding
/// with an existing column is reported as a duplicate.
#[must_use]
pub fn repair_and_ingest(text: &str, options: &IngestOptions) -> IngestResult {
    ingest_str(&repair_headers(text), options)
}
