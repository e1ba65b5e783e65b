//! CSV ingestion with header validation, row limits and streaming reads.
//!
//! There is a single parser core, [`LineParser`], fed one physical line at a
//! time. Two entry points drive it:
//!
//! - [`ingest_reader`] pulls fixed-size chunks from any [`Read`], carries
//!   partial lines across chunk boundaries and stops reading as soon as the
//!   row limit is exceeded.
//! - [`ingest_str`] walks an in-memory document (used after header repair).
//!
//! [`ingest_path`] opens a file, applies transparent decompression and
//! streams it through [`ingest_reader`].
//!
//! # Validation policy
//! The first non-blank line is the header. It must have at least
//! [`MIN_COLUMNS`] columns, no blank names and no duplicates; the first
//! failing check is the only one reported. A blank header name is
//! recoverable through [`crate::io::repair`].
//!
//! Data rows whose field count differs from the header abort the parse while
//! fewer than [`STRICT_ROW_WINDOW`] rows have been accepted. After that such
//! rows are skipped and counted in [`IngestResult::skipped_rows`].

use crate::io::compression::auto_detect_reader;
use crate::io::tokenizer::tokenize_line;
use crate::records::RawRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Minimum number of header columns a source must have.
pub const MIN_COLUMNS: usize = 4;

/// Number of accepted rows during which a column-count mismatch is fatal.
pub const STRICT_ROW_WINDOW: usize = 10;

/// Structural problems that end an ingestion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum IngestError {
    #[error("The file appears to be empty: no header row found")]
    NoHeader,

    #[error("Too few columns: found {found}, at least {} are required", MIN_COLUMNS)]
    TooFewColumns { found: usize },

    #[error("Empty column headers at position(s) {}", join_positions(.positions))]
    EmptyHeaders { positions: Vec<usize> },

    #[error("Duplicate column headers: {}", .names.join(", "))]
    DuplicateHeaders { names: Vec<String> },

    #[error("Row {line}: expected {expected} columns but found {found}; the file may be corrupt")]
    ColumnMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Critical streaming failure while reading the source")]
    Stream,
}

fn join_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Knobs for a single ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Maximum number of data rows to keep.
    pub row_limit: usize,
    /// Bytes requested from the source per read in streaming mode.
    pub chunk_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            row_limit: 1_000_000,
            chunk_size: 64 * 1024,
        }
    }
}

impl IngestOptions {
    #[must_use]
    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Outcome of an ingestion attempt.
///
/// Structural failures are data, not `Err`: `errors` is non-empty and `rows`
/// is empty. A truncated result is still a success.
#[derive(Debug, Clone, Default)]
pub struct IngestResult {
    /// Validated header names, trimmed. Empty when the attempt failed.
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
    pub errors: Vec<IngestError>,
    /// The source had more rows than the limit; reading stopped early.
    pub truncated: bool,
    /// The header has blank names; run header repair and ingest again.
    pub has_empty_headers: bool,
    pub row_count: usize,
    /// Mismatched rows dropped after the strict window.
    pub skipped_rows: usize,
}

impl IngestResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Incremental parser fed one physical line at a time.
///
/// `feed_line` returns [`ControlFlow::Break`] once the caller should stop
/// supplying input: after a fatal error or when the row limit is exceeded.
#[derive(Debug)]
pub struct LineParser {
    row_limit: usize,
    line_no: usize,
    headers: Option<Arc<[String]>>,
    rows: Vec<RawRecord>,
    errors: Vec<IngestError>,
    truncated: bool,
    has_empty_headers: bool,
    skipped_rows: usize,
}

impl LineParser {
    #[must_use]
    pub fn new(row_limit: usize) -> Self {
        Self {
            row_limit,
            line_no: 0,
            headers: None,
            rows: Vec::new(),
            errors: Vec::new(),
            truncated: false,
            has_empty_headers: false,
            skipped_rows: 0,
        }
    }

    /// Process one line without its terminator.
    pub fn feed_line(&mut self, line: &str) -> ControlFlow<()> {
        self.line_no += 1;
        if line.trim().is_empty() {
            return ControlFlow::Continue(());
        }

        let Some(headers) = self.headers.clone() else {
            let line = line.strip_prefix('\u{feff}').unwrap_or(line);
            return self.accept_header(line);
        };

        if self.rows.len() >= self.row_limit {
            self.truncated = true;
            return ControlFlow::Break(());
        }

        let fields = tokenize_line(line);
        if fields.len() == headers.len() {
            self.rows.push(RawRecord::new(headers, fields));
            return ControlFlow::Continue(());
        }

        if self.rows.len() < STRICT_ROW_WINDOW {
            self.fail(IngestError::ColumnMismatch {
                line: self.line_no,
                expected: headers.len(),
                found: fields.len(),
            });
            return ControlFlow::Break(());
        }

        debug!(
            line = self.line_no,
            expected = headers.len(),
            found = fields.len(),
            "skipping row with mismatched column count"
        );
        self.skipped_rows += 1;
        ControlFlow::Continue(())
    }

    fn accept_header(&mut self, line: &str) -> ControlFlow<()> {
        let names: Vec<String> = tokenize_line(line)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        if names.len() < MIN_COLUMNS {
            self.fail(IngestError::TooFewColumns { found: names.len() });
            return ControlFlow::Break(());
        }

        let blank: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_empty())
            .map(|(i, _)| i + 1)
            .collect();
        if !blank.is_empty() {
            self.has_empty_headers = true;
            self.fail(IngestError::EmptyHeaders { positions: blank });
            return ControlFlow::Break(());
        }

        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for name in &names {
            if !seen.insert(name.as_str()) && !duplicates.contains(name) {
                duplicates.push(name.clone());
            }
        }
        if !duplicates.is_empty() {
            self.fail(IngestError::DuplicateHeaders { names: duplicates });
            return ControlFlow::Break(());
        }

        debug!(columns = names.len(), "accepted header row");
        self.headers = Some(names.into());
        ControlFlow::Continue(())
    }

    /// Record a fatal error. Fatal results never carry rows.
    fn fail(&mut self, err: IngestError) {
        warn!(error = %err, "ingestion aborted");
        self.rows.clear();
        self.errors.push(err);
    }

    /// Record a read failure from the underlying source.
    pub fn fail_stream(&mut self, cause: &std::io::Error) {
        error!(error = %cause, "critical streaming failure");
        self.rows.clear();
        self.errors.push(IngestError::Stream);
    }

    /// Finish the run and produce the result.
    #[must_use]
    pub fn finish(mut self) -> IngestResult {
        if self.headers.is_none() && self.errors.is_empty() {
            self.fail(IngestError::NoHeader);
        }
        let headers = if self.errors.is_empty() {
            self.headers.map(|h| h.to_vec()).unwrap_or_default()
        } else {
            Vec::new()
        };
        let result = IngestResult {
            headers,
            row_count: self.rows.len(),
            rows: self.rows,
            errors: self.errors,
            truncated: self.truncated,
            has_empty_headers: self.has_empty_headers,
            skipped_rows: self.skipped_rows,
        };
        info!(
            rows = result.row_count,
            truncated = result.truncated,
            skipped = result.skipped_rows,
            errors = result.errors.len(),
            "ingestion finished"
        );
        result
    }
}

/// Split `text` into lines on `\r\n`, `\n` or `\r`.
///
/// Returns the complete lines and the byte offset where the unterminated
/// remainder starts. When `at_eof` is false a trailing `\r` is left in the
/// remainder, since the next chunk may start with its `\n`.
fn split_lines(buf: &[u8], at_eof: bool) -> (Vec<&[u8]>, usize) {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < buf.len() {
        match buf[i] {
            b'\n' => {
                lines.push(&buf[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                if i + 1 == buf.len() && !at_eof {
                    break;
                }
                lines.push(&buf[start..i]);
                i += if buf.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    (lines, start)
}

/// Stream CSV from `reader`, `options.chunk_size` bytes at a time.
///
/// Reading stops as soon as the parser breaks, so a truncated parse does not
/// consume the rest of the source. Read errors become a single
/// [`IngestError::Stream`].
pub fn ingest_reader<R: Read>(mut reader: R, options: &IngestOptions) -> IngestResult {
    let mut parser = LineParser::new(options.row_limit);
    let mut chunk = vec![0u8; options.chunk_size.max(1)];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                parser.fail_stream(&e);
                return parser.finish();
            }
        };
        let at_eof = n == 0;
        pending.extend_from_slice(&chunk[..n]);

        let (lines, consumed) = split_lines(&pending, at_eof);
        // an unterminated last line only exists once the source is exhausted
        let tail = at_eof
            .then(|| &pending[consumed..])
            .filter(|t| !t.is_empty());
        for line in lines.into_iter().chain(tail) {
            if parser.feed_line(&String::from_utf8_lossy(line)).is_break() {
                return parser.finish();
            }
        }

        if at_eof {
            return parser.finish();
        }
        pending.drain(..consumed);
    }
}

/// Parse an in-memory CSV document with the same rules as [`ingest_reader`].
#[must_use]
pub fn ingest_str(text: &str, options: &IngestOptions) -> IngestResult {
    let mut parser = LineParser::new(options.row_limit);
    let (lines, consumed) = split_lines(text.as_bytes(), true);
    // every terminator is ASCII, so the slices are valid UTF-8
    let tail = std::iter::once(&text.as_bytes()[consumed..]).filter(|t| !t.is_empty());
    for line in lines.into_iter().chain(tail) {
        if parser
            .feed_line(&String::from_utf8_lossy(line))
            .is_break()
        {
            break;
        }
    }
    parser.finish()
}

/// Open `path` (decompressing `.gz`/`.zst` transparently) and stream it.
///
/// # Errors
/// Returns an error only if the file cannot be opened; everything that goes
/// wrong while reading is reported inside the [`IngestResult`].
pub fn ingest_path(path: impl AsRef<Path>, options: &IngestOptions) -> Result<IngestResult> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = auto_detect_reader(file, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    debug!(path = %path.display(), row_limit = options.row_limit, "streaming ingestion");
    Ok(ingest_reader(reader, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_trailing_cr_until_eof() {
        let (lines, rest) = split_lines(b"a\r\nb\r", false);
        assert_eq!(lines, vec![&b"a"[..]]);
        assert_eq!(rest, 3);

        let (lines, rest) = split_lines(b"a\r\nb\r", true);
        assert_eq!(lines, vec![&b"a"[..], &b"b"[..]]);
        assert_eq!(rest, 6);
    }

    #[test]
    fn split_handles_mixed_terminators() {
        let (lines, rest) = split_lines(b"a\nb\rc\r\nd", true);
        assert_eq!(lines, vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
        assert_eq!(rest, 7);
    }
}
