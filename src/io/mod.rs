//! Reading and writing CSV.
//!
//! - [`tokenizer`] splits single lines and quotes fields for output.
//! - [`ingest`] validates and streams CSV sources into raw records.
//! - [`repair`] fills blank header names so a rejected file can be retried.
//! - [`export`] writes typed results back out as CSV.
//! - [`compression`] wraps files in gzip/zstd codecs by extension or magic bytes.

pub mod compression;
pub mod export;
pub mod ingest;
pub mod repair;
pub mod tokenizer;
