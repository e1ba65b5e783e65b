//! # Ironcart
//!
//! A **customer-intelligence pipeline** for transactional retail data. Ironcart
//! reads raw CSV exports, cleans them into typed transactions and derives
//! RFM segments, customer-lifetime-value projections and product association
//! rules.
//!
//! ## Key Features
//!
//! - **Streaming CSV ingestion** - chunked reads, header validation, row limits
//!   that stop reading early, transparent gzip/zstd decompression
//! - **Header repair** - blank header names are replaced with placeholders and
//!   the document is ingested again
//! - **Cleaning** - duplicate, null-customer, non-positive quantity and price
//!   filters, with ISO-8601 and `M/D/YYYY` date parsing
//! - **RFM scoring** - population quintiles and a fixed segment table
//! - **CLTV** - per-customer and per-segment lifetime value
//! - **Market-basket analysis** - pairwise support, confidence and lift
//! - **Sequential and parallel execution** - keyed aggregation on rayon with
//!   identical output
//!
//! ## Quick Start
//!
//! ```
//! use ironcart::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let csv = testing::sample_csv();
//!
//! // Parse, then clean with the default column names
//! let ingested = ingest_str(&csv, &IngestOptions::default());
//! assert!(ingested.is_ok());
//! let txns = clean(&ingested.rows, &ColumnMapping::default(), &CleaningOptions::default());
//!
//! // Score customers and mine rules
//! let rfm = compute_rfm(&txns);
//! let cltv = compute_cltv(&rfm, &CltvParams::default());
//! let basket = mine_rules(&txns, &BasketParams::default());
//!
//! assert_eq!(rfm.len(), cltv.customer_details.len());
//! assert!(!basket.rules.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! Or run every stage at once with [`Analyzer`].
//!
//! ## Module Overview
//!
//! - [`io`] - tokenizer, ingestion, header repair, compression and CSV export
//! - [`records`] - raw records, column mappings and canonical transactions
//! - [`clean`] - cleaning stages and date parsing
//! - [`rfm`], [`cltv`], [`basket`] - the analysis engines
//! - [`combine`] - keyed aggregation shared by the engines
//! - [`pipeline`] - end-to-end orchestration
//! - [`config`] - TOML settings
//! - [`metrics`] - counters and stage timings
//! - [`validation`] - validation errors and rule helpers
//! - [`testing`] - fixtures and assertions

pub mod basket;
pub mod clean;
pub mod cltv;
pub mod combine;
pub mod config;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod records;
pub mod rfm;
pub mod testing;
pub mod validation;

pub use basket::{AssociationRule, BasketParams, BasketResult, FrequentItem, mine_rules};
pub use clean::{CleaningOptions, CleaningReport, clean, clean_with_report};
pub use cltv::{CltvCustomerRecord, CltvParams, CltvResult, CltvSegmentRecord, compute_cltv};
pub use combine::{CombineFn, ExecMode};
pub use config::Settings;
pub use io::ingest::{IngestError, IngestOptions, IngestResult, ingest_path, ingest_reader, ingest_str};
pub use io::repair::repair_headers;
pub use pipeline::{AnalysisReport, Analyzer, Notice};
pub use records::{CanonicalTransaction, ColumnMapping, RawRecord};
pub use rfm::{RfmRecord, Segment, compute_rfm};
pub use validation::{Validate, ValidationError};
