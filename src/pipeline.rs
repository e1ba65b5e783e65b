//! End-to-end analysis: ingest, clean, score, mine.
//!
//! [`Analyzer`] wires the stages together with one [`Settings`] value:
//!
//! ```text
//! CSV ─► ingest ─(blank headers? repair, re-ingest)─► mapping check ─► clean
//!                                                                     │
//!                                   ┌─────────────────────────────────┤
//!                                   ▼                                 ▼
//!                                  RFM ─► CLTV                      basket
//! ```
//!
//! Structural ingestion failures and mapping mismatches are errors. Empty
//! results are not: they are reported as [`Notice`]s on the
//! [`AnalysisReport`].
//!
//! # Example
//!
//! ```
//! use ironcart::config::Settings;
//! use ironcart::pipeline::{Analyzer, Notice};
//! use ironcart::testing::sample_csv;
//!
//! # fn main() -> anyhow::Result<()> {
//! let report = Analyzer::new(Settings::default()).analyze_str(&sample_csv())?;
//! assert!(!report.rfm.is_empty());
//! assert!(!report.notices.contains(&Notice::NoTransactions));
//! # Ok(())
//! # }
//! ```

use crate::basket::{BasketResult, mine_rules_with};
use crate::clean::{CleaningReport, clean_with_report};
use crate::cltv::{CltvResult, compute_cltv};
use crate::config::Settings;
use crate::io::compression::auto_detect_reader;
use crate::io::ingest::{IngestResult, ingest_path, ingest_str};
use crate::io::repair::repair_and_ingest;
use crate::metrics::{self, PipelineMetrics};
use crate::rfm::{RfmRecord, compute_rfm_with};
use crate::validation::format_errors;
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// A non-fatal condition worth telling the user about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notice {
    /// Cleaning left no transactions; check the column mapping and options.
    NoTransactions,
    /// No item reached the minimum support.
    NoFrequentItems,
    /// Frequent items exist but no rule passed the thresholds.
    NoRules,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoTransactions => {
                "No valid transactions remain after cleaning; review the column mapping"
            }
            Self::NoFrequentItems => {
                "No item reaches the minimum support; try lowering min_support"
            }
            Self::NoRules => {
                "No association rules pass the thresholds; try relaxing confidence or lift"
            }
        })
    }
}

/// What ingestion produced, without the rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub headers: Vec<String>,
    pub row_count: usize,
    pub truncated: bool,
    pub skipped_rows: usize,
    /// Blank header names were replaced with placeholders before parsing.
    pub headers_repaired: bool,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub ingest: IngestSummary,
    pub cleaning: CleaningReport,
    pub rfm: Vec<RfmRecord>,
    pub cltv: CltvResult,
    pub basket: BasketResult,
    pub notices: Vec<Notice>,
    pub metrics: PipelineMetrics,
}

/// Runs the full analysis with fixed settings.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    settings: Settings,
}

impl Analyzer {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Analyze a CSV file, streaming it from disk.
    ///
    /// If the header has blank names the file is read again in full, the
    /// header is repaired and the text is parsed in memory.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, ingestion reports a
    /// structural problem or the column mapping does not match the header.
    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<AnalysisReport> {
        let path = path.as_ref();
        let mut metrics = PipelineMetrics::new();
        let start = Instant::now();
        let mut ingested = ingest_path(path, &self.settings.ingest)?;
        let mut repaired = false;
        if ingested.has_empty_headers {
            warn!(path = %path.display(), "blank header names, repairing and re-reading");
            let text = read_text(path)?;
            ingested = repair_and_ingest(&text, &self.settings.ingest);
            repaired = true;
        }
        metrics.record_stage("ingest", start.elapsed());
        self.analyze_ingested(ingested, repaired, metrics)
    }

    /// Analyze an in-memory CSV document, repairing blank header names.
    ///
    /// # Errors
    /// Same conditions as [`Analyzer::analyze_path`], minus file access.
    pub fn analyze_str(&self, text: &str) -> Result<AnalysisReport> {
        let mut metrics = PipelineMetrics::new();
        let start = Instant::now();
        let mut ingested = ingest_str(text, &self.settings.ingest);
        let mut repaired = false;
        if ingested.has_empty_headers {
            warn!("blank header names, repairing");
            ingested = repair_and_ingest(text, &self.settings.ingest);
            repaired = true;
        }
        metrics.record_stage("ingest", start.elapsed());
        self.analyze_ingested(ingested, repaired, metrics)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn analyze_ingested(
        &self,
        ingested: IngestResult,
        headers_repaired: bool,
        mut metrics: PipelineMetrics,
    ) -> Result<AnalysisReport> {
        if !ingested.is_ok() {
            bail!("ingestion failed: {}", ingested.error_messages().join("; "));
        }
        self.settings
            .mapping
            .validate_against(&ingested.headers)
            .map_err(|errs| anyhow!("column mapping does not match the source: {}", format_errors(&errs)))?;

        metrics.set_counter(metrics::ROWS_INGESTED, ingested.row_count as u64);
        metrics.set_counter(metrics::ROWS_SKIPPED, ingested.skipped_rows as u64);

        let (transactions, cleaning) = metrics.time_stage("clean", || {
            clean_with_report(&ingested.rows, &self.settings.mapping, &self.settings.cleaning)
        });
        metrics.set_counter(metrics::TRANSACTIONS, transactions.len() as u64);

        let mode = self.settings.execution.mode();
        let (rfm, cltv, basket) = self.run_in_pool(|| {
            let rfm = metrics.time_stage("rfm", || compute_rfm_with(&transactions, mode));
            let cltv = metrics.time_stage("cltv", || compute_cltv(&rfm, &self.settings.cltv));
            let basket = metrics.time_stage("basket", || {
                mine_rules_with(&transactions, &self.settings.basket, mode)
            });
            (rfm, cltv, basket)
        })?;
        metrics.set_counter(metrics::CUSTOMERS, rfm.len() as u64);
        metrics.set_counter(metrics::BASKETS, basket.basket_count as u64);
        metrics.set_counter(metrics::FREQUENT_ITEMS, basket.frequent_items.len() as u64);
        metrics.set_counter(metrics::RULES, basket.rules.len() as u64);

        let notices = collect_notices(transactions.is_empty(), &basket);
        for notice in &notices {
            info!(%notice, "analysis notice");
        }

        Ok(AnalysisReport {
            ingest: IngestSummary {
                headers: ingested.headers,
                row_count: ingested.row_count,
                truncated: ingested.truncated,
                skipped_rows: ingested.skipped_rows,
                headers_repaired,
            },
            cleaning,
            rfm,
            cltv,
            basket,
            notices,
            metrics,
        })
    }

    /// Run `f` on a dedicated pool when a thread count is configured.
    fn run_in_pool<T: Send>(&self, f: impl FnOnce() -> T + Send) -> Result<T> {
        match self.settings.execution.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("build analysis thread pool")?;
                Ok(pool.install(f))
            }
            None => Ok(f()),
        }
    }
}

fn collect_notices(no_transactions: bool, basket: &BasketResult) -> Vec<Notice> {
    if no_transactions {
        return vec![Notice::NoTransactions];
    }
    if basket.frequent_items.is_empty() {
        vec![Notice::NoFrequentItems, Notice::NoRules]
    } else if basket.rules.is_empty() {
        vec![Notice::NoRules]
    } else {
        Vec::new()
    }
}

/// Read a whole (possibly compressed) source as text.
fn read_text(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = auto_detect_reader(file, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::FrequentItem;

    #[test]
    fn empty_cleaning_only_reports_no_transactions() {
        let notices = collect_notices(true, &BasketResult::default());
        assert_eq!(notices, vec![Notice::NoTransactions]);
    }

    #[test]
    fn frequent_items_without_rules() {
        let basket = BasketResult {
            frequent_items: vec![FrequentItem {
                item: "Bread".into(),
                support: 1.0,
            }],
            ..BasketResult::default()
        };
        assert_eq!(collect_notices(false, &basket), vec![Notice::NoRules]);
    }
}
