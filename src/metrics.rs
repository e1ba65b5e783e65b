//! Counters and stage timings for one analysis run.
//!
//! [`PipelineMetrics`] is filled in by [`Analyzer`](crate::pipeline::Analyzer)
//! as each stage finishes and can be printed or saved as JSON afterwards.
//!
//! # Example
//!
//! ```
//! use ironcart::metrics::{PipelineMetrics, ROWS_INGESTED};
//! use std::time::Duration;
//!
//! let mut m = PipelineMetrics::new();
//! m.set_counter(ROWS_INGESTED, 120);
//! m.record_stage("ingest", Duration::from_millis(15));
//!
//! let json = m.to_json();
//! assert_eq!(json["counters"][ROWS_INGESTED]["value"], 120);
//! assert_eq!(json["stages"]["ingest"]["ms"], 15);
//! ```

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

pub const ROWS_INGESTED: &str = "rows_ingested";
pub const ROWS_SKIPPED: &str = "rows_skipped";
pub const TRANSACTIONS: &str = "transactions";
pub const CUSTOMERS: &str = "customers";
pub const BASKETS: &str = "baskets";
pub const FREQUENT_ITEMS: &str = "frequent_items";
pub const RULES: &str = "rules";

fn describe(counter: &str) -> Option<&'static str> {
    Some(match counter {
        ROWS_INGESTED => "Data rows accepted by the parser",
        ROWS_SKIPPED => "Rows skipped for a column-count mismatch",
        TRANSACTIONS => "Transactions left after cleaning",
        CUSTOMERS => "Distinct customers scored",
        BASKETS => "Distinct invoices mined",
        FREQUENT_ITEMS => "Items at or above minimum support",
        RULES => "Association rules kept",
        _ => return None,
    })
}

/// Counters and per-stage durations of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    counters: BTreeMap<String, u64>,
    stages: Vec<(String, Duration)>,
}

impl PipelineMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a counter, replacing any previous value.
    pub fn set_counter(&mut self, name: &str, value: u64) {
        self.counters.insert(name.to_string(), value);
    }

    /// Add `value` to a counter, creating it at zero if needed.
    pub fn increment_counter(&mut self, name: &str, value: u64) {
        *self.counters.entry(name.to_string()).or_insert(0) += value;
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    /// Record how long a stage took. Stages keep their insertion order.
    pub fn record_stage(&mut self, name: &str, elapsed: Duration) {
        self.stages.push((name.to_string(), elapsed));
    }

    /// Run `f`, recording its wall time under `name`.
    pub fn time_stage<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record_stage(name, start.elapsed());
        out
    }

    #[must_use]
    pub fn stage(&self, name: &str) -> Option<Duration> {
        self.stages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| *d)
    }

    /// Sum of all recorded stage durations.
    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|(_, d)| *d).sum()
    }

    /// Metrics as a JSON object with `counters`, `stages` and `total_ms`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut counters = serde_json::Map::new();
        for (name, value) in &self.counters {
            let mut obj = serde_json::Map::new();
            obj.insert("value".to_string(), json!(value));
            if let Some(desc) = describe(name) {
                obj.insert("description".to_string(), json!(desc));
            }
            counters.insert(name.clone(), Value::Object(obj));
        }

        let mut stages = serde_json::Map::new();
        for (name, elapsed) in &self.stages {
            stages.insert(
                name.clone(),
                json!({ "ms": elapsed.as_millis(), "secs": elapsed.as_secs_f64() }),
            );
        }

        json!({
            "counters": counters,
            "stages": stages,
            "total_ms": self.total_elapsed().as_millis(),
        })
    }

    /// Print the metrics to stdout.
    pub fn print(&self) {
        println!("\n========== Analysis Metrics ==========");
        let total = self.total_elapsed();
        println!(
            "Execution Time: {:.3}s ({} ms)",
            total.as_secs_f64(),
            total.as_millis()
        );
        println!("--------------------------------------");
        for (name, elapsed) in &self.stages {
            println!("{name}: {} ms", elapsed.as_millis());
        }
        println!("--------------------------------------");
        for (name, value) in &self.counters {
            match describe(name) {
                Some(desc) => println!("{name}: {value} ({desc})"),
                None => println!("{name}: {value}"),
            }
        }
        println!("======================================\n");
    }

    /// Save the metrics as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
