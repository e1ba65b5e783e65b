//! TOML configuration for an analysis run.
//!
//! Every section and key is optional; anything left out keeps its default.
//!
//! ```toml
//! [ingest]
//! row_limit = 500000
//! chunk_size = 65536
//!
//! [mapping]
//! customer_id = "Customer ID"
//! invoice_id = "Invoice"
//!
//! [cleaning]
//! remove_duplicate_transactions = true
//!
//! [basket]
//! min_support = 0.02
//! min_confidence = 0.3
//! min_lift = 1.2
//!
//! [cltv]
//! profit_margin = 0.25
//! discount_rate = 0.1
//! churn_override = 0.4
//!
//! [execution]
//! parallel = true
//! threads = 8
//! ```
//!
//! The row limit can also be set with the `IRONCART_ROW_LIMIT` environment
//! variable, which wins over the file.

use crate::basket::BasketParams;
use crate::clean::CleaningOptions;
use crate::cltv::CltvParams;
use crate::combine::ExecMode;
use crate::io::ingest::IngestOptions;
use crate::records::ColumnMapping;
use crate::validation::{
    Validate, ValidationResult, combine_validations, format_errors, validators,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding `[ingest] row_limit`.
pub const ROW_LIMIT_ENV: &str = "IRONCART_ROW_LIMIT";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnvVar { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// How CPU-bound stages run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Run aggregation and pair counting on the rayon pool.
    pub parallel: bool,
    /// Size of a dedicated thread pool; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl ExecutionSettings {
    #[must_use]
    pub const fn mode(&self) -> ExecMode {
        if self.parallel {
            ExecMode::parallel()
        } else {
            ExecMode::Sequential
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: IngestOptions,
    pub mapping: ColumnMapping,
    pub cleaning: CleaningOptions,
    pub basket: BasketParams,
    pub cltv: CltvParams,
    pub execution: ExecutionSettings,
}

impl Settings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    /// Returns [`SettingsError::ParseError`] for malformed TOML or mistyped keys.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from a file.
    ///
    /// # Errors
    /// Returns an error if the file is missing, unreadable or malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded settings file");
        Self::from_toml_str(&text)
    }

    /// Load from `path` (or defaults), apply environment overrides and validate.
    ///
    /// # Errors
    /// Returns an error if loading fails, an override is malformed or the
    /// resulting settings are out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        settings.apply_env()?;
        settings
            .validate()
            .map_err(|errs| SettingsError::InvalidConfig(format_errors(&errs)))?;
        Ok(settings)
    }

    /// Apply `IRONCART_ROW_LIMIT` if it is set.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidEnvVar`] if the value is not a number.
    pub fn apply_env(&mut self) -> Result<(), SettingsError> {
        match env::var(ROW_LIMIT_ENV) {
            Ok(raw) => self.apply_row_limit_override(&raw),
            Err(_) => Ok(()),
        }
    }

    /// Set the row limit from its textual form.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidEnvVar`] if `raw` is not a number.
    pub fn apply_row_limit_override(&mut self, raw: &str) -> Result<(), SettingsError> {
        let limit = raw
            .trim()
            .parse::<usize>()
            .map_err(|_| SettingsError::InvalidEnvVar {
                var: ROW_LIMIT_ENV,
                value: raw.to_string(),
            })?;
        debug!(limit, "row limit overridden from environment");
        self.ingest.row_limit = limit;
        Ok(())
    }
}

impl Validate for Settings {
    fn validate(&self) -> ValidationResult {
        let mut checks = vec![
            validators::at_least("ingest.row_limit", self.ingest.row_limit, 1),
            validators::at_least("ingest.chunk_size", self.ingest.chunk_size, 1),
            validators::in_range("basket.min_support", self.basket.min_support, 0.0, 1.0),
            validators::in_range(
                "basket.min_confidence",
                self.basket.min_confidence,
                0.0,
                1.0,
            ),
            validators::at_least("basket.min_lift", self.basket.min_lift, 0.0),
        ];
        if let Some(churn) = self.cltv.churn_override {
            checks.push(validators::in_range("cltv.churn_override", churn, 0.0, 1.0));
        }
        if let Some(threads) = self.execution.threads {
            checks.push(validators::at_least("execution.threads", threads, 1));
        }
        combine_validations(checks)
    }
}
