//! Record types shared by the ingestion, cleaning and analysis stages.
//!
//! Ingestion produces [`RawRecord`]s: opaque header-to-cell mappings that keep
//! every column of the source. Cleaning joins them with a [`ColumnMapping`]
//! to derive fixed-shape [`CanonicalTransaction`]s, which are all the
//! downstream engines ever see.

use crate::validation::{ValidationError, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One data row of an ingested CSV source.
///
/// Cells are stored in header order. The header list is shared by every record
/// from the same source. Equality and hashing only consider the cell values,
/// which is what duplicate detection compares.
#[derive(Clone, Debug)]
pub struct RawRecord {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRecord {
    /// Build a record from a shared header list and its cells.
    ///
    /// The caller guarantees `values.len() == headers.len()`.
    #[must_use]
    pub fn new(headers: Arc<[String]>, values: Vec<String>) -> Self {
        debug_assert_eq!(headers.len(), values.len());
        Self { headers, values }
    }

    /// Cell value for `header`, if the column exists.
    #[must_use]
    pub fn get(&self, header: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == header)
            .map(|i| self.values[i].as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Iterate `(header, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for RawRecord {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for RawRecord {}

impl Hash for RawRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

/// Names the source header playing each canonical role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub customer_id: String,
    pub invoice_id: String,
    pub invoice_date: String,
    pub quantity: String,
    pub unit_price: String,
    pub description: String,
}

impl Default for ColumnMapping {
    /// The column names of the classic online-retail export.
    fn default() -> Self {
        Self {
            customer_id: "CustomerID".to_string(),
            invoice_id: "InvoiceNo".to_string(),
            invoice_date: "InvoiceDate".to_string(),
            quantity: "Quantity".to_string(),
            unit_price: "UnitPrice".to_string(),
            description: "Description".to_string(),
        }
    }
}

impl ColumnMapping {
    /// `(role, header)` pairs in a stable order.
    #[must_use]
    pub fn roles(&self) -> [(&'static str, &str); 6] {
        [
            ("customer_id", self.customer_id.as_str()),
            ("invoice_id", self.invoice_id.as_str()),
            ("invoice_date", self.invoice_date.as_str()),
            ("quantity", self.quantity.as_str()),
            ("unit_price", self.unit_price.as_str()),
            ("description", self.description.as_str()),
        ]
    }

    /// Check that every mapped header exists among `headers`.
    ///
    /// One error is reported per role whose header is missing.
    pub fn validate_against<S: AsRef<str>>(&self, headers: &[S]) -> ValidationResult {
        let known: HashSet<&str> = headers.iter().map(|h| h.as_ref()).collect();
        let errors: Vec<ValidationError> = self
            .roles()
            .into_iter()
            .filter(|(_, header)| !known.contains(header))
            .map(|(role, header)| {
                ValidationError::field(role, format!("column '{header}' not found in headers"))
                    .with_code("missing_column")
            })
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A cleaned, fully typed transaction line.
///
/// Only the cleaner constructs these; every instance satisfies
/// `total_price > 0`, a valid `invoice_date` and non-empty `invoice_id` and
/// `description`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub customer_id: String,
    pub invoice_id: String,
    pub description: String,
    pub invoice_date: DateTime<Utc>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}
