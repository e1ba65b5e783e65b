//! Recency / Frequency / Monetary scoring and segmentation.
//!
//! Customers are scored against the whole current population: each metric is
//! ranked into quintiles over the sorted values of every customer, so adding
//! or removing customers can change everyone's scores. There is no
//! incremental update; recompute from the full transaction set.
//!
//! # Algorithm
//! 1. The snapshot date is one day after the latest transaction.
//! 2. Per customer: recency is the smallest whole number of days between a
//!    transaction and the snapshot, frequency the number of transactions and
//!    monetary the summed `total_price`.
//! 3. Each metric is ranked with [`quintile_rank`]; recency is inverted so
//!    that recent buyers score high.
//! 4. The three digits form the RFM code, mapped to a [`Segment`] through
//!    [`SEGMENT_TABLE`].

use crate::combine::{CombineFn, ExecMode, combine_by_key};
use crate::records::CanonicalTransaction;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Named customer segment derived from an RFM code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "Champions")]
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalist")]
    PotentialLoyalist,
    #[serde(rename = "Recent Customers")]
    RecentCustomers,
    #[serde(rename = "Promising")]
    Promising,
    #[serde(rename = "Customers Needing Attention")]
    NeedingAttention,
    #[serde(rename = "About to Sleep")]
    AboutToSleep,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Can't Lose Them")]
    CantLoseThem,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Others")]
    Others,
}

/// RFM codes for each named segment. Codes not listed map to [`Segment::Others`].
pub static SEGMENT_TABLE: &[(Segment, &[&str])] = &[
    (Segment::Champions, &["555", "554", "545"]),
    (Segment::LoyalCustomers, &["544", "455", "454", "445"]),
    (Segment::PotentialLoyalist, &["535", "534", "435", "434"]),
    (Segment::RecentCustomers, &["525", "524", "523"]),
    (Segment::Promising, &["355", "354", "345"]),
    (Segment::NeedingAttention, &["255", "254", "245"]),
    (Segment::AboutToSleep, &["333", "332", "323"]),
    (Segment::AtRisk, &["233", "232", "223"]),
    (Segment::CantLoseThem, &["155", "154", "145"]),
    (Segment::Lost, &["111", "112", "121"]),
];

impl Segment {
    /// Look up the segment for a three-digit RFM code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        SEGMENT_TABLE
            .iter()
            .find(|(_, codes)| codes.contains(&code))
            .map_or(Self::Others, |(segment, _)| *segment)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Champions => "Champions",
            Self::LoyalCustomers => "Loyal Customers",
            Self::PotentialLoyalist => "Potential Loyalist",
            Self::RecentCustomers => "Recent Customers",
            Self::Promising => "Promising",
            Self::NeedingAttention => "Customers Needing Attention",
            Self::AboutToSleep => "About to Sleep",
            Self::AtRisk => "At Risk",
            Self::CantLoseThem => "Can't Lose Them",
            Self::Lost => "Lost",
            Self::Others => "Others",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scores and segment of one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmRecord {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub rfm_score: String,
    pub segment: Segment,
}

/// Quintile (1-5) of `value` within the ascending `sorted` population.
///
/// The thresholds are the values at indices `floor(n*k/5)` for `k = 1..=4`;
/// the rank is the first `k` whose threshold is `>= value`, or 5 if none is.
///
/// # Examples
/// ```
/// use ironcart::rfm::quintile_rank;
///
/// let s: Vec<f64> = (1..=10).map(f64::from).collect();
/// assert_eq!(quintile_rank(10.0, &s), 5);
/// assert_eq!(quintile_rank(1.0, &s), 1);
/// ```
#[must_use]
pub fn quintile_rank(value: f64, sorted: &[f64]) -> u8 {
    let n = sorted.len();
    if n == 0 {
        return 1;
    }
    for k in 1..=4u8 {
        let idx = n * usize::from(k) / 5;
        if value <= sorted[idx] {
            return k;
        }
    }
    5
}

#[derive(Debug, Clone, Copy)]
struct CustomerTotals {
    recency: i64,
    frequency: u64,
    monetary: f64,
}

/// Per-customer accumulator. Line totals stay in input order so the monetary
/// sum rounds the same way however the input was partitioned.
struct CustomerParts {
    recency: i64,
    frequency: u64,
    amounts: Vec<f64>,
}

/// Folds a customer's transactions into recency/frequency/monetary totals.
struct CustomerAggregate {
    snapshot: DateTime<Utc>,
}

impl<'a> CombineFn<&'a CanonicalTransaction, CustomerParts, CustomerTotals> for CustomerAggregate {
    fn create(&self) -> CustomerParts {
        CustomerParts {
            recency: i64::MAX,
            frequency: 0,
            amounts: Vec::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn add_input(&self, acc: &mut CustomerParts, t: &'a CanonicalTransaction) {
        let days = (self.snapshot - t.invoice_date).num_milliseconds() as f64 / MS_PER_DAY;
        acc.recency = acc.recency.min(days.round() as i64);
        acc.frequency += 1;
        acc.amounts.push(t.total_price);
    }

    fn merge(&self, acc: &mut CustomerParts, other: CustomerParts) {
        acc.recency = acc.recency.min(other.recency);
        acc.frequency += other.frequency;
        acc.amounts.extend(other.amounts);
    }

    fn finish(&self, acc: CustomerParts) -> CustomerTotals {
        CustomerTotals {
            recency: acc.recency,
            frequency: acc.frequency,
            monetary: acc.amounts.iter().sum(),
        }
    }
}

fn sorted_column(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Score every customer in `transactions`.
///
/// Records are returned sorted by customer id. Empty input yields no records.
#[must_use]
pub fn compute_rfm(transactions: &[CanonicalTransaction]) -> Vec<RfmRecord> {
    compute_rfm_with(transactions, ExecMode::Sequential)
}

/// [`compute_rfm`] with an explicit execution mode for the per-customer pass.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_rfm_with(transactions: &[CanonicalTransaction], mode: ExecMode) -> Vec<RfmRecord> {
    let Some(latest) = transactions.iter().map(|t| t.invoice_date).max() else {
        return Vec::new();
    };
    let snapshot = latest + Duration::days(1);

    let totals: BTreeMap<String, CustomerTotals> = combine_by_key(
        transactions,
        |t: &CanonicalTransaction| t.customer_id.clone(),
        |t| t,
        &CustomerAggregate { snapshot },
        mode,
    );

    let recencies = sorted_column(totals.values().map(|c| c.recency as f64));
    let frequencies = sorted_column(totals.values().map(|c| c.frequency as f64));
    let monetaries = sorted_column(totals.values().map(|c| c.monetary));

    let records: Vec<RfmRecord> = totals
        .into_iter()
        .map(|(customer_id, c)| {
            let r_score = 5 - (quintile_rank(c.recency as f64, &recencies) - 1);
            let f_score = quintile_rank(c.frequency as f64, &frequencies);
            let m_score = quintile_rank(c.monetary, &monetaries);
            let rfm_score = format!("{r_score}{f_score}{m_score}");
            let segment = Segment::from_code(&rfm_score);
            RfmRecord {
                customer_id,
                recency: c.recency,
                frequency: c.frequency,
                monetary: c.monetary,
                r_score,
                f_score,
                m_score,
                rfm_score,
                segment,
            }
        })
        .collect();

    info!(customers = records.len(), snapshot = %snapshot, "computed RFM scores");
    records
}

/// Number of customers per segment, largest first (ties by segment order).
#[must_use]
pub fn segment_counts(records: &[RfmRecord]) -> Vec<(Segment, usize)> {
    let mut counts: BTreeMap<Segment, usize> = BTreeMap::new();
    for r in records {
        *counts.entry(r.segment).or_default() += 1;
    }
    let mut out: Vec<(Segment, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    out
}
