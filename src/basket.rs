//! Market-basket analysis over item pairs.
//!
//! A basket is the set of distinct descriptions on one invoice. Mining stops
//! at itemsets of size two: frequent single items are found first, every
//! unordered pair of them is a candidate, and each frequent pair yields two
//! directional rules `A -> B` and `B -> A`.
//!
//! | measure | definition |
//! |---|---|
//! | support(X) | baskets containing X / all baskets |
//! | confidence(A -> B) | support(A, B) / support(A) |
//! | lift(A -> B) | confidence(A -> B) / support(B) |

use crate::combine::{CombineFn, ExecMode, combine_by_key};
use crate::records::CanonicalTransaction;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Thresholds a frequent item or rule has to meet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketParams {
    pub min_support: f64,
    pub min_confidence: f64,
    pub min_lift: f64,
}

impl Default for BasketParams {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_confidence: 0.2,
            min_lift: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentItem {
    pub item: String,
    pub support: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: String,
    pub consequent: String,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasketResult {
    /// Sorted by lift, then support (both descending), then antecedent and consequent.
    pub rules: Vec<AssociationRule>,
    /// Sorted by support descending, ties by item.
    pub frequent_items: Vec<FrequentItem>,
    pub basket_count: usize,
}

/// Collects the distinct descriptions of an invoice.
struct BasketUnion;

impl<'a> CombineFn<&'a str, BTreeSet<&'a str>, BTreeSet<&'a str>> for BasketUnion {
    fn create(&self) -> BTreeSet<&'a str> {
        BTreeSet::new()
    }

    fn add_input(&self, acc: &mut BTreeSet<&'a str>, item: &'a str) {
        acc.insert(item);
    }

    fn merge(&self, acc: &mut BTreeSet<&'a str>, other: BTreeSet<&'a str>) {
        acc.extend(other);
    }

    fn finish(&self, acc: BTreeSet<&'a str>) -> BTreeSet<&'a str> {
        acc
    }
}

type PairCounts = HashMap<(usize, usize), u64>;

/// Count co-occurrences in baskets encoded as ascending frequent-item indices.
fn count_pairs(baskets: &[Vec<usize>]) -> PairCounts {
    let mut counts = PairCounts::new();
    for basket in baskets {
        for (i, &a) in basket.iter().enumerate() {
            for &b in &basket[i + 1..] {
                *counts.entry((a, b)).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn merge_pair_counts(mut left: PairCounts, right: PairCounts) -> PairCounts {
    for (pair, n) in right {
        *left.entry(pair).or_insert(0) += n;
    }
    left
}

#[allow(clippy::cast_precision_loss)]
fn ratio(count: u64, total: usize) -> f64 {
    count as f64 / total as f64
}

/// Mine pairwise association rules from `transactions`.
#[must_use]
pub fn mine_rules(transactions: &[CanonicalTransaction], params: &BasketParams) -> BasketResult {
    mine_rules_with(transactions, params, ExecMode::Sequential)
}

/// [`mine_rules`] with an explicit execution mode.
///
/// Both basket grouping and pair counting honour `mode`. Pair counting visits
/// every pair of frequent items inside every basket, so its cost is bounded by
/// `O(baskets * candidate pairs)`; there is no pruning beyond size two.
/// Every unordered pair of frequent items is a candidate, so pairs never seen
/// in the same basket still yield zero-support rules when the thresholds allow.
#[must_use]
pub fn mine_rules_with(
    transactions: &[CanonicalTransaction],
    params: &BasketParams,
    mode: ExecMode,
) -> BasketResult {
    let baskets: BTreeMap<&str, BTreeSet<&str>> = combine_by_key(
        transactions,
        |t| t.invoice_id.as_str(),
        |t| t.description.as_str(),
        &BasketUnion,
        mode,
    );
    let basket_count = baskets.len();
    if basket_count == 0 {
        return BasketResult::default();
    }

    let mut item_counts: BTreeMap<&str, u64> = BTreeMap::new();
    for &item in baskets.values().flatten() {
        *item_counts.entry(item).or_insert(0) += 1;
    }

    let mut frequent: Vec<(&str, f64)> = item_counts
        .into_iter()
        .map(|(item, n)| (item, ratio(n, basket_count)))
        .filter(|&(_, support)| support >= params.min_support)
        .collect();
    // BTreeMap order already breaks ties by label
    frequent.sort_by_key(|&(_, support)| std::cmp::Reverse(OrderedFloat(support)));

    let index: HashMap<&str, usize> = frequent
        .iter()
        .enumerate()
        .map(|(i, &(item, _))| (item, i))
        .collect();
    let encoded: Vec<Vec<usize>> = baskets
        .values()
        .map(|basket| {
            let mut ids: Vec<usize> = basket.iter().filter_map(|i| index.get(i).copied()).collect();
            ids.sort_unstable();
            ids
        })
        .filter(|ids| ids.len() > 1)
        .collect();

    let pair_counts = match mode.chunk_len(encoded.len()) {
        None => count_pairs(&encoded),
        Some(chunk) => encoded
            .par_chunks(chunk)
            .map(count_pairs)
            .reduce(PairCounts::new, merge_pair_counts),
    };
    debug!(
        candidates = frequent.len() * frequent.len().saturating_sub(1) / 2,
        observed = pair_counts.len(),
        "counted item pairs"
    );

    // every pair of frequent items is a candidate, co-occurring or not
    let mut rules = Vec::new();
    let candidates = (0..frequent.len()).flat_map(|a| (a + 1..frequent.len()).map(move |b| (a, b)));
    for (a, b) in candidates {
        let n = pair_counts.get(&(a, b)).copied().unwrap_or(0);
        let support = ratio(n, basket_count);
        if support < params.min_support {
            continue;
        }
        for (ante, cons) in [(a, b), (b, a)] {
            let (ante_item, ante_support) = frequent[ante];
            let (cons_item, cons_support) = frequent[cons];
            let confidence = support / ante_support;
            let lift = confidence / cons_support;
            if confidence >= params.min_confidence && lift >= params.min_lift {
                rules.push(AssociationRule {
                    antecedent: ante_item.to_string(),
                    consequent: cons_item.to_string(),
                    support,
                    confidence,
                    lift,
                });
            }
        }
    }
    rules.sort_by(|x, y| {
        OrderedFloat(y.lift)
            .cmp(&OrderedFloat(x.lift))
            .then_with(|| OrderedFloat(y.support).cmp(&OrderedFloat(x.support)))
            .then_with(|| x.antecedent.cmp(&y.antecedent))
            .then_with(|| x.consequent.cmp(&y.consequent))
    });

    let frequent_items: Vec<FrequentItem> = frequent
        .into_iter()
        .map(|(item, support)| FrequentItem {
            item: item.to_string(),
            support,
        })
        .collect();

    info!(
        baskets = basket_count,
        frequent_items = frequent_items.len(),
        rules = rules.len(),
        "mined association rules"
    );
    BasketResult {
        rules,
        frequent_items,
        basket_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_counted_once_per_basket() {
        let baskets = vec![vec![0, 1, 2], vec![0, 2], vec![1]];
        let counts = count_pairs(&baskets);
        assert_eq!(counts.get(&(0, 2)), Some(&2));
        assert_eq!(counts.get(&(0, 1)), Some(&1));
        assert_eq!(counts.get(&(1, 2)), Some(&1));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn merged_counts_add_up() {
        let left = count_pairs(&[vec![0, 1]]);
        let right = count_pairs(&[vec![0, 1], vec![1, 2]]);
        let merged = merge_pair_counts(left, right);
        assert_eq!(merged[&(0, 1)], 2);
        assert_eq!(merged[&(1, 2)], 1);
    }
}
