//! Assertions for floating-point results and sorted analysis output.

use crate::basket::AssociationRule;
use crate::cltv::CltvCustomerRecord;
use std::fmt::Debug;

/// Default absolute tolerance for [`assert_close`].
pub const EPSILON: f64 = 1e-9;

/// Assert that two floats differ by at most `tolerance`.
///
/// # Panics
///
/// Panics if either value is NaN or the difference exceeds `tolerance`.
///
/// # Example
///
/// ```
/// use ironcart::testing::assert_close;
///
/// assert_close(0.1 + 0.2, 0.3, 1e-12);
/// ```
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "Values differ:\n  Expected: {expected}\n  Actual: {actual}\n  Tolerance: {tolerance}"
    );
}

/// Assert that every element satisfies `predicate`.
///
/// # Panics
///
/// Panics with the first failing element and its index.
pub fn assert_all<T: Debug>(collection: &[T], predicate: impl Fn(&T) -> bool) {
    if let Some((i, item)) = collection.iter().enumerate().find(|(_, x)| !predicate(x)) {
        panic!("Predicate failed at index {i}: {item:?}\n  Full collection: {collection:?}");
    }
}

/// Assert that rules are in lift-descending order, ties by support descending.
///
/// # Panics
///
/// Panics at the first out-of-order pair.
pub fn assert_rules_sorted(rules: &[AssociationRule]) {
    for (i, w) in rules.windows(2).enumerate() {
        let ordered = w[0].lift > w[1].lift
            || (w[0].lift == w[1].lift && w[0].support >= w[1].support);
        assert!(
            ordered,
            "Rules out of order at index {i}:\n  {:?}\n  {:?}",
            w[0],
            w[1]
        );
    }
}

/// Assert that customer details are in CLTV-descending order.
///
/// # Panics
///
/// Panics at the first out-of-order pair.
pub fn assert_cltv_sorted(details: &[CltvCustomerRecord]) {
    for (i, w) in details.windows(2).enumerate() {
        assert!(
            w[0].cltv >= w[1].cltv,
            "Customers out of order at index {i}: {} ({}) before {} ({})",
            w[0].customer_id,
            w[0].cltv,
            w[1].customer_id,
            w[1].cltv
        );
    }
}
