//! Keyed aggregation with sequential or parallel execution.
//!
//! Engines describe their per-key aggregation as a [`CombineFn`]: how to
//! start an accumulator, fold one input into it, merge two partial
//! accumulators and turn the final accumulator into an output. [`combine_by_key`]
//! then runs it either in one pass or over rayon partitions whose partial
//! results are merged.
//!
//! Results come back in a `BTreeMap`, so both modes produce the same output
//! in the same key order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// A per-key aggregation: accumulator `A` over inputs `V`, producing `O`.
pub trait CombineFn<V, A, O>: Send + Sync {
    fn create(&self) -> A;
    fn add_input(&self, acc: &mut A, v: V);
    fn merge(&self, acc: &mut A, other: A);
    fn finish(&self, acc: A) -> O;
}

/// How CPU-bound aggregation runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecMode {
    /// Single-threaded, in input order.
    #[default]
    Sequential,
    /// Split the input into partitions processed on the rayon pool.
    /// `None` uses twice the number of CPUs.
    Parallel { partitions: Option<usize> },
}

impl ExecMode {
    /// Parallel mode with the default partition count.
    #[must_use]
    pub const fn parallel() -> Self {
        Self::Parallel { partitions: None }
    }

    /// Chunk length for splitting `len` items, or `None` to run sequentially.
    #[must_use]
    pub fn chunk_len(&self, len: usize) -> Option<usize> {
        match *self {
            Self::Sequential => None,
            Self::Parallel { .. } if !cfg!(feature = "parallel") => None,
            Self::Parallel { partitions } => {
                let parts = partitions
                    .unwrap_or_else(|| 2 * num_cpus::get().max(2))
                    .clamp(1, len.max(1));
                Some(len.div_ceil(parts).max(1))
            }
        }
    }
}

fn fold_chunk<'a, T, K, V, A, O, C>(
    items: &'a [T],
    key: &(impl Fn(&'a T) -> K + Sync),
    value: &(impl Fn(&'a T) -> V + Sync),
    comb: &C,
) -> HashMap<K, A>
where
    K: Eq + Hash,
    C: CombineFn<V, A, O>,
{
    let mut accs: HashMap<K, A> = HashMap::new();
    for item in items {
        let acc = accs.entry(key(item)).or_insert_with(|| comb.create());
        comb.add_input(acc, value(item));
    }
    accs
}

/// Aggregate `items` per key with `comb`.
///
/// `key` and `value` project each item. In parallel mode every partition
/// builds its own accumulators, which are then merged pairwise. Merges keep
/// partition order: `merge(acc, other)` always receives the later partition as
/// `other`, so a combiner that appends reproduces the sequential input order.
/// Combiners that fold floats eagerly may round differently between modes.
pub fn combine_by_key<'a, T, K, V, A, O, C>(
    items: &'a [T],
    key: impl Fn(&'a T) -> K + Sync,
    value: impl Fn(&'a T) -> V + Sync,
    comb: &C,
    mode: ExecMode,
) -> BTreeMap<K, O>
where
    T: Sync,
    K: Ord + Eq + Hash + Send,
    A: Send,
    C: CombineFn<V, A, O>,
{
    let accs = match mode.chunk_len(items.len()) {
        None => fold_chunk(items, &key, &value, comb),
        Some(chunk) => items
            .par_chunks(chunk)
            .map(|part| fold_chunk(part, &key, &value, comb))
            .reduce(HashMap::new, |mut left, right| {
                for (k, a) in right {
                    match left.get_mut(&k) {
                        Some(acc) => comb.merge(acc, a),
                        None => {
                            left.insert(k, a);
                        }
                    }
                }
                left
            }),
    };

    accs.into_iter()
        .map(|(k, a)| (k, comb.finish(a)))
        .collect()
}
