//! Shuffle and sort: turns the runs every mapper produced for a bucket into
//! key-ordered groups.
//!
//! Each map task hands over one run per bucket, already stably sorted by the
//! comparator. The runs of a bucket are merged with a k-way heap merge in
//! which equal keys are released by ascending run (mapper) index, and within a
//! run in emission order. Adjacent keys the comparator considers equal are then
//! collapsed into a single [`Group`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::KeyValue;

/// A unique key and every value emitted for it, in shuffle order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group<K, V> {
    pub key: K,
    pub values: Vec<V>,
}

/// Borrowed form of a [`Comparator`](crate::Comparator).
pub type KeyOrder<K> = dyn Fn(&K, &K) -> Ordering + Send + Sync;

/// Stable sort of one run by key.
pub fn sort_run<K, V>(run: &mut [KeyValue<K, V>], cmp: &KeyOrder<K>) {
    run.sort_by(|a, b| cmp(&a.key, &b.key));
}

// The head of one run inside the merge heap. `BinaryHeap` is a max-heap, so
// the ordering is reversed: the smallest key, then the lowest run, is "greatest".
struct Head<'c, K, V> {
    pair: KeyValue<K, V>,
    run: usize,
    cmp: &'c KeyOrder<K>,
}

impl<K, V> Ord for Head<'_, K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.cmp)(&other.pair.key, &self.pair.key).then_with(|| other.run.cmp(&self.run))
    }
}

impl<K, V> PartialOrd for Head<'_, K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, V> PartialEq for Head<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K, V> Eq for Head<'_, K, V> {}

/// Merges sorted runs into one sorted sequence.
///
/// Equal keys keep run order first and position inside the run second, which
/// makes the merge equivalent to a stable sort of the runs' concatenation.
pub fn merge_runs<K, V>(runs: Vec<Vec<KeyValue<K, V>>>, cmp: &KeyOrder<K>) -> Vec<KeyValue<K, V>> {
    let total = runs.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);

    let mut sources: Vec<_> = runs.into_iter().map(Vec::into_iter).collect();
    let mut heap = BinaryHeap::with_capacity(sources.len());
    for (run, source) in sources.iter_mut().enumerate() {
        if let Some(pair) = source.next() {
            heap.push(Head { pair, run, cmp });
        }
    }

    while let Some(Head { pair, run, .. }) = heap.pop() {
        merged.push(pair);
        if let Some(next) = sources[run].next() {
            heap.push(Head {
                pair: next,
                run,
                cmp,
            });
        }
    }
    merged
}

/// Collapses a sorted sequence into groups of comparator-equal keys.
///
/// The first key of each run of equal keys becomes the group key.
pub fn group_sorted<K, V, T>(sorted: T, cmp: &KeyOrder<K>) -> Vec<Group<K, V>>
where
    T: IntoIterator<Item = KeyValue<K, V>>,
{
    let mut groups: Vec<Group<K, V>> = Vec::new();
    for KeyValue { key, value } in sorted {
        if let Some(last) = groups.last_mut() {
            if cmp(&last.key, &key) == Ordering::Equal {
                last.values.push(value);
                continue;
            }
        }
        groups.push(Group {
            key,
            values: vec![value],
        });
    }
    groups
}

/// Shuffle-sorts one bucket: merges the mappers' runs, ordered by mapper
/// index, and groups the result.
pub fn shuffle_sort<K, V>(runs: Vec<Vec<KeyValue<K, V>>>, cmp: &KeyOrder<K>) -> Vec<Group<K, V>> {
    group_sorted(merge_runs(runs, cmp), cmp)
}
