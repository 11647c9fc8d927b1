//! The map side of a job: map, combine, partition and the local sort of each
//! bucket's run.
//!
//! A map task owns one split. Nothing here is shared between splits, the
//! task returns its runs to the driver, which merges them after the barrier.

use bytes::Bytes;
use tracing::debug;

use super::job::JobSpec;
use super::partition;
use super::shuffle::{group_sorted, sort_run, Group};
use super::task::AttemptGuard;
use super::Phase;
use crate::error::{MapReduceError, Result};
use crate::{CombineFn, Comparator, KeyValue, MapFn, PartitionFn};

/// What one map task hands to the driver.
#[derive(Debug)]
pub struct MapTaskOutput<K, V> {
    /// One run per bucket, each stably sorted by the comparator.
    pub runs: Vec<Vec<KeyValue<K, V>>>,
    /// Pairs emitted by the map function, before combining.
    pub emitted: usize,
}

/// Calls `map_fn` on every record of a split, in order, and buffers what it emits.
///
/// `cancelled` is polled before each record.
pub fn map_split<I, K, V>(
    map_fn: &MapFn<I, K, V>,
    aux: &Bytes,
    split: usize,
    records: &[I],
    cancelled: impl Fn() -> bool,
) -> Result<Vec<KeyValue<K, V>>> {
    let mut buffer = Vec::new();
    for (offset, record) in records.iter().enumerate() {
        if cancelled() {
            return Err(MapReduceError::Cancelled {
                phase: Phase::Map,
                task: split,
            });
        }
        let failed = |source| MapReduceError::MapTask {
            split,
            offset: Some(offset),
            source,
        };
        for item in map_fn(record, aux).map_err(failed)? {
            buffer.push(item.map_err(failed)?);
        }
    }
    Ok(buffer)
}

/// Runs the combiner over one split's output.
///
/// Pairs are grouped by comparator equality, keeping emission order inside
/// each group, and every group is replaced by whatever `combine_fn` returns.
pub fn combine_split<K, V>(
    combine_fn: &CombineFn<K, V>,
    cmp: &Comparator<K>,
    aux: &Bytes,
    split: usize,
    mut pairs: Vec<KeyValue<K, V>>,
) -> Result<Vec<KeyValue<K, V>>> {
    sort_run(&mut pairs, cmp.as_ref());
    let mut combined = Vec::with_capacity(pairs.len());
    for Group { key, values } in group_sorted(pairs, cmp.as_ref()) {
        let replacement = combine_fn(&key, Box::new(values.iter()), aux).map_err(|source| {
            MapReduceError::MapTask {
                split,
                offset: None,
                source,
            }
        })?;
        combined.extend(replacement);
    }
    Ok(combined)
}

/// Distributes one split's pairs over `num_reducers` runs and sorts each run.
pub fn partition_split<K, V>(
    partition_fn: &PartitionFn<K>,
    cmp: &Comparator<K>,
    num_reducers: usize,
    split: usize,
    pairs: Vec<KeyValue<K, V>>,
) -> Result<Vec<Vec<KeyValue<K, V>>>> {
    let mut runs: Vec<Vec<KeyValue<K, V>>> = (0..num_reducers).map(|_| Vec::new()).collect();
    for pair in pairs {
        let bucket = partition::assign(partition_fn, &pair.key, num_reducers, split)?;
        runs[bucket].push(pair);
    }
    for run in &mut runs {
        sort_run(run, cmp.as_ref());
    }
    Ok(runs)
}

pub(crate) fn run_map_task<I, K, V, OK, OV>(
    spec: &JobSpec<I, K, V, OK, OV>,
    split: usize,
    records: &[I],
    guard: &AttemptGuard,
) -> Result<MapTaskOutput<K, V>> {
    let pairs = map_split(&spec.workload.map_fn, &spec.aux, split, records, || {
        guard.is_cancelled()
    })?;
    let emitted = pairs.len();

    let pairs = match &spec.workload.combine_fn {
        Some(combine_fn) => combine_split(combine_fn, &spec.comparator, &spec.aux, split, pairs)?,
        None => pairs,
    };
    let shuffled = pairs.len();

    let runs = partition_split(
        &spec.partition_fn,
        &spec.comparator,
        spec.num_reducers,
        split,
        pairs,
    )?;
    debug!(
        split,
        records = records.len(),
        emitted,
        shuffled,
        "map task done"
    );
    Ok(MapTaskOutput { runs, emitted })
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;
    use std::sync::Arc;

    use anyhow::anyhow;

    use super::*;
    use crate::{hash_partition, MapOutput, Values};

    fn words() -> MapFn<&'static str, String, u64> {
        Arc::new(|line: &&'static str, _aux: &Bytes| -> MapOutput<String, u64> {
            let pairs: Vec<anyhow::Result<KeyValue<String, u64>>> = line
                .split_whitespace()
                .map(|w| Ok(KeyValue::new(w.to_string(), 1)))
                .collect();
            Ok(Box::new(pairs.into_iter()))
        })
    }

    fn natural() -> Comparator<String> {
        Arc::new(|a: &String, b: &String| a.cmp(b))
    }

    fn sum_values(
        key: &String,
        values: Values<'_, u64>,
        _aux: &Bytes,
    ) -> anyhow::Result<Vec<KeyValue<String, u64>>> {
        Ok(vec![KeyValue::new(key.clone(), values.sum())])
    }

    fn refuse(
        key: &String,
        _values: Values<'_, u64>,
        _aux: &Bytes,
    ) -> anyhow::Result<Vec<KeyValue<String, u64>>> {
        Err(anyhow!("cannot combine {key}"))
    }

    fn summing() -> CombineFn<String, u64> {
        Arc::new(sum_values)
    }

    fn keys<V>(pairs: &[KeyValue<String, V>]) -> Vec<&str> {
        pairs.iter().map(|kv| kv.key.as_str()).collect()
    }

    #[test]
    fn map_split_keeps_emission_order() {
        let records = ["b a", "c", "", "a"];
        let pairs = map_split(&words(), &Bytes::new(), 0, &records, || false).unwrap();
        assert_eq!(keys(&pairs), vec!["b", "a", "c", "a"]);
    }

    #[test]
    fn map_error_reports_split_and_offset() {
        let map_fn: MapFn<&'static str, String, u64> =
            Arc::new(|line: &&'static str, _aux: &Bytes| -> MapOutput<String, u64> {
                if line.contains("bad") {
                    Err(anyhow!("cannot parse {line}"))
                } else {
                    Ok(Box::new(std::iter::empty::<anyhow::Result<KeyValue<String, u64>>>()))
                }
            });
        let records = ["ok", "ok", "bad record"];
        let err = map_split(&map_fn, &Bytes::new(), 3, &records, || false).unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::MapTask {
                split: 3,
                offset: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn lazy_iterator_errors_are_caught_too() {
        let map_fn: MapFn<&'static str, String, u64> =
            Arc::new(|_: &&'static str, _aux: &Bytes| -> MapOutput<String, u64> {
                let items: Vec<anyhow::Result<KeyValue<String, u64>>> =
                    vec![Ok(KeyValue::new("x".to_string(), 1)), Err(anyhow!("late"))];
                Ok(Box::new(items.into_iter()))
            });
        let err = map_split(&map_fn, &Bytes::new(), 0, &["one"], || false).unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::MapTask {
                offset: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn cancelled_split_stops_before_next_record() {
        let err = map_split(&words(), &Bytes::new(), 1, &["a"], || true).unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::Cancelled {
                phase: Phase::Map,
                task: 1
            }
        ));
    }

    #[test]
    fn combiner_folds_each_key_once() {
        let records = ["the cat sat", "the dog sat", "the end"];
        let pairs = map_split(&words(), &Bytes::new(), 0, &records, || false).unwrap();
        let combined = combine_split(&summing(), &natural(), &Bytes::new(), 0, pairs).unwrap();
        let counts: Vec<_> = combined.iter().map(|kv| (kv.key.as_str(), kv.value)).collect();
        assert_eq!(
            counts,
            vec![("cat", 1), ("dog", 1), ("end", 1), ("sat", 2), ("the", 3)]
        );
    }

    #[test]
    fn combiner_failure_has_no_offset() {
        let failing: CombineFn<String, u64> = Arc::new(refuse);
        let pairs = vec![KeyValue::new("k".to_string(), 1)];
        let err = combine_split(&failing, &natural(), &Bytes::new(), 5, pairs).unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::MapTask {
                split: 5,
                offset: None,
                ..
            }
        ));
    }

    #[test]
    fn partition_split_sorts_every_run() {
        let partition_fn: PartitionFn<String> =
            Arc::new(|key: &String, r: usize| hash_partition(key, r));
        let pairs: Vec<_> = ["d", "a", "c", "a", "b", "e"]
            .iter()
            .enumerate()
            .map(|(i, k)| KeyValue::new(k.to_string(), i))
            .collect();
        let runs = partition_split(&partition_fn, &natural(), 3, 0, pairs).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs.iter().map(Vec::len).sum::<usize>(), 6);
        for (bucket, run) in runs.iter().enumerate() {
            assert!(run
                .windows(2)
                .all(|w| w[0].key.cmp(&w[1].key) != Ordering::Greater));
            assert!(run.iter().all(|kv| hash_partition(&kv.key, 3) == bucket));
        }
        let a_values: Vec<_> = runs
            .iter()
            .flatten()
            .filter(|kv| kv.key == "a")
            .map(|kv| kv.value)
            .collect();
        assert_eq!(a_values, vec![1, 3]);
    }

    #[test]
    fn out_of_range_bucket_fails_the_split() {
        let partition_fn: PartitionFn<String> = Arc::new(|_: &String, r: usize| r);
        let pairs = vec![KeyValue::new("a".to_string(), 0)];
        let err = partition_split(&partition_fn, &natural(), 2, 4, pairs).unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::Partition {
                split: 4,
                bucket: 2,
                num_reducers: 2
            }
        ));
    }
}
