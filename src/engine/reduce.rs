//! The reduce side of a job: one call of the reduce function per group, in
//! key order, for every bucket.

use std::fmt::Debug;

use bytes::Bytes;
use tracing::debug;

use super::job::JobSpec;
use super::shuffle::Group;
use super::task::AttemptGuard;
use super::Phase;
use crate::error::{MapReduceError, Result};
use crate::{KeyValue, ReduceFn};

/// Calls `reduce_fn` once per group, in group order, and concatenates the
/// pairs it returns.
///
/// `cancelled` is polled before each group.
pub fn reduce_bucket<K, V, OK, OV>(
    reduce_fn: &ReduceFn<K, V, OK, OV>,
    aux: &Bytes,
    bucket: usize,
    groups: &[Group<K, V>],
    cancelled: impl Fn() -> bool,
) -> Result<Vec<KeyValue<OK, OV>>>
where
    K: Debug,
{
    let mut output = Vec::new();
    for group in groups {
        if cancelled() {
            return Err(MapReduceError::Cancelled {
                phase: Phase::Reduce,
                task: bucket,
            });
        }
        let pairs = reduce_fn(&group.key, Box::new(group.values.iter()), aux).map_err(|source| {
            MapReduceError::ReduceTask {
                bucket,
                key: format!("{:?}", group.key),
                source,
            }
        })?;
        output.extend(pairs);
    }
    Ok(output)
}

pub(crate) fn run_reduce_task<I, K, V, OK, OV>(
    spec: &JobSpec<I, K, V, OK, OV>,
    bucket: usize,
    groups: &[Group<K, V>],
    guard: &AttemptGuard,
) -> Result<Vec<KeyValue<OK, OV>>>
where
    K: Debug,
{
    let output = reduce_bucket(&spec.workload.reduce_fn, &spec.aux, bucket, groups, || {
        guard.is_cancelled()
    })?;
    debug!(bucket, groups = groups.len(), outputs = output.len(), "reduce task done");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::bail;

    use super::*;
    use crate::Values;

    fn group(key: &str, values: &[u64]) -> Group<String, u64> {
        Group {
            key: key.to_string(),
            values: values.to_vec(),
        }
    }

    fn sum_or_fail(
        key: &String,
        values: Values<'_, u64>,
        _aux: &Bytes,
    ) -> anyhow::Result<Vec<KeyValue<String, u64>>> {
        if key == "poison" {
            bail!("refusing to reduce {key}");
        }
        Ok(vec![KeyValue::new(key.clone(), values.sum())])
    }

    fn fan_out(
        key: &String,
        values: Values<'_, u64>,
        aux: &Bytes,
    ) -> anyhow::Result<Vec<KeyValue<String, u64>>> {
        let tag = std::str::from_utf8(aux)?;
        Ok(values
            .map(|v| KeyValue::new(format!("{tag}:{key}"), *v))
            .collect())
    }

    #[test]
    fn output_follows_group_order() {
        let reduce_fn: ReduceFn<String, u64, String, u64> = Arc::new(sum_or_fail);
        let groups = vec![group("a", &[1, 2]), group("b", &[5]), group("c", &[])];
        let out = reduce_bucket(&reduce_fn, &Bytes::new(), 0, &groups, || false).unwrap();
        let got: Vec<_> = out.iter().map(|kv| (kv.key.as_str(), kv.value)).collect();
        assert_eq!(got, vec![("a", 3), ("b", 5), ("c", 0)]);
    }

    #[test]
    fn reduce_may_emit_many_pairs_per_key() {
        let reduce_fn: ReduceFn<String, u64, String, u64> = Arc::new(fan_out);
        let groups = vec![group("w", &[7, 8])];
        let out = reduce_bucket(&reduce_fn, &Bytes::from("t"), 0, &groups, || false).unwrap();
        assert_eq!(
            out,
            vec![
                KeyValue::new("t:w".to_string(), 7),
                KeyValue::new("t:w".to_string(), 8)
            ]
        );
    }

    #[test]
    fn failure_names_bucket_and_key() {
        let reduce_fn: ReduceFn<String, u64, String, u64> = Arc::new(sum_or_fail);
        let groups = vec![group("fine", &[1]), group("poison", &[1])];
        let err = reduce_bucket(&reduce_fn, &Bytes::new(), 2, &groups, || false).unwrap_err();
        match err {
            MapReduceError::ReduceTask { bucket, key, .. } => {
                assert_eq!(bucket, 2);
                assert_eq!(key, "\"poison\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cancellation_is_checked_between_groups() {
        let reduce_fn: ReduceFn<String, u64, String, u64> = Arc::new(sum_or_fail);
        let groups = vec![group("a", &[1])];
        let err = reduce_bucket(&reduce_fn, &Bytes::new(), 1, &groups, || true).unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::Cancelled {
                phase: Phase::Reduce,
                task: 1
            }
        ));
    }
}
