//! Job configuration.
//!
//! A [`JobSpec`] is built once through [`JobSpecBuilder`], validated, and is
//! read-only from then on. The driver shares it with every task behind an
//! `Arc`.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::config::EngineConfig;
use crate::engine::partition::hash_partition;
use crate::error::{MapReduceError, Result};
use crate::{Comparator, PartitionFn, Workload};

/// How individual map and reduce tasks are supervised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskPolicy {
    /// Wall-clock limit for a single attempt of a task.
    pub timeout: Option<Duration>,
    /// Total attempts per task, including the first one.
    pub max_attempts: u32,
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
        }
    }
}

/// Everything the driver needs to run one job.
pub struct JobSpec<I, K, V, OK, OV> {
    pub(crate) workload: Workload<I, K, V, OK, OV>,
    pub(crate) num_mappers: usize,
    pub(crate) num_reducers: usize,
    pub(crate) partition_fn: PartitionFn<K>,
    pub(crate) comparator: Comparator<K>,
    pub(crate) aux: Bytes,
    pub(crate) policy: TaskPolicy,
}

impl<I, K, V, OK, OV> JobSpec<I, K, V, OK, OV>
where
    K: Hash + Ord + 'static,
{
    pub fn builder(workload: Workload<I, K, V, OK, OV>) -> JobSpecBuilder<I, K, V, OK, OV> {
        JobSpecBuilder::new(workload)
    }
}

impl<I, K, V, OK, OV> JobSpec<I, K, V, OK, OV> {
    pub fn workload(&self) -> &Workload<I, K, V, OK, OV> {
        &self.workload
    }

    pub fn num_mappers(&self) -> usize {
        self.num_mappers
    }

    pub fn num_reducers(&self) -> usize {
        self.num_reducers
    }

    pub fn aux(&self) -> &Bytes {
        &self.aux
    }

    pub fn policy(&self) -> TaskPolicy {
        self.policy
    }

    pub fn has_combiner(&self) -> bool {
        self.workload.combine_fn.is_some()
    }
}

impl<I, K, V, OK, OV> Clone for JobSpec<I, K, V, OK, OV> {
    fn clone(&self) -> Self {
        Self {
            workload: self.workload.clone(),
            num_mappers: self.num_mappers,
            num_reducers: self.num_reducers,
            partition_fn: Arc::clone(&self.partition_fn),
            comparator: Arc::clone(&self.comparator),
            aux: self.aux.clone(),
            policy: self.policy,
        }
    }
}

impl<I, K, V, OK, OV> fmt::Debug for JobSpec<I, K, V, OK, OV> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("num_mappers", &self.num_mappers)
            .field("num_reducers", &self.num_reducers)
            .field("combiner", &self.workload.combine_fn.is_some())
            .field("aux_len", &self.aux.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`JobSpec`].
///
/// Defaults: one mapper, one reducer, [`hash_partition`], the key type's
/// natural order, empty auxiliary arguments, a single attempt and no timeout.
pub struct JobSpecBuilder<I, K, V, OK, OV> {
    workload: Workload<I, K, V, OK, OV>,
    num_mappers: usize,
    num_reducers: usize,
    partition_fn: PartitionFn<K>,
    comparator: Comparator<K>,
    aux: Bytes,
    policy: TaskPolicy,
}

impl<I, K, V, OK, OV> JobSpecBuilder<I, K, V, OK, OV>
where
    K: Hash + Ord + 'static,
{
    pub fn new(workload: Workload<I, K, V, OK, OV>) -> Self {
        Self {
            workload,
            num_mappers: 1,
            num_reducers: 1,
            partition_fn: Arc::new(|key: &K, num_reducers: usize| {
                hash_partition(key, num_reducers)
            }),
            comparator: Arc::new(|a: &K, b: &K| a.cmp(b)),
            aux: Bytes::new(),
            policy: TaskPolicy::default(),
        }
    }
}

impl<I, K, V, OK, OV> JobSpecBuilder<I, K, V, OK, OV> {
    pub fn mappers(mut self, num_mappers: usize) -> Self {
        self.num_mappers = num_mappers;
        self
    }

    pub fn reducers(mut self, num_reducers: usize) -> Self {
        self.num_reducers = num_reducers;
        self
    }

    /// Replace the bucket assignment. Keys the comparator considers equal must
    /// land in the same bucket.
    pub fn partition_fn<F>(mut self, partition_fn: F) -> Self
    where
        F: Fn(&K, usize) -> usize + Send + Sync + 'static,
    {
        self.partition_fn = Arc::new(partition_fn);
        self
    }

    /// Replace the key order. `Ordering::Equal` merges keys into one group.
    pub fn comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&K, &K) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.comparator = Arc::new(comparator);
        self
    }

    /// Auxiliary bytes handed to every map, combine and reduce call.
    pub fn aux(mut self, aux: impl Into<Bytes>) -> Self {
        self.aux = aux.into();
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = Some(timeout);
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    /// Apply the parallelism and task policy of an [`EngineConfig`].
    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.num_mappers = config.num_mappers;
        self.num_reducers = config.num_reducers;
        self.policy = TaskPolicy {
            timeout: config.task_timeout(),
            max_attempts: config.max_attempts,
        };
        self
    }

    pub fn build(self) -> Result<JobSpec<I, K, V, OK, OV>> {
        if self.num_mappers < 1 {
            return Err(MapReduceError::Config(
                "num_mappers must be at least 1".to_string(),
            ));
        }
        if self.num_reducers < 1 {
            return Err(MapReduceError::Config(
                "num_reducers must be at least 1".to_string(),
            ));
        }
        if self.policy.max_attempts < 1 {
            return Err(MapReduceError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.policy.timeout == Some(Duration::ZERO) {
            return Err(MapReduceError::Config(
                "task timeout must be greater than zero".to_string(),
            ));
        }

        Ok(JobSpec {
            workload: self.workload,
            num_mappers: self.num_mappers,
            num_reducers: self.num_reducers,
            partition_fn: self.partition_fn,
            comparator: self.comparator,
            aux: self.aux,
            policy: self.policy,
        })
    }
}
