//! Orchestrates a job: map (with combine and partition), barrier, shuffle
//! per bucket, barrier, reduce per bucket, barrier, output in bucket order.

use std::fmt::Debug;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::job::JobSpec;
use super::shuffle::shuffle_sort;
use super::split::split_ranges;
use super::task::{run_phase, supervise, AttemptGuard};
use super::{map, reduce, Phase};
use crate::error::{MapReduceError, Result};
use crate::KeyValue;

/// The reduced output of a job, kept per bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOutput<OK, OV> {
    buckets: Vec<Vec<KeyValue<OK, OV>>>,
}

impl<OK, OV> JobOutput<OK, OV> {
    /// Output of every bucket, indexed by bucket.
    pub fn buckets(&self) -> &[Vec<KeyValue<OK, OV>>] {
        &self.buckets
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of output pairs.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Every output pair, bucket 0 first.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue<OK, OV>> {
        self.buckets.iter().flatten()
    }

    /// Consumes the output and returns the pairs, bucket 0 first.
    pub fn into_pairs(self) -> Vec<KeyValue<OK, OV>> {
        self.buckets.into_iter().flatten().collect()
    }
}

/// Runs jobs described by a [`JobSpec`].
///
/// The driver is the only place tasks are launched and joined.
pub struct Driver<I, K, V, OK, OV> {
    spec: Arc<JobSpec<I, K, V, OK, OV>>,
}

impl<I, K, V, OK, OV> Driver<I, K, V, OK, OV>
where
    I: Send + Sync + 'static,
    K: Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
    OK: Send + 'static,
    OV: Send + 'static,
{
    pub fn new(spec: JobSpec<I, K, V, OK, OV>) -> Self {
        Self {
            spec: Arc::new(spec),
        }
    }

    pub fn spec(&self) -> &JobSpec<I, K, V, OK, OV> {
        &self.spec
    }

    /// Runs the job over `input` and returns the output of every bucket.
    ///
    /// Any task failure aborts the job; no partial output is returned.
    pub async fn run(&self, input: Vec<I>) -> Result<JobOutput<OK, OV>> {
        let job_id = Uuid::new_v4();
        let span = info_span!(
            "job",
            %job_id,
            mappers = self.spec.num_mappers,
            reducers = self.spec.num_reducers
        );
        self.execute(input).instrument(span).await
    }

    async fn execute(&self, input: Vec<I>) -> Result<JobOutput<OK, OV>> {
        let num_mappers = self.spec.num_mappers;
        let num_reducers = self.spec.num_reducers;
        let policy = self.spec.policy;

        let records = input.len();
        let input = Arc::new(input);
        let splits = split_ranges(records, num_mappers);
        info!(records, combiner = self.spec.has_combiner(), "map phase started");

        let cancel = CancellationToken::new();
        let map_tasks = splits
            .into_iter()
            .enumerate()
            .map(|(split, range)| {
                let spec = Arc::clone(&self.spec);
                let input = Arc::clone(&input);
                let work = Arc::new(move |guard: &AttemptGuard| {
                    map::run_map_task(&spec, split, &input[range.clone()], guard)
                });
                supervise(Phase::Map, split, policy, cancel.clone(), work)
            })
            .collect();
        let map_outputs = run_phase(Phase::Map, &cancel, map_tasks).await?;

        // Barrier: every split is done. Runs are moved into their bucket in
        // mapper order, which is the order the shuffle merge relies on.
        let mut bucket_runs: Vec<Vec<Vec<KeyValue<K, V>>>> = (0..num_reducers)
            .map(|_| Vec::with_capacity(num_mappers))
            .collect();
        let mut emitted = 0;
        for output in map_outputs {
            emitted += output.emitted;
            for (bucket, run) in output.runs.into_iter().enumerate() {
                bucket_runs[bucket].push(run);
            }
        }
        info!(emitted, "map phase finished, shuffling");

        let cancel = CancellationToken::new();
        let shuffle_tasks = bucket_runs
            .into_iter()
            .enumerate()
            .map(|(bucket, runs)| {
                let spec = Arc::clone(&self.spec);
                async move {
                    tokio::task::spawn_blocking(move || {
                        shuffle_sort(runs, spec.comparator.as_ref())
                    })
                    .await
                    .map_err(|err| {
                        if err.is_panic() {
                            MapReduceError::TaskPanicked {
                                phase: Phase::Shuffle,
                                task: bucket,
                            }
                        } else {
                            MapReduceError::Join(err)
                        }
                    })
                }
            })
            .collect();
        let grouped = run_phase(Phase::Shuffle, &cancel, shuffle_tasks).await?;
        let groups: usize = grouped.iter().map(Vec::len).sum();
        info!(groups, "shuffle finished, reduce phase started");

        let cancel = CancellationToken::new();
        let reduce_tasks = grouped
            .into_iter()
            .enumerate()
            .map(|(bucket, groups)| {
                let spec = Arc::clone(&self.spec);
                let work = Arc::new(move |guard: &AttemptGuard| {
                    reduce::run_reduce_task(&spec, bucket, &groups, guard)
                });
                supervise(Phase::Reduce, bucket, policy, cancel.clone(), work)
            })
            .collect();
        let buckets = run_phase(Phase::Reduce, &cancel, reduce_tasks).await?;

        let output = JobOutput { buckets };
        info!(outputs = output.len(), "job finished");
        Ok(output)
    }

    /// Runs the job on a dedicated runtime, blocking the calling thread.
    ///
    /// The runtime's blocking pool holds `max(M, R)` threads per allowed
    /// attempt, so a retry never waits behind an abandoned attempt. Must not
    /// be called from inside a tokio runtime; use [`Driver::run`] there.
    pub fn run_blocking(&self, input: Vec<I>) -> Result<JobOutput<OK, OV>> {
        let attempts = self.spec.policy.max_attempts.max(1) as usize;
        let workers = self.spec.num_mappers.max(self.spec.num_reducers) * attempts;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("mrl-worker")
            .max_blocking_threads(workers)
            .enable_all()
            .build()?;

        let result = runtime.block_on(self.run(input));
        // Abandoned attempts may still be winding down; don't wait for them.
        runtime.shutdown_background();
        result
    }
}

/// Runs a job to completion on a dedicated runtime and returns its output,
/// bucket 0 first.
///
/// Blocks the calling thread; see [`Driver::run_blocking`]. Cloning a
/// [`JobSpec`] is cheap, its callbacks are shared.
pub fn run_job<I, K, V, OK, OV>(
    spec: &JobSpec<I, K, V, OK, OV>,
    input: Vec<I>,
) -> Result<Vec<KeyValue<OK, OV>>>
where
    I: Send + Sync + 'static,
    K: Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
    OK: Send + 'static,
    OV: Send + 'static,
{
    Driver::new(spec.clone())
        .run_blocking(input)
        .map(JobOutput::into_pairs)
}
