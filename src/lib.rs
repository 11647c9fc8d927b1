//! A single-process MapReduce (lite) engine.
//!
//! Users supply a map function, an optional combiner and a reduce function,
//! and the engine runs the classic phases (map, partition, shuffle, sort,
//! reduce) over `M` mapper tasks and `R` reducer tasks inside one process.
//! Grouping and ordering follow a real distributed MapReduce exactly, so the
//! output does not depend on how the tasks happened to be scheduled.

use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub mod config;
pub mod engine;
pub mod error;
pub mod standalone;
pub mod utils;
pub mod workload;

pub use config::EngineConfig;
pub use engine::{run_job, Driver, JobOutput, JobSpec, JobSpecBuilder};
pub use engine::partition::{hash_partition, ihash};
pub use error::MapReduceError;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accomodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput<K, V> =
    anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue<K, V>>>>>;

/// The values of one key, in group order, as seen by combine and reduce functions.
pub type Values<'a, V> = Box<dyn Iterator<Item = &'a V> + 'a>;

/// A map function takes a record and the job's auxiliary arguments.
///
/// It returns an iterator that yields intermediate key-value pairs.
pub type MapFn<I, K, V> = Arc<dyn Fn(&I, &Bytes) -> MapOutput<K, V> + Send + Sync>;

/// A combine function folds the values one split emitted for a key into a
/// (usually smaller) replacement list of pairs.
pub type CombineFn<K, V> =
    Arc<dyn Fn(&K, Values<'_, V>, &Bytes) -> anyhow::Result<Vec<KeyValue<K, V>>> + Send + Sync>;

/// A reduce function takes in a key, an iterator over values for that key,
/// and an auxiliary argument. It returns zero or more output pairs.
pub type ReduceFn<K, V, OK, OV> =
    Arc<dyn Fn(&K, Values<'_, V>, &Bytes) -> anyhow::Result<Vec<KeyValue<OK, OV>>> + Send + Sync>;

/// Assigns a key to a bucket in `[0, num_reducers)`.
pub type PartitionFn<K> = Arc<dyn Fn(&K, usize) -> usize + Send + Sync>;

/// Total order over intermediate keys. Keys comparing `Equal` are the same key.
pub type Comparator<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// A map reduce application.
pub struct Workload<I, K, V, OK, OV> {
    pub map_fn: MapFn<I, K, V>,
    pub combine_fn: Option<CombineFn<K, V>>,
    pub reduce_fn: ReduceFn<K, V, OK, OV>,
}

impl<I, K, V, OK, OV> Workload<I, K, V, OK, OV> {
    /// Build a workload from a map and a reduce function, without a combiner.
    pub fn new<M, R>(map_fn: M, reduce_fn: R) -> Self
    where
        M: Fn(&I, &Bytes) -> MapOutput<K, V> + Send + Sync + 'static,
        R: Fn(&K, Values<'_, V>, &Bytes) -> anyhow::Result<Vec<KeyValue<OK, OV>>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            map_fn: Arc::new(map_fn),
            combine_fn: None,
            reduce_fn: Arc::new(reduce_fn),
        }
    }

    /// Attach a combiner that runs on each split's output before partitioning.
    pub fn with_combiner<C>(mut self, combine_fn: C) -> Self
    where
        C: Fn(&K, Values<'_, V>, &Bytes) -> anyhow::Result<Vec<KeyValue<K, V>>>
            + Send
            + Sync
            + 'static,
    {
        self.combine_fn = Some(Arc::new(combine_fn));
        self
    }

    /// Drop the combiner, if any.
    pub fn without_combiner(mut self) -> Self {
        self.combine_fn = None;
        self
    }
}

impl<I, K, V, OK, OV> Clone for Workload<I, K, V, OK, OV> {
    fn clone(&self) -> Self {
        Self {
            map_fn: Arc::clone(&self.map_fn),
            combine_fn: self.combine_fn.clone(),
            reduce_fn: Arc::clone(&self.reduce_fn),
        }
    }
}

impl<I, K, V, OK, OV> fmt::Debug for Workload<I, K, V, OK, OV> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workload")
            .field("combiner", &self.combine_fn.is_some())
            .finish_non_exhaustive()
    }
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue<K, V> {
    /// The key.
    pub key: K,
    /// The value.
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Consumes the key-value pair and returns the key.
    #[inline]
    pub fn into_key(self) -> K {
        self.key
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }
}

impl KeyValue<Bytes, Bytes> {
    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Get the value of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn value(&self) -> Bytes {
        self.value.clone()
    }
}

impl<K, V> From<(K, V)> for KeyValue<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self { key, value }
    }
}

/// The pair type every registered workload reads and writes.
pub type ByteKeyValue = KeyValue<Bytes, Bytes>;

/// A workload whose records, keys and values are all raw bytes.
///
/// This is the shape used by the [`workload`] registry and the standalone runner.
pub type ByteWorkload = Workload<ByteKeyValue, Bytes, Bytes, Bytes, Bytes>;
