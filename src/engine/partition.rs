//! Bucket assignment for intermediate keys.

use std::hash::{Hash, Hasher};

use fnv::FnvHasher;

use crate::error::{MapReduceError, Result};
use crate::PartitionFn;

/// FNV-1a that feeds integers as fixed-width little-endian bytes.
///
/// `Hash` writes slice lengths as `usize` and integers in native byte order,
/// which would make buckets depend on the platform.
struct StableHasher(FnvHasher);

impl Hasher for StableHasher {
    fn finish(&self) -> u64 {
        self.0.finish()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.write(bytes);
    }

    fn write_u16(&mut self, i: u16) {
        self.write(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn write_u128(&mut self, i: u128) {
        self.write(&i.to_le_bytes());
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    fn write_isize(&mut self, i: isize) {
        self.write_u64(i as i64 as u64);
    }
}

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
///
/// The hash is FNV-1a with a zero key, fed through the key's [`Hash`]
/// implementation and masked to 31 bits. It carries no per-process seed and
/// no platform-dependent widths, so a key lands in the same bucket on every
/// run and every machine.
pub fn ihash<T: Hash + ?Sized>(key: &T) -> u32 {
    let mut hasher = StableHasher(FnvHasher::with_key(0));
    key.hash(&mut hasher);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// The default partition function.
///
/// `num_reducers` of 0 is treated as 1.
pub fn hash_partition<K: Hash + ?Sized>(key: &K, num_reducers: usize) -> usize {
    ihash(key) as usize % num_reducers.max(1)
}

/// Runs `partition_fn` and checks that the bucket it picked exists.
pub(crate) fn assign<K>(
    partition_fn: &PartitionFn<K>,
    key: &K,
    num_reducers: usize,
    split: usize,
) -> Result<usize> {
    let bucket = partition_fn(key, num_reducers);
    if bucket >= num_reducers {
        return Err(MapReduceError::Partition {
            split,
            bucket,
            num_reducers,
        });
    }
    Ok(bucket)
}
