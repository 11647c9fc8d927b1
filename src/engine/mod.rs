//! The MapReduce engine: splitting, map, combine, partition, shuffle, sort
//! and reduce, orchestrated by the [`Driver`].

use std::fmt;

pub mod driver;
pub mod job;
pub mod map;
pub mod partition;
pub mod reduce;
pub mod shuffle;
pub mod split;
mod task;

pub use driver::{run_job, Driver, JobOutput};
pub use job::{JobSpec, JobSpecBuilder, TaskPolicy};
pub use shuffle::{group_sorted, merge_runs, shuffle_sort, Group, KeyOrder};
pub use split::split_ranges;

/// The phases a job goes through. Each ends with a barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Map,
    Shuffle,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Map => "map",
            Phase::Shuffle => "shuffle",
            Phase::Reduce => "reduce",
        };
        f.write_str(name)
    }
}
