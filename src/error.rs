use std::time::Duration;

use thiserror::Error;

use crate::engine::Phase;

/// Everything that can abort a job.
///
/// Callback failures keep the callback's [`anyhow::Error`] as their source,
/// tagged with the split, bucket or key they happened on.
#[derive(Error, Debug)]
pub enum MapReduceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Partition function returned bucket {bucket} in split {split}, expected a bucket below {num_reducers}")]
    Partition {
        split: usize,
        bucket: usize,
        num_reducers: usize,
    },

    #[error("Map task for split {split} failed {}", failure_site(.offset))]
    MapTask {
        split: usize,
        /// Offset of the failing record within the split; `None` when the combiner failed.
        offset: Option<usize>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Reduce task for bucket {bucket} failed on key {key}")]
    ReduceTask {
        bucket: usize,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{phase} task {task} timed out after {timeout:?}")]
    TaskTimeout {
        phase: Phase,
        task: usize,
        timeout: Duration,
    },

    #[error("{phase} task {task} panicked")]
    TaskPanicked { phase: Phase, task: usize },

    #[error("{phase} task {task} was cancelled")]
    Cancelled { phase: Phase, task: usize },

    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl MapReduceError {
    /// Whether another attempt of the same task could succeed.
    ///
    /// Configuration and partition errors are deterministic and cancellation is
    /// a decision of the driver, so none of them are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MapReduceError::MapTask { .. }
                | MapReduceError::ReduceTask { .. }
                | MapReduceError::TaskTimeout { .. }
                | MapReduceError::TaskPanicked { .. }
        )
    }
}

fn failure_site(offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!("at record {offset}"),
        None => "in the combiner".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, MapReduceError>;
