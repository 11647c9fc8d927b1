//! Task supervision: attempts, timeouts, cancellation and phase barriers.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::job::TaskPolicy;
use super::Phase;
use crate::error::{MapReduceError, Result};

/// What a running attempt polls to know whether it should stop: the phase
/// was aborted, or this particular attempt was abandoned after a timeout.
///
/// The attempt token is a child of the phase token, so cancelling the phase
/// reaches every attempt while abandoning one attempt leaves the phase alone.
#[derive(Clone, Debug)]
pub(crate) struct AttemptGuard {
    token: CancellationToken,
}

impl AttemptGuard {
    pub(crate) fn new(phase: &CancellationToken) -> Self {
        Self {
            token: phase.child_token(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn abandon(&self) {
        self.token.cancel();
    }
}

/// Runs `work` on the blocking pool until it succeeds, fails with an error
/// that cannot be retried, or runs out of attempts.
///
/// The timeout of an attempt starts when the attempt gets a thread, not when
/// it is queued.
pub(crate) async fn supervise<T, F>(
    phase: Phase,
    task: usize,
    policy: TaskPolicy,
    cancel: CancellationToken,
    work: Arc<F>,
) -> Result<T>
where
    F: Fn(&AttemptGuard) -> Result<T> + Send + Sync + 'static,
    T: Send + 'static,
{
    let mut attempt = 1;
    loop {
        let guard = AttemptGuard::new(&cancel);
        let abandon = guard.clone();
        let work = Arc::clone(&work);
        let (started_tx, started_rx) = oneshot::channel();
        let handle = tokio::task::spawn_blocking(move || {
            // Nobody listens once the supervisor has moved on.
            let _ = started_tx.send(());
            work(&guard)
        });

        let joined = match policy.timeout {
            Some(limit) => {
                // A dropped sender means the closure never ran; the join
                // below reports why.
                let _ = started_rx.await;
                match tokio::time::timeout(limit, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        // The blocking thread cannot be killed; it stops at its next check.
                        abandon.abandon();
                        Ok(Err(MapReduceError::TaskTimeout {
                            phase,
                            task,
                            timeout: limit,
                        }))
                    }
                }
            }
            None => handle.await,
        };

        let result = match joined {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(MapReduceError::TaskPanicked { phase, task }),
            Err(err) => Err(MapReduceError::Join(err)),
        };

        match result {
            Err(err)
                if err.is_retryable()
                    && attempt < policy.max_attempts
                    && !cancel.is_cancelled() =>
            {
                warn!(%phase, task, attempt, error = %err, "task attempt failed, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Runs every task of a phase concurrently and waits for all of them.
///
/// Results come back in task order regardless of completion order. The first
/// failure cancels `cancel`, aborts the remaining tasks and is returned as is.
pub(crate) async fn run_phase<T, Fut>(
    phase: Phase,
    cancel: &CancellationToken,
    tasks: Vec<Fut>,
) -> Result<Vec<T>>
where
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let count = tasks.len();
    let mut set = JoinSet::new();
    for (index, task) in tasks.into_iter().enumerate() {
        set.spawn(async move { (index, task.await) });
    }

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Ok(output))) => {
                debug!(%phase, task = index, "task finished");
                slots[index] = Some(output);
            }
            Ok((index, Err(err))) => {
                debug!(%phase, task = index, error = %err, "task failed, cancelling phase");
                cancel.cancel();
                set.abort_all();
                return Err(err);
            }
            Err(err) => {
                cancel.cancel();
                set.abort_all();
                return Err(err.into());
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
