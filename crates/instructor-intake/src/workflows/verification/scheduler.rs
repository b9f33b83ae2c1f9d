use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use super::steps::StepId;

pub const DEFAULT_REVALIDATION_DELAY: Duration = Duration::from_millis(100);

/// Coalesces revalidation requests per step: a new request cancels the pending one
/// and restarts the delay.
#[derive(Debug)]
pub struct RevalidationScheduler {
    delay: Duration,
    pending: Mutex<HashMap<StepId, JoinHandle<()>>>,
}

impl RevalidationScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<StepId, JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Defer `task` on the ambient tokio runtime. Returns `false` when there is no
    /// runtime, in which case the caller is expected to run the work inline.
    pub fn schedule<F>(&self, step: StepId, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            return false;
        };

        let delay = self.delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });

        if let Some(previous) = self.pending().insert(step, handle) {
            if !previous.is_finished() {
                trace!(step = step.slug(), "coalescing revalidation");
            }
            previous.abort();
        }
        true
    }

    /// Cancel every queued run and report which steps still needed one.
    pub fn take_pending(&self) -> Vec<StepId> {
        let mut steps: Vec<StepId> = self
            .pending()
            .drain()
            .filter_map(|(step, handle)| {
                let outstanding = !handle.is_finished();
                handle.abort();
                outstanding.then_some(step)
            })
            .collect();
        steps.sort();
        steps
    }

    pub fn pending_count(&self) -> usize {
        self.pending()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Default for RevalidationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REVALIDATION_DELAY)
    }
}

impl Drop for RevalidationScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.pending().drain() {
            handle.abort();
        }
    }
}
