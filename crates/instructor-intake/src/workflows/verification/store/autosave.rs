use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use super::{SaveOutcome, VerificationStore};

/// Background task that calls [`VerificationStore::trigger_auto_save`] on a fixed
/// period with the store's remembered session. Stops when dropped.
#[derive(Debug)]
pub struct AutoSaver {
    handle: JoinHandle<()>,
}

impl AutoSaver {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: VerificationStore, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(session) = store.session() else {
                    trace!("auto-save idle: no session yet");
                    continue;
                };
                match store.trigger_auto_save(&session).await {
                    Ok(SaveOutcome::Saved {
                        verification_id, ..
                    }) => debug!(verification_id = %verification_id, "auto-saved draft"),
                    Ok(SaveOutcome::Skipped { reason }) => trace!(?reason, "auto-save skipped"),
                    Err(err) => warn!(error = %err, "auto-save failed"),
                }
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
