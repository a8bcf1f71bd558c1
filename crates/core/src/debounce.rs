//! Restartable quiet-period timer for volume notifications.

use crate::models::Volume;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Sleep};

/// Default quiet period before a volume is acted on
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

struct Pending {
    volume: Volume,
    deadline: Pin<Box<Sleep>>,
}

/// Holds at most one pending volume and its deadline.
///
/// The debouncer is owned by the task that awaits [`Debouncer::settled`], so
/// a [`Debouncer::cancel`] is complete when it returns and no stale window can
/// fire afterwards.
pub struct Debouncer {
    window: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a new window for `volume`, returning the volume it supersedes
    pub fn schedule(&mut self, volume: Volume) -> Option<Volume> {
        let superseded = self.cancel();
        self.pending = Some(Pending {
            volume,
            deadline: Box::pin(sleep(self.window)),
        });
        superseded
    }

    /// Drop the pending window, returning its volume
    pub fn cancel(&mut self) -> Option<Volume> {
        self.pending.take().map(|pending| pending.volume)
    }

    /// Wait for the pending window to elapse and hand back its volume.
    ///
    /// Never completes while idle. Cancel safe: dropping the future leaves the
    /// pending volume and deadline untouched.
    pub async fn settled(&mut self) -> Volume {
        let Some(pending) = self.pending.as_mut() else {
            return std::future::pending().await;
        };

        pending.deadline.as_mut().await;
        let volume = pending.volume;
        self.pending = None;
        volume
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
