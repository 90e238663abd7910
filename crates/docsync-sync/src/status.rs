//! Change notifications for the synchronisation status
//!
//! The [`StatusNotifier`] holds the current [`SyncStatus`] in a
//! `watch` channel. Every update that changes at least one field wakes the
//! subscribers; updates that leave the snapshot as it was are silent.
//!
//! ```text
//! SyncAdaptor ──update()──→ watch::Sender<SyncStatus> ──→ subscribers (UI, CLI)
//! ```

use docsync_core::domain::SyncStatus;
use tokio::sync::watch;
use tracing::debug;

/// Publishes [`SyncStatus`] snapshots to any number of observers
#[derive(Debug)]
pub struct StatusNotifier {
    status_tx: watch::Sender<SyncStatus>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::default());
        Self { status_tx }
    }

    /// Applies `change` to the current status and notifies subscribers if
    /// the snapshot changed. Returns true in that case.
    pub fn update(&self, change: impl FnOnce(&mut SyncStatus)) -> bool {
        let changed = self.status_tx.send_if_modified(|status| {
            let before = status.clone();
            change(status);
            *status != before
        });
        if changed {
            debug!(status = %self.snapshot(), "Status changed");
        }
        changed
    }

    /// Receiver that observes every future change
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Copy of the current status
    pub fn snapshot(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}
