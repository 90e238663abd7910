//! Observable synchronisation status
//!
//! [`SyncStatus`] is the snapshot emitted to observers (UI, CLI) whenever
//! any of its fields changes. Authentication is one of signed out, signing
//! in, or signed in; `synchronising` and `rate_limited` are independent.

use serde::{Deserialize, Serialize};

/// Snapshot of the synchronisation state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub signed_in: bool,
    pub signing_in: bool,
    pub synchronising: bool,
    pub rate_limited: bool,
    pub last_error: Option<String>,
}

impl SyncStatus {
    pub fn mark_signed_out(&mut self) {
        self.signed_in = false;
        self.signing_in = false;
    }

    pub fn mark_signing_in(&mut self) {
        self.signed_in = false;
        self.signing_in = true;
    }

    pub fn mark_signed_in(&mut self) {
        self.signed_in = true;
        self.signing_in = false;
    }

    /// Returns true when the document store may be read (synchronisation is running)
    pub fn is_ready(&self) -> bool {
        self.synchronising
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = if self.signed_in {
            "signed in"
        } else if self.signing_in {
            "signing in"
        } else {
            "signed out"
        };
        let sync = if self.synchronising {
            "synchronising"
        } else {
            "stopped"
        };
        write!(f, "{}, {}", auth, sync)?;
        if self.rate_limited {
            write!(f, ", rate limited")?;
        }
        if let Some(err) = &self.last_error {
            write!(f, " (last error: {})", err)?;
        }
        Ok(())
    }
}
