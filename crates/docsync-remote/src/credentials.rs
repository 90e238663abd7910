//! Credential storage in the system keyring
//!
//! Tokens are kept in the OS credential store (GNOME Keyring, KDE Wallet,
//! macOS Keychain) under the service name "docsync", with one entry per
//! remote account. The entry holds the [`Credentials`] as JSON.

use anyhow::{Context, Result};
use docsync_core::domain::Credentials;
use tracing::{debug, info};

/// Keyring service name for stored credentials
const KEYRING_SERVICE: &str = "docsync";

/// Stores and retrieves remote credentials from the system keyring
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    fn entry(account: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, account).context("Failed to create keyring entry")
    }

    /// Stores credentials for `account` (typically the API host)
    pub fn store(account: &str, credentials: &Credentials) -> Result<()> {
        let json = encode(credentials)?;
        Self::entry(account)?
            .set_password(&json)
            .context("Failed to store credentials in keyring")?;

        debug!(account, "Stored credentials in keyring");
        Ok(())
    }

    /// Loads credentials for `account`, `None` if nothing is stored
    pub fn load(account: &str) -> Result<Option<Credentials>> {
        match Self::entry(account)?.get_password() {
            Ok(json) => {
                let credentials = decode(&json)?;
                debug!(account, "Loaded credentials from keyring");
                Ok(Some(credentials))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account, "No credentials found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes stored credentials for `account`. Nothing stored is not an error.
    pub fn clear(account: &str) -> Result<()> {
        match Self::entry(account)?.delete_credential() {
            Ok(()) => {
                info!(account, "Cleared credentials from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account, "No credentials to clear");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

fn encode(credentials: &Credentials) -> Result<String> {
    serde_json::to_string(credentials).context("Failed to serialize credentials")
}

fn decode(json: &str) -> Result<Credentials> {
    serde_json::from_str(json).context("Failed to deserialize credentials from keyring")
}
