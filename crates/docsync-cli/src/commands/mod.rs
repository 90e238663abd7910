//! CLI subcommands and the shared session they run in

pub mod auth;
pub mod documents;
pub mod status;

use std::sync::Arc;

use anyhow::{bail, Result};
use docsync_core::{config::Config, domain::Credentials, ports::IRemoteApi};
use docsync_remote::{
    credentials::KeyringCredentialStore, github::GitHubApi, memory::MemoryRemoteApi,
    rate_limit::RateLimiter,
};
use docsync_sync::{adaptor::AdaptorSettings, SyncAdaptor, TidCodec};
use tracing::{debug, warn};

/// Login and token accepted by the in-memory repository
const OFFLINE_LOGIN: &str = "offline";
const OFFLINE_TOKEN: &str = "offline";

/// Configuration and mode shared by every command
#[derive(Debug)]
pub struct Session {
    pub config: Config,
    pub offline: bool,
}

impl Session {
    pub fn new(mut config: Config, offline: bool) -> Self {
        if offline {
            if config.remote.owner.is_empty() {
                config.remote.owner = OFFLINE_LOGIN.to_string();
            }
            if config.remote.repository.is_empty() {
                config.remote.repository = "documents".to_string();
            }
        }
        Self { config, offline }
    }

    /// Keyring entry holding the credentials for the configured API
    pub fn keyring_account(&self) -> &str {
        &self.config.remote.api_url
    }

    /// Credentials stored by `auth login`, if any. Keyring failures are
    /// logged and treated as nothing stored.
    pub fn stored_credentials(&self) -> Option<Credentials> {
        if self.offline {
            return None;
        }
        match KeyringCredentialStore::load(self.keyring_account()) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Could not read credentials from the keyring");
                None
            }
        }
    }

    /// Credentials to sign in with
    pub fn credentials(&self) -> Credentials {
        if self.offline {
            return Credentials::new(None, Some(OFFLINE_TOKEN.to_string()));
        }
        resolve_credentials(self.config.credentials(), || self.stored_credentials())
    }

    pub fn api(&self) -> Arc<dyn IRemoteApi> {
        if self.offline {
            debug!("Using the in-memory repository");
            Arc::new(MemoryRemoteApi::new().with_user(OFFLINE_LOGIN, OFFLINE_TOKEN))
        } else {
            Arc::new(GitHubApi::with_base_url(&self.config.remote.api_url))
        }
    }

    /// Checks the configuration, listing every problem found
    pub fn validate(&self) -> Result<()> {
        let errors = self.config.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "))
    }

    /// Builds a stopped adaptor with the given credentials
    pub fn adaptor_with(&self, credentials: Credentials) -> Result<SyncAdaptor> {
        self.validate()?;
        Ok(SyncAdaptor::new(
            AdaptorSettings::from_config(&self.config),
            self.api(),
            Arc::new(RateLimiter::from_config(&self.config.rate_limiting)),
            Arc::new(TidCodec::new()),
            credentials,
        ))
    }

    pub fn adaptor(&self) -> Result<SyncAdaptor> {
        self.adaptor_with(self.credentials())
    }
}

/// Configured credentials win over stored ones; the keyring is only
/// consulted when the configuration carries no token.
fn resolve_credentials(
    configured: Credentials,
    stored: impl FnOnce() -> Option<Credentials>,
) -> Credentials {
    if !configured.is_anonymous() {
        return configured;
    }
    stored().unwrap_or(configured)
}

#[cfg(test)]
mod tests {
    use docsync_core::config::ConfigBuilder;

    use super::*;

    #[test]
    fn test_configured_token_wins() {
        let configured = Credentials::new(None, Some("from-config".into()));
        let resolved = resolve_credentials(configured.clone(), || {
            panic!("keyring must not be consulted")
        });
        assert_eq!(resolved, configured);
    }

    #[test]
    fn test_stored_credentials_fill_in() {
        let stored = Credentials::new(Some("octocat".into()), Some("ghp_x".into()));
        let resolved = resolve_credentials(Credentials::anonymous(), || Some(stored.clone()));
        assert_eq!(resolved, stored);

        let resolved = resolve_credentials(Credentials::anonymous(), || None);
        assert!(resolved.is_anonymous());
    }

    #[test]
    fn test_offline_session_is_usable_without_remote_settings() {
        let session = Session::new(Config::default(), true);
        assert!(session.validate().is_ok());
        assert!(!session.credentials().is_anonymous());
        assert!(session.adaptor().is_ok());
    }

    #[test]
    fn test_invalid_configuration_is_reported() {
        let session = Session::new(Config::default(), false);
        let err = session.validate().unwrap_err().to_string();
        assert!(err.contains("remote.owner"));

        let config = ConfigBuilder::new()
            .remote_repository("octo", "wiki")
            .build();
        assert!(Session::new(config, false).validate().is_ok());
    }
}
