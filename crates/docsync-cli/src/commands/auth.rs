//! Auth commands - Login, Logout, and Status for the remote repository
//!
//! Provides the `docsync auth` CLI subcommands which:
//! 1. `login`  - Validates a token with a profile fetch and stores it in the
//!    system keyring.
//! 2. `logout` - Clears the stored credentials from the keyring.
//! 3. `status` - Signs in with the current credentials and shows the user.

use anyhow::{Context, Result};
use clap::Subcommand;
use docsync_core::domain::Credentials;
use docsync_remote::credentials::KeyringCredentialStore;
use tracing::info;

use super::Session;
use crate::output::{OutputFormat, Printer};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Validate a personal access token and store it
    Login {
        /// Personal access token
        #[arg(long)]
        token: String,
        /// Username for basic authentication
        #[arg(long)]
        username: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let printer = format.printer();
        match self {
            AuthCommand::Login { token, username } => {
                self.execute_login(session, token, username.as_deref(), &*printer)
                    .await
            }
            AuthCommand::Logout => self.execute_logout(session, &*printer),
            AuthCommand::Status => self.execute_status(session, &*printer).await,
        }
    }

    async fn execute_login(
        &self,
        session: &Session,
        token: &str,
        username: Option<&str>,
        printer: &dyn Printer,
    ) -> Result<()> {
        let credentials = Credentials::new(username.map(str::to_string), Some(token.to_string()));
        let adaptor = session.adaptor_with(Credentials::anonymous())?;

        adaptor
            .sign_in(credentials.username.clone(), credentials.token.clone())
            .await
            .context("Sign-in failed")?;
        let login = adaptor.get_user().login.unwrap_or_default();
        info!(login = %login, "Signed in");

        if !session.offline {
            KeyringCredentialStore::store(session.keyring_account(), &credentials)
                .context("Failed to store credentials in keyring")?;
        }

        printer.done(
            &format!("Signed in as {}", login),
            serde_json::json!({ "login": login }),
        );
        Ok(())
    }

    fn execute_logout(&self, session: &Session, printer: &dyn Printer) -> Result<()> {
        KeyringCredentialStore::clear(session.keyring_account())
            .context("Failed to clear credentials from keyring")?;
        printer.done("Signed out", serde_json::Value::Null);
        Ok(())
    }

    async fn execute_status(&self, session: &Session, printer: &dyn Printer) -> Result<()> {
        let credentials = session.credentials();
        if credentials.is_anonymous() {
            printer.note("Not signed in. Run 'docsync auth login --token <token>' first.");
            printer.value(serde_json::json!({ "signed_in": false, "login": null }));
            return Ok(());
        }

        let adaptor = session.adaptor_with(credentials)?;
        adaptor.start().await.context("Failed to reach the remote")?;
        let user = adaptor.get_user();
        let details = serde_json::to_value(&user)?;
        match &user.login {
            Some(login) => printer.done(&format!("Signed in as {}", login), details),
            None => {
                printer.warn("Stored credentials were rejected");
                printer.value(details);
            }
        }
        Ok(())
    }
}
