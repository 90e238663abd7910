//! Status command - Display synchronisation status
//!
//! Starts the adaptor (signing in when credentials are available) and shows
//! where documents are synchronised to and the resulting status snapshot.

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let printer = format.printer();
        let adaptor = session.adaptor()?;

        if let Err(e) = adaptor.start().await {
            printer.error(&format!("Failed to start synchronisation: {}", e));
        }

        let settings = adaptor.settings();
        let status = adaptor.status();
        let user = adaptor.get_user();
        let location = format!(
            "{}@{}:/{}",
            settings.repo, settings.branch, settings.path
        );

        match format {
            OutputFormat::Json => printer.value(serde_json::json!({
                "repository": settings.repo.to_string(),
                "branch": settings.branch,
                "path": settings.path,
                "status": status,
                "user": user,
            })),
            OutputFormat::Human => {
                printer.done(&format!("docsync: {}", status), serde_json::Value::Null);
                printer.note(&format!("Repository: {}", location));
                match user.login {
                    Some(login) => printer.note(&format!("User: {}", login)),
                    None => printer.note("User: anonymous (read-only)"),
                }
                if let Some(err) = &status.last_error {
                    printer.warn(err);
                }
            }
        }
        Ok(())
    }
}
