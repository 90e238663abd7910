//! Document commands - list, get, put and rm
//!
//! Each command builds an adaptor, lets it start (signing in when
//! credentials are available) and performs one document operation.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Args;
use docsync_core::{
    domain::{Document, Fields, TITLE_FIELD},
    ports::{IDocumentCodec, SaveOutcome},
};
use docsync_sync::TidCodec;
use tracing::debug;

use super::Session;
use crate::output::{short_revision, OutputFormat};

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Wait for the summaries to be loaded or computed
    #[arg(long)]
    pub wait: bool,
}

impl ListCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let printer = format.printer();
        let adaptor = session.adaptor()?;

        let mut summaries = adaptor.get_summaries().await?;
        if self.wait {
            let poll = Duration::from_secs(session.config.summaries.poll_interval);
            loop {
                match tokio::time::timeout(poll, adaptor.wait_for_summaries()).await {
                    Ok(result) => {
                        summaries = result?;
                        break;
                    }
                    Err(_) => {
                        let status = adaptor.status();
                        printer.note(&format!("Still loading summaries ({})", status));
                    }
                }
            }
        }

        printer.summaries(&summaries);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct GetCommand {
    /// Document title
    pub title: String,
}

impl GetCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let adaptor = session.adaptor()?;

        let document = adaptor
            .load_document(&self.title)
            .await
            .with_context(|| format!("Failed to load {}", self.title))?;

        format.printer().document(&document);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct PutCommand {
    /// Local `.tid` file to save
    pub file: PathBuf,
}

impl PutCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let mut document = read_document(&self.file).await?;
        let adaptor = session.adaptor()?;

        let outcome = adaptor
            .save_document(&mut document)
            .await
            .with_context(|| format!("Failed to save {}", document.title()))?;

        let message = match &outcome {
            SaveOutcome::Saved { revision } => {
                format!("Saved {} ({})", document.title(), short_revision(revision))
            }
            SaveOutcome::Unchanged => format!("{} is already up to date", document.title()),
            SaveOutcome::Skipped => format!("{} has no new revision", document.title()),
        };
        format.printer().done(
            &message,
            serde_json::json!({
                "title": document.title(),
                "revision": document.revision(),
                "path": adaptor.get_document_metadata(document.title()).path,
            }),
        );
        Ok(())
    }
}

/// Parses a local document file; it must hold exactly one document
async fn read_document(file: &Path) -> Result<Document> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let mut defaults = Fields::new();
    if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
        defaults.insert(TITLE_FIELD.to_string(), stem.to_string());
    }

    let mut documents = TidCodec
        .deserialize(&extension, &content, &defaults)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    if documents.len() != 1 {
        bail!(
            "{} holds {} documents, expected exactly one",
            file.display(),
            documents.len()
        );
    }
    let document = documents.remove(0);
    debug!(title = document.title(), "Parsed local document");
    Ok(document)
}

#[derive(Debug, Args)]
pub struct RmCommand {
    /// Document title
    pub title: String,
}

impl RmCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let adaptor = session.adaptor()?;

        adaptor
            .delete_document(&self.title)
            .await
            .with_context(|| format!("Failed to delete {}", self.title))?;
        format.printer().done(
            &format!("Deleted {}", self.title),
            serde_json::json!({ "title": self.title }),
        );
        Ok(())
    }
}
