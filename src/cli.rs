//! CLI glue: argument exposure, client wiring and the user-facing summary.
//!
//! All pipeline logic lives in the library modules; this module parses flags,
//! loads [`RunConfig`] from flags + environment, constructs the real store and
//! completer clients, and runs [`review`]. The async [`run`] entrypoint exists
//! so integration tests can invoke the CLI programmatically.
//!
//! [`RunConfig`]: crate::config::RunConfig
//! [`review`]: crate::review::review

use anyhow::Result;
use clap::Parser;

use crate::auth::TokenProvider;
use crate::config::{Env, RunConfig};
use crate::google::GoogleDriveStore;
use crate::openai::OpenAiCompleter;
use crate::review::{self, ReviewError};

/// Generate a self-review report from date-ranged journal documents and
/// publish it back to the document store.
#[derive(Parser)]
#[clap(
    name = "auto-reviewer",
    version,
    about = "Fetch journal documents for a date range, generate a review report with an LLM, and publish it as a new document"
)]
pub struct Cli {
    /// Start of the date range, YYYY-MM-DD (default: seven days before the end)
    #[clap(long, value_name = "DATE")]
    pub start: Option<String>,

    /// End of the date range, YYYY-MM-DD (default: today)
    #[clap(long, value_name = "DATE")]
    pub end: Option<String>,

    /// Source folder id holding the journal documents (default: GOOGLE_DRIVE_FOLDER_ID)
    #[clap(long, value_name = "ID")]
    pub folder_id: Option<String>,

    /// Destination folder id for the generated report (default: GOOGLE_REPORT_FOLDER_ID)
    #[clap(long, value_name = "ID")]
    pub report_folder_id: Option<String>,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let env = Env::from_process();
    let config = RunConfig::load(&cli, &env).map_err(ReviewError::Config)?;
    config.trace_loaded();

    let auth = TokenProvider::from_cache(
        config.token_cache_path.clone(),
        config.credentials.google_client_id.clone(),
        config.credentials.google_client_secret.clone(),
    )
    .map_err(ReviewError::Config)?;
    let store = GoogleDriveStore::new(auth, config.credentials.google_api_key.clone());
    let completer = OpenAiCompleter::new(config.credentials.openai_api_key.clone());

    let outcome = match review::review(&config, &store, &completer).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::error!(stage = %error.stage(), error = %error, "Review failed");
            return Err(error.into());
        }
    };

    match &outcome.published {
        Some(report) => println!(
            "Report published: document {} in folder {}",
            report.document_id, report.folder_id
        ),
        None => println!(
            "No readable documents between {} and {}; no report published.",
            config.start, config.end
        ),
    }
    if !outcome.skipped.is_empty() {
        println!("Skipped {} unreadable document(s):", outcome.skipped.len());
        for warning in &outcome.skipped {
            println!("  - {warning}");
        }
    }

    Ok(())
}
