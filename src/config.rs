//! Run configuration: CLI flags merged over environment values over defaults.
//!
//! This is the only place run parameters are resolved. The merge is pure: the
//! environment is read once into an [`Env`] snapshot, so precedence and
//! validation stay testable without touching process state.

use std::fmt;
use std::path::PathBuf;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info};

use crate::cli::Cli;
use crate::contract::ConfigError;

/// Default token cache location, overridable with `GOOGLE_TOKEN_PATH`.
pub const DEFAULT_TOKEN_CACHE: &str = "token.json";

/// Days subtracted from the end date for the default window (7 days inclusive).
const DEFAULT_RANGE_DAYS: u64 = 6;

/// Snapshot of the recognized environment keys.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub drive_folder_id: Option<String>,
    pub report_folder_id: Option<String>,
    pub token_path: Option<String>,
}

impl Env {
    pub fn from_process() -> Self {
        fn var(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|value| !value.trim().is_empty())
        }
        Self {
            google_client_id: var("GOOGLE_CLIENT_ID"),
            google_client_secret: var("GOOGLE_CLIENT_SECRET"),
            openai_api_key: var("OPENAI_API_KEY"),
            google_api_key: var("GOOGLE_API_KEY"),
            drive_folder_id: var("GOOGLE_DRIVE_FOLDER_ID"),
            report_folder_id: var("GOOGLE_REPORT_FOLDER_ID"),
            token_path: var("GOOGLE_TOKEN_PATH"),
        }
    }
}

/// API credentials resolved at startup. Opaque to the pipeline; only the
/// concrete clients look inside.
#[derive(Clone)]
pub struct Credentials {
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Optional API key sent alongside OAuth for quota attribution.
    pub google_api_key: Option<String>,
    pub openai_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("google_client_id", &self.google_client_id)
            .field("google_client_secret", &"<redacted>")
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

/// Immutable parameters for one run. Invariant: `start <= end`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source_folder_id: String,
    pub destination_folder_id: String,
    pub token_cache_path: PathBuf,
    pub credentials: Credentials,
}

impl RunConfig {
    /// Merge and validate. Precedence: CLI flag, then environment, then default
    /// (date range only: most recent 7 days ending today).
    pub fn load(cli: &Cli, env: &Env) -> Result<Self, ConfigError> {
        let end = match cli.end.as_deref() {
            Some(raw) => parse_date("--end", raw)?,
            None => today(),
        };
        let start = match cli.start.as_deref() {
            Some(raw) => parse_date("--start", raw)?,
            None => end.checked_sub_days(Days::new(DEFAULT_RANGE_DAYS)).unwrap_or(end),
        };
        if start > end {
            return Err(ConfigError::ReversedRange { start, end });
        }

        let source_folder_id = cli
            .folder_id
            .clone()
            .or_else(|| env.drive_folder_id.clone())
            .ok_or(ConfigError::Missing {
                key: "GOOGLE_DRIVE_FOLDER_ID",
            })?;
        let destination_folder_id = cli
            .report_folder_id
            .clone()
            .or_else(|| env.report_folder_id.clone())
            .ok_or(ConfigError::Missing {
                key: "GOOGLE_REPORT_FOLDER_ID",
            })?;

        let credentials = Credentials {
            google_client_id: env.google_client_id.clone().ok_or(ConfigError::Missing {
                key: "GOOGLE_CLIENT_ID",
            })?,
            google_client_secret: env.google_client_secret.clone().ok_or(ConfigError::Missing {
                key: "GOOGLE_CLIENT_SECRET",
            })?,
            google_api_key: env.google_api_key.clone(),
            openai_api_key: env.openai_api_key.clone().ok_or(ConfigError::Missing {
                key: "OPENAI_API_KEY",
            })?,
        };

        let token_cache_path = env
            .token_path
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_CACHE));

        Ok(Self {
            start,
            end,
            source_folder_id,
            destination_folder_id,
            token_cache_path,
            credentials,
        })
    }

    pub fn trace_loaded(&self) {
        info!(
            start = %self.start,
            end = %self.end,
            source_folder_id = %self.source_folder_id,
            destination_folder_id = %self.destination_folder_id,
            "Loaded RunConfig"
        );
        debug!(?self, "RunConfig loaded (full debug)");
    }
}

fn parse_date(flag: &'static str, raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        flag,
        value: raw.to_string(),
    })
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
