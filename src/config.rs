//! Configuration, read from environment variables.

use std::time::Duration;

use secrecy::SecretString;

use crate::composer::ReferenceLinks;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::mail::GMAIL_COMPOSE_BASE;
use crate::rewrite::RewriteConfig;
use crate::roster::SheetsConfig;
use crate::roster::sheets::{DEFAULT_ROSTER_RANGE, DEFAULT_SHEETS_API_BASE};
use crate::session::DEFAULT_SESSION_TTL;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct OutreachConfig {
    /// HTTP listen port.
    pub port: u16,
    pub sheets: SheetsConfig,
    /// `None` disables the rewrite endpoints.
    pub llm: Option<LlmConfig>,
    pub rewrite: RewriteConfig,
    pub links: ReferenceLinks,
    /// Sender for `.eml` drafts; drafts are unavailable without it.
    pub from_address: Option<String>,
    /// Idle time after which a session is dropped.
    pub session_ttl: Duration,
    /// Web-mail compose endpoint used by the send handoff.
    pub compose_base: String,
}

impl OutreachConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required =
            |key: &str| var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let port = parse_or(var("OUTREACH_PORT"), "OUTREACH_PORT", 3000u16)?;
        let timeout_secs = parse_or(
            var("OUTREACH_HTTP_TIMEOUT_SECS"),
            "OUTREACH_HTTP_TIMEOUT_SECS",
            30u64,
        )?;
        let session_ttl_secs = parse_or(
            var("OUTREACH_SESSION_TTL_SECS"),
            "OUTREACH_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL.as_secs(),
        )?;

        let sheets = SheetsConfig {
            api_base: var("SHEETS_API_BASE").unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            sheet_id: required("SHEET_ID")?,
            range: var("ROSTER_RANGE").unwrap_or_else(|| DEFAULT_ROSTER_RANGE.to_string()),
            api_key: SecretString::from(required("GOOGLE_API_KEY")?),
            timeout: Duration::from_secs(timeout_secs),
        };

        let backend: LlmBackend = match var("OUTREACH_LLM_BACKEND") {
            Some(name) => name.parse()?,
            None => LlmBackend::Gemini,
        };
        let llm = var(backend.api_key_var()).map(|key| LlmConfig {
            backend,
            api_key: SecretString::from(key),
            model: var("OUTREACH_LLM_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
        });

        let defaults = ReferenceLinks::default();
        let links = ReferenceLinks {
            quill: var("OUTREACH_QUILL_LINK").unwrap_or(defaults.quill),
            letter_a: var("OUTREACH_LETTER_115TH_URL").unwrap_or(defaults.letter_a),
            letter_b: var("OUTREACH_LETTER_117TH_URL").unwrap_or(defaults.letter_b),
            letter_c: var("OUTREACH_LETTER_118TH_URL").unwrap_or(defaults.letter_c),
            senate_letter: var("OUTREACH_SENATE_LETTER_URL").unwrap_or(defaults.senate_letter),
        };

        Ok(Self {
            port,
            sheets,
            llm,
            rewrite: RewriteConfig::default(),
            links,
            from_address: var("OUTREACH_FROM_ADDRESS"),
            session_ttl: Duration::from_secs(session_ttl_secs),
            compose_base: var("OUTREACH_COMPOSE_URL")
                .unwrap_or_else(|| GMAIL_COMPOSE_BASE.to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
