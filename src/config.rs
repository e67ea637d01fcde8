//! Configuration constants and validation functions for the provider.

use std::env;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::{ProviderError, Result};

/// OAI-PMH protocol version reported by Identify.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Deleted record policy: deleted records keep appearing with header only.
pub const DELETED_RECORD_POLICY: &str = "persistent";

/// Datestamp granularity reported by Identify (second precision, UTC).
pub const GRANULARITY: &str = "YYYY-MM-DDThh:mm:ssZ";

/// Compression encodings the transport layer supports.
pub const COMPRESSIONS: [&str; 2] = ["gzip", "deflate"];

/// Earliest datestamp in either catalog.
pub const EARLIEST_DATESTAMP: &str = "2011-01-01T00:00:00Z";

/// Protocol identifier prefix prepended to catalog-native identifiers.
pub const IDENTIFIER_PREFIX: &str = "doi";

/// HTTP timeout in seconds for upstream catalog calls.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Datestamp pattern: date only.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Datestamp pattern: full UTC second granularity.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATETIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$").expect("valid regex"));

/// Which catalog backend the provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// DOI registration REST API.
    DataCite,
    /// Institutional-repository relational store.
    Postgres,
}

impl Backend {
    /// Parse from the `OAIPMH_BACKEND` environment value.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "datacite" => Ok(Self::DataCite),
            "postgres" => Ok(Self::Postgres),
            other => Err(ProviderError::Config(format!(
                "unknown backend '{other}' (expected 'datacite' or 'postgres')"
            ))),
        }
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name reported by Identify.
    pub repository_name: String,

    /// Base URL reported for where the OAI-PMH service is hosted.
    pub base_url: String,

    /// Admin e-mail reported by Identify.
    pub admin_email: String,

    /// Page size for result listings.
    pub page_size: usize,

    /// Catalog backend selected at startup.
    pub backend: Backend,

    /// URL of the DOI registry REST API.
    pub datacite_api_url: String,

    /// Postgres connection string for the institutional-repository store.
    pub database_url: String,
}

impl Config {
    /// Build configuration from environment variables, with defaults
    /// matching the public DataCite deployment.
    pub fn from_env() -> Result<Self> {
        let page_size = match env::var("RESULT_SET_SIZE") {
            Ok(raw) => raw.parse::<usize>().map_err(|_| {
                ProviderError::Config(format!("RESULT_SET_SIZE must be a positive integer, got '{raw}'"))
            })?,
            Err(_) => 50,
        };
        if page_size == 0 {
            return Err(ProviderError::Config(
                "RESULT_SET_SIZE must be at least 1".to_string(),
            ));
        }

        let backend = match env::var("OAIPMH_BACKEND") {
            Ok(raw) => Backend::parse(&raw)?,
            Err(_) => Backend::DataCite,
        };

        Ok(Self {
            repository_name: env::var("OAIPMH_REPOS_NAME").unwrap_or_else(|_| "DataCite".to_string()),
            base_url: env::var("OAIPMH_BASE_URL")
                .unwrap_or_else(|_| "https://oai.datacite.org/oai".to_string()),
            admin_email: env::var("OAIPMH_ADMIN_EMAIL")
                .unwrap_or_else(|_| "support@datacite.org".to_string()),
            page_size,
            backend,
            datacite_api_url: env::var("DATACITE_API_URL")
                .unwrap_or_else(|_| "https://api.datacite.org".to_string()),
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
        })
    }

    /// Repository identifier used in the oai-identifier description block,
    /// derived from the base URL host.
    #[must_use]
    pub fn repository_identifier(&self) -> String {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "oai.datacite.org".to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_name: "DataCite".to_string(),
            base_url: "https://oai.datacite.org/oai".to_string(),
            admin_email: "support@datacite.org".to_string(),
            page_size: 50,
            backend: Backend::DataCite,
            datacite_api_url: "https://api.datacite.org".to_string(),
            database_url: String::new(),
        }
    }
}

/// Check whether a `from`/`until` argument is a valid OAI datestamp.
///
/// The protocol allows either day granularity (`YYYY-MM-DD`) or full second
/// granularity UTC (`YYYY-MM-DDThh:mm:ssZ`).
///
/// # Examples
/// ```
/// use oai_provider::config::is_valid_datestamp;
///
/// assert!(is_valid_datestamp("2021-01-01"));
/// assert!(is_valid_datestamp("2021-01-01T12:30:00Z"));
/// assert!(!is_valid_datestamp("01-01-2021"));
/// assert!(!is_valid_datestamp("2021-13-01"));
/// ```
#[must_use]
pub fn is_valid_datestamp(value: &str) -> bool {
    if DATE_PATTERN.is_match(value) {
        return chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    }
    if DATETIME_PATTERN.is_match(value) {
        return NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ").is_ok();
    }
    false
}

/// Format a naive UTC datetime as a protocol datestamp.
#[must_use]
pub fn format_datestamp(datetime: &NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_is_valid_datestamp_date_only() {
        assert!(is_valid_datestamp("2021-01-01"));
        assert!(is_valid_datestamp("1999-12-31"));
        assert!(!is_valid_datestamp("2021-1-1"));
        assert!(!is_valid_datestamp("2021-02-30"));
    }

    #[test]
    fn test_is_valid_datestamp_second_granularity() {
        assert!(is_valid_datestamp("2021-01-01T00:00:00Z"));
        assert!(!is_valid_datestamp("2021-01-01T00:00:00"));
        assert!(!is_valid_datestamp("2021-01-01T00:00:00+02:00"));
        assert!(!is_valid_datestamp("2021-01-01T25:00:00Z"));
    }

    #[test]
    fn test_is_valid_datestamp_garbage() {
        assert!(!is_valid_datestamp(""));
        assert!(!is_valid_datestamp("yesterday"));
    }

    #[test]
    fn test_format_datestamp() {
        let dt = NaiveDate::from_ymd_opt(2019, 6, 3)
            .and_then(|d| d.and_hms_opt(9, 12, 45))
            .expect("valid datetime");
        assert_eq!(format_datestamp(&dt), "2019-06-03T09:12:45Z");
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(Backend::parse("datacite").ok(), Some(Backend::DataCite));
        assert_eq!(Backend::parse("POSTGRES").ok(), Some(Backend::Postgres));
        assert!(Backend::parse("mysql").is_err());
    }

    #[test]
    fn test_repository_identifier_from_base_url() {
        let config = Config {
            base_url: "https://oai.example.org/oai".to_string(),
            ..Config::default()
        };
        assert_eq!(config.repository_identifier(), "oai.example.org");
    }
}
