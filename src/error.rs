//! Error types for the provider.
//!
//! Uses the dual-error pattern: `ProviderError` for infrastructure failures
//! that should never reach a harvester, and `ProtocolError` for the OAI-PMH
//! error conditions that are rendered as `<error>` elements in an otherwise
//! well-formed 200 response.

use thiserror::Error;

/// Infrastructure error type for the provider library.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request to an upstream catalog failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// All retry attempts were exhausted.
    #[error("Retries exhausted after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Database query failed.
    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// Upstream returned a payload we could not interpret.
    #[error("Malformed upstream payload from {source_name}: {message}")]
    MalformedPayload {
        source_name: String,
        message: String,
    },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Configuration is missing or invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Protocol-level OAI-PMH error conditions.
///
/// Each variant corresponds to one of the error codes defined by the
/// protocol. These are not faults: they are encoded into the XML response
/// body with HTTP status 200.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Verb argument missing or illegal.
    #[error("badVerb: {0}")]
    BadVerb(String),

    /// Required argument missing or arguments combined illegally.
    #[error("badArgument: {0}")]
    BadArgument(String),

    /// The requested metadataPrefix is not supported.
    #[error("cannotDisseminateFormat: {0}")]
    CannotDisseminateFormat(String),

    /// No item with the given identifier exists.
    #[error("idDoesNotExist: {0}")]
    IdDoesNotExist(String),

    /// The combination of arguments matched no records.
    #[error("noRecordsMatch")]
    NoRecordsMatch,

    /// The resumption token is malformed or expired.
    #[error("badResumptionToken: {0}")]
    BadResumptionToken(String),

    /// The repository does not support sets.
    #[error("noSetHierarchy")]
    NoSetHierarchy,
}

impl ProtocolError {
    /// The wire-format error code for the `<error code="...">` attribute.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadVerb(_) => "badVerb",
            Self::BadArgument(_) => "badArgument",
            Self::CannotDisseminateFormat(_) => "cannotDisseminateFormat",
            Self::IdDoesNotExist(_) => "idDoesNotExist",
            Self::NoRecordsMatch => "noRecordsMatch",
            Self::BadResumptionToken(_) => "badResumptionToken",
            Self::NoSetHierarchy => "noSetHierarchy",
        }
    }

    /// Human-readable message for the error element body.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::BadVerb(m) | Self::BadArgument(m) | Self::BadResumptionToken(m) => m.clone(),
            Self::CannotDisseminateFormat(prefix) => {
                format!("Metadata format '{prefix}' is not supported")
            }
            Self::IdDoesNotExist(id) => {
                format!("No item found for identifier '{id}'")
            }
            Self::NoRecordsMatch => {
                "The combination of arguments resulted in an empty list".to_string()
            }
            Self::NoSetHierarchy => "This repository does not support sets".to_string(),
        }
    }
}
