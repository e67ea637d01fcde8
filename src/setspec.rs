//! Set specification codec.
//!
//! A set argument scopes listing verbs to a provider (`"BL"`) or a client
//! (`"BL.CCSD"`), and may carry an embedded free-text search query after a
//! `~` separator, base64url-encoded: `"BL.CCSD~cGFuZ2FlYQ=="`. Scoping and
//! query are decoded independently; the dispatcher always calls both.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

/// Decoded set scoping: provider and client identifiers, lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetSpec {
    /// Top-level grouping identifier, lowercase.
    pub provider_id: Option<String>,

    /// Sub-repository identifier in full "provider.client" form, lowercase.
    pub client_id: Option<String>,
}

impl SetSpec {
    /// Decode the scoping part of a raw set argument.
    ///
    /// Anything after the first `~` is the embedded query payload and is
    /// ignored here. Of what remains: a `.` splits provider from client
    /// (the client keeps the full dotted form); otherwise the whole string
    /// is the provider. Empty input yields both absent.
    ///
    /// # Examples
    /// ```
    /// use oai_provider::setspec::SetSpec;
    ///
    /// let spec = SetSpec::decode("BL.CCSD~cGFuZ2FlYQ==");
    /// assert_eq!(spec.provider_id.as_deref(), Some("bl"));
    /// assert_eq!(spec.client_id.as_deref(), Some("bl.ccsd"));
    /// ```
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        let scoping = match raw.split_once('~') {
            Some((scoping, _)) => scoping,
            None => raw,
        };

        if scoping.is_empty() {
            return Self::default();
        }

        let scoping = scoping.to_lowercase();
        if scoping.contains('.') {
            let provider = scoping
                .split_once('.')
                .map(|(provider, _)| provider.to_string());
            Self {
                provider_id: provider,
                client_id: Some(scoping),
            }
        } else {
            Self {
                provider_id: Some(scoping),
                client_id: None,
            }
        }
    }

    /// Display (wire) form of the most specific scoping present, uppercase.
    #[must_use]
    pub fn display(&self) -> Option<String> {
        self.client_id
            .as_deref()
            .or(self.provider_id.as_deref())
            .map(str::to_uppercase)
    }
}

/// Decode the embedded search query from a raw set argument.
///
/// The substring after the first `~` is base64 (URL-safe alphabet) decoded
/// to UTF-8. Absence of `~`, malformed base64, or non-UTF-8 payload all
/// yield the empty string; this never fails.
///
/// # Examples
/// ```
/// use oai_provider::setspec::decode_query;
///
/// assert_eq!(decode_query("BL.CCSD~cGFuZ2FlYQ=="), "pangaea");
/// assert_eq!(decode_query("BL.CCSD"), "");
/// assert_eq!(decode_query("BL.CCSD~!!notbase64!!"), "");
/// ```
#[must_use]
pub fn decode_query(raw: &str) -> String {
    let Some((_, payload)) = raw.split_once('~') else {
        return String::new();
    };

    match URL_SAFE.decode(payload) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_default(),
        Err(_) => String::new(),
    }
}
