//! Resumption token codec.
//!
//! A token carries the entire continuation state of a paged verb: the
//! original verb arguments plus the backend cursor. The server holds no
//! session state; decoding a token recovers everything needed to serve the
//! next page on any instance. The wire form is a flat key/value string in
//! form-urlencoded encoding, opaque to harvesters and safe inside a URL
//! query parameter.

use url::form_urlencoded;

use crate::error::ProtocolError;

/// Continuation state for ListRecords, ListIdentifiers, and ListSets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumptionToken {
    /// Verb the sequence belongs to.
    pub verb: String,

    /// metadataPrefix argument from the first request.
    pub metadata_prefix: Option<String>,

    /// set argument from the first request.
    pub set: Option<String>,

    /// from argument from the first request.
    pub from: Option<String>,

    /// until argument from the first request.
    pub until: Option<String>,

    /// Backend cursor for the next page. Opaque to this layer: a
    /// server-issued cursor for the REST backend, a row offset for the
    /// relational backend, a slice offset for ListSets.
    pub cursor: String,

    /// Total record count for the sequence, when the backend reports one.
    pub complete_list_size: Option<u64>,
}

impl ResumptionToken {
    /// Serialize to the opaque wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("verb", &self.verb);
        if let Some(prefix) = &self.metadata_prefix {
            serializer.append_pair("metadataPrefix", prefix);
        }
        if let Some(set) = &self.set {
            serializer.append_pair("set", set);
        }
        if let Some(from) = &self.from {
            serializer.append_pair("from", from);
        }
        if let Some(until) = &self.until {
            serializer.append_pair("until", until);
        }
        serializer.append_pair("cursor", &self.cursor);
        if let Some(size) = self.complete_list_size {
            serializer.append_pair("completeListSize", &size.to_string());
        }
        serializer.finish()
    }

    /// Decode a wire-form token.
    ///
    /// Any structural problem yields `BadResumptionToken`, never a panic:
    /// the token came from the network and may be arbitrarily mangled.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        if raw.is_empty() {
            return Err(ProtocolError::BadResumptionToken(
                "empty resumption token".to_string(),
            ));
        }

        let mut token = Self::default();
        let mut saw_verb = false;
        let mut saw_cursor = false;

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "verb" => {
                    token.verb = value.into_owned();
                    saw_verb = true;
                }
                "metadataPrefix" => token.metadata_prefix = Some(value.into_owned()),
                "set" => token.set = Some(value.into_owned()),
                "from" => token.from = Some(value.into_owned()),
                "until" => token.until = Some(value.into_owned()),
                "cursor" => {
                    token.cursor = value.into_owned();
                    saw_cursor = true;
                }
                "completeListSize" => {
                    let size = value.parse::<u64>().map_err(|_| {
                        ProtocolError::BadResumptionToken(format!(
                            "completeListSize is not a number: '{value}'"
                        ))
                    })?;
                    token.complete_list_size = Some(size);
                }
                other => {
                    return Err(ProtocolError::BadResumptionToken(format!(
                        "unrecognized token field '{other}'"
                    )));
                }
            }
        }

        if !saw_verb || !saw_cursor {
            return Err(ProtocolError::BadResumptionToken(
                "token is missing verb or cursor".to_string(),
            ));
        }

        Ok(token)
    }

    /// The cursor parsed as a non-negative integer offset.
    ///
    /// ListSets cursors are plain offsets rather than backend-opaque
    /// strings; a cursor of another shape is a bad token.
    pub fn offset_cursor(&self) -> Result<usize, ProtocolError> {
        self.cursor.parse::<usize>().map_err(|_| {
            ProtocolError::BadResumptionToken(format!(
                "cursor '{}' is not a list offset",
                self.cursor
            ))
        })
    }
}
