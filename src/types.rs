//! Core data types for the provider.
//!
//! `NormalizedRecord` is the canonical shape every catalog adapter emits;
//! the protocol layer and the metadata writers only ever see this struct,
//! never a backend-native row or JSON document.

use chrono::NaiveDateTime;

use crate::config::{format_datestamp, IDENTIFIER_PREFIX};

/// A typed date attached to a record (Issued, Created, Updated, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateEntry {
    /// Date type as reported by the catalog (e.g. "Issued").
    pub date_type: String,

    /// Date value, stored as given by the catalog.
    pub date: String,
}

/// A contributor to the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    /// Contributor display name.
    pub name: String,

    /// Contributor type, when the catalog reports one.
    pub contributor_type: Option<String>,
}

/// A typed identifier: an alternate identifier for the item itself, or a
/// reference to a related item, depending on which field it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedIdentifier {
    /// Identifier scheme (e.g. "DOI", "URL").
    pub id_type: String,

    /// The identifier value.
    pub id: String,
}

impl RelatedIdentifier {
    /// Create a new typed identifier.
    #[must_use]
    pub fn new(id_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id_type: id_type.into(),
            id: id.into(),
        }
    }

    /// Wire representation: `<type-lowercase>:<value>`.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        format!("{}:{}", self.id_type.to_lowercase(), self.id)
    }
}

/// A rights statement with an optional URI. Either part may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RightsEntry {
    /// Rights statement text.
    pub statement: Option<String>,

    /// Rights URI.
    pub uri: Option<String>,
}

/// The canonical unit a catalog adapter emits.
///
/// Sequence fields are always present, possibly empty, never conceptually
/// null. Timestamps are naive UTC: the protocol operates exclusively in UTC
/// so the offset is stripped at the adapter boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Catalog-scoped identifier, stable per item (e.g. a DOI).
    pub identifier: String,

    /// Creation timestamp, naive UTC.
    pub created_datetime: NaiveDateTime,

    /// Last-update timestamp, naive UTC. Used as the OAI datestamp.
    pub updated_datetime: NaiveDateTime,

    /// Titles, in catalog order.
    pub titles: Vec<String>,

    /// Creator names, in catalog order.
    pub creators: Vec<String>,

    /// Subject keywords.
    pub subjects: Vec<String>,

    /// Descriptions / abstracts.
    pub descriptions: Vec<String>,

    /// Publisher, when known.
    pub publisher: Option<String>,

    /// Publication year, stored as given (sources disagree on shape).
    pub publication_year: Option<String>,

    /// Typed dates attached to the item.
    pub dates: Vec<DateEntry>,

    /// Contributors.
    pub contributors: Vec<Contributor>,

    /// Resource types: general type first, specific type second, either
    /// may be absent.
    pub resource_types: Vec<String>,

    /// Funding references, kept as display strings.
    pub funding_references: Vec<String>,

    /// Geo locations, kept as display strings.
    pub geo_locations: Vec<String>,

    /// Media formats.
    pub formats: Vec<String>,

    /// Alternate persistent identifiers for the same item (not the
    /// primary identifier).
    pub identifiers: Vec<RelatedIdentifier>,

    /// References to related items.
    pub relations: Vec<RelatedIdentifier>,

    /// Rights statements.
    pub rights: Vec<RightsEntry>,

    /// Sizes (e.g. "4 pages", "2.1 MB").
    pub sizes: Vec<String>,

    /// Language tag.
    pub language: Option<String>,

    /// Backend-native metadata XML blob, used by passthrough and envelope
    /// formats. Absent when the catalog holds no payload.
    pub raw_xml: Option<String>,

    /// Schema version of the native XML.
    pub metadata_version: Option<String>,

    /// Owning sub-repository symbol (e.g. "BL.CCSD").
    pub client: String,

    /// False means the record is logically deleted: it is reported with a
    /// header only, no metadata body, in every output format.
    pub active: bool,
}

impl NormalizedRecord {
    /// Create an empty active record with the given identifier and client.
    #[must_use]
    pub fn new(identifier: impl Into<String>, client: impl Into<String>) -> Self {
        let epoch = NaiveDateTime::default();
        Self {
            identifier: identifier.into(),
            created_datetime: epoch,
            updated_datetime: epoch,
            titles: Vec::new(),
            creators: Vec::new(),
            subjects: Vec::new(),
            descriptions: Vec::new(),
            publisher: None,
            publication_year: None,
            dates: Vec::new(),
            contributors: Vec::new(),
            resource_types: Vec::new(),
            funding_references: Vec::new(),
            geo_locations: Vec::new(),
            formats: Vec::new(),
            identifiers: Vec::new(),
            relations: Vec::new(),
            rights: Vec::new(),
            sizes: Vec::new(),
            language: None,
            raw_xml: None,
            metadata_version: None,
            client: client.into(),
            active: true,
        }
    }

    /// Protocol-prefixed identifier form, e.g. `doi:10.5072/example`.
    #[must_use]
    pub fn oai_identifier(&self) -> String {
        format!("{IDENTIFIER_PREFIX}:{}", self.identifier)
    }

    /// Top-level grouping identifier, derived from the client symbol's
    /// leading segment.
    #[must_use]
    pub fn provider(&self) -> String {
        provider_from_client(&self.client)
    }
}

/// Derive the provider symbol from a client symbol ("BL.CCSD" -> "BL").
#[must_use]
pub fn provider_from_client(client: &str) -> String {
    match client.split_once('.') {
        Some((provider, _)) => provider.to_string(),
        None => client.to_string(),
    }
}

/// OAI record header: everything a harvester sees for a deleted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Protocol-prefixed identifier.
    pub identifier: String,

    /// Datestamp in second-granularity UTC form.
    pub datestamp: String,

    /// Set memberships, display (uppercase) form: `[PROVIDER, PROVIDER.CLIENT]`.
    pub set_specs: Vec<String>,

    /// Deleted flag.
    pub deleted: bool,
}

impl RecordHeader {
    /// Build the header for a normalized record.
    #[must_use]
    pub fn for_record(record: &NormalizedRecord) -> Self {
        Self {
            identifier: record.oai_identifier(),
            datestamp: format_datestamp(&record.updated_datetime),
            set_specs: vec![record.provider().to_uppercase(), record.client.to_uppercase()],
            deleted: !record.active,
        }
    }
}
