//! DOI-registry REST adapter.
//!
//! Talks to the DataCite JSON:API (`/dois`). Pagination is cursor-based:
//! the first page asks for `page[cursor]=1`, and each response's
//! `links.next` URL carries the server-issued cursor for the following
//! page. Field mapping normalizes the JSON:API attributes into
//! [`NormalizedRecord`], including base64 decoding of the native XML blob
//! and stripping of `https://doi.org/` prefixes from alternate
//! identifiers.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{CatalogAdapter, ListFilter, RecordPage, SetEntry, SetPage};
use crate::config::Config;
use crate::error::Result;
use crate::http::{create_client, get_with_retry};
use crate::types::{
    Contributor, DateEntry, NormalizedRecord, RelatedIdentifier, RightsEntry,
};

/// Page size used when listing the client catalog for ListSets.
const CLIENT_PAGE_SIZE: usize = 1000;

/// Adapter over the DataCite REST API.
pub struct DataCiteAdapter {
    client: Client,
    api_url: String,
}

// JSON:API payload shapes. Only the attributes the normalization consumes
// are declared; everything else is ignored.

#[derive(Debug, Deserialize)]
struct DoiResponse {
    data: DoiData,
}

#[derive(Debug, Deserialize)]
struct DoiListResponse {
    #[serde(default)]
    data: Vec<DoiData>,
    #[serde(default)]
    meta: Option<ListMeta>,
    #[serde(default)]
    links: Option<ListLinks>,
}

#[derive(Debug, Deserialize)]
struct ListMeta {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ListLinks {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoiData {
    id: String,
    attributes: DoiAttributes,
    #[serde(default)]
    relationships: Option<Relationships>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DoiAttributes {
    created: Option<String>,
    updated: Option<String>,
    xml: Option<String>,
    is_active: Option<bool>,
    titles: Vec<TitleEntry>,
    creators: Vec<NameEntry>,
    subjects: Vec<SubjectEntry>,
    descriptions: Vec<DescriptionEntry>,
    publisher: Option<serde_json::Value>,
    publication_year: Option<serde_json::Value>,
    dates: Vec<RawDate>,
    contributors: Vec<RawContributor>,
    types: Option<RawTypes>,
    funding_references: Vec<RawFundingReference>,
    geo_locations: Vec<RawGeoLocation>,
    sizes: Vec<String>,
    formats: Vec<String>,
    identifiers: Vec<RawIdentifier>,
    related_identifiers: Vec<RawRelatedIdentifier>,
    rights_list: Vec<RawRights>,
    language: Option<String>,
    metadata_version: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct TitleEntry {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NameEntry {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SubjectEntry {
    #[serde(default)]
    subject: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DescriptionEntry {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDate {
    date: Option<String>,
    date_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawContributor {
    name: Option<String>,
    contributor_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTypes {
    resource_type_general: Option<String>,
    resource_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawFundingReference {
    funder_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawGeoLocation {
    geo_location_place: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawIdentifier {
    identifier: Option<String>,
    identifier_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRelatedIdentifier {
    related_identifier: Option<String>,
    related_identifier_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRights {
    rights: Option<String>,
    rights_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Relationships {
    #[serde(default)]
    client: Option<RelationshipEntry>,
}

#[derive(Debug, Deserialize)]
struct RelationshipEntry {
    #[serde(default)]
    data: Option<RelationshipData>,
}

#[derive(Debug, Deserialize)]
struct RelationshipData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ClientListResponse {
    #[serde(default)]
    data: Vec<ClientData>,
    #[serde(default)]
    links: Option<ListLinks>,
}

#[derive(Debug, Deserialize)]
struct ClientData {
    id: String,
    attributes: ClientAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClientAttributes {
    name: Option<String>,
}

impl DataCiteAdapter {
    /// Create an adapter for the configured API URL.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            api_url: config.datacite_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Adapter over an explicit base URL (used by tests).
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the `/dois` listing URL for a filter and cursor.
    fn list_url(&self, filter: &ListFilter, cursor: Option<&str>) -> String {
        let mut url = format!("{}/dois", self.api_url);
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());

        let query = combined_query(filter);
        if !query.is_empty() {
            serializer.append_pair("query", &query);
        }
        if let Some(provider) = &filter.provider_id {
            serializer.append_pair("provider-id", provider);
        }
        if let Some(client) = &filter.client_id {
            serializer.append_pair("client-id", client);
        }
        serializer.append_pair("page[size]", &filter.page_size.to_string());
        serializer.append_pair("page[cursor]", cursor.unwrap_or("1"));

        url.push('?');
        url.push_str(&serializer.finish());
        url
    }
}

/// Combine the free-text query with an `updated:` range when datestamp
/// bounds are present.
fn combined_query(filter: &ListFilter) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !filter.query.is_empty() {
        parts.push(filter.query.clone());
    }
    if filter.from.is_some() || filter.until.is_some() {
        parts.push(format!(
            "updated:[{} TO {}]",
            filter.from.as_deref().unwrap_or("*"),
            filter.until.as_deref().unwrap_or("*"),
        ));
    }
    parts.join(" AND ")
}

/// Parse an ISO timestamp into naive UTC, dropping the offset entirely.
/// The protocol operates exclusively in UTC.
fn parse_utc(raw: Option<&str>) -> NaiveDateTime {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.to_utc().naive_utc())
        .unwrap_or_default()
}

/// Strip the resolver prefix from a DOI-shaped identifier; the protocol
/// does not work with URL forms.
fn strip_uri_prefix(identifier: &str) -> &str {
    identifier
        .strip_prefix("https://doi.org/")
        .unwrap_or(identifier)
}

/// Render an inconsistent scalar (number or string) as given.
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the cursor for the following page from a `links.next` URL.
/// An empty cursor value would replay page one, so it counts as absent.
fn cursor_from_next_link(next: &str) -> Option<String> {
    let parsed = url::Url::parse(next).ok()?;
    parsed
        .query_pairs()
        .find(|(key, value)| key == "page[cursor]" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Map one JSON:API document into a normalized record.
fn build_record(data: DoiData) -> NormalizedRecord {
    let attributes = data.attributes;

    let client = data
        .relationships
        .and_then(|r| r.client)
        .and_then(|c| c.data)
        .map(|d| d.id.to_uppercase())
        .unwrap_or_default();

    let mut record = NormalizedRecord::new(data.id, client);
    record.created_datetime = parse_utc(attributes.created.as_deref());
    record.updated_datetime = parse_utc(attributes.updated.as_deref());

    record.raw_xml = attributes.xml.as_deref().and_then(|encoded| {
        match BASE64_STANDARD.decode(encoded) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(xml) => Some(xml),
                Err(_) => {
                    tracing::warn!(identifier = %record.identifier, "Native XML is not UTF-8");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(identifier = %record.identifier, error = %e, "Native XML base64 decode failed");
                None
            }
        }
    });

    // A record counts as active only when the upstream flag says so AND a
    // payload exists; several call sites depend on exactly this rule.
    record.active = attributes.is_active.unwrap_or(false) && record.raw_xml.is_some();

    record.titles = attributes.titles.into_iter().filter_map(|t| t.title).collect();
    record.creators = attributes.creators.into_iter().filter_map(|c| c.name).collect();
    record.subjects = attributes.subjects.into_iter().filter_map(|s| s.subject).collect();
    record.descriptions = attributes
        .descriptions
        .into_iter()
        .filter_map(|d| d.description)
        .collect();
    record.publisher = attributes.publisher.as_ref().and_then(value_to_string);
    record.publication_year = attributes.publication_year.as_ref().and_then(value_to_string);
    record.dates = attributes
        .dates
        .into_iter()
        .filter_map(|d| match (d.date_type, d.date) {
            (Some(date_type), Some(date)) => Some(DateEntry { date_type, date }),
            _ => None,
        })
        .collect();
    record.contributors = attributes
        .contributors
        .into_iter()
        .filter_map(|c| {
            c.name.map(|name| Contributor {
                name,
                contributor_type: c.contributor_type,
            })
        })
        .collect();
    record.resource_types = attributes
        .types
        .map(|t| {
            [t.resource_type_general, t.resource_type]
                .into_iter()
                .flatten()
                .filter(|v| !v.is_empty())
                .collect()
        })
        .unwrap_or_default();
    record.funding_references = attributes
        .funding_references
        .into_iter()
        .filter_map(|f| f.funder_name)
        .collect();
    record.geo_locations = attributes
        .geo_locations
        .into_iter()
        .filter_map(|g| g.geo_location_place)
        .collect();
    record.sizes = attributes.sizes;
    record.formats = attributes.formats;
    record.identifiers = attributes
        .identifiers
        .into_iter()
        .filter_map(|i| match (i.identifier_type, i.identifier) {
            (Some(id_type), Some(id)) => Some(RelatedIdentifier::new(
                id_type,
                strip_uri_prefix(&id).to_uppercase(),
            )),
            _ => None,
        })
        .collect();
    record.relations = attributes
        .related_identifiers
        .into_iter()
        .filter_map(|r| match (r.related_identifier_type, r.related_identifier) {
            (Some(id_type), Some(id)) => Some(RelatedIdentifier::new(id_type, id)),
            _ => None,
        })
        .collect();
    record.rights = attributes
        .rights_list
        .into_iter()
        .map(|r| RightsEntry {
            statement: r.rights,
            uri: r.rights_uri,
        })
        .collect();
    record.language = attributes.language.filter(|l| !l.is_empty());
    record.metadata_version = attributes.metadata_version.as_ref().and_then(value_to_string);

    record
}

impl CatalogAdapter for DataCiteAdapter {
    fn fetch_by_id(&self, native_id: &str) -> Result<Option<NormalizedRecord>> {
        let url = format!("{}/dois/{native_id}", self.api_url);
        let response = get_with_retry(&self.client, &url)?;

        if !response.status().is_success() {
            tracing::debug!(
                doi = native_id,
                status = %response.status(),
                "DOI lookup returned non-success"
            );
            return Ok(None);
        }

        match response.json::<DoiResponse>() {
            Ok(body) => Ok(Some(build_record(body.data))),
            Err(e) => {
                tracing::warn!(doi = native_id, error = %e, "Malformed DOI payload");
                Ok(None)
            }
        }
    }

    fn list_page(&self, filter: &ListFilter, cursor: Option<&str>) -> Result<RecordPage> {
        let url = self.list_url(filter, cursor);
        let response = get_with_retry(&self.client, &url)?;

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                "DOI listing returned non-success, reporting empty page"
            );
            return Ok(RecordPage {
                records: Vec::new(),
                total: None,
                next_cursor: None,
            });
        }

        let body: DoiListResponse = match response.json() {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed DOI listing payload");
                return Ok(RecordPage {
                    records: Vec::new(),
                    total: None,
                    next_cursor: None,
                });
            }
        };

        let next_cursor = body
            .links
            .and_then(|links| links.next)
            .and_then(|next| cursor_from_next_link(&next));

        Ok(RecordPage {
            records: body.data.into_iter().map(build_record).collect(),
            total: body.meta.and_then(|m| m.total),
            next_cursor,
        })
    }

    fn list_sets(&self) -> Result<SetPage> {
        let mut sets: Vec<SetEntry> = Vec::new();
        let mut next_url = Some(format!(
            "{}/clients?page%5Bsize%5D={CLIENT_PAGE_SIZE}",
            self.api_url
        ));

        // The client catalog itself is paginated; follow links.next until
        // it runs out so the set catalog is complete.
        while let Some(url) = next_url.take() {
            let response = get_with_retry(&self.client, &url)?;

            if !response.status().is_success() {
                tracing::warn!(status = %response.status(), "Client listing returned non-success");
                break;
            }

            let body: ClientListResponse = match response.json() {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed client listing payload");
                    break;
                }
            };

            sets.extend(body.data.into_iter().map(|client| {
                let name = client.attributes.name.unwrap_or_else(|| client.id.clone());
                SetEntry {
                    id: client.id,
                    name,
                }
            }));
            next_url = body.links.and_then(|links| links.next);
        }

        // The collected entries are the catalog; advertising the upstream
        // meta count would overstate it when a later page failed.
        let total = sets.len() as u64;
        Ok(SetPage { sets, total })
    }
}
