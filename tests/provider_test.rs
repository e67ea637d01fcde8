//! End-to-end tests for the protocol engine over an in-memory catalog.
//!
//! Drives the full request path (argument validation, verb dispatch, token
//! round trips, XML rendering) with a deterministic adapter so the scenarios
//! stay independent of any real backend.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use oai_provider::catalog::{ListFilter, RecordPage, SetEntry, SetPage};
use oai_provider::config::Config;
use oai_provider::{CatalogAdapter, NormalizedRecord, OaiProvider, OaiRequest, Result};

/// In-memory catalog with offset-cursor paging.
struct MemoryCatalog {
    records: Vec<NormalizedRecord>,
    sets: Vec<SetEntry>,
}

impl MemoryCatalog {
    fn filtered(&self, filter: &ListFilter) -> Vec<&NormalizedRecord> {
        self.records
            .iter()
            .filter(|r| match (&filter.client_id, &filter.provider_id) {
                (Some(client), _) => r.client.to_lowercase() == *client,
                (None, Some(provider)) => r.provider().to_lowercase() == *provider,
                (None, None) => true,
            })
            .collect()
    }
}

impl CatalogAdapter for MemoryCatalog {
    fn fetch_by_id(&self, native_id: &str) -> Result<Option<NormalizedRecord>> {
        Ok(self
            .records
            .iter()
            .find(|r| r.identifier == native_id)
            .cloned())
    }

    fn list_page(&self, filter: &ListFilter, cursor: Option<&str>) -> Result<RecordPage> {
        let matching = self.filtered(filter);
        let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (offset + filter.page_size).min(matching.len());
        let records: Vec<NormalizedRecord> = matching
            .get(offset..end)
            .unwrap_or(&[])
            .iter()
            .map(|r| (*r).clone())
            .collect();
        let next_cursor = (end < matching.len()).then(|| end.to_string());

        Ok(RecordPage {
            records,
            total: Some(matching.len() as u64),
            next_cursor,
        })
    }

    fn list_sets(&self) -> Result<SetPage> {
        Ok(SetPage {
            total: self.sets.len() as u64,
            sets: self.sets.clone(),
        })
    }
}

fn sample_record(identifier: &str, client: &str, day: u32) -> NormalizedRecord {
    let mut record = NormalizedRecord::new(identifier, client);
    record.updated_datetime = NaiveDate::from_ymd_opt(2020, 3, day)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("valid datetime");
    record.titles = vec![format!("Record {identifier}")];
    record.creators = vec!["Okafor, Amara".to_string(), "Lindqvist, Maja".to_string()];
    record.publisher = Some("Example Press".to_string());
    record.publication_year = Some("2020".to_string());
    record.rights = vec![oai_provider::types::RightsEntry {
        statement: Some("CC BY 4.0".to_string()),
        uri: None,
    }];
    record.raw_xml = Some(format!(
        "<resource xmlns=\"http://datacite.org/schema/kernel-4\">\
         <identifier identifierType=\"DOI\">{identifier}</identifier></resource>"
    ));
    record.metadata_version = Some("4".to_string());
    record
}

fn standard_catalog() -> MemoryCatalog {
    MemoryCatalog {
        records: vec![
            sample_record("10.5072/a", "BL.CCSD", 1),
            sample_record("10.5072/b", "BL.CCSD", 2),
            sample_record("10.5072/c", "BL.IMPERIAL", 3),
            sample_record("10.5072/d", "TIB.PANGAEA", 4),
            sample_record("10.5072/e", "TIB.PANGAEA", 5),
        ],
        sets: vec![
            SetEntry { id: "bl.ccsd".to_string(), name: "CCSD".to_string() },
            SetEntry { id: "bl.imperial".to_string(), name: "Imperial College".to_string() },
            SetEntry { id: "tib.pangaea".to_string(), name: "PANGAEA".to_string() },
            SetEntry { id: "frdr.waterloo".to_string(), name: "University of Waterloo".to_string() },
            SetEntry { id: "frdr.sfu".to_string(), name: "Simon Fraser University".to_string() },
        ],
    }
}

fn provider_with(catalog: MemoryCatalog, page_size: usize) -> OaiProvider {
    let config = Config {
        page_size,
        ..Config::default()
    };
    OaiProvider::new(config, Box::new(catalog))
}

fn handle(provider: &OaiProvider, request: &OaiRequest) -> String {
    provider.handle(request).expect("no infrastructure error")
}

/// Pull the resumptionToken text out of a response document.
fn token_of(response: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(response).expect("well-formed response");
    doc.descendants()
        .find(|n| n.has_tag_name(("http://www.openarchives.org/OAI/2.0/", "resumptionToken")))
        .map(|n| n.text().unwrap_or("").to_string())
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn test_get_record_header_and_dublin_core_body() {
    let provider = provider_with(standard_catalog(), 50);
    let request = OaiRequest {
        identifier: Some("doi:10.5072/a".to_string()),
        metadata_prefix: Some("oai_dc".to_string()),
        ..OaiRequest::for_verb("GetRecord")
    };
    let response = handle(&provider, &request);

    assert!(response.contains("<identifier>doi:10.5072/a</identifier>"));
    assert!(response.contains("<datestamp>2020-03-01T10:00:00Z</datestamp>"));
    assert!(response.contains("<setSpec>BL</setSpec><setSpec>BL.CCSD</setSpec>"));
    assert!(response.contains("<dc:title>Record 10.5072/a</dc:title>"));
    // One element per creator
    assert_eq!(count_occurrences(&response, "<dc:creator>"), 2);
    assert!(response.contains("<dc:creator>Okafor, Amara</dc:creator>"));
    assert!(response.contains("<dc:creator>Lindqvist, Maja</dc:creator>"));
    assert!(response.contains("<dc:publisher>Example Press</dc:publisher>"));
    // A statement-only rights entry yields exactly one element
    assert_eq!(count_occurrences(&response, "<dc:rights>"), 1);
    assert!(response.contains("<dc:rights>CC BY 4.0</dc:rights>"));
    // The primary DOI is disseminated through the identifiers field only
    assert_eq!(count_occurrences(&response, "<dc:date>"), 1);
}

#[test]
fn test_get_record_native_passthrough() {
    let provider = provider_with(standard_catalog(), 50);
    let request = OaiRequest {
        identifier: Some("doi:10.5072/a".to_string()),
        metadata_prefix: Some("datacite".to_string()),
        ..OaiRequest::for_verb("GetRecord")
    };
    let response = handle(&provider, &request);
    assert!(response.contains("<metadata><resource xmlns=\"http://datacite.org/schema/kernel-4\">"));
}

#[test]
fn test_get_record_deleted_has_header_only() {
    let mut catalog = standard_catalog();
    catalog.records[0].active = false;
    let provider = provider_with(catalog, 50);

    for prefix in ["oai_dc", "datacite", "oai_datacite"] {
        let request = OaiRequest {
            identifier: Some("doi:10.5072/a".to_string()),
            metadata_prefix: Some(prefix.to_string()),
            ..OaiRequest::for_verb("GetRecord")
        };
        let response = handle(&provider, &request);
        assert!(response.contains("<header status=\"deleted\">"), "prefix {prefix}");
        assert!(!response.contains("<metadata>"), "prefix {prefix}");
    }
}

#[test]
fn test_list_records_full_harvest_via_tokens() {
    let provider = provider_with(standard_catalog(), 2);
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        ..OaiRequest::for_verb("ListRecords")
    };

    // Page 1: two records plus a continuation token
    let response = handle(&provider, &request);
    assert_eq!(count_occurrences(&response, "<record>"), 2);
    let token = token_of(&response).expect("token present");
    assert!(!token.is_empty());
    assert!(response.contains("completeListSize=\"5\""));

    // Page 2
    let request = OaiRequest {
        resumption_token: Some(token),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    assert_eq!(count_occurrences(&response, "<record>"), 2);
    let token = token_of(&response).expect("token present");

    // Page 3 is the final short page: empty token closes the sequence
    let request = OaiRequest {
        resumption_token: Some(token),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    assert_eq!(count_occurrences(&response, "<record>"), 1);
    assert_eq!(token_of(&response), Some(String::new()));
}

#[test]
fn test_list_records_token_preserves_original_arguments() {
    let provider = provider_with(standard_catalog(), 2);
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        set: Some("TIB".to_string()),
        from: Some("2020-01-01".to_string()),
        until: Some("2021-01-01".to_string()),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    let token = token_of(&response).expect("token present");

    assert!(token.contains("metadataPrefix=oai_dc"));
    assert!(token.contains("set=TIB"));
    assert!(token.contains("from=2020-01-01"));
    assert!(token.contains("until=2021-01-01"));
}

#[test]
fn test_list_records_set_scoping() {
    let provider = provider_with(standard_catalog(), 50);

    // Client scoping
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        set: Some("BL.CCSD".to_string()),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    assert_eq!(count_occurrences(&response, "<record>"), 2);

    // Provider scoping picks up every client underneath
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        set: Some("BL".to_string()),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    assert_eq!(count_occurrences(&response, "<record>"), 3);
}

#[test]
fn test_list_records_no_match() {
    let provider = provider_with(standard_catalog(), 50);
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        set: Some("GESIS".to_string()),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    assert!(response.contains("<error code=\"noRecordsMatch\">"));
    assert!(!response.contains("<ListRecords>"));
}

#[test]
fn test_list_identifiers_has_headers_without_bodies() {
    let provider = provider_with(standard_catalog(), 50);
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        ..OaiRequest::for_verb("ListIdentifiers")
    };
    let response = handle(&provider, &request);

    assert_eq!(count_occurrences(&response, "<header>"), 5);
    assert!(!response.contains("<metadata>"));
    assert!(!response.contains("<record>"));
}

#[test]
fn test_list_identifiers_token_is_verb_bound() {
    // A ListIdentifiers token must not resume a ListRecords harvest
    let provider = provider_with(standard_catalog(), 2);
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        ..OaiRequest::for_verb("ListIdentifiers")
    };
    let token = token_of(&handle(&provider, &request)).expect("token present");

    let request = OaiRequest {
        resumption_token: Some(token),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    assert!(response.contains("<error code=\"badResumptionToken\">"));
}

#[test]
fn test_list_sets_pages_are_disjoint_and_complete() {
    let provider = provider_with(standard_catalog(), 2);

    let mut seen = Vec::new();
    let mut response = handle(&provider, &OaiRequest::for_verb("ListSets"));
    loop {
        let doc = roxmltree::Document::parse(&response).expect("well-formed response");
        for node in doc
            .descendants()
            .filter(|n| n.has_tag_name(("http://www.openarchives.org/OAI/2.0/", "setSpec")))
        {
            seen.push(node.text().unwrap_or("").to_string());
        }
        match token_of(&response) {
            Some(token) if !token.is_empty() => {
                let request = OaiRequest {
                    resumption_token: Some(token),
                    ..OaiRequest::for_verb("ListSets")
                };
                response = handle(&provider, &request);
            }
            _ => break,
        }
    }

    // Every set exactly once, uppercase, in catalog order
    assert_eq!(
        seen,
        vec!["BL.CCSD", "BL.IMPERIAL", "TIB.PANGAEA", "FRDR.WATERLOO", "FRDR.SFU"]
    );
}

#[test]
fn test_list_sets_reports_complete_list_size() {
    let provider = provider_with(standard_catalog(), 2);
    let response = handle(&provider, &OaiRequest::for_verb("ListSets"));
    assert!(response.contains("completeListSize=\"5\""));
}

#[test]
fn test_embedded_set_query_reaches_adapter_unharmed() {
    // The scoping part still filters even when a query payload is attached
    let provider = provider_with(standard_catalog(), 50);
    let request = OaiRequest {
        metadata_prefix: Some("oai_dc".to_string()),
        // "cGFuZ2FlYQ==" is base64url for "pangaea"
        set: Some("TIB.PANGAEA~cGFuZ2FlYQ==".to_string()),
        ..OaiRequest::for_verb("ListRecords")
    };
    let response = handle(&provider, &request);
    assert_eq!(count_occurrences(&response, "<record>"), 2);
}

#[test]
fn test_every_response_is_well_formed() {
    let provider = provider_with(standard_catalog(), 2);
    let requests = vec![
        OaiRequest::for_verb("Identify"),
        OaiRequest::for_verb("ListMetadataFormats"),
        OaiRequest::for_verb("ListSets"),
        OaiRequest::for_verb("NoSuchVerb"),
        OaiRequest::default(),
        OaiRequest {
            metadata_prefix: Some("oai_dc".to_string()),
            ..OaiRequest::for_verb("ListRecords")
        },
        OaiRequest {
            resumption_token: Some("garbage".to_string()),
            ..OaiRequest::for_verb("ListRecords")
        },
    ];

    for request in requests {
        let response = handle(&provider, &request);
        roxmltree::Document::parse(&response).expect("well-formed response");
    }
}
