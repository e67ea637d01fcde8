//! Dublin Core crosswalk.
//!
//! Maps the normalized record onto the fifteen oai_dc target elements in a
//! fixed order. An empty normalized field produces zero output elements,
//! never an empty element; singleton fields are wrapped or omitted. All
//! text passes through [`crate::xml::sanitize`] before being written.

use super::writer::{MetadataWriter, OAI_DC};
use crate::types::NormalizedRecord;
use crate::xml::{sanitize, XmlElement};

const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Target element names, in output order.
const ELEMENT_ORDER: [&str; 15] = [
    "title",
    "creator",
    "publisher",
    "publicationYear",
    "date",
    "identifier",
    "relation",
    "subject",
    "description",
    "contributor",
    "language",
    "type",
    "format",
    "source",
    "rights",
];

/// Writer for the `oai_dc` crosswalk format.
pub struct DublinCoreWriter;

impl MetadataWriter for DublinCoreWriter {
    fn write(&self, parent: &mut XmlElement, record: &NormalizedRecord) {
        let mut dc = XmlElement::new("oai_dc:dc")
            .attr("xmlns:oai_dc", OAI_DC.namespace)
            .attr("xmlns:dc", NS_DC)
            .attr("xmlns:xsi", NS_XSI)
            .attr(
                "xsi:schemaLocation",
                format!("{} {}", OAI_DC.namespace, OAI_DC.schema),
            );

        for name in ELEMENT_ORDER {
            for value in field_values(record, name) {
                dc.push(XmlElement::new(format!("dc:{name}")).text(sanitize(&value)));
            }
        }

        parent.push(dc);
    }
}

/// Assemble the values for one target element.
fn field_values(record: &NormalizedRecord, name: &str) -> Vec<String> {
    match name {
        "title" => record.titles.clone(),
        "creator" => record.creators.clone(),
        "publisher" => singleton(&record.publisher),
        "publicationYear" => singleton(&record.publication_year),
        "date" => date_values(record),
        "identifier" => record
            .identifiers
            .iter()
            .map(|id| id.to_display_string())
            .collect(),
        "relation" => record
            .relations
            .iter()
            .map(|id| id.to_display_string())
            .collect(),
        "subject" => record.subjects.clone(),
        "description" => record.descriptions.clone(),
        "contributor" => record.contributors.iter().map(|c| c.name.clone()).collect(),
        "language" => singleton(&record.language),
        "type" => record.resource_types.clone(),
        "format" => record.formats.clone(),
        // No normalized counterpart; always empty.
        "source" => Vec::new(),
        "rights" => rights_values(record),
        _ => Vec::new(),
    }
}

/// Wrap an optional singleton as a zero- or one-element sequence,
/// dropping empty strings.
fn singleton(value: &Option<String>) -> Vec<String> {
    match value {
        Some(v) if !v.is_empty() => vec![v.clone()],
        _ => Vec::new(),
    }
}

/// Publication year (bare) followed by `"<DateType>: <date>"` per entry.
fn date_values(record: &NormalizedRecord) -> Vec<String> {
    let mut values = singleton(&record.publication_year);
    for entry in &record.dates {
        values.push(format!("{}: {}", entry.date_type, entry.date));
    }
    values
}

/// Statement and URI as separate values per rights entry.
fn rights_values(record: &NormalizedRecord) -> Vec<String> {
    let mut values = Vec::new();
    for entry in &record.rights {
        if let Some(statement) = &entry.statement {
            values.push(statement.clone());
        }
        if let Some(uri) = &entry.uri {
            values.push(uri.clone());
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DateEntry, RelatedIdentifier, RightsEntry};

    fn write_record(record: &NormalizedRecord) -> String {
        let mut metadata = XmlElement::new("metadata");
        DublinCoreWriter.write(&mut metadata, record);
        metadata.render()
    }

    #[test]
    fn test_empty_sequence_produces_zero_elements() {
        let record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        let xml = write_record(&record);
        assert!(!xml.contains("<dc:title"));
        assert!(!xml.contains("<dc:creator"));
        assert!(!xml.contains("<dc:publisher"));
    }

    #[test]
    fn test_single_title_produces_one_element() {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.titles = vec!["Ocean Data".to_string()];
        let xml = write_record(&record);
        assert_eq!(xml.matches("<dc:title>").count(), 1);
        assert!(xml.contains("<dc:title>Ocean Data</dc:title>"));
    }

    #[test]
    fn test_element_order_is_fixed() {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.titles = vec!["T".to_string()];
        record.creators = vec!["C".to_string()];
        record.subjects = vec!["S".to_string()];
        let xml = write_record(&record);

        let title_pos = xml.find("<dc:title>").expect("title present");
        let creator_pos = xml.find("<dc:creator>").expect("creator present");
        let subject_pos = xml.find("<dc:subject>").expect("subject present");
        assert!(title_pos < creator_pos);
        assert!(creator_pos < subject_pos);
    }

    #[test]
    fn test_date_prepends_publication_year() {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.publication_year = Some("2019".to_string());
        record.dates = vec![
            DateEntry {
                date_type: "Issued".to_string(),
                date: "2019-06-03".to_string(),
            },
            DateEntry {
                date_type: "Updated".to_string(),
                date: "2020-01-15".to_string(),
            },
        ];
        let xml = write_record(&record);
        assert!(xml.contains("<dc:date>2019</dc:date>"));
        assert!(xml.contains("<dc:date>Issued: 2019-06-03</dc:date>"));
        assert!(xml.contains("<dc:date>Updated: 2020-01-15</dc:date>"));
        assert_eq!(xml.matches("<dc:date>").count(), 3);
    }

    #[test]
    fn test_identifier_and_relation_formatting() {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.identifiers = vec![RelatedIdentifier::new("DOI", "10.5072/X")];
        record.relations = vec![RelatedIdentifier::new("URL", "https://example.org")];
        let xml = write_record(&record);
        assert!(xml.contains("<dc:identifier>doi:10.5072/X</dc:identifier>"));
        assert!(xml.contains("<dc:relation>url:https://example.org</dc:relation>"));
    }

    #[test]
    fn test_rights_statement_and_uri_are_separate_values() {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.rights = vec![
            RightsEntry {
                statement: Some("CC BY 4.0".to_string()),
                uri: Some("https://creativecommons.org/licenses/by/4.0/".to_string()),
            },
            RightsEntry {
                statement: Some("Open Access".to_string()),
                uri: None,
            },
        ];
        let xml = write_record(&record);
        assert_eq!(xml.matches("<dc:rights>").count(), 3);
        assert!(xml.contains("<dc:rights>CC BY 4.0</dc:rights>"));
        assert!(
            xml.contains("<dc:rights>https://creativecommons.org/licenses/by/4.0/</dc:rights>")
        );
        assert!(xml.contains("<dc:rights>Open Access</dc:rights>"));
    }

    #[test]
    fn test_values_are_sanitized() {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.titles = vec!["Bad\u{0}control it\u{00e2}\u{20ac}\u{2122}s".to_string()];
        let xml = write_record(&record);
        assert!(xml.contains("<dc:title>Badcontrol it\u{2019}s</dc:title>"));
    }

    #[test]
    fn test_empty_publisher_is_omitted_entirely() {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.publisher = Some(String::new());
        let xml = write_record(&record);
        assert!(!xml.contains("<dc:publisher"));
    }

    #[test]
    fn test_schema_location_declared() {
        let record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        let xml = write_record(&record);
        assert!(xml.contains("xsi:schemaLocation="));
        assert!(xml.contains("http://www.openarchives.org/OAI/2.0/oai_dc.xsd"));
    }
}
