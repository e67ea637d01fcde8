//! Record builder: assembles protocol header and metadata body XML.

use crate::metadata::MetadataWriter;
use crate::types::{NormalizedRecord, RecordHeader};
use crate::xml::XmlElement;

/// Render a record header as its `<header>` element.
#[must_use]
pub fn header_to_xml(header: &RecordHeader) -> XmlElement {
    let mut element = XmlElement::new("header");
    if header.deleted {
        element = element.attr("status", "deleted");
    }
    element.push(XmlElement::new("identifier").text(header.identifier.clone()));
    element.push(XmlElement::new("datestamp").text(header.datestamp.clone()));
    for set_spec in &header.set_specs {
        element.push(XmlElement::new("setSpec").text(set_spec.clone()));
    }
    element
}

/// Build the `<metadata>` element for a record, or `None` for a logically
/// deleted record: those are reported with header only, in every format.
#[must_use]
pub fn build_body(record: &NormalizedRecord, writer: &dyn MetadataWriter) -> Option<XmlElement> {
    if !record.active {
        return None;
    }

    let mut metadata = XmlElement::new("metadata");
    writer.write(&mut metadata, record);
    Some(metadata)
}

/// Render a full `<record>` element: header plus metadata body when the
/// record is active. The protocol's `about` container is never emitted.
#[must_use]
pub fn record_to_xml(record: &NormalizedRecord, writer: &dyn MetadataWriter) -> XmlElement {
    let header = RecordHeader::for_record(record);
    let mut element = XmlElement::new("record").child(header_to_xml(&header));
    if let Some(body) = build_body(record, writer) {
        element.push(body);
    }
    element
}
