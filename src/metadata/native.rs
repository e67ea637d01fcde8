//! Native-schema writers: verbatim passthrough and the enveloped form.
//!
//! Both writers re-emit the record's backend-native XML blob. The blob is
//! parsed first; a blob that fails to parse is an upstream data quality
//! issue, so the writer logs and omits the content for that one record
//! rather than failing the whole response.

use super::writer::{MetadataWriter, OAI_DATACITE};
use crate::types::NormalizedRecord;
use crate::xml::XmlElement;

/// Validate a native blob, returning it with any XML declaration stripped
/// so it can be spliced into the response document.
fn validated_native_xml(record: &NormalizedRecord) -> Option<String> {
    let raw = record.raw_xml.as_deref()?;

    if let Err(e) = roxmltree::Document::parse(raw) {
        tracing::warn!(
            identifier = %record.identifier,
            error = %e,
            "Native XML failed to parse, omitting metadata content"
        );
        return None;
    }

    let trimmed = raw.trim_start();
    if let Some(decl_end) = trimmed.strip_prefix("<?xml").and_then(|rest| rest.find("?>")) {
        Some(trimmed["<?xml".len() + decl_end + 2..].trim_start().to_string())
    } else {
        Some(trimmed.to_string())
    }
}

/// Writer for the `datacite` passthrough format: the native XML resource
/// element becomes the direct child of `<metadata>`.
pub struct NativeWriter;

impl MetadataWriter for NativeWriter {
    fn write(&self, parent: &mut XmlElement, record: &NormalizedRecord) {
        if let Some(xml) = validated_native_xml(record) {
            parent.push_raw(xml);
        }
    }
}

/// Writer for the `oai_datacite` format: the native XML wrapped in an
/// envelope carrying schema version and owning-client identifiers.
pub struct EnvelopedNativeWriter;

impl MetadataWriter for EnvelopedNativeWriter {
    fn write(&self, parent: &mut XmlElement, record: &NormalizedRecord) {
        let Some(xml) = validated_native_xml(record) else {
            return;
        };

        let mut envelope = XmlElement::new("oai_datacite")
            .attr("xmlns", OAI_DATACITE.namespace)
            .attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance")
            .attr(
                "xsi:schemaLocation",
                format!("{} {}", OAI_DATACITE.namespace, OAI_DATACITE.schema),
            )
            .child(XmlElement::new("isReferenceQuality").text("true"));

        if let Some(version) = &record.metadata_version {
            envelope.push(XmlElement::new("schemaVersion").text(version.clone()));
        }
        envelope.push(XmlElement::new("datacentreSymbol").text(record.client.to_uppercase()));

        let mut payload = XmlElement::new("payload");
        payload.push_raw(xml);
        envelope.push(payload);

        parent.push(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESOURCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<resource xmlns="http://datacite.org/schema/kernel-4"><identifier identifierType="DOI">10.5072/x</identifier></resource>"#;

    fn record_with_xml(raw: Option<&str>) -> NormalizedRecord {
        let mut record = NormalizedRecord::new("10.5072/x", "BL.CCSD");
        record.raw_xml = raw.map(str::to_string);
        record.metadata_version = Some("4".to_string());
        record
    }

    #[test]
    fn test_native_passthrough_splices_resource() {
        let mut metadata = XmlElement::new("metadata");
        NativeWriter.write(&mut metadata, &record_with_xml(Some(SAMPLE_RESOURCE)));
        let xml = metadata.render();
        assert!(xml.contains("<metadata><resource"));
        assert!(xml.contains("identifierType=\"DOI\""));
        // Declaration from the blob must not appear inside the response
        assert!(!xml.contains("<?xml"));
    }

    #[test]
    fn test_native_passthrough_unparseable_blob_is_skipped() {
        let mut metadata = XmlElement::new("metadata");
        NativeWriter.write(&mut metadata, &record_with_xml(Some("<resource><broken")));
        assert_eq!(metadata.render(), "<metadata/>");
    }

    #[test]
    fn test_native_passthrough_missing_blob_is_skipped() {
        let mut metadata = XmlElement::new("metadata");
        NativeWriter.write(&mut metadata, &record_with_xml(None));
        assert_eq!(metadata.render(), "<metadata/>");
    }

    #[test]
    fn test_envelope_carries_version_and_client() {
        let mut metadata = XmlElement::new("metadata");
        EnvelopedNativeWriter.write(&mut metadata, &record_with_xml(Some(SAMPLE_RESOURCE)));
        let xml = metadata.render();
        assert!(xml.contains("<oai_datacite"));
        assert!(xml.contains("http://schema.datacite.org/oai/oai-1.1/"));
        assert!(xml.contains("<schemaVersion>4</schemaVersion>"));
        assert!(xml.contains("<datacentreSymbol>BL.CCSD</datacentreSymbol>"));
        assert!(xml.contains("<payload><resource"));
    }

    #[test]
    fn test_envelope_unparseable_blob_is_skipped() {
        let mut metadata = XmlElement::new("metadata");
        EnvelopedNativeWriter.write(&mut metadata, &record_with_xml(Some("not xml")));
        assert_eq!(metadata.render(), "<metadata/>");
    }

    #[test]
    fn test_envelope_without_version_omits_element() {
        let mut record = record_with_xml(Some(SAMPLE_RESOURCE));
        record.metadata_version = None;
        let mut metadata = XmlElement::new("metadata");
        EnvelopedNativeWriter.write(&mut metadata, &record);
        assert!(!metadata.render().contains("<schemaVersion>"));
    }
}
