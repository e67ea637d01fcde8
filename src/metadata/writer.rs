//! Writer trait and format descriptors.

use crate::types::NormalizedRecord;
use crate::xml::XmlElement;

/// One supported output schema, as advertised by ListMetadataFormats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataFormat {
    /// metadataPrefix value harvesters request.
    pub prefix: &'static str,

    /// Schema URL.
    pub schema: &'static str,

    /// Namespace URI.
    pub namespace: &'static str,
}

/// Dublin Core crosswalk format.
pub const OAI_DC: MetadataFormat = MetadataFormat {
    prefix: "oai_dc",
    schema: "http://www.openarchives.org/OAI/2.0/oai_dc.xsd",
    namespace: "http://www.openarchives.org/OAI/2.0/oai_dc/",
};

/// Native schema passthrough format.
pub const DATACITE: MetadataFormat = MetadataFormat {
    prefix: "datacite",
    schema: "http://schema.datacite.org/meta/kernel-4/metadata.xsd",
    namespace: "http://datacite.org/schema/kernel-4",
};

/// Enveloped native schema format.
pub const OAI_DATACITE: MetadataFormat = MetadataFormat {
    prefix: "oai_datacite",
    schema: "http://schema.datacite.org/oai/oai-1.1/oai.xsd",
    namespace: "http://schema.datacite.org/oai/oai-1.1/",
};

/// Serializes a normalized record into one output schema.
///
/// Writers append zero or more children to `parent` (the `<metadata>`
/// element). A writer must never fail the response: unusable input is
/// logged and skipped.
pub trait MetadataWriter: Send + Sync {
    /// Write the record's metadata body under `parent`.
    fn write(&self, parent: &mut XmlElement, record: &NormalizedRecord);
}
