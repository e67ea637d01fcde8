//! Writer registry mapping metadataPrefix values to writers.

use std::collections::HashMap;

use super::dublin_core::DublinCoreWriter;
use super::native::{EnvelopedNativeWriter, NativeWriter};
use super::writer::{MetadataFormat, MetadataWriter, DATACITE, OAI_DATACITE, OAI_DC};

/// Registry mapping prefix strings to metadata writers.
///
/// Constructed once at process start and passed by reference into every
/// request handler; immutable after construction.
pub struct WriterRegistry {
    writers: HashMap<&'static str, Box<dyn MetadataWriter>>,
    formats: Vec<MetadataFormat>,
}

impl WriterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writers: HashMap::new(),
            formats: Vec::new(),
        }
    }

    /// Registry with the standard formats: oai_dc, datacite, oai_datacite.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(OAI_DC, DublinCoreWriter);
        registry.register(DATACITE, NativeWriter);
        registry.register(OAI_DATACITE, EnvelopedNativeWriter);
        registry
    }

    /// Register a writer for a format.
    pub fn register(&mut self, format: MetadataFormat, writer: impl MetadataWriter + 'static) {
        self.writers.insert(format.prefix, Box::new(writer));
        self.formats.push(format);
    }

    /// Look up the writer for a prefix.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&dyn MetadataWriter> {
        self.writers.get(prefix).map(Box::as_ref)
    }

    /// Check whether a prefix is supported.
    #[must_use]
    pub fn supports(&self, prefix: &str) -> bool {
        self.writers.contains_key(prefix)
    }

    /// All advertised formats, in registration order.
    #[must_use]
    pub fn formats(&self) -> &[MetadataFormat] {
        &self.formats
    }
}

impl Default for WriterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
