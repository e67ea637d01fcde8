//! Metadata crosswalks and the writer registry.
//!
//! A writer turns a normalized record into one output schema. The registry
//! maps a metadataPrefix to its writer; it is built once at startup and
//! read-only afterwards.

pub mod dublin_core;
pub mod native;
pub mod registry;
pub mod writer;

pub use registry::WriterRegistry;
pub use writer::{MetadataFormat, MetadataWriter};
