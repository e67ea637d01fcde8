//! OAI-PMH provider for DOI and institutional-repository catalogs.
//!
//! This crate implements a metadata provider speaking the OAI-PMH 2.0
//! protocol over two catalog backends: the DataCite DOI registry REST API
//! and an institutional-repository Postgres store. Records from either
//! backend are normalized into one canonical shape and disseminated in
//! three metadata formats.
//!
//! # Example
//!
//! ```
//! use oai_provider::config;
//!
//! // Validate OAI datestamp arguments
//! assert!(config::is_valid_datestamp("2021-01-01"));
//! assert!(config::is_valid_datestamp("2021-01-01T12:30:00Z"));
//! ```
//!
//! # Architecture
//!
//! The provider is organized into several modules:
//!
//! - [`config`]: Configuration constants and datestamp validation
//! - [`types`]: Core data types (NormalizedRecord, RecordHeader, etc.)
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP client with retry for upstream catalog calls
//! - [`xml`]: XML element tree, escaping, text sanitization
//! - [`setspec`]: Set specification codec
//! - [`token`]: Resumption token codec
//! - [`catalog`]: Catalog adapter contract and backends
//! - [`metadata`]: Metadata format writers and registry
//! - [`record`]: Record header and body assembly
//! - [`provider`]: Verb dispatch and response envelope
//! - [`cli`]: Command-line interface

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod metadata;
pub mod provider;
pub mod record;
pub mod setspec;
pub mod token;
pub mod types;
pub mod xml;

// Re-export the engine entry points
pub use provider::{OaiProvider, OaiRequest};

// Re-export commonly used items
pub use catalog::{CatalogAdapter, ListFilter, RecordPage, SetEntry, SetPage};
pub use error::{ProtocolError, ProviderError, Result};
pub use types::{NormalizedRecord, RecordHeader};
