//! Catalog adapters: the contract that normalizes disparate backends.
//!
//! The protocol engine talks to exactly one `CatalogAdapter`, chosen at
//! startup. Adapters own their backend connection handling, retry policy,
//! field mapping into [`NormalizedRecord`], and cursor shape; the protocol
//! layer forwards cursors without inspecting them.

pub mod datacite;
pub mod postgres;

use crate::error::Result;
use crate::types::NormalizedRecord;

pub use datacite::DataCiteAdapter;
pub use postgres::PostgresAdapter;

/// Scoping and filtering for a paged listing call.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Free-text search query (from the set's embedded payload).
    pub query: String,

    /// Provider scoping, lowercase.
    pub provider_id: Option<String>,

    /// Client scoping, lowercase "provider.client" form.
    pub client_id: Option<String>,

    /// Lower datestamp bound (inclusive).
    pub from: Option<String>,

    /// Upper datestamp bound (exclusive).
    pub until: Option<String>,

    /// Page size the response should not exceed.
    pub page_size: usize,
}

/// One page of a record listing.
#[derive(Debug, Clone)]
pub struct RecordPage {
    /// Records in backend cursor order.
    pub records: Vec<NormalizedRecord>,

    /// Total matches for the whole sequence, when the backend reports one.
    pub total: Option<u64>,

    /// Cursor for the next page; absent on the last page.
    pub next_cursor: Option<String>,
}

/// One entry of the set catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEntry {
    /// Set identifier (client or provider symbol).
    pub id: String,

    /// Display name.
    pub name: String,
}

/// The full set catalog. Sets are assumed small; paging over them is done
/// by the protocol layer, not the adapter.
#[derive(Debug, Clone)]
pub struct SetPage {
    /// All sets, in stable backend order.
    pub sets: Vec<SetEntry>,

    /// Total set count.
    pub total: u64,
}

/// Uniform access to one catalog backend.
pub trait CatalogAdapter: Send + Sync {
    /// Fetch a single record by its catalog-native identifier.
    ///
    /// `Ok(None)` means the item does not exist or the upstream could not
    /// produce it; the dispatcher turns that into a protocol error.
    fn fetch_by_id(&self, native_id: &str) -> Result<Option<NormalizedRecord>>;

    /// Fetch one page of records matching the filter.
    ///
    /// `cursor` is this adapter's own cursor from a previous page, or
    /// `None` for the first page.
    fn list_page(&self, filter: &ListFilter, cursor: Option<&str>) -> Result<RecordPage>;

    /// Fetch the entire set catalog.
    fn list_sets(&self) -> Result<SetPage>;
}
