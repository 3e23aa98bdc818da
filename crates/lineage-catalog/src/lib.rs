//! Catalog access for LineageGraph: HTTP transport, link normalization,
//! the shared asset cache and the retrying [`CatalogClient`].

pub mod cache;
pub mod class_types;
pub mod client;
pub mod memory;
pub mod normalizer;
pub mod record;
pub mod stats;
pub mod transport;

pub use cache::AssetCache;
pub use class_types::{ClassType, ClassTypeSelector};
pub use client::{CatalogClient, FetchOutcome, SearchFilters};
pub use memory::InMemoryCatalog;
pub use normalizer::{
    empty_record, normalize_item, normalize_links, LinkFilterCounts, NormalizedLinks,
    SYNONYM_ASSOCIATION,
};
pub use record::{AssetRecord, CatalogResponse, Fact, LineageLink, RawFact, RawItem, RawLink};
pub use stats::{ClientStatistics, ClientStatsSnapshot};
pub use transport::{CatalogQuery, CatalogTransport, HttpCatalogTransport};
