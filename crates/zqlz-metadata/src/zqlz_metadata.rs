//! ZQLZ Metadata - lazily loaded database object metadata
//!
//! Table models expose their child collections (partitions, indexes,
//! columns) through [`ObjectLookupCache`], a single-flight cache that runs one
//! data dictionary query per collection the first time it is read and serves
//! every later read from memory until it is invalidated.
//!
//! # Components
//!
//! - [`ObjectLookupCache`] - Per-parent lazy cache of one child kind
//! - [`ObjectFetcher`] - Builds the lookup statement and maps rows for a kind
//! - [`PhysicalTable`] - Table model owning its child caches and derived
//!   properties
//! - [`PropertyCacheValidator`] - I/O-free freshness checks for derived
//!   properties
//! - [`retry`] - Backoff and retry for callers that retry failed loads
//!
//! # Example
//!
//! ```ignore
//! let source = DataSource::new("orcl", MetadataConfig::load_or_default());
//! let table = PhysicalTable::new(source, TableDescriptor::table("SCOTT", "SALES").partitioned(true));
//! let partitions = table.partitions(conn.as_ref(), &VoidProgressMonitor).await?;
//! ```

mod config;
mod data_source;
mod error;
pub mod fetch;
pub mod lazy;
pub mod retry;
pub mod table;
pub mod validator;

pub use config::{MetadataConfig, RetrySettings};
pub use data_source::DataSource;
pub use error::{MetadataError, MetadataResult};
pub use fetch::{LookupParent, LookupStatement, MetadataObject, ObjectFetcher};
pub use lazy::{CacheState, LookupCacheStats, ObjectLookupCache, ObjectMap};
pub use table::{
    ColumnFetcher, HasColumns, HasIndexes, HasPartitions, IndexFetcher, PartitionFetcher,
    PartitionInfo, PhysicalTable, TableColumn, TableDescriptor, TableIndex, TableKind,
    TablePartition,
};
pub use validator::{
    PartitionInfoSource, PartitionInfoValidator, PropertyCacheValidator, PropertyId,
    RealRowCountValidator, RowCountSource,
};
