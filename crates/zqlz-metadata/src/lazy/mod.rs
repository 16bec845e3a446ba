//! Lazy loading of child metadata objects
//!
//! Provides the single-flight object cache that table models use for their
//! partitions, indexes and columns, only fetching data when first accessed.

mod cache;

pub use cache::{CacheState, LookupCacheStats, ObjectLookupCache, ObjectMap};
