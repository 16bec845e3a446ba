//! Fetch protocol for lazily cached child objects
//!
//! A cache owner supplies an [`ObjectFetcher`] with two steps: build the
//! lookup statement for a parent (optionally narrowed to one child name),
//! and map each returned row to a child object or skip it.

use std::sync::Arc;

use zqlz_core::{Row, Value};

use crate::error::MetadataResult;

/// A metadata entity keyed by name within its parent
pub trait MetadataObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Ordinal position within the parent, when the kind has one
    fn position(&self) -> Option<i64> {
        None
    }
}

/// An object that owns cached child collections
pub trait LookupParent: Send + Sync + 'static {
    /// Name used in logs and error messages, e.g. `SCOTT.SALES`
    fn qualified_name(&self) -> String;
}

/// Parameterized statement plus its bound values, in binding order
#[derive(Debug, Clone, PartialEq)]
pub struct LookupStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl LookupStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append the next positional parameter
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// Loads one kind of child object for a parent.
///
/// Statements are bound container identity first, parent identity second and
/// the optional child name last. Without a name filter the statement must
/// return every child ordered by its natural key; the cache keeps that order.
pub trait ObjectFetcher: Send + Sync + 'static {
    type Parent: LookupParent;
    type Object: MetadataObject;

    /// Child kind, e.g. `"partitions"`
    fn kind(&self) -> &'static str;

    fn prepare_lookup(&self, parent: &Self::Parent, object_name: Option<&str>) -> LookupStatement;

    /// Map one row. `Ok(None)` skips the row (no key); this must not query.
    fn fetch_object(
        &self,
        parent: &Arc<Self::Parent>,
        row: &Row,
    ) -> MetadataResult<Option<Self::Object>>;
}
