//! Physical table model
//!
//! [`PhysicalTable`] owns one lazily loaded child collection per kind it
//! supports. What a table supports is decided once, at construction, from
//! its listing row; the capabilities are exposed through [`HasPartitions`],
//! [`HasIndexes`] and [`HasColumns`].

mod column;
mod index;
mod partition;
mod physical;


use async_trait::async_trait;
use std::sync::Arc;
use zqlz_core::{Connection, ProgressMonitor, Row};

use crate::error::{MetadataError, MetadataResult};

pub use column::{ColumnFetcher, TableColumn};
pub use index::{IndexFetcher, TableIndex};
pub use partition::{PartitionFetcher, PartitionInfo, TablePartition};
pub use physical::{PhysicalTable, TableDescriptor, TableKind};

#[async_trait]
pub trait HasPartitions {
    async fn partitions(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TablePartition>>>;

    async fn partition(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TablePartition>>>;
}

#[async_trait]
pub trait HasIndexes {
    async fn indexes(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TableIndex>>>;

    async fn index(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TableIndex>>>;
}

#[async_trait]
pub trait HasColumns {
    async fn columns(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TableColumn>>>;

    async fn column(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TableColumn>>>;
}

#[async_trait]
impl HasPartitions for Arc<PhysicalTable> {
    async fn partitions(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TablePartition>>> {
        PhysicalTable::partitions(self, conn, monitor).await
    }

    async fn partition(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TablePartition>>> {
        PhysicalTable::partition(self, conn, monitor, name).await
    }
}

#[async_trait]
impl HasIndexes for Arc<PhysicalTable> {
    async fn indexes(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TableIndex>>> {
        PhysicalTable::indexes(self, conn, monitor).await
    }

    async fn index(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TableIndex>>> {
        PhysicalTable::index(self, conn, monitor, name).await
    }
}

#[async_trait]
impl HasColumns for Arc<PhysicalTable> {
    async fn columns(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TableColumn>>> {
        PhysicalTable::columns(self, conn, monitor).await
    }

    async fn column(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TableColumn>>> {
        PhysicalTable::column(self, conn, monitor, name).await
    }
}

/// Numeric column that may be NULL or absent, but must parse when present
pub(crate) fn optional_i64(
    row: &Row,
    column: &str,
    kind: &'static str,
    parent: &str,
) -> MetadataResult<Option<i64>> {
    match row.get_by_name(column) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| MetadataError::Mapping {
                kind,
                parent: parent.to_string(),
                message: format!("{} is not a number: {}", column, value),
            }),
    }
}
