use parking_lot::RwLock;
use std::sync::Arc;
use zqlz_core::{Connection, MonitorTask, ProgressMonitor, Row, Value};

use super::{
    ColumnFetcher, IndexFetcher, PartitionFetcher, PartitionInfo, TableColumn, TableIndex,
    TablePartition, optional_i64,
};
use crate::data_source::DataSource;
use crate::error::{MetadataError, MetadataResult};
use crate::fetch::LookupParent;
use crate::lazy::ObjectLookupCache;
use crate::retry::{RetryPolicy, retry_with_policy};
use crate::validator::{
    PartitionInfoSource, PartitionInfoValidator, PropertyCacheValidator, PropertyId,
    RealRowCountValidator, RowCountSource,
};

/// What a table object stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// An ordinary table
    Table,
    /// A single partition opened as a table of its own; never partitioned
    Partition,
}

/// Listing data a table is built from
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub kind: TableKind,
    pub row_count: Option<i64>,
    pub tablespace: Option<String>,
    pub partitioned: bool,
    /// False for tables that exist only in the model so far
    pub persisted: bool,
}

impl TableDescriptor {
    /// A new, not yet created table
    pub fn table(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind: TableKind::Table,
            row_count: None,
            tablespace: None,
            partitioned: false,
            persisted: false,
        }
    }

    /// Read a row of a table listing (`ALL_TABLES` shape)
    pub fn from_row(schema: impl Into<String>, row: &Row) -> MetadataResult<Self> {
        let schema = schema.into();
        let name = row.get_string("TABLE_NAME").ok_or_else(|| MetadataError::Mapping {
            kind: "tables",
            parent: schema.clone(),
            message: "TABLE_NAME is empty".to_string(),
        })?;
        let row_count = optional_i64(row, "NUM_ROWS", "tables", &format!("{schema}.{name}"))?;
        Ok(Self {
            row_count,
            tablespace: row.get_string("TABLESPACE_NAME"),
            partitioned: row.get_flag("PARTITIONED"),
            persisted: true,
            kind: TableKind::Table,
            schema,
            name,
        })
    }

    pub fn partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }

    pub fn kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Table model owning its lazily loaded child collections.
///
/// The partition cache only exists for partitioned tables. Derived
/// properties (partition info, exact row count) are stored on the table and
/// guarded by validators rather than by a lookup cache.
pub struct PhysicalTable {
    data_source: Arc<DataSource>,
    schema: String,
    name: String,
    kind: TableKind,
    row_count: Option<i64>,
    tablespace: RwLock<Option<String>>,
    partitioned: bool,
    persisted: bool,

    partition_cache: Option<ObjectLookupCache<PartitionFetcher>>,
    index_cache: ObjectLookupCache<IndexFetcher>,
    column_cache: ObjectLookupCache<ColumnFetcher>,

    partition_info: RwLock<Option<Arc<PartitionInfo>>>,
    real_row_count: RwLock<Option<i64>>,
    /// Serialises loading and resetting of the derived properties
    property_lock: tokio::sync::Mutex<()>,
}

impl PhysicalTable {
    pub fn new(data_source: Arc<DataSource>, descriptor: TableDescriptor) -> Arc<Self> {
        let partitioned = descriptor.partitioned && descriptor.kind == TableKind::Table;
        Arc::new(Self {
            data_source,
            schema: descriptor.schema,
            name: descriptor.name,
            kind: descriptor.kind,
            row_count: descriptor.row_count,
            tablespace: RwLock::new(descriptor.tablespace),
            partitioned,
            persisted: descriptor.persisted,
            partition_cache: partitioned.then(|| ObjectLookupCache::new(PartitionFetcher)),
            index_cache: ObjectLookupCache::new(IndexFetcher),
            column_cache: ObjectLookupCache::new(ColumnFetcher),
            partition_info: RwLock::new(None),
            real_row_count: RwLock::new(None),
            property_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn data_source(&self) -> &Arc<DataSource> {
        &self.data_source
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Row count from optimizer statistics
    pub fn row_count(&self) -> Option<i64> {
        self.row_count
    }

    pub fn tablespace(&self) -> Option<String> {
        self.tablespace.read().clone()
    }

    pub fn set_tablespace(&self, tablespace: Option<String>) {
        *self.tablespace.write() = tablespace;
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn partition_cache(&self) -> Option<&ObjectLookupCache<PartitionFetcher>> {
        self.partition_cache.as_ref()
    }

    pub fn index_cache(&self) -> &ObjectLookupCache<IndexFetcher> {
        &self.index_cache
    }

    pub fn column_cache(&self) -> &ObjectLookupCache<ColumnFetcher> {
        &self.column_cache
    }

    // ========== Child collections ==========

    /// Partitions in partition position order; empty for tables that are not
    /// partitioned
    pub async fn partitions(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TablePartition>>> {
        match &self.partition_cache {
            Some(cache) => cache.get_objects(conn, monitor, self).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn partition(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TablePartition>>> {
        match &self.partition_cache {
            Some(cache) => cache.get_object(conn, monitor, self, name).await,
            None => Ok(None),
        }
    }

    /// Re-read one partition, e.g. after it was split or dropped
    pub async fn refresh_partition(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TablePartition>>> {
        match &self.partition_cache {
            Some(cache) => cache.refresh_object(conn, monitor, self, name).await,
            None => Ok(None),
        }
    }

    /// [`partitions`](Self::partitions), retried on connectivity failures
    pub async fn partitions_with_retry(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        policy: &RetryPolicy,
    ) -> MetadataResult<Vec<Arc<TablePartition>>> {
        retry_with_policy(policy, monitor, MetadataError::is_transient, move |_| {
            self.partitions(conn, monitor)
        })
        .await
    }

    pub async fn indexes(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TableIndex>>> {
        self.index_cache.get_objects(conn, monitor, self).await
    }

    pub async fn index(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TableIndex>>> {
        self.index_cache.get_object(conn, monitor, self, name).await
    }

    pub async fn columns(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Vec<Arc<TableColumn>>> {
        self.column_cache.get_objects(conn, monitor, self).await
    }

    pub async fn column(
        self: &Arc<Self>,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        name: &str,
    ) -> MetadataResult<Option<Arc<TableColumn>>> {
        self.column_cache.get_object(conn, monitor, self, name).await
    }

    // ========== Derived properties ==========

    /// Partitioning summary, loaded once. `None` for tables that are not
    /// partitioned, when the dictionary has no row, or when the monitor was
    /// cancelled before loading.
    pub async fn partition_info(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> MetadataResult<Option<Arc<PartitionInfo>>> {
        if !self.partitioned {
            return Ok(None);
        }
        let cached = self.partition_info.read().clone();
        if cached.is_some() || monitor.is_cancelled() {
            return Ok(cached);
        }

        let _guard = self.property_lock.lock().await;
        let cached = self.partition_info.read().clone();
        if cached.is_some() {
            return Ok(cached);
        }

        let statement = PartitionInfo::statement(self);
        let task = MonitorTask::begin(monitor, "Load partitioning info");
        let result = conn.query(&statement.sql, &statement.params).await;
        drop(task);
        let result = result.map_err(|e| {
            MetadataError::from_executor("partition info", self.qualified_name(), e)
        })?;

        let info = match result.rows.first() {
            Some(row) => Arc::new(PartitionInfo::from_row(self, row)?),
            None => {
                tracing::debug!(table = %self.qualified_name(), "no partitioning info found");
                return Ok(None);
            }
        };
        *self.partition_info.write() = Some(Arc::clone(&info));
        Ok(Some(info))
    }

    /// Exact row count via `COUNT(*)`, computed once.
    ///
    /// Not available for tables that were never created. A failed count is
    /// logged and remembered as -1.
    pub async fn real_row_count(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
    ) -> Option<i64> {
        let cached = *self.real_row_count.read();
        if cached.is_some() || !self.persisted || monitor.is_cancelled() {
            return cached;
        }

        let _guard = self.property_lock.lock().await;
        let cached = *self.real_row_count.read();
        if cached.is_some() {
            return cached;
        }

        let sql = format!("SELECT COUNT(*) FROM {}", self.quoted_name());
        let task = MonitorTask::begin(monitor, "Read row count");
        let count = match conn.query(&sql, &[]).await {
            Ok(result) => result
                .rows
                .first()
                .and_then(|row| row.get(0))
                .and_then(Value::as_i64),
            Err(e) => {
                tracing::debug!(table = %self.qualified_name(), error = %e, "can't fetch row count");
                None
            }
        };
        drop(task);

        let count = count.unwrap_or(-1);
        *self.real_row_count.write() = Some(count);
        Some(count)
    }

    /// Whether a derived property can be shown without loading it
    pub fn is_property_cached(&self, property: PropertyId) -> bool {
        match property {
            PropertyId::PartitionInfo => PartitionInfoValidator.is_property_cached(self, property),
            PropertyId::RealRowCount => RealRowCountValidator.is_property_cached(self, property),
        }
    }

    /// Forget every loaded child collection and derived property
    pub async fn refresh(&self) {
        self.index_cache.clear_cache().await;
        self.column_cache.clear_cache().await;
        if let Some(cache) = &self.partition_cache {
            cache.clear_cache().await;
        }

        let _guard = self.property_lock.lock().await;
        *self.partition_info.write() = None;
        *self.real_row_count.write() = None;
        tracing::info!(table = %self.qualified_name(), "refreshed table metadata");
    }

    fn quoted_name(&self) -> String {
        fn quote(identifier: &str) -> String {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
        format!("{}.{}", quote(&self.schema), quote(&self.name))
    }
}

impl LookupParent for PhysicalTable {
    fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl PartitionInfoSource for PhysicalTable {
    fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    fn has_partition_info(&self) -> bool {
        self.partition_info.read().is_some()
    }
}

impl RowCountSource for PhysicalTable {
    fn has_real_row_count(&self) -> bool {
        self.real_row_count.read().is_some()
    }
}

impl std::fmt::Debug for PhysicalTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalTable")
            .field("schema", &self.schema)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("partitioned", &self.partitioned)
            .finish()
    }
}
