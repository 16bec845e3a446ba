//! Table partitions and table-level partitioning info

use std::sync::{Arc, Weak};

use zqlz_core::Row;

use super::{PhysicalTable, optional_i64};
use crate::error::MetadataResult;
use crate::fetch::{LookupParent, LookupStatement, MetadataObject, ObjectFetcher};

/// One partition of a partitioned table
#[derive(Debug, Clone)]
pub struct TablePartition {
    table: Weak<PhysicalTable>,
    name: String,
    position: Option<i64>,
    high_value: Option<String>,
    tablespace: Option<String>,
    row_count: Option<i64>,
    composite: bool,
    subpartition_count: Option<i64>,
}

impl TablePartition {
    /// Owning table, if it is still alive
    pub fn table(&self) -> Option<Arc<PhysicalTable>> {
        self.table.upgrade()
    }

    /// Partition bound expression as stored by the dictionary
    pub fn high_value(&self) -> Option<&str> {
        self.high_value.as_deref()
    }

    pub fn tablespace(&self) -> Option<&str> {
        self.tablespace.as_deref()
    }

    pub fn row_count(&self) -> Option<i64> {
        self.row_count
    }

    /// Whether the partition is itself subpartitioned
    pub fn is_composite(&self) -> bool {
        self.composite
    }

    pub fn subpartition_count(&self) -> Option<i64> {
        self.subpartition_count
    }
}

impl MetadataObject for TablePartition {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Option<i64> {
        self.position
    }
}

/// Reads `ALL_TAB_PARTITIONS`, ordered by partition position
#[derive(Debug, Default, Clone, Copy)]
pub struct PartitionFetcher;

impl ObjectFetcher for PartitionFetcher {
    type Parent = PhysicalTable;
    type Object = TablePartition;

    fn kind(&self) -> &'static str {
        "partitions"
    }

    fn prepare_lookup(&self, table: &PhysicalTable, partition_name: Option<&str>) -> LookupStatement {
        let partition_name = partition_name.filter(|name| !name.is_empty());
        let sql = format!(
            "SELECT * FROM {}ALL_TAB_PARTITIONS \nWHERE TABLE_OWNER=? AND TABLE_NAME=? {}\nORDER BY PARTITION_POSITION",
            table.data_source().sys_schema_prefix(),
            if partition_name.is_some() {
                " AND PARTITION_NAME=?"
            } else {
                ""
            }
        );
        let statement = LookupStatement::new(sql)
            .bind(table.schema())
            .bind(table.name());
        match partition_name {
            Some(name) => statement.bind(name),
            None => statement,
        }
    }

    fn fetch_object(
        &self,
        table: &Arc<PhysicalTable>,
        row: &Row,
    ) -> MetadataResult<Option<TablePartition>> {
        let Some(name) = row.get_string("PARTITION_NAME") else {
            return Ok(None);
        };
        let parent = table.qualified_name();
        Ok(Some(TablePartition {
            table: Arc::downgrade(table),
            position: optional_i64(row, "PARTITION_POSITION", self.kind(), &parent)?,
            high_value: row.get_string("HIGH_VALUE"),
            tablespace: row.get_string("TABLESPACE_NAME"),
            row_count: optional_i64(row, "NUM_ROWS", self.kind(), &parent)?,
            composite: row.get_flag("COMPOSITE"),
            subpartition_count: optional_i64(row, "SUBPARTITION_COUNT", self.kind(), &parent)?,
            name,
        }))
    }
}

/// Table-level partitioning summary from `ALL_PART_TABLES`
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionInfo {
    pub partitioning_type: Option<String>,
    pub subpartitioning_type: Option<String>,
    pub partition_count: Option<i64>,
    pub default_tablespace: Option<String>,
    pub interval: Option<String>,
}

impl PartitionInfo {
    pub(crate) fn statement(table: &PhysicalTable) -> LookupStatement {
        LookupStatement::new(format!(
            "SELECT * FROM {}ALL_PART_TABLES WHERE OWNER=? AND TABLE_NAME=?",
            table.data_source().sys_schema_prefix()
        ))
        .bind(table.schema())
        .bind(table.name())
    }

    pub(crate) fn from_row(table: &PhysicalTable, row: &Row) -> MetadataResult<Self> {
        Ok(Self {
            partitioning_type: row.get_string("PARTITIONING_TYPE"),
            subpartitioning_type: row
                .get_string("SUBPARTITIONING_TYPE")
                .filter(|kind| kind != "NONE"),
            partition_count: optional_i64(
                row,
                "PARTITION_COUNT",
                "partition info",
                &table.qualified_name(),
            )?,
            default_tablespace: row.get_string("DEF_TABLESPACE_NAME"),
            interval: row.get_string("INTERVAL"),
        })
    }
}
