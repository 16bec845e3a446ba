use std::sync::{Arc, Weak};

use zqlz_core::Row;

use super::{PhysicalTable, optional_i64};
use crate::error::MetadataResult;
use crate::fetch::{LookupParent, LookupStatement, MetadataObject, ObjectFetcher};

/// Column of an in-place table type.
///
/// These columns only describe shape: they are never required, never
/// generated and carry no description.
#[derive(Debug, Clone)]
pub struct TableColumn {
    table: Weak<PhysicalTable>,
    name: String,
    type_name: String,
    position: i64,
    length: Option<i64>,
    scale: Option<i64>,
}

impl TableColumn {
    pub fn table(&self) -> Option<Arc<PhysicalTable>> {
        self.table.upgrade()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn length(&self) -> Option<i64> {
        self.length
    }

    pub fn scale(&self) -> Option<i64> {
        self.scale
    }

    pub fn is_required(&self) -> bool {
        false
    }

    pub fn is_auto_generated(&self) -> bool {
        false
    }

    pub fn description(&self) -> Option<&str> {
        None
    }

    pub fn is_persisted(&self) -> bool {
        true
    }
}

impl MetadataObject for TableColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Option<i64> {
        Some(self.position)
    }
}

/// Reads `ALL_TAB_COLUMNS`, ordered by column id
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnFetcher;

impl ObjectFetcher for ColumnFetcher {
    type Parent = PhysicalTable;
    type Object = TableColumn;

    fn kind(&self) -> &'static str {
        "columns"
    }

    fn prepare_lookup(&self, table: &PhysicalTable, column_name: Option<&str>) -> LookupStatement {
        let column_name = column_name.filter(|name| !name.is_empty());
        let mut sql = format!(
            "SELECT * FROM {}ALL_TAB_COLUMNS \nWHERE OWNER=? AND TABLE_NAME=?",
            table.data_source().sys_schema_prefix()
        );
        if column_name.is_some() {
            sql.push_str(" AND COLUMN_NAME=?");
        }
        sql.push_str("\nORDER BY COLUMN_ID");

        let statement = LookupStatement::new(sql)
            .bind(table.schema())
            .bind(table.name());
        match column_name {
            Some(name) => statement.bind(name),
            None => statement,
        }
    }

    fn fetch_object(&self, table: &Arc<PhysicalTable>, row: &Row) -> MetadataResult<Option<TableColumn>> {
        let Some(name) = row.get_string("COLUMN_NAME") else {
            return Ok(None);
        };
        let parent = table.qualified_name();
        Ok(Some(TableColumn {
            table: Arc::downgrade(table),
            type_name: row.get_string("DATA_TYPE").unwrap_or_default(),
            position: optional_i64(row, "COLUMN_ID", self.kind(), &parent)?.unwrap_or_default(),
            length: optional_i64(row, "DATA_LENGTH", self.kind(), &parent)?,
            scale: optional_i64(row, "DATA_SCALE", self.kind(), &parent)?,
            name,
        }))
    }
}
