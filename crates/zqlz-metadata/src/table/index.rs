use std::sync::{Arc, Weak};

use zqlz_core::Row;

use super::PhysicalTable;
use crate::error::MetadataResult;
use crate::fetch::{LookupStatement, MetadataObject, ObjectFetcher};

/// An index defined on a table
#[derive(Debug, Clone)]
pub struct TableIndex {
    table: Weak<PhysicalTable>,
    name: String,
    index_type: Option<String>,
    unique: bool,
    tablespace: Option<String>,
    valid: bool,
}

impl TableIndex {
    pub fn table(&self) -> Option<Arc<PhysicalTable>> {
        self.table.upgrade()
    }

    /// Dictionary index type, e.g. `NORMAL` or `BITMAP`
    pub fn index_type(&self) -> Option<&str> {
        self.index_type.as_deref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn tablespace(&self) -> Option<&str> {
        self.tablespace.as_deref()
    }

    /// False when the dictionary reports the index `UNUSABLE`
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl MetadataObject for TableIndex {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Reads `ALL_INDEXES`, ordered by index name
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexFetcher;

impl ObjectFetcher for IndexFetcher {
    type Parent = PhysicalTable;
    type Object = TableIndex;

    fn kind(&self) -> &'static str {
        "indexes"
    }

    fn prepare_lookup(&self, table: &PhysicalTable, index_name: Option<&str>) -> LookupStatement {
        let index_name = index_name.filter(|name| !name.is_empty());
        let mut sql = format!(
            "SELECT * FROM {}ALL_INDEXES \nWHERE TABLE_OWNER=? AND TABLE_NAME=?",
            table.data_source().sys_schema_prefix()
        );
        if index_name.is_some() {
            sql.push_str(" AND INDEX_NAME=?");
        }
        sql.push_str("\nORDER BY INDEX_NAME");

        let statement = LookupStatement::new(sql)
            .bind(table.schema())
            .bind(table.name());
        match index_name {
            Some(name) => statement.bind(name),
            None => statement,
        }
    }

    fn fetch_object(&self, table: &Arc<PhysicalTable>, row: &Row) -> MetadataResult<Option<TableIndex>> {
        let Some(name) = row.get_string("INDEX_NAME") else {
            return Ok(None);
        };
        let status = row.get_string("STATUS");
        Ok(Some(TableIndex {
            table: Arc::downgrade(table),
            name,
            index_type: row.get_string("INDEX_TYPE"),
            unique: row.get_string("UNIQUENESS").as_deref() == Some("UNIQUE"),
            tablespace: row.get_string("TABLESPACE_NAME"),
            valid: status.as_deref() != Some("UNUSABLE"),
        }))
    }
}
