//! In-memory snapshot of the source database's catalog.
//!
//! The snapshot is read once per run by [`crate::db::read_catalog`]; everything
//! downstream (graph discovery, join paths, plan emission) operates on these
//! records and never touches the live connection, so the core is testable with
//! hand-built catalogs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};

/// The schema all source tables live in. Generated schemas are siblings of it.
pub const SOURCE_SCHEMA: &str = "public";

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    /// True for serial columns (default draws from a sequence) and identity
    /// columns. These are re-keyed with a fresh sequence per partition.
    pub is_serial: bool,
    pub default: Option<String>,
}

/// A foreign key declared on `table`, referencing `ref_table`.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKey {
    pub constraint: String,
    pub table: String,
    /// (referencing column, referenced column) pairs, in constraint order.
    pub columns: Vec<(String, String)>,
    pub ref_table: String,
    /// True when any referencing column is nullable; such links are weaker
    /// evidence of ownership and are avoided when resolving join paths.
    pub nullable: bool,
}

impl ForeignKey {
    pub fn is_self_reference(&self) -> bool {
        self.table == self.ref_table
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    /// Primary key column names, in key order. Re-keying uses serial columns,
    /// partition filtering uses the first.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that need an independent sequence in each generated schema.
    pub fn serial_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_serial)
    }
}

/// Full catalog snapshot, keyed by table name for deterministic iteration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub tables: BTreeMap<String, Table>,
}

impl Catalog {
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn require_table(&self, name: &str) -> Result<&Table> {
        self.table(name)
            .ok_or_else(|| Error::RootTableNotFound(name.to_string()))
    }
}
