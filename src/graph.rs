//! Discovers the set of tables that must be cloned alongside the root table,
//! and the order in which they can be created.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Catalog, ForeignKey};
use crate::error::{Error, Result};

/// The root table plus every table transitively referencing it, with the
/// foreign keys among them.
#[derive(Debug, Clone)]
pub struct RelationGraph {
    pub root: String,
    tables: BTreeSet<String>,
}

impl RelationGraph {
    /// Builds the working set rooted at `root` by expanding to a fixed point:
    /// a table joins the set when one of its foreign keys targets a member.
    /// This picks up indirect dependents (a table referencing a related table
    /// rather than the root itself), and nothing else.
    pub fn discover(catalog: &Catalog, root: &str) -> Result<Self> {
        catalog.require_table(root)?;

        let mut tables: BTreeSet<String> = BTreeSet::new();
        tables.insert(root.to_string());

        loop {
            let mut grew = false;
            for table in catalog.tables.values() {
                if tables.contains(&table.name) {
                    continue;
                }
                if table
                    .foreign_keys
                    .iter()
                    .any(|fk| tables.contains(&fk.ref_table))
                {
                    tables.insert(table.name.clone());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        Ok(Self {
            root: root.to_string(),
            tables,
        })
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    /// Member tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    /// Foreign keys where both endpoints are in the working set, ordered by
    /// (table, constraint name) so constraint re-creation is deterministic.
    pub fn foreign_keys<'a>(&'a self, catalog: &'a Catalog) -> Vec<&'a ForeignKey> {
        let mut fks: Vec<&ForeignKey> = self
            .tables
            .iter()
            .filter_map(|name| catalog.table(name))
            .flat_map(|t| t.foreign_keys.iter())
            .filter(|fk| self.tables.contains(&fk.ref_table))
            .collect();
        fks.sort_by(|a, b| (&a.table, &a.constraint).cmp(&(&b.table, &b.constraint)));
        fks
    }

    /// Topological order with every table after all tables it references
    /// within the set. Self-references do not constrain the order. Ties are
    /// broken lexicographically so the order is stable across runs.
    ///
    /// A cycle across two or more distinct tables has no valid order and
    /// fails the whole run before any SQL is emitted.
    pub fn creation_order(&self, catalog: &Catalog) -> Result<Vec<String>> {
        let mut remaining_deps: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for name in &self.tables {
            let deps = match catalog.table(name) {
                Some(table) => table
                    .foreign_keys
                    .iter()
                    .filter(|fk| !fk.is_self_reference())
                    .filter(|fk| self.tables.contains(&fk.ref_table))
                    .map(|fk| fk.ref_table.as_str())
                    .collect(),
                None => BTreeSet::new(),
            };
            remaining_deps.insert(name.as_str(), deps);
        }

        let mut order = Vec::with_capacity(self.tables.len());
        while !remaining_deps.is_empty() {
            let ready = remaining_deps
                .iter()
                .find(|(_, deps)| deps.is_empty())
                .map(|(name, _)| *name);
            let Some(name) = ready else {
                return Err(Error::ReferenceCycle(trace_cycle(&remaining_deps)));
            };
            remaining_deps.remove(name);
            for deps in remaining_deps.values_mut() {
                deps.remove(name);
            }
            order.push(name.to_string());
        }
        Ok(order)
    }
}

/// Walks "references" edges through the stalled dependency map until a table
/// repeats; the slice from its first occurrence is an actual cycle. Tables
/// that are merely blocked downstream of the cycle lead into it but are not
/// part of the repeated slice, so they stay out of the report.
fn trace_cycle(remaining_deps: &BTreeMap<&str, BTreeSet<&str>>) -> Vec<String> {
    let mut walk: Vec<&str> = Vec::new();
    let Some(start) = remaining_deps.keys().next() else {
        return Vec::new();
    };
    let mut current = *start;
    loop {
        if let Some(pos) = walk.iter().position(|name| *name == current) {
            return walk[pos..].iter().map(|name| name.to_string()).collect();
        }
        walk.push(current);
        match remaining_deps.get(current).and_then(|deps| deps.iter().next()) {
            Some(next) => current = *next,
            // every stalled table has an unmet dependency, but keep the walk
            // as the report if the map disagrees
            None => return walk.iter().map(|name| name.to_string()).collect(),
        }
    }
}
