//! Resolves, for every related table, the chain of foreign-key joins that
//! connects it back to the root table. The chain is what lets a partition
//! filter ("root rows with this partition value") be applied to tables that
//! are two or three hops away from the root.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::graph::RelationGraph;

/// One hop of a join chain: `JOIN parent ON child.col = parent.ref_col [AND ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    pub child: String,
    pub parent: String,
    /// (child column, parent column) pairs from the foreign key.
    pub columns: Vec<(String, String)>,
}

/// Steps from a related table up to the root. Empty for the root itself.
pub type JoinPath = Vec<JoinStep>;

/// Resolves join paths for every table in the working set.
pub fn resolve_all(catalog: &Catalog, graph: &RelationGraph) -> Result<BTreeMap<String, JoinPath>> {
    let mut paths = BTreeMap::new();
    for table in graph.tables() {
        paths.insert(table.to_string(), resolve(catalog, graph, table)?);
    }
    Ok(paths)
}

/// Finds the shortest join chain from `table` to the root, following foreign
/// keys in the child-to-parent direction.
///
/// Chains built only from non-nullable foreign keys are preferred: a nullable
/// link is weak evidence of ownership, and rows with a null in it would drop
/// out of the inner join anyway. Only when no such chain exists does the
/// search fall back to nullable links. Ties between equally short chains are
/// broken by (parent table, constraint name) order, so the same catalog always
/// yields the same chain.
pub fn resolve(catalog: &Catalog, graph: &RelationGraph, table: &str) -> Result<JoinPath> {
    if table == graph.root {
        return Ok(Vec::new());
    }
    if let Some(path) = search(catalog, graph, table, false) {
        return Ok(path);
    }
    if let Some(path) = search(catalog, graph, table, true) {
        return Ok(path);
    }
    Err(Error::NoJoinPath(table.to_string()))
}

fn search(
    catalog: &Catalog,
    graph: &RelationGraph,
    start: &str,
    allow_nullable: bool,
) -> Option<JoinPath> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    visited.insert(start.to_string());
    let mut queue: VecDeque<(String, JoinPath)> = VecDeque::new();
    queue.push_back((start.to_string(), Vec::new()));

    while let Some((current, path)) = queue.pop_front() {
        let table = catalog.table(&current)?;
        let mut fks: Vec<_> = table
            .foreign_keys
            .iter()
            .filter(|fk| !fk.is_self_reference())
            .filter(|fk| graph.contains(&fk.ref_table))
            .filter(|fk| allow_nullable || !fk.nullable)
            .collect();
        fks.sort_by(|a, b| (&a.ref_table, &a.constraint).cmp(&(&b.ref_table, &b.constraint)));

        for fk in fks {
            if !visited.insert(fk.ref_table.clone()) {
                continue;
            }
            let mut next = path.clone();
            next.push(JoinStep {
                child: current.clone(),
                parent: fk.ref_table.clone(),
                columns: fk.columns.clone(),
            });
            if fk.ref_table == graph.root {
                return Some(next);
            }
            queue.push_back((fk.ref_table.clone(), next));
        }
    }
    None
}
