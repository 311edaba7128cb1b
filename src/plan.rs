//! Builds the per-partition statement plan.
//!
//! Statements are kept structured until the last moment; [`Statement::to_sql`]
//! is the only place SQL text is assembled. For a fixed catalog snapshot and
//! partition list the emitted sequence is byte-for-byte stable, so the print
//! mode can be used as a diff target.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::catalog::{Catalog, SOURCE_SCHEMA};
use crate::error::{Error, Result};
use crate::graph::RelationGraph;
use crate::ident::{quote_ident, quote_literal};
use crate::partition::Partition;
use crate::paths::{self, JoinPath};

/// What a cloned serial column's sequence should start at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePolicy {
    /// Advance the sequence past the highest copied id, so inserts made after
    /// the split continue where the source data left off.
    Resume,
    /// Leave the sequence at its default starting value.
    Fresh,
}

#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub sequence_policy: SequencePolicy,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            sequence_policy: SequencePolicy::Resume,
        }
    }
}

/// Filter anchoring a copy to the root table's partition value.
#[derive(Debug, Clone, Serialize)]
pub struct RootFilter {
    pub table: String,
    pub column: String,
    pub value: String,
}

/// One statement of the plan, rendered to SQL only at the boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    DropSchema {
        schema: String,
    },
    CreateSchema {
        schema: String,
    },
    /// Clone structure from the source table: columns, defaults, indexes.
    /// `LIKE` never carries foreign keys over, and identity definitions are
    /// excluded explicitly; both are rebuilt by later statements.
    CreateTable {
        schema: String,
        table: String,
    },
    /// Copy the partition's rows, joining back to the root to filter them.
    CopyData {
        schema: String,
        table: String,
        joins: JoinPath,
        filter: RootFilter,
    },
    CreateSequence {
        schema: String,
        table: String,
        column: String,
    },
    /// Ties the sequence to its column so `DROP SCHEMA ... CASCADE` takes the
    /// sequence down with the table.
    SequenceOwnedBy {
        schema: String,
        table: String,
        column: String,
    },
    SetColumnDefault {
        schema: String,
        table: String,
        column: String,
    },
    /// Advance the sequence past the highest copied id.
    ResumeSequence {
        schema: String,
        table: String,
        column: String,
    },
    /// Re-add a foreign key, pointing inside the new schema.
    AddForeignKey {
        schema: String,
        constraint: String,
        table: String,
        columns: Vec<(String, String)>,
        ref_table: String,
    },
}

fn sequence_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_seq")
}

/// Schema-qualified, quoted name.
fn qual(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

impl Statement {
    pub fn to_sql(&self) -> String {
        match self {
            Statement::DropSchema { schema } => {
                format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(schema))
            }
            Statement::CreateSchema { schema } => {
                format!("CREATE SCHEMA {}", quote_ident(schema))
            }
            Statement::CreateTable { schema, table } => format!(
                "CREATE TABLE {} (LIKE {} INCLUDING ALL EXCLUDING IDENTITY)",
                qual(schema, table),
                qual(SOURCE_SCHEMA, table)
            ),
            Statement::CopyData {
                schema,
                table,
                joins,
                filter,
            } => {
                let mut sql = format!(
                    "INSERT INTO {} SELECT {}.* FROM {}",
                    qual(schema, table),
                    quote_ident(table),
                    qual(SOURCE_SCHEMA, table)
                );
                for step in joins {
                    let on = step
                        .columns
                        .iter()
                        .map(|(child_col, parent_col)| {
                            format!(
                                "{}.{} = {}.{}",
                                quote_ident(&step.child),
                                quote_ident(child_col),
                                quote_ident(&step.parent),
                                quote_ident(parent_col)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(" AND ");
                    sql.push_str(&format!(
                        " JOIN {} ON {on}",
                        qual(SOURCE_SCHEMA, &step.parent)
                    ));
                }
                sql.push_str(&format!(
                    " WHERE {}.{} = {}",
                    quote_ident(&filter.table),
                    quote_ident(&filter.column),
                    quote_literal(&filter.value)
                ));
                sql
            }
            Statement::CreateSequence {
                schema,
                table,
                column,
            } => format!(
                "CREATE SEQUENCE {}",
                qual(schema, &sequence_name(table, column))
            ),
            Statement::SequenceOwnedBy {
                schema,
                table,
                column,
            } => format!(
                "ALTER SEQUENCE {} OWNED BY {}.{}",
                qual(schema, &sequence_name(table, column)),
                qual(schema, table),
                quote_ident(column)
            ),
            Statement::SetColumnDefault {
                schema,
                table,
                column,
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT nextval({}::regclass)",
                qual(schema, table),
                quote_ident(column),
                quote_literal(&qual(schema, &sequence_name(table, column)))
            ),
            Statement::ResumeSequence {
                schema,
                table,
                column,
            } => format!(
                "SELECT setval({}, COALESCE((SELECT MAX({}) FROM {}), 0) + 1, false)",
                quote_literal(&qual(schema, &sequence_name(table, column))),
                quote_ident(column),
                qual(schema, table)
            ),
            Statement::AddForeignKey {
                schema,
                constraint,
                table,
                columns,
                ref_table,
            } => {
                let (cols, ref_cols): (Vec<_>, Vec<_>) = columns
                    .iter()
                    .map(|(col, ref_col)| (quote_ident(col), quote_ident(ref_col)))
                    .unzip();
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                    qual(schema, table),
                    quote_ident(constraint),
                    cols.join(", "),
                    qual(schema, ref_table),
                    ref_cols.join(", ")
                )
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionPlan {
    pub schema: String,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub partitions: Vec<PartitionPlan>,
}

/// Builds the full plan: one ordered statement list per partition.
///
/// Statement order within a partition is fixed by the dependency structure:
/// schema recreation, then table creation parents-first, then data copies,
/// then sequence re-keying, then foreign keys last (they may point forward
/// regardless of creation order).
pub fn plan(
    catalog: &Catalog,
    root: &str,
    partition_column: &str,
    partitions: &[Partition],
    options: &PlanOptions,
) -> Result<Plan> {
    let root_table = catalog.require_table(root)?;
    if root_table.column(partition_column).is_none() {
        return Err(Error::PartitionColumnNotFound {
            table: root.to_string(),
            column: partition_column.to_string(),
        });
    }
    if !root_table.foreign_keys.is_empty() {
        warn!(
            table = root,
            "root table declares foreign keys of its own; it may itself be owned by another table"
        );
    }

    let graph = RelationGraph::discover(catalog, root)?;
    let order = graph.creation_order(catalog)?;
    let join_paths = paths::resolve_all(catalog, &graph)?;
    let foreign_keys = graph.foreign_keys(catalog);

    let mut plans = Vec::with_capacity(partitions.len());
    for partition in partitions {
        let schema = &partition.schema;
        let mut statements = vec![
            Statement::DropSchema {
                schema: schema.clone(),
            },
            Statement::CreateSchema {
                schema: schema.clone(),
            },
        ];

        for table in &order {
            statements.push(Statement::CreateTable {
                schema: schema.clone(),
                table: table.clone(),
            });
        }

        for table in &order {
            statements.push(Statement::CopyData {
                schema: schema.clone(),
                table: table.clone(),
                joins: join_paths.get(table).cloned().unwrap_or_default(),
                filter: RootFilter {
                    table: root.to_string(),
                    column: partition_column.to_string(),
                    value: partition.value.clone(),
                },
            });
        }

        for table in &order {
            let serials = catalog
                .table(table)
                .map(|t| t.serial_columns().collect::<Vec<_>>())
                .unwrap_or_default();
            for column in serials {
                statements.push(Statement::CreateSequence {
                    schema: schema.clone(),
                    table: table.clone(),
                    column: column.name.clone(),
                });
                statements.push(Statement::SequenceOwnedBy {
                    schema: schema.clone(),
                    table: table.clone(),
                    column: column.name.clone(),
                });
                statements.push(Statement::SetColumnDefault {
                    schema: schema.clone(),
                    table: table.clone(),
                    column: column.name.clone(),
                });
                if options.sequence_policy == SequencePolicy::Resume {
                    statements.push(Statement::ResumeSequence {
                        schema: schema.clone(),
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        for fk in &foreign_keys {
            statements.push(Statement::AddForeignKey {
                schema: schema.clone(),
                constraint: fk.constraint.clone(),
                table: fk.table.clone(),
                columns: fk.columns.clone(),
                ref_table: fk.ref_table.clone(),
            });
        }

        plans.push(PartitionPlan {
            schema: schema.clone(),
            statements,
        });
    }

    Ok(Plan { partitions: plans })
}
