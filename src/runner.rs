//! Executes or prints an emitted plan.
//!
//! Each partition runs in its own transaction: a failing statement rolls the
//! partition back and stops the run, while partitions that already committed
//! stay in place. The `DROP SCHEMA ... CASCADE` prefix on the next run cleans
//! up whatever a failed partition left behind.

use std::io::Write;

use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::error::{Error, Result};
use crate::plan::{Plan, Statement};

/// Writes the plan as SQL text: a comment line naming each partition, then
/// its statements in emission order.
pub fn print_plan<W: Write>(plan: &Plan, out: &mut W) -> Result<()> {
    for partition in &plan.partitions {
        writeln!(out, "-- {}", partition.schema)?;
        for statement in &partition.statements {
            writeln!(out, "{statement}")?;
        }
    }
    Ok(())
}

/// Writes the structured plan as JSON, statement kinds and fields intact.
pub fn print_plan_json<W: Write>(plan: &Plan, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, plan)?;
    writeln!(out)?;
    Ok(())
}

/// Runs the plan against the database, one transaction per partition.
///
/// Unless `force` is set, a target schema that already exists aborts the run
/// before anything is dropped; only `--force` opts into destroying it.
pub async fn execute_plan(pool: &PgPool, plan: &Plan, force: bool) -> Result<()> {
    if !force {
        for partition in &plan.partitions {
            if db::schema_exists(pool, &partition.schema).await? {
                return Err(Error::SchemaExists(partition.schema.clone()));
            }
        }
    }

    for partition in &plan.partitions {
        info!("+ {}", partition.schema);
        let mut tx = pool.begin().await?;
        for statement in &partition.statements {
            let sql = statement.to_sql();
            match sqlx::query(&sql).execute(&mut *tx).await {
                Ok(done) => {
                    if let Statement::CopyData { table, .. } = statement {
                        info!("  ~ {}: {} rows", table, done.rows_affected());
                    }
                }
                Err(source) => {
                    let _ = tx.rollback().await;
                    return Err(Error::Execution {
                        partition: partition.schema.clone(),
                        statement: sql,
                        source,
                    });
                }
            }
        }
        tx.commit().await?;
    }
    Ok(())
}
