//! Live-database access: connecting, reading the catalog snapshot, and
//! reading the root table's partition values.
//!
//! Everything here returns plain data structures; no other module holds a
//! connection. The snapshot is taken once at the start of a run, and later
//! catalog changes are not observed.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::catalog::{Catalog, Column, ForeignKey, Table, SOURCE_SCHEMA};
use crate::error::{Error, Result};
use crate::ident::quote_ident;

/// Base tables in the source schema along with their primary key columns.
/// Tables without a primary key are not clonable and are left out, as the
/// source data cannot be re-keyed.
const TABLES_SQL: &str = "
    SELECT t.table_name::text AS table_name,
           array_agg(kcu.column_name::text ORDER BY kcu.ordinal_position) AS pk_cols
    FROM information_schema.tables t
    JOIN information_schema.table_constraints tc
        ON tc.table_schema = t.table_schema
        AND tc.table_name = t.table_name
        AND tc.constraint_type = 'PRIMARY KEY'
    JOIN information_schema.key_column_usage kcu
        ON kcu.constraint_name = tc.constraint_name
        AND kcu.constraint_schema = tc.constraint_schema
    WHERE t.table_type = 'BASE TABLE' AND t.table_schema = $1
    GROUP BY t.table_name
";

const COLUMNS_SQL: &str = "
    SELECT
        c.table_name::text AS table_name,
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.is_nullable = 'NO' AS not_null,
        c.column_default::text AS column_default,
        (c.is_identity = 'YES' OR COALESCE(c.column_default LIKE 'nextval(%', false)) AS is_serial
    FROM information_schema.columns c
    WHERE c.table_schema = $1
    ORDER BY c.table_name, c.ordinal_position
";

/// Foreign keys with one row per column pair. Unnesting `conkey`/`confkey`
/// together keeps referencing and referenced columns paired by position, so
/// multi-column constraints reassemble exactly. Constraint names are only
/// unique per table, which is why rows carry the table name too.
const FOREIGN_KEYS_SQL: &str = "
    SELECT
        con.conname::text AS constraint_name,
        rel.relname::text AS table_name,
        att.attname::text AS column_name,
        frel.relname::text AS foreign_table_name,
        fatt.attname::text AS foreign_column_name,
        NOT att.attnotnull AS nullable
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class rel ON rel.oid = con.conrelid
    JOIN pg_catalog.pg_namespace nsp ON nsp.oid = rel.relnamespace
    JOIN pg_catalog.pg_class frel ON frel.oid = con.confrelid
    JOIN pg_catalog.pg_namespace fnsp ON fnsp.oid = frel.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
        WITH ORDINALITY AS pairs(attnum, fattnum, ord)
    JOIN pg_catalog.pg_attribute att
        ON att.attrelid = con.conrelid AND att.attnum = pairs.attnum
    JOIN pg_catalog.pg_attribute fatt
        ON fatt.attrelid = con.confrelid AND fatt.attnum = pairs.fattnum
    WHERE con.contype = 'f' AND nsp.nspname = $1 AND fnsp.nspname = $1
    ORDER BY rel.relname, con.conname, pairs.ord
";

pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Reads the full catalog snapshot for the source schema.
pub async fn read_catalog(pool: &PgPool) -> Result<Catalog> {
    let mut catalog = Catalog::default();

    for row in sqlx::query(TABLES_SQL)
        .bind(SOURCE_SCHEMA)
        .fetch_all(pool)
        .await?
    {
        catalog.insert(Table {
            name: row.get("table_name"),
            columns: Vec::new(),
            primary_key: row.get("pk_cols"),
            foreign_keys: Vec::new(),
        });
    }

    for row in sqlx::query(COLUMNS_SQL)
        .bind(SOURCE_SCHEMA)
        .fetch_all(pool)
        .await?
    {
        let table: String = row.get("table_name");
        if let Some(table) = catalog.tables.get_mut(&table) {
            table.columns.push(Column {
                name: row.get("column_name"),
                data_type: row.get("data_type"),
                not_null: row.get("not_null"),
                is_serial: row.get("is_serial"),
                default: row.get("column_default"),
            });
        }
    }

    for row in sqlx::query(FOREIGN_KEYS_SQL)
        .bind(SOURCE_SCHEMA)
        .fetch_all(pool)
        .await?
    {
        attach_foreign_key(
            &mut catalog,
            FkRow {
                constraint: row.get("constraint_name"),
                table: row.get("table_name"),
                column: row.get("column_name"),
                ref_table: row.get("foreign_table_name"),
                ref_column: row.get("foreign_column_name"),
                nullable: row.get("nullable"),
            },
        );
    }

    Ok(catalog)
}

/// One column pair of a foreign key, in constraint order.
struct FkRow {
    constraint: String,
    table: String,
    column: String,
    ref_table: String,
    ref_column: String,
    nullable: bool,
}

/// Folds a column-pair row into the snapshot. Rows for the same (table,
/// constraint) extend the existing key's column list; constraints touching
/// tables outside the snapshot are dropped, matching how the working set
/// ignores them.
fn attach_foreign_key(catalog: &mut Catalog, row: FkRow) {
    if catalog.table(&row.ref_table).is_none() {
        return;
    }
    let Some(table) = catalog.tables.get_mut(&row.table) else {
        return;
    };
    match table
        .foreign_keys
        .iter_mut()
        .find(|fk| fk.constraint == row.constraint)
    {
        Some(fk) => {
            fk.columns.push((row.column, row.ref_column));
            fk.nullable |= row.nullable;
        }
        None => table.foreign_keys.push(ForeignKey {
            constraint: row.constraint,
            table: row.table,
            columns: vec![(row.column, row.ref_column)],
            ref_table: row.ref_table,
            nullable: row.nullable,
        }),
    }
}

/// Reads the distinct partition values from the root table, as text.
/// Validates the table and column against the snapshot first, so a typo shows
/// up as a configuration error rather than a SQL one.
pub async fn read_partition_values(
    pool: &PgPool,
    catalog: &Catalog,
    table: &str,
    column: &str,
) -> Result<Vec<Option<String>>> {
    let root = catalog.require_table(table)?;
    if root.column(column).is_none() {
        return Err(Error::PartitionColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        });
    }

    let sql = format!(
        "SELECT DISTINCT {}::text AS value FROM {}.{} ORDER BY 1",
        quote_ident(column),
        quote_ident(SOURCE_SCHEMA),
        quote_ident(table)
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|row| row.get("value")).collect())
}

/// True when a schema with this name already exists.
pub async fn schema_exists(pool: &PgPool, name: &str) -> Result<bool> {
    let row = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1) AS present",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(row.get("present"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_table(name: &str) -> Table {
        Table {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: vec!["id".to_string()],
            foreign_keys: Vec::new(),
        }
    }

    fn row(constraint: &str, table: &str, column: &str, ref_table: &str, ref_column: &str) -> FkRow {
        FkRow {
            constraint: constraint.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
            nullable: false,
        }
    }

    #[test]
    fn test_composite_key_pairs_stay_in_order() {
        let mut catalog = Catalog::default();
        catalog.insert(bare_table("parent"));
        catalog.insert(bare_table("child"));

        attach_foreign_key(&mut catalog, row("child_parent_fkey", "child", "parent_id", "parent", "id"));
        attach_foreign_key(&mut catalog, row("child_parent_fkey", "child", "parent_region", "parent", "region"));

        let fks = &catalog.table("child").unwrap().foreign_keys;
        assert_eq!(fks.len(), 1);
        assert_eq!(
            fks[0].columns,
            vec![
                ("parent_id".to_string(), "id".to_string()),
                ("parent_region".to_string(), "region".to_string()),
            ]
        );
    }

    #[test]
    fn test_same_named_constraints_on_different_tables_stay_separate() {
        let mut catalog = Catalog::default();
        catalog.insert(bare_table("parent"));
        catalog.insert(bare_table("a"));
        catalog.insert(bare_table("b"));

        attach_foreign_key(&mut catalog, row("owner_fkey", "a", "parent_id", "parent", "id"));
        attach_foreign_key(&mut catalog, row("owner_fkey", "b", "parent_id", "parent", "id"));

        let a_fks = &catalog.table("a").unwrap().foreign_keys;
        let b_fks = &catalog.table("b").unwrap().foreign_keys;
        assert_eq!(a_fks.len(), 1);
        assert_eq!(b_fks.len(), 1);
        assert_eq!(a_fks[0].columns.len(), 1);
        assert_eq!(b_fks[0].columns.len(), 1);
    }

    #[test]
    fn test_nullable_column_marks_whole_key() {
        let mut catalog = Catalog::default();
        catalog.insert(bare_table("parent"));
        catalog.insert(bare_table("child"));

        attach_foreign_key(&mut catalog, row("child_parent_fkey", "child", "parent_id", "parent", "id"));
        let mut second = row("child_parent_fkey", "child", "parent_region", "parent", "region");
        second.nullable = true;
        attach_foreign_key(&mut catalog, second);

        assert!(catalog.table("child").unwrap().foreign_keys[0].nullable);
    }

    #[test]
    fn test_key_to_unknown_table_is_dropped() {
        let mut catalog = Catalog::default();
        catalog.insert(bare_table("child"));

        attach_foreign_key(&mut catalog, row("child_other_fkey", "child", "other_id", "other", "id"));

        assert!(catalog.table("child").unwrap().foreign_keys.is_empty());
    }
}
