use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("root table not found: {0}")]
    RootTableNotFound(String),

    #[error("column {column} not found on table {table}")]
    PartitionColumnNotFound { table: String, column: String },

    #[error("foreign keys form a cycle: {}", .0.join(" -> "))]
    ReferenceCycle(Vec<String>),

    #[error("null or empty partition value in column {0}")]
    NullPartitionValue(String),

    #[error("partition values {} all normalize to schema name {name}", .values.join(", "))]
    SchemaNameCollision { name: String, values: Vec<String> },

    #[error("cannot derive a schema name from {0:?}")]
    InvalidSchemaName(String),

    #[error("no foreign key path from {0} to the root table")]
    NoJoinPath(String),

    #[error("schema {0} already exists (re-run with --force to drop and rebuild it)")]
    SchemaExists(String),

    #[error("statement failed for partition {partition}: {source}\n  {statement}")]
    Execution {
        partition: String,
        statement: String,
        #[source]
        source: sqlx::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
