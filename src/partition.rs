//! Turns the distinct values of the partition column into named partitions.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::ident;

/// One output schema: its normalized name and the raw partition value whose
/// root rows it will hold. Computed fresh each run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub schema: String,
    pub value: String,
}

/// Builds the partition list from the distinct values of `column` on the root
/// table, ordered by schema name.
///
/// A null or empty value cannot name a schema and fails the run. Two distinct
/// values that normalize to the same schema name are logically different
/// partitions aimed at one schema; that is reported as a collision rather
/// than silently merged.
pub fn enumerate(column: &str, values: Vec<Option<String>>) -> Result<Vec<Partition>> {
    let mut by_schema: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for value in values {
        let value = match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Err(Error::NullPartitionValue(column.to_string())),
        };
        let schema = ident::schema_name(&value)?;
        let entry = by_schema.entry(schema).or_default();
        if !entry.contains(&value) {
            entry.push(value);
        }
    }

    let mut partitions = Vec::with_capacity(by_schema.len());
    for (schema, mut values) in by_schema {
        if values.len() > 1 {
            values.sort();
            return Err(Error::SchemaNameCollision {
                name: schema,
                values,
            });
        }
        partitions.push(Partition {
            schema,
            value: values.remove(0),
        });
    }
    Ok(partitions)
}
