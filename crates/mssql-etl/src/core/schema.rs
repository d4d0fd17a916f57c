//! Destination schema metadata and introspection.
//!
//! A [`TableSchema`] is fetched once per load and read-only thereafter; the
//! mapper and the statement synthesizer both consume it.

use serde::{Deserialize, Serialize};

use crate::core::traits::Destination;
use crate::error::{EtlError, Result};

/// Column metadata as reported by the destination catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Declared data type (e.g. "int", "nvarchar", "datetime2").
    pub data_type: String,

    /// Ordinal position (1-based).
    pub ordinal_pos: i32,
}

/// Destination table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name as given by the caller (optionally schema-qualified).
    pub table: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<ColumnDescriptor>,

    /// Primary key column names in key ordinal order.
    ///
    /// Empty means the table has no declared primary key, which is valid.
    /// Membership semantics are those of a set; the order is kept because
    /// the upsert predicate binds parameters in key order.
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Fetch the destination schema for `table`. Called once per load.
    pub async fn introspect(dest: &dyn Destination, table: &str) -> Result<Self> {
        let columns = dest.list_columns(table).await?;
        if columns.is_empty() {
            return Err(EtlError::Schema(format!(
                "destination table {} does not exist or has no columns",
                table
            )));
        }
        let primary_key = dest.list_primary_keys(table).await?;

        Ok(Self {
            table: table.to_string(),
            columns,
            primary_key,
        })
    }

    /// Check if the table has a declared primary key.
    pub fn has_pk(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Look up a column by name (case-insensitive, like the catalog).
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Check whether `name` is one of the primary key columns.
    pub fn is_pk_column(&self, name: &str) -> bool {
        self.primary_key
            .iter()
            .any(|pk| pk.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_column(name: &str, data_type: &str, pos: i32) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            data_type: data_type.to_string(),
            ordinal_pos: pos,
        }
    }

    fn make_schema(pk: &[&str]) -> TableSchema {
        TableSchema {
            table: "dbo.People".to_string(),
            columns: vec![
                make_column("Id", "int", 1),
                make_column("Name", "nvarchar", 2),
            ],
            primary_key: pk.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_has_pk() {
        assert!(make_schema(&["Id"]).has_pk());
        assert!(!make_schema(&[]).has_pk());
    }

    #[test]
    fn test_column_lookup_case_insensitive() {
        let schema = make_schema(&["Id"]);
        assert!(schema.column("name").is_some());
        assert!(schema.column("missing").is_none());
    }

    #[test]
    fn test_is_pk_column() {
        let schema = make_schema(&["Id"]);
        assert!(schema.is_pk_column("id"));
        assert!(!schema.is_pk_column("Name"));
    }
}
