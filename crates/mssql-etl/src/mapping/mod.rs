//! Column mapping validation.
//!
//! A [`ColumnMapping`] pairs source projection columns with destination
//! columns, in source projection order. The order matters: the loader
//! assembles its positional value vector from this same mapping, and the
//! statement synthesizer derives its parameter-order contract from it.

use std::collections::HashMap;

use tracing::warn;

use crate::core::schema::TableSchema;
use crate::error::{EtlError, Result};

/// Validated source-to-destination column correspondence.
///
/// `source_columns` and `dest_columns` are parallel sequences of equal
/// length; every destination name is a member of the destination schema and
/// every primary key column is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Source projection columns, in projection order, skipped entries removed.
    pub source_columns: Vec<String>,

    /// Destination columns, parallel to `source_columns`.
    pub dest_columns: Vec<String>,
}

impl ColumnMapping {
    /// Number of mapped column pairs.
    pub fn len(&self) -> usize {
        self.dest_columns.len()
    }

    /// Check if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.dest_columns.is_empty()
    }

    /// Position of a destination column within the mapping, if mapped.
    pub fn position_of_dest(&self, name: &str) -> Option<usize> {
        self.dest_columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Build and validate a column mapping.
///
/// `correspondence` maps a source column name to `Some(destination name)` or
/// `None` for an explicit skip; source columns absent from the map are
/// skipped as well. Entries whose destination name is not in the schema are
/// dropped with a warning rather than failing the load.
///
/// # Errors
///
/// `EtlError::Mapping` when the resulting mapping is empty, or when the
/// destination has a primary key and any of its columns is left unmapped.
pub fn build_mapping(
    source_columns: &[String],
    schema: &TableSchema,
    correspondence: &HashMap<String, Option<String>>,
) -> Result<ColumnMapping> {
    let mut mapped_source = Vec::new();
    let mut mapped_dest = Vec::new();

    for src in source_columns {
        let dest = match correspondence.get(src) {
            Some(Some(dest)) => dest,
            _ => continue,
        };

        if schema.column(dest).is_none() {
            warn!(
                "column {} is not part of destination table {}, dropping mapping {} -> {}",
                dest, schema.table, src, dest
            );
            continue;
        }

        mapped_source.push(src.clone());
        mapped_dest.push(dest.clone());
    }

    if mapped_dest.is_empty() {
        return Err(EtlError::Mapping(format!(
            "no valid mapping for destination table {}",
            schema.table
        )));
    }

    for pk in &schema.primary_key {
        if !mapped_dest.iter().any(|c| c.eq_ignore_ascii_case(pk)) {
            return Err(EtlError::Mapping(format!(
                "unmapped primary key column {} of destination table {}",
                pk, schema.table
            )));
        }
    }

    Ok(ColumnMapping {
        source_columns: mapped_source,
        dest_columns: mapped_dest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnDescriptor;

    fn make_schema(columns: &[&str], pk: &[&str]) -> TableSchema {
        TableSchema {
            table: "dbo.People".to_string(),
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, name)| ColumnDescriptor {
                    name: name.to_string(),
                    data_type: "nvarchar".to_string(),
                    ordinal_pos: i as i32 + 1,
                })
                .collect(),
            primary_key: pk.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn correspondence(pairs: &[(&str, Option<&str>)]) -> HashMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(s, d)| (s.to_string(), d.map(|d| d.to_string())))
            .collect()
    }

    #[test]
    fn test_mapping_follows_source_order() {
        let schema = make_schema(&["Id", "Name", "City"], &[]);
        let corr = correspondence(&[("a", Some("City")), ("b", Some("Id")), ("c", Some("Name"))]);
        let source = vec!["b".to_string(), "c".to_string(), "a".to_string()];

        let mapping = build_mapping(&source, &schema, &corr).unwrap();
        assert_eq!(mapping.source_columns, vec!["b", "c", "a"]);
        assert_eq!(mapping.dest_columns, vec!["Id", "Name", "City"]);
    }

    #[test]
    fn test_unknown_dest_column_dropped_not_fatal() {
        let schema = make_schema(&["Id", "Name"], &[]);
        let corr = correspondence(&[("a", Some("Id")), ("b", Some("Nope"))]);
        let source = vec!["a".to_string(), "b".to_string()];

        let mapping = build_mapping(&source, &schema, &corr).unwrap();
        assert_eq!(mapping.dest_columns, vec!["Id"]);
        assert_eq!(mapping.source_columns, vec!["a"]);
    }

    #[test]
    fn test_skip_and_omitted_entries() {
        let schema = make_schema(&["Id", "Name"], &[]);
        let corr = correspondence(&[("a", Some("Id")), ("b", None)]);
        let source = vec!["a".to_string(), "b".to_string(), "unlisted".to_string()];

        let mapping = build_mapping(&source, &schema, &corr).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.dest_columns, vec!["Id"]);
    }

    #[test]
    fn test_empty_mapping_rejected() {
        let schema = make_schema(&["Id"], &[]);
        let corr = correspondence(&[("a", Some("Missing"))]);
        let source = vec!["a".to_string()];

        let err = build_mapping(&source, &schema, &corr).unwrap_err();
        assert!(err.to_string().contains("no valid mapping"));
    }

    #[test]
    fn test_unmapped_primary_key_rejected() {
        let schema = make_schema(&["Id", "Name"], &["Id"]);
        let corr = correspondence(&[("n", Some("Name"))]);
        let source = vec!["n".to_string()];

        let err = build_mapping(&source, &schema, &corr).unwrap_err();
        assert!(err.to_string().contains("unmapped primary key"));
    }

    #[test]
    fn test_accepted_mapping_covers_all_pk_columns() {
        let schema = make_schema(&["Id", "Tenant", "Name"], &["Id", "Tenant"]);
        let corr = correspondence(&[
            ("i", Some("Id")),
            ("t", Some("Tenant")),
            ("n", Some("Name")),
        ]);
        let source = vec!["i".to_string(), "t".to_string(), "n".to_string()];

        let mapping = build_mapping(&source, &schema, &corr).unwrap();
        for pk in &schema.primary_key {
            assert!(mapping.position_of_dest(pk).is_some());
        }
    }

    #[test]
    fn test_pk_coverage_case_insensitive() {
        let schema = make_schema(&["Id", "Name"], &["Id"]);
        let corr = correspondence(&[("i", Some("id")), ("n", Some("Name"))]);
        let source = vec!["i".to_string(), "n".to_string()];

        assert!(build_mapping(&source, &schema, &corr).is_ok());
    }
}
