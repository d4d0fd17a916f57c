//! Identifier validation and T-SQL quoting.
//!
//! SQL identifiers (table names, column names) cannot be passed as
//! parameters in prepared statements - only data values can be
//! parameterized. To safely construct statements with dynamic identifiers
//! we validate them for suspicious patterns and apply bracket quoting with
//! `]` doubling. Data values themselves never reach statement text; they
//! always go through placeholders.

use crate::error::{EtlError, Result};

/// Maximum identifier length (SQL Server limit).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EtlError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(EtlError::Config(format!(
            "Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(EtlError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a SQL Server identifier using brackets.
///
/// Escapes closing brackets by doubling them and wraps in brackets.
/// Validates the identifier before quoting.
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Quote a table reference, honoring an optional `schema.table` form.
///
/// A single dot splits into schema and table parts quoted separately;
/// anything else is quoted as one identifier.
pub fn qualify_table(name: &str) -> Result<String> {
    match name.split_once('.') {
        Some((schema, table)) => Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(table)?)),
        None => quote_ident(name),
    }
}

/// Split a table reference into optional schema part and bare table name.
pub fn split_table(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("my_table").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        assert!(validate_identifier("table\0name").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(validate_identifier(&long_name).is_err());
        let max_name = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(validate_identifier(&max_name).is_ok());
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users").unwrap(), "[users]");
        assert_eq!(quote_ident("table]name").unwrap(), "[table]]name]");
    }

    #[test]
    fn test_quote_ident_injection_safely_quoted() {
        let result = quote_ident("Robert]; DROP TABLE Students;--").unwrap();
        assert_eq!(result, "[Robert]]; DROP TABLE Students;--]");
    }

    #[test]
    fn test_qualify_table() {
        assert_eq!(qualify_table("People").unwrap(), "[People]");
        assert_eq!(qualify_table("dbo.People").unwrap(), "[dbo].[People]");
        assert!(qualify_table("dbo.").is_err());
    }

    #[test]
    fn test_split_table() {
        assert_eq!(split_table("People"), (None, "People"));
        assert_eq!(split_table("dbo.People"), (Some("dbo"), "People"));
    }
}
