//! Core abstractions for the ETL pipeline.
//!
//! This module provides the foundational types and traits used throughout
//! the loader:
//!
//! - [`schema`]: Destination column and table metadata plus introspection
//! - [`value`]: SQL value representation
//! - [`traits`]: Source, cursor, destination, and statement abstractions
//! - [`identifier`]: T-SQL identifier validation and quoting
//!
//! The core is database-agnostic; the `drivers` module supplies the
//! concrete SQL Server implementations, and tests exercise the same traits
//! with in-memory fakes.

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use schema::{ColumnDescriptor, TableSchema};
pub use traits::{BoundStatement, Destination, RowCursor, Source};
pub use value::{SqlNullType, SqlValue};
