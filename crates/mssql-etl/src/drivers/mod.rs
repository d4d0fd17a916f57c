//! Concrete database drivers implementing the core traits.

pub mod mssql;

pub use mssql::{MssqlDestination, MssqlSource};
