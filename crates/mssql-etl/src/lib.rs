//! Query-to-table ETL loader for SQL Server.
//!
//! Executes an extraction query against a source database and loads the
//! result into a destination table, applying per-column transformations
//! on the way. The write strategy (plain insert, existence-guarded insert
//! or primary-key upsert) is chosen at load time from the introspected
//! destination schema, and rows are written in commit windows with full
//! rollback of a failed window.
//!
//! # Example
//!
//! ```no_run
//! use mssql_etl::{loader, EtlConfig, MssqlDestination, MssqlSource};
//!
//! # async fn example() -> mssql_etl::Result<()> {
//! let config = EtlConfig::load("etl.yaml")?;
//! let source = MssqlSource::connect(&config.source).await?;
//! let dest = MssqlDestination::connect(&config.destination).await?;
//! let stats = loader::run(&source, &dest, &config).await?;
//! println!("loaded {} rows in {} commits", stats.rows_read, stats.commits);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod plan;
pub mod transform;

pub use config::{ColumnMapEntry, ConnectionConfig, EtlConfig, LoadSpec};
pub use core::{
    BoundStatement, ColumnDescriptor, Destination, RowCursor, Source, SqlNullType, SqlValue,
    TableSchema,
};
pub use drivers::{MssqlDestination, MssqlSource};
pub use error::{EtlError, Result};
pub use loader::{LoadConfiguration, LoadStats};
pub use mapping::{build_mapping, ColumnMapping};
pub use plan::{synthesize, LoadPlan, ParamRole, ParamSlot, PlanKind};
pub use transform::{DatePart, TransformRule, TransformSet};
