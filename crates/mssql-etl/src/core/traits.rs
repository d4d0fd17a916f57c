//! Core traits for the source and destination collaborators.
//!
//! The loader is written against these abstractions:
//!
//! - [`Source`]: executes the extraction query and hands back a cursor
//! - [`RowCursor`]: forward-only row iteration over the query result
//! - [`Destination`]: schema introspection plus transactional statement
//!   execution
//! - [`BoundStatement`]: positional parameter binding and batched execution
//!
//! Connection establishment and credential handling live with the concrete
//! implementations; the core only ever sees these traits.

use async_trait::async_trait;

use crate::core::schema::ColumnDescriptor;
use crate::core::value::SqlValue;
use crate::error::Result;

/// Executes queries against the source database.
#[async_trait]
pub trait Source: Send + Sync {
    /// Run `query` and return a forward-only cursor over its result.
    ///
    /// The cursor is single-pass; the only way to re-read is to execute
    /// the query again.
    async fn execute(&self, query: &str) -> Result<Box<dyn RowCursor>>;
}

/// Forward-only cursor over a query result.
#[async_trait]
pub trait RowCursor: Send {
    /// Ordered column names of the projection.
    ///
    /// Available before the first row is fetched so mapping validation can
    /// happen without consuming input.
    fn columns(&self) -> &[String];

    /// Fetch the next row, or `None` at end of input.
    ///
    /// Values are positional, matching [`columns`](RowCursor::columns).
    async fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>>;
}

/// Introspectable, transactional destination database.
#[async_trait]
pub trait Destination: Send + Sync {
    /// List the destination table's columns in ordinal order.
    ///
    /// An empty list means the table does not exist.
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// List the primary key column names in key ordinal order.
    ///
    /// An empty list is valid and means no declared primary key.
    async fn list_primary_keys(&self, table: &str) -> Result<Vec<String>>;

    /// Count the rows currently in the destination table.
    async fn row_count(&self, table: &str) -> Result<i64>;

    /// Prepare a parameterized statement for batched execution.
    async fn prepare(&self, statement: &str) -> Result<Box<dyn BoundStatement>>;

    /// Enable or disable auto-commit on the destination connection.
    async fn set_auto_commit(&self, enabled: bool) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> Result<()>;
}

/// A prepared statement with positional parameters and a batch queue.
#[async_trait]
pub trait BoundStatement: Send {
    /// Bind `value` to the 0-based placeholder `position` of the pending row.
    fn bind(&mut self, position: usize, value: SqlValue);

    /// Queue the currently bound parameter set and clear the bindings.
    fn add_to_batch(&mut self);

    /// Execute every queued parameter set, in order, and clear the queue.
    ///
    /// Returns the number of affected rows. On failure the queue is
    /// discarded and the caller decides whether to roll back.
    async fn execute_batch(&mut self) -> Result<u64>;
}
