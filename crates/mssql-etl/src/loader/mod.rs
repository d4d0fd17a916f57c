//! Batched, transactional load loop.
//!
//! [`run`] wires the whole pipeline: execute the extraction query,
//! introspect the destination, validate the column mapping, synthesize the
//! write statement, then drive the cursor through [`load_rows`]. The loader
//! owns the destination transaction for the load's duration; auto-commit is
//! disabled before the first row and unconditionally restored on every exit
//! path.

use tracing::{debug, info, warn};

use crate::config::EtlConfig;
use crate::core::schema::TableSchema;
use crate::core::traits::{Destination, RowCursor, Source};
use crate::error::{EtlError, Result};
use crate::mapping::{build_mapping, ColumnMapping};
use crate::plan::{synthesize, LoadPlan};
use crate::transform::TransformSet;

/// Everything the load loop needs, built once before the first row.
///
/// There is no process-wide mutable state; a load is fully described by
/// this struct plus the two connections.
#[derive(Debug, Clone)]
pub struct LoadConfiguration {
    /// Extraction query for the source.
    pub query: String,

    /// Synthesized statement and parameter-order contract.
    pub plan: LoadPlan,

    /// Validated column correspondence, in source projection order.
    pub mapping: ColumnMapping,

    /// Per-column transformation rules keyed by source column.
    pub transforms: TransformSet,

    /// Commit window threshold.
    pub batch_size: usize,
}

/// Statistics from a completed load.
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    /// Rows read from the source cursor.
    pub rows_read: u64,

    /// Rows queued for execution (equals `rows_read` today; kept separate
    /// so skipped-row accounting has a home).
    pub rows_queued: u64,

    /// Commit windows flushed.
    pub commits: u64,
}

/// Run a full load as described by `config`.
///
/// Control flow: execute query, introspect destination, build mapping,
/// probe destination emptiness, synthesize the plan, then stream rows.
/// All validation errors surface before any row is read.
pub async fn run(
    source: &dyn Source,
    dest: &dyn Destination,
    config: &EtlConfig,
) -> Result<LoadStats> {
    let spec = &config.load;

    let cursor = source.execute(&spec.query).await?;
    let source_columns = cursor.columns().to_vec();
    debug!(
        "source query returned {} columns: {:?}",
        source_columns.len(),
        source_columns
    );

    let schema = TableSchema::introspect(dest, &spec.table).await?;
    info!(
        "destination {}: {} columns, primary key {:?}",
        schema.table,
        schema.columns.len(),
        schema.primary_key
    );

    let correspondence = spec.correspondence(&source_columns);
    let mapping = build_mapping(&source_columns, &schema, &correspondence)?;

    let destination_is_empty = dest.row_count(&spec.table).await? == 0;
    let plan = synthesize(&schema, &mapping, destination_is_empty)?;
    info!(
        "write strategy for {}: {:?} ({} bind parameters per row)",
        schema.table,
        plan.kind,
        plan.params.len()
    );

    let configuration = LoadConfiguration {
        query: spec.query.clone(),
        plan,
        mapping,
        transforms: TransformSet::from_encodings(&spec.transforms),
        batch_size: spec.batch_size,
    };

    load_rows(cursor, dest, &configuration).await
}

/// Drive the cursor through the batched, transactional load loop.
///
/// Auto-commit is disabled up front and restored whether the load
/// succeeds or fails.
pub async fn load_rows(
    cursor: Box<dyn RowCursor>,
    dest: &dyn Destination,
    config: &LoadConfiguration,
) -> Result<LoadStats> {
    dest.set_auto_commit(false).await?;

    let result = drive(cursor, dest, config).await;

    if let Err(e) = dest.set_auto_commit(true).await {
        warn!("failed to restore auto-commit after load: {}", e);
    }

    result
}

async fn drive(
    mut cursor: Box<dyn RowCursor>,
    dest: &dyn Destination,
    config: &LoadConfiguration,
) -> Result<LoadStats> {
    let mapping = &config.mapping;
    let plan = &config.plan;

    // Resolve source value positions once; a mapped column missing from the
    // projection is a schema problem, surfaced before any row is read.
    let source_columns = cursor.columns();
    let mut value_positions = Vec::with_capacity(mapping.len());
    for src in &mapping.source_columns {
        let idx = source_columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(src))
            .ok_or_else(|| {
                EtlError::Schema(format!("source projection has no column {}", src))
            })?;
        value_positions.push(idx);
    }

    // Bind order comes from the plan's parameter list, never from the
    // statement text.
    let mut bind_order = Vec::with_capacity(plan.params.len());
    for slot in &plan.params {
        let idx = mapping.position_of_dest(&slot.column).ok_or_else(|| {
            EtlError::Mapping(format!(
                "plan references unmapped destination column {}",
                slot.column
            ))
        })?;
        bind_order.push(idx);
    }

    let mut stmt = dest.prepare(&plan.statement).await?;

    let mut stats = LoadStats::default();
    let mut window = 0usize;

    while let Some(row) = cursor.next_row().await? {
        stats.rows_read += 1;

        // Each source value is fetched once, transformed, and placed into
        // the positional vector in mapping order.
        let mut values = Vec::with_capacity(mapping.len());
        for (i, src) in mapping.source_columns.iter().enumerate() {
            let raw = row.get(value_positions[i]).cloned().ok_or_else(|| {
                EtlError::execution(
                    plan.statement.clone(),
                    format!("row {} is narrower than the projection", stats.rows_read),
                )
            })?;
            values.push(config.transforms.apply(src, raw));
        }

        for (position, &value_idx) in bind_order.iter().enumerate() {
            stmt.bind(position, values[value_idx].clone());
        }
        stmt.add_to_batch();
        stats.rows_queued += 1;
        window += 1;

        if window >= config.batch_size {
            flush_window(dest, stmt.as_mut(), window).await?;
            stats.commits += 1;
            window = 0;
        }
    }

    if window > 0 {
        flush_window(dest, stmt.as_mut(), window).await?;
        stats.commits += 1;
    }

    info!(
        "load finished: {} rows in {} commits",
        stats.rows_read, stats.commits
    );
    Ok(stats)
}

/// Execute the queued window and commit it, rolling the whole window back
/// on execution failure. No partial retry.
async fn flush_window(
    dest: &dyn Destination,
    stmt: &mut dyn crate::core::traits::BoundStatement,
    window: usize,
) -> Result<()> {
    match stmt.execute_batch().await {
        Ok(affected) => {
            dest.commit().await?;
            debug!("committed window of {} rows ({} affected)", window, affected);
            Ok(())
        }
        Err(e) => {
            warn!("window of {} rows failed, rolling back: {}", window, e);
            if let Err(rb) = dest.rollback().await {
                warn!("rollback after failed window also failed: {}", rb);
            }
            Err(e)
        }
    }
}
