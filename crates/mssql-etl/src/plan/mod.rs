//! Write-strategy selection and parameterized statement synthesis.
//!
//! [`synthesize`] is a pure function of the destination's primary key set
//! and emptiness. It renders one of three T-SQL statement shapes and,
//! alongside the text, an explicit role-tagged parameter-order list. The
//! loader binds positionally from that list and never re-derives binding
//! order from the statement text.
//!
//! Policy: primary-key presence alone selects the upsert shape; the
//! plain-insert fast path for an empty destination applies only when the
//! table has no primary key.

use crate::core::identifier::{qualify_table, quote_ident};
use crate::core::schema::TableSchema;
use crate::error::{EtlError, Result};
use crate::mapping::ColumnMapping;

/// Which of the three statement shapes a plan uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// `INSERT INTO … VALUES (…)`. No primary key, destination known empty.
    PlainInsert,

    /// Existence probe over the full value tuple, then insert. No primary
    /// key, destination non-empty.
    GuardedInsert,

    /// Update by key, insert when the update matched nothing. Primary key
    /// present.
    Upsert,
}

/// The role a bound parameter plays in the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// A SET value of the upsert's UPDATE arm.
    UpdateValue,

    /// A WHERE comparison value (upsert key predicate or existence probe).
    PredicateValue,

    /// A VALUES entry of an INSERT.
    InsertValue,
}

/// One placeholder position of the synthesized statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub role: ParamRole,
    /// Destination column whose (transformed) value fills this position.
    pub column: String,
}

/// A synthesized statement plus its parameter-order contract.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub kind: PlanKind,

    /// Destination table, as configured.
    pub table: String,

    /// Statement text with `@P1`-style placeholders only; values are never
    /// interpolated.
    pub statement: String,

    /// Position-by-position description of what each placeholder binds to.
    /// Invariant: the statement's placeholder count equals this length.
    pub params: Vec<ParamSlot>,
}

impl LoadPlan {
    /// Count `@P` placeholders in the statement text.
    pub fn placeholder_count(&self) -> usize {
        self.statement.matches("@P").count()
    }
}

/// Select a statement shape and render it for the given mapping.
///
/// The mapper has already validated the mapping against the schema; a
/// primary key column missing from the mapping here is a caller bug and is
/// rejected with `EtlError::Mapping`.
pub fn synthesize(
    schema: &TableSchema,
    mapping: &ColumnMapping,
    destination_is_empty: bool,
) -> Result<LoadPlan> {
    if mapping.is_empty() {
        return Err(EtlError::Mapping(format!(
            "no valid mapping for destination table {}",
            schema.table
        )));
    }
    for pk in &schema.primary_key {
        if mapping.position_of_dest(pk).is_none() {
            return Err(EtlError::Mapping(format!(
                "unmapped primary key column {} of destination table {}",
                pk, schema.table
            )));
        }
    }

    let table = qualify_table(&schema.table)?;

    let plan = if schema.has_pk() {
        synthesize_upsert(schema, mapping, &table)?
    } else if destination_is_empty {
        synthesize_plain_insert(mapping, &table)?
    } else {
        synthesize_guarded_insert(mapping, &table)?
    };

    debug_assert_eq!(plan.placeholder_count(), plan.params.len());
    Ok(plan)
}

/// Sequential `@P1`, `@P2`, … placeholder allocator.
struct Placeholders {
    next: usize,
}

impl Placeholders {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn take(&mut self) -> String {
        let p = format!("@P{}", self.next);
        self.next += 1;
        p
    }
}

fn synthesize_plain_insert(mapping: &ColumnMapping, table: &str) -> Result<LoadPlan> {
    let mut placeholders = Placeholders::new();
    let mut params = Vec::with_capacity(mapping.len());

    let col_list = quoted_list(&mapping.dest_columns)?;
    let value_list: Vec<String> = mapping
        .dest_columns
        .iter()
        .map(|col| {
            params.push(ParamSlot {
                role: ParamRole::InsertValue,
                column: col.clone(),
            });
            placeholders.take()
        })
        .collect();

    Ok(LoadPlan {
        kind: PlanKind::PlainInsert,
        table: table.to_string(),
        statement: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            col_list,
            value_list.join(", ")
        ),
        params,
    })
}

fn synthesize_guarded_insert(mapping: &ColumnMapping, table: &str) -> Result<LoadPlan> {
    let mut placeholders = Placeholders::new();
    let mut params = Vec::with_capacity(mapping.len() * 2);

    // Probe equates every destination column to a bound value.
    let mut probe = Vec::with_capacity(mapping.len());
    for col in &mapping.dest_columns {
        params.push(ParamSlot {
            role: ParamRole::PredicateValue,
            column: col.clone(),
        });
        probe.push(format!("{} = {}", quote_ident(col)?, placeholders.take()));
    }

    let col_list = quoted_list(&mapping.dest_columns)?;
    let value_list: Vec<String> = mapping
        .dest_columns
        .iter()
        .map(|col| {
            params.push(ParamSlot {
                role: ParamRole::InsertValue,
                column: col.clone(),
            });
            placeholders.take()
        })
        .collect();

    Ok(LoadPlan {
        kind: PlanKind::GuardedInsert,
        table: table.to_string(),
        statement: format!(
            "IF NOT EXISTS (SELECT 1 FROM {} WHERE {}) BEGIN INSERT INTO {} ({}) VALUES ({}) END",
            table,
            probe.join(" AND "),
            table,
            col_list,
            value_list.join(", ")
        ),
        params,
    })
}

fn synthesize_upsert(
    schema: &TableSchema,
    mapping: &ColumnMapping,
    table: &str,
) -> Result<LoadPlan> {
    let non_pk: Vec<&String> = mapping
        .dest_columns
        .iter()
        .filter(|c| !schema.is_pk_column(c))
        .collect();

    // With nothing to UPDATE (every mapped column is part of the key) the
    // shape degenerates to an insert guarded on the key predicate.
    if non_pk.is_empty() {
        return synthesize_pk_guarded_insert(schema, mapping, table);
    }

    let mut placeholders = Placeholders::new();
    let mut params = Vec::new();

    let mut set_clauses = Vec::with_capacity(non_pk.len());
    for col in &non_pk {
        params.push(ParamSlot {
            role: ParamRole::UpdateValue,
            column: (*col).clone(),
        });
        set_clauses.push(format!("{} = {}", quote_ident(col)?, placeholders.take()));
    }

    let mut key_predicate = Vec::with_capacity(schema.primary_key.len());
    for pk in &schema.primary_key {
        params.push(ParamSlot {
            role: ParamRole::PredicateValue,
            column: pk.clone(),
        });
        key_predicate.push(format!("{} = {}", quote_ident(pk)?, placeholders.take()));
    }

    let col_list = quoted_list(&mapping.dest_columns)?;
    let value_list: Vec<String> = mapping
        .dest_columns
        .iter()
        .map(|col| {
            params.push(ParamSlot {
                role: ParamRole::InsertValue,
                column: col.clone(),
            });
            placeholders.take()
        })
        .collect();

    Ok(LoadPlan {
        kind: PlanKind::Upsert,
        table: table.to_string(),
        statement: format!(
            "UPDATE {} SET {} WHERE {}; IF @@ROWCOUNT = 0 BEGIN INSERT INTO {} ({}) VALUES ({}) END",
            table,
            set_clauses.join(", "),
            key_predicate.join(" AND "),
            table,
            col_list,
            value_list.join(", ")
        ),
        params,
    })
}

fn synthesize_pk_guarded_insert(
    schema: &TableSchema,
    mapping: &ColumnMapping,
    table: &str,
) -> Result<LoadPlan> {
    let mut placeholders = Placeholders::new();
    let mut params = Vec::new();

    let mut key_predicate = Vec::with_capacity(schema.primary_key.len());
    for pk in &schema.primary_key {
        params.push(ParamSlot {
            role: ParamRole::PredicateValue,
            column: pk.clone(),
        });
        key_predicate.push(format!("{} = {}", quote_ident(pk)?, placeholders.take()));
    }

    let col_list = quoted_list(&mapping.dest_columns)?;
    let value_list: Vec<String> = mapping
        .dest_columns
        .iter()
        .map(|col| {
            params.push(ParamSlot {
                role: ParamRole::InsertValue,
                column: col.clone(),
            });
            placeholders.take()
        })
        .collect();

    Ok(LoadPlan {
        kind: PlanKind::Upsert,
        table: table.to_string(),
        statement: format!(
            "IF NOT EXISTS (SELECT 1 FROM {} WHERE {}) BEGIN INSERT INTO {} ({}) VALUES ({}) END",
            table,
            key_predicate.join(" AND "),
            table,
            col_list,
            value_list.join(", ")
        ),
        params,
    })
}

fn quoted_list(columns: &[String]) -> Result<String> {
    let quoted: Result<Vec<String>> = columns.iter().map(|c| quote_ident(c)).collect();
    Ok(quoted?.join(", "))
}
