//! Configuration validation.

use crate::core::identifier::validate_identifier;
use crate::error::{EtlError, Result};

use super::types::EtlConfig;

pub(crate) fn validate(config: &EtlConfig) -> Result<()> {
    for (side, conn) in [("source", &config.source), ("destination", &config.destination)] {
        if conn.host.is_empty() {
            return Err(EtlError::Config(format!("{} host must not be empty", side)));
        }
        if conn.database.is_empty() {
            return Err(EtlError::Config(format!(
                "{} database must not be empty",
                side
            )));
        }
        if conn.user.is_empty() {
            return Err(EtlError::Config(format!("{} user must not be empty", side)));
        }
    }

    let load = &config.load;
    if load.query.trim().is_empty() {
        return Err(EtlError::Config("load query must not be empty".to_string()));
    }
    if load.table.trim().is_empty() {
        return Err(EtlError::Config("load table must not be empty".to_string()));
    }
    if load.batch_size == 0 {
        return Err(EtlError::Config(
            "batch_size must be at least 1".to_string(),
        ));
    }

    for part in load.table.splitn(2, '.') {
        validate_identifier(part)?;
    }
    for entry in &load.columns {
        validate_identifier(&entry.source)?;
        if let Some(dest) = &entry.dest {
            validate_identifier(dest)?;
        }
    }

    Ok(())
}
