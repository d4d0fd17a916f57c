//! Configuration types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Top-level ETL configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Source database connection.
    pub source: ConnectionConfig,

    /// Destination database connection.
    pub destination: ConnectionConfig,

    /// What to extract, where to load it, and how.
    pub load: LoadSpec,
}

/// Connection settings for one side of the transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Hostname or IP address.
    pub host: String,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password (never logged).
    #[serde(skip_serializing)]
    pub password: String,

    /// Whether to require TLS.
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Whether to trust the server certificate.
    #[serde(default)]
    pub trust_server_cert: bool,
}

/// Extraction and load parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSpec {
    /// Extraction query executed against the source.
    pub query: String,

    /// Destination table, optionally schema-qualified (`dbo.People`).
    pub table: String,

    /// Commit window threshold.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Source-to-destination column correspondence.
    ///
    /// Empty means every source column maps to the same-named destination
    /// column.
    #[serde(default)]
    pub columns: Vec<ColumnMapEntry>,

    /// Transform rule encodings keyed by source column name.
    #[serde(default)]
    pub transforms: BTreeMap<String, String>,
}

/// One entry of the configured column correspondence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapEntry {
    /// Source projection column.
    pub source: String,

    /// Destination column, or `None`/omitted to skip the source column.
    #[serde(default)]
    pub dest: Option<String>,
}

impl LoadSpec {
    /// Resolve the configured correspondence against the actual projection.
    ///
    /// With no configured entries every source column maps to itself;
    /// otherwise unlisted source columns are skipped.
    pub fn correspondence(&self, source_columns: &[String]) -> HashMap<String, Option<String>> {
        if self.columns.is_empty() {
            return source_columns
                .iter()
                .map(|c| (c.clone(), Some(c.clone())))
                .collect();
        }

        self.columns
            .iter()
            .map(|entry| (entry.source.clone(), entry.dest.clone()))
            .collect()
    }
}

fn default_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_batch_size() -> usize {
    1000
}
