//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl EtlConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EtlConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl ConnectionConfig {
    /// Build an ADO-style connection string for tiberius.
    pub fn connection_string(&self) -> String {
        format!(
            "Server=tcp:{},{};Database={};User Id={};Password={};Encrypt={};TrustServerCertificate={}",
            self.host,
            self.port,
            self.database,
            self.user,
            self.password,
            self.encrypt,
            self.trust_server_cert
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
source:
  host: src.example.com
  database: Sales
  user: reader
  password: secret
destination:
  host: dst.example.com
  database: Warehouse
  user: loader
  password: secret
load:
  query: "SELECT Id, Name, City FROM Customers"
  table: dbo.Customers
  transforms:
    City: uppercase
"#;

    #[test]
    fn test_from_yaml_with_defaults() {
        let config = EtlConfig::from_yaml(VALID_YAML).unwrap();
        assert_eq!(config.source.port, 1433);
        assert_eq!(config.load.batch_size, 1000);
        assert_eq!(config.load.table, "dbo.Customers");
        assert_eq!(
            config.load.transforms.get("City").map(String::as_str),
            Some("uppercase")
        );
    }

    #[test]
    fn test_rejects_empty_query() {
        let yaml = VALID_YAML.replace("\"SELECT Id, Name, City FROM Customers\"", "\"  \"");
        assert!(EtlConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let yaml = format!("{}  batch_size: 0\n", VALID_YAML);
        assert!(EtlConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_connection_string() {
        let config = EtlConfig::from_yaml(VALID_YAML).unwrap();
        let conn = config.source.connection_string();
        assert!(conn.contains("Server=tcp:src.example.com,1433"));
        assert!(conn.contains("Database=Sales"));
    }
}
