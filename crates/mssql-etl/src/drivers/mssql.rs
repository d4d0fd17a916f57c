//! SQL Server source and destination over Tiberius.
//!
//! Both sides hold a single exclusively-owned connection; the load is
//! strictly sequential, so pooling has nothing to contribute here. The
//! destination connection additionally owns the load transaction via
//! `SET IMPLICIT_TRANSACTIONS`.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{AuthMethod, Client, ColumnType, Config, EncryptionLevel, Row, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::core::identifier::{qualify_table, split_table};
use crate::core::schema::ColumnDescriptor;
use crate::core::traits::{BoundStatement, Destination, RowCursor, Source};
use crate::core::value::{SqlNullType, SqlValue};
use crate::error::{EtlError, Result};

type MssqlClient = Client<Compat<TcpStream>>;

fn build_config(config: &ConnectionConfig) -> Config {
    let mut tiberius_config = Config::new();
    tiberius_config.host(&config.host);
    tiberius_config.port(config.port);
    tiberius_config.database(&config.database);
    tiberius_config.authentication(AuthMethod::sql_server(&config.user, &config.password));

    if config.encrypt {
        if config.trust_server_cert {
            tiberius_config.trust_cert();
        }
        tiberius_config.encryption(EncryptionLevel::Required);
    } else {
        tiberius_config.encryption(EncryptionLevel::NotSupported);
    }

    tiberius_config
}

async fn connect(config: &ConnectionConfig) -> Result<MssqlClient> {
    let tiberius_config = build_config(config);

    let tcp = TcpStream::connect(tiberius_config.get_addr())
        .await
        .map_err(|e| {
            EtlError::Connectivity(format!(
                "cannot reach {}:{}: {}",
                config.host, config.port, e
            ))
        })?;
    tcp.set_nodelay(true).ok();

    let client = Client::connect(tiberius_config, tcp.compat_write())
        .await
        .map_err(|e| {
            EtlError::Connectivity(format!(
                "handshake with {}:{}/{} failed: {}",
                config.host, config.port, config.database, e
            ))
        })?;

    info!(
        "connected to {}:{}/{}",
        config.host, config.port, config.database
    );
    Ok(client)
}

/// Source side: executes the extraction query.
pub struct MssqlSource {
    client: Mutex<MssqlClient>,
}

impl MssqlSource {
    /// Connect to the source database.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self {
            client: Mutex::new(connect(config).await?),
        })
    }
}

#[async_trait]
impl Source for MssqlSource {
    async fn execute(&self, query: &str) -> Result<Box<dyn RowCursor>> {
        let mut client = self.client.lock().await;

        let mut stream = client
            .query(query, &[])
            .await
            .map_err(|e| EtlError::execution(query, e.to_string()))?;

        let (columns, col_types) = match stream
            .columns()
            .await
            .map_err(|e| EtlError::execution(query, e.to_string()))?
        {
            Some(cols) => (
                cols.iter().map(|c| c.name().to_string()).collect(),
                cols.iter()
                    .map(|c| type_name(c.column_type()).to_string())
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let rows: VecDeque<Row> = stream
            .into_first_result()
            .await
            .map_err(|e| EtlError::execution(query, e.to_string()))?
            .into();

        debug!("query produced {} buffered rows", rows.len());
        Ok(Box::new(MssqlCursor {
            columns,
            col_types,
            rows,
        }))
    }
}

/// Buffered forward-only cursor over a query result.
struct MssqlCursor {
    columns: Vec<String>,
    col_types: Vec<String>,
    rows: VecDeque<Row>,
}

#[async_trait]
impl RowCursor for MssqlCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>> {
        let Some(row) = self.rows.pop_front() else {
            return Ok(None);
        };

        let values = (0..self.columns.len())
            .map(|idx| convert_row_value(&row, idx, &self.col_types[idx]))
            .collect();
        Ok(Some(values))
    }
}

/// Destination side: introspection plus transactional batched execution.
pub struct MssqlDestination {
    client: Arc<Mutex<MssqlClient>>,
}

impl MssqlDestination {
    /// Connect to the destination database.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self {
            client: Arc::new(Mutex::new(connect(config).await?)),
        })
    }

    async fn control(&self, sql: &str) -> Result<()> {
        let mut client = self.client.lock().await;
        client
            .simple_query(sql)
            .await
            .map_err(|e| EtlError::execution(sql, e.to_string()))?
            .into_results()
            .await
            .map_err(|e| EtlError::execution(sql, e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Destination for MssqlDestination {
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let (schema, bare_table) = split_table(table);
        let mut query = String::from(
            "SELECT COLUMN_NAME, DATA_TYPE, ORDINAL_POSITION \
             FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = @P1",
        );
        if schema.is_some() {
            query.push_str(" AND TABLE_SCHEMA = @P2");
        }
        query.push_str(" ORDER BY ORDINAL_POSITION");

        let mut client = self.client.lock().await;
        let params: Vec<&dyn ToSql> = match &schema {
            Some(s) => vec![&bare_table, s],
            None => vec![&bare_table],
        };
        let rows = client
            .query(query.as_str(), &params)
            .await
            .map_err(|e| EtlError::Schema(format!("listing columns of {}: {}", table, e)))?
            .into_first_result()
            .await
            .map_err(|e| EtlError::Schema(format!("listing columns of {}: {}", table, e)))?;

        Ok(rows
            .iter()
            .map(|row| ColumnDescriptor {
                name: row.get::<&str, _>(0).unwrap_or_default().to_string(),
                data_type: row.get::<&str, _>(1).unwrap_or_default().to_string(),
                ordinal_pos: row.get::<i32, _>(2).unwrap_or_default(),
            })
            .collect())
    }

    async fn list_primary_keys(&self, table: &str) -> Result<Vec<String>> {
        let (schema, bare_table) = split_table(table);
        let mut query = String::from(
            "SELECT kcu.COLUMN_NAME \
             FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
               ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
              AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA \
              AND tc.TABLE_NAME = kcu.TABLE_NAME \
             WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND kcu.TABLE_NAME = @P1",
        );
        if schema.is_some() {
            query.push_str(" AND kcu.TABLE_SCHEMA = @P2");
        }
        query.push_str(" ORDER BY kcu.ORDINAL_POSITION");

        let mut client = self.client.lock().await;
        let params: Vec<&dyn ToSql> = match &schema {
            Some(s) => vec![&bare_table, s],
            None => vec![&bare_table],
        };
        let rows = client
            .query(query.as_str(), &params)
            .await
            .map_err(|e| EtlError::Schema(format!("listing primary key of {}: {}", table, e)))?
            .into_first_result()
            .await
            .map_err(|e| EtlError::Schema(format!("listing primary key of {}: {}", table, e)))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get::<&str, _>(0).map(|s| s.to_string()))
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let query = format!("SELECT COUNT_BIG(*) FROM {}", qualify_table(table)?);

        let mut client = self.client.lock().await;
        let rows = client
            .simple_query(query.as_str())
            .await
            .map_err(|e| EtlError::Schema(format!("counting rows of {}: {}", table, e)))?
            .into_first_result()
            .await
            .map_err(|e| EtlError::Schema(format!("counting rows of {}: {}", table, e)))?;

        Ok(rows
            .first()
            .and_then(|row| row.get::<i64, _>(0))
            .unwrap_or(0))
    }

    async fn prepare(&self, statement: &str) -> Result<Box<dyn BoundStatement>> {
        Ok(Box::new(MssqlStatement {
            client: Arc::clone(&self.client),
            text: statement.to_string(),
            current: Vec::new(),
            queued: Vec::new(),
        }))
    }

    async fn set_auto_commit(&self, enabled: bool) -> Result<()> {
        // Implicit transactions are the inverse of auto-commit.
        if enabled {
            self.control("SET IMPLICIT_TRANSACTIONS OFF").await
        } else {
            self.control("SET IMPLICIT_TRANSACTIONS ON").await
        }
    }

    async fn commit(&self) -> Result<()> {
        self.control("IF @@TRANCOUNT > 0 COMMIT TRANSACTION").await
    }

    async fn rollback(&self) -> Result<()> {
        self.control("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
    }
}

/// Statement with a queue of positionally bound parameter sets.
struct MssqlStatement {
    client: Arc<Mutex<MssqlClient>>,
    text: String,
    current: Vec<Option<SqlValue>>,
    queued: Vec<Vec<SqlValue>>,
}

#[async_trait]
impl BoundStatement for MssqlStatement {
    fn bind(&mut self, position: usize, value: SqlValue) {
        if self.current.len() <= position {
            self.current.resize(position + 1, None);
        }
        self.current[position] = Some(value);
    }

    fn add_to_batch(&mut self) {
        let row = std::mem::take(&mut self.current)
            .into_iter()
            .map(|v| v.unwrap_or(SqlValue::Null(SqlNullType::String)))
            .collect();
        self.queued.push(row);
    }

    async fn execute_batch(&mut self) -> Result<u64> {
        // The queue is consumed whether execution succeeds or not; a failed
        // window is rolled back by the caller, never retried piecemeal.
        let queued = std::mem::take(&mut self.queued);
        if queued.is_empty() {
            return Ok(0);
        }

        let mut client = self.client.lock().await;
        let mut total = 0u64;

        for row in &queued {
            let params: Vec<Box<dyn ToSql>> = row.iter().map(sql_value_to_sql_param).collect();
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

            let result = client
                .execute(self.text.as_str(), &param_refs)
                .await
                .map_err(|e| EtlError::execution(&self.text, e.to_string()))?;
            total += result.total();
        }

        Ok(total)
    }
}

/// Dispatch name for a wire column type, used to pick the typed accessor.
fn type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Bit | ColumnType::Bitn => "bit",
        ColumnType::Int1 => "tinyint",
        ColumnType::Int2 => "smallint",
        ColumnType::Int4 => "int",
        ColumnType::Int8 => "bigint",
        ColumnType::Intn => "intn",
        ColumnType::Float4 => "real",
        ColumnType::Float8 => "float",
        ColumnType::Floatn => "floatn",
        ColumnType::Money | ColumnType::Money4 | ColumnType::Decimaln | ColumnType::Numericn => {
            "decimal"
        }
        ColumnType::Guid => "uniqueidentifier",
        ColumnType::Datetime
        | ColumnType::Datetime4
        | ColumnType::Datetimen
        | ColumnType::Datetime2 => "datetime2",
        ColumnType::Daten => "date",
        ColumnType::Timen => "time",
        ColumnType::DatetimeOffsetn => "datetimeoffset",
        ColumnType::BigBinary | ColumnType::BigVarBin | ColumnType::Image => "varbinary",
        _ => "nvarchar",
    }
}

/// Convert a row value to SqlValue based on the column type name.
fn convert_row_value(row: &Row, idx: usize, data_type: &str) -> SqlValue {
    match data_type {
        "bit" => row
            .get::<bool, _>(idx)
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null(SqlNullType::Bool)),
        "tinyint" => row
            .get::<u8, _>(idx)
            .map(|v| SqlValue::I16(v as i16))
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        "smallint" => row
            .get::<i16, _>(idx)
            .map(SqlValue::I16)
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        "int" => row
            .get::<i32, _>(idx)
            .map(SqlValue::I32)
            .unwrap_or(SqlValue::Null(SqlNullType::I32)),
        "bigint" => row
            .get::<i64, _>(idx)
            .map(SqlValue::I64)
            .unwrap_or(SqlValue::Null(SqlNullType::I64)),
        // Variable-width integers: widest accessor first.
        "intn" => row
            .get::<i64, _>(idx)
            .map(SqlValue::I64)
            .or_else(|| row.get::<i32, _>(idx).map(SqlValue::I32))
            .or_else(|| row.get::<i16, _>(idx).map(SqlValue::I16))
            .or_else(|| row.get::<u8, _>(idx).map(|v| SqlValue::I16(v as i16)))
            .unwrap_or(SqlValue::Null(SqlNullType::I64)),
        "real" => row
            .get::<f32, _>(idx)
            .map(SqlValue::F32)
            .unwrap_or(SqlValue::Null(SqlNullType::F32)),
        "float" => row
            .get::<f64, _>(idx)
            .map(SqlValue::F64)
            .unwrap_or(SqlValue::Null(SqlNullType::F64)),
        "floatn" => row
            .get::<f64, _>(idx)
            .map(SqlValue::F64)
            .or_else(|| row.get::<f32, _>(idx).map(SqlValue::F32))
            .unwrap_or(SqlValue::Null(SqlNullType::F64)),
        "uniqueidentifier" => row
            .get::<Uuid, _>(idx)
            .map(SqlValue::Uuid)
            .unwrap_or(SqlValue::Null(SqlNullType::Uuid)),
        "decimal" => row
            .get::<rust_decimal::Decimal, _>(idx)
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),
        "datetime2" => row
            .get::<NaiveDateTime, _>(idx)
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),
        "date" => row
            .get::<NaiveDate, _>(idx)
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),
        "time" => row
            .get::<NaiveTime, _>(idx)
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),
        "datetimeoffset" => row
            .get::<DateTime<FixedOffset>, _>(idx)
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTimeOffset)),
        "varbinary" => row
            .get::<&[u8], _>(idx)
            .map(|v| SqlValue::Bytes(v.to_vec()))
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),
        _ => row
            .get::<&str, _>(idx)
            .map(|s| SqlValue::Text(s.to_string()))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
    }
}

fn sql_value_to_sql_param(value: &SqlValue) -> Box<dyn ToSql> {
    match value {
        SqlValue::Null(null_type) => match null_type {
            SqlNullType::Bool => Box::new(Option::<bool>::None),
            SqlNullType::I16 => Box::new(Option::<i16>::None),
            SqlNullType::I32 => Box::new(Option::<i32>::None),
            SqlNullType::I64 => Box::new(Option::<i64>::None),
            SqlNullType::F32 => Box::new(Option::<f32>::None),
            SqlNullType::F64 => Box::new(Option::<f64>::None),
            SqlNullType::String => Box::new(Option::<String>::None),
            SqlNullType::Bytes => Box::new(Option::<Vec<u8>>::None),
            SqlNullType::Uuid => Box::new(Option::<Uuid>::None),
            SqlNullType::Decimal => Box::new(Option::<rust_decimal::Decimal>::None),
            SqlNullType::DateTime | SqlNullType::Date => Box::new(Option::<NaiveDateTime>::None),
            SqlNullType::DateTimeOffset => Box::new(Option::<DateTime<FixedOffset>>::None),
            SqlNullType::Time => Box::new(Option::<NaiveTime>::None),
        },
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::I16(i) => Box::new(*i),
        SqlValue::I32(i) => Box::new(*i),
        SqlValue::I64(i) => Box::new(*i),
        SqlValue::F32(f) => Box::new(*f),
        SqlValue::F64(f) => Box::new(*f),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Bytes(b) => Box::new(b.clone()),
        SqlValue::Uuid(u) => Box::new(*u),
        SqlValue::Decimal(d) => Box::new(*d),
        SqlValue::DateTime(dt) => Box::new(*dt),
        SqlValue::DateTimeOffset(dto) => Box::new(*dto),
        // Sent as midnight datetime2; SQL Server narrows it for date columns.
        SqlValue::Date(d) => Box::new(d.and_hms_opt(0, 0, 0).unwrap_or_default()),
        SqlValue::Time(t) => Box::new(*t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_dispatch() {
        assert_eq!(type_name(ColumnType::Int4), "int");
        assert_eq!(type_name(ColumnType::NVarchar), "nvarchar");
        assert_eq!(type_name(ColumnType::Daten), "date");
        assert_eq!(type_name(ColumnType::Numericn), "decimal");
    }

    #[test]
    fn test_build_config_disables_encryption_when_asked() {
        let config = ConnectionConfig {
            host: "localhost".to_string(),
            port: 1433,
            database: "db".to_string(),
            user: "sa".to_string(),
            password: "pw".to_string(),
            encrypt: false,
            trust_server_cert: false,
        };
        // Smoke test only; tiberius Config has no public accessors beyond
        // the address.
        let tiberius_config = build_config(&config);
        assert!(tiberius_config.get_addr().contains("1433"));
    }
}
