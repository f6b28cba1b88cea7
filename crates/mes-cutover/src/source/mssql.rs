//! MSSQL legacy store reader.

use super::{LegacyReader, LegacyRow, RowFilter, SqlValue};
use crate::config::SourceConfig;
use crate::error::{CutoverError, Result};
use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use chrono::NaiveDateTime;
use tiberius::{AuthMethod, Client, ColumnType, Config, EncryptionLevel, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};
use uuid::Uuid;

/// Connection manager for bb8 pool with tiberius.
#[derive(Clone)]
struct TiberiusConnectionManager {
    config: SourceConfig,
}

impl TiberiusConnectionManager {
    fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        if self.config.encrypt {
            if self.config.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }

        config
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            })?;

        tcp.set_nodelay(true).ok();

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// MSSQL legacy reader with connection pooling.
///
/// The cutover is strictly sequential, so the pool stays small; it
/// exists for reconnect handling, not parallelism.
pub struct MssqlLegacy {
    pool: Pool<TiberiusConnectionManager>,
    schema: String,
}

impl MssqlLegacy {
    /// Connect to the legacy database and verify the connection.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let schema = config.schema.clone();
        let manager = TiberiusConnectionManager::new(config.clone());
        let pool = Pool::builder()
            .max_size(2)
            .build(manager)
            .await
            .map_err(|e| CutoverError::pool(e.to_string(), "creating MSSQL pool"))?;

        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| CutoverError::pool(e.to_string(), "connecting to legacy store"))?;
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }

        info!(
            "Connected to legacy store: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool, schema })
    }

    async fn get_client(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CutoverError::pool(e.to_string(), "getting legacy connection"))
    }

    fn qualified(&self, table: &str) -> String {
        format!("[{}].[{}]", self.schema, table)
    }

    fn where_clause(filter: Option<&RowFilter>) -> String {
        match filter {
            Some(f) => format!(" WHERE {}", f.to_sql()),
            None => String::new(),
        }
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<LegacyRow>> {
        let mut client = self.get_client().await?;
        let stream = client.simple_query(sql).await?;
        let rows = stream.into_first_result().await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(convert_row(&row));
        }

        debug!("Legacy query returned {} rows", result.len());
        Ok(result)
    }
}

#[async_trait]
impl LegacyReader for MssqlLegacy {
    async fn count(&self, table: &str, filter: Option<&RowFilter>) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT_BIG(*) FROM {}{}",
            self.qualified(table),
            Self::where_clause(filter)
        );
        Ok(self.scalar_i64(&sql).await?.unwrap_or(0))
    }

    async fn read_table(&self, table: &str, filter: Option<&RowFilter>) -> Result<Vec<LegacyRow>> {
        let sql = format!(
            "SELECT * FROM {}{}",
            self.qualified(table),
            Self::where_clause(filter)
        );
        self.run_query(&sql).await
    }

    async fn raw_query(&self, sql: &str) -> Result<Vec<LegacyRow>> {
        self.run_query(sql).await
    }

    async fn scalar_i64(&self, sql: &str) -> Result<Option<i64>> {
        let mut client = self.get_client().await?;
        let stream = client.simple_query(sql).await?;
        let row = stream.into_row().await?;

        Ok(row.and_then(|r| {
            r.try_get::<i64, _>(0)
                .ok()
                .flatten()
                .or_else(|| r.try_get::<i32, _>(0).ok().flatten().map(i64::from))
        }))
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}' AND COLUMN_NAME = '{}'",
            self.schema.replace('\'', "''"),
            table.replace('\'', "''"),
            column.replace('\'', "''")
        );
        Ok(self.scalar_i64(&sql).await?.unwrap_or(0) > 0)
    }
}

/// Convert a tiberius row to a dynamic legacy row.
fn convert_row(row: &Row) -> LegacyRow {
    let mut out = LegacyRow::new();
    let columns: Vec<(String, ColumnType)> = row
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.column_type()))
        .collect();

    for (idx, (name, ty)) in columns.iter().enumerate() {
        out.insert(name, convert_cell(row, idx, *ty));
    }
    out
}

fn convert_cell(row: &Row, idx: usize, ty: ColumnType) -> SqlValue {
    match ty {
        ColumnType::Bit | ColumnType::Bitn => get_opt::<bool>(row, idx)
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null),
        ColumnType::Int1 => get_opt::<u8>(row, idx)
            .map(|v| SqlValue::I32(i32::from(v)))
            .unwrap_or(SqlValue::Null),
        ColumnType::Int2 => get_opt::<i16>(row, idx)
            .map(|v| SqlValue::I32(i32::from(v)))
            .unwrap_or(SqlValue::Null),
        ColumnType::Int4 => get_opt::<i32>(row, idx)
            .map(SqlValue::I32)
            .unwrap_or(SqlValue::Null),
        ColumnType::Int8 => get_opt::<i64>(row, idx)
            .map(SqlValue::I64)
            .unwrap_or(SqlValue::Null),
        // Nullable integer columns arrive as Intn with a runtime width.
        ColumnType::Intn => get_opt::<i64>(row, idx)
            .map(SqlValue::I64)
            .or_else(|| get_opt::<i32>(row, idx).map(SqlValue::I32))
            .or_else(|| get_opt::<i16>(row, idx).map(|v| SqlValue::I32(i32::from(v))))
            .or_else(|| get_opt::<u8>(row, idx).map(|v| SqlValue::I32(i32::from(v))))
            .unwrap_or(SqlValue::Null),
        ColumnType::Float4 => get_opt::<f32>(row, idx)
            .map(|v| SqlValue::F64(f64::from(v)))
            .unwrap_or(SqlValue::Null),
        ColumnType::Float8 | ColumnType::Floatn => get_opt::<f64>(row, idx)
            .map(SqlValue::F64)
            .or_else(|| get_opt::<f32>(row, idx).map(|v| SqlValue::F64(f64::from(v))))
            .unwrap_or(SqlValue::Null),
        ColumnType::Decimaln | ColumnType::Numericn | ColumnType::Money | ColumnType::Money4 => {
            get_opt::<rust_decimal::Decimal>(row, idx)
                .map(SqlValue::Decimal)
                .unwrap_or(SqlValue::Null)
        }
        ColumnType::Guid => get_opt::<Uuid>(row, idx)
            .map(SqlValue::Uuid)
            .unwrap_or(SqlValue::Null),
        ColumnType::Datetime
        | ColumnType::Datetime4
        | ColumnType::Datetimen
        | ColumnType::Datetime2
        | ColumnType::Daten => get_opt::<NaiveDateTime>(row, idx)
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null),
        // Everything else (varchar, nvarchar, char, text, xml, ...) as text.
        _ => get_opt::<&str>(row, idx)
            .map(|s| SqlValue::Text(s.to_string()))
            .unwrap_or(SqlValue::Null),
    }
}

fn get_opt<'a, T: tiberius::FromSql<'a>>(row: &'a Row, idx: usize) -> Option<T> {
    row.try_get::<T, _>(idx).ok().flatten()
}
