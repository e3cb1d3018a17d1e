//! Database gateway.
//!
//! Holds the single live connection of a chat session (MySQL or PostgreSQL)
//! and exposes the two operations the pipeline needs: schema introspection and
//! raw SQL execution. Statements run through the drivers' text protocol so
//! every cell can be read back as text regardless of its SQL type.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectionConfig, DbType};
use common::models::query::{ColumnInfo, ColumnKind, QueryOutcome, QueryResult};
use common::models::schema::{ColumnSchema, DatabaseSchema, TableSchema};
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, Column, Row, TypeInfo};
use sqlx::{MySqlPool, PgPool};

/// Operations the pipeline runs against a connected database.
#[async_trait]
pub trait SqlGateway: Send + Sync {
    /// Textual description of all tables and columns.
    async fn schema(&self) -> AppResult<String>;

    /// Runs arbitrary SQL. Driver failures come back as [`QueryOutcome::Failed`].
    async fn execute(&self, sql: &str) -> QueryOutcome;
}

/// Opens gateways from connection configs.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> AppResult<Arc<dyn SqlGateway>>;
}

/// Live connection, one variant per engine.
#[derive(Clone)]
pub enum DatabaseHandle {
    /// MySQL connection.
    MySQL(MySqlPool),
    /// PostgreSQL connection.
    PostgreSQL(PgPool),
}

/// Gateway over a single sqlx connection.
pub struct DatabaseGateway {
    db_type: DbType,
    handle: DatabaseHandle,
    /// Rows sampled per table for the schema text.
    sample_rows: u32,
}

impl DatabaseGateway {
    /// Opens a connection. The pool never grows beyond one connection.
    pub async fn connect(
        config: &ConnectionConfig,
        timeout: Duration,
        sample_rows: u32,
    ) -> AppResult<Self> {
        let uri = config.connection_uri();

        let handle = match config.db_type {
            DbType::MySQL => MySqlPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(timeout)
                .connect(&uri)
                .await
                .map(DatabaseHandle::MySQL),
            DbType::PostgreSQL => PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(timeout)
                .connect(&uri)
                .await
                .map(DatabaseHandle::PostgreSQL),
        }
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        tracing::info!(
            db_type = %config.db_type,
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Database connected"
        );

        Ok(Self {
            db_type: config.db_type,
            handle,
            sample_rows,
        })
    }

    /// Reads tables, columns and sample rows.
    pub async fn describe(&self) -> AppResult<DatabaseSchema> {
        let sql = columns_query(self.db_type);
        let columns = match &self.handle {
            DatabaseHandle::MySQL(pool) => {
                sqlx::query_as::<_, ColumnRow>(sql).fetch_all(pool).await
            }
            DatabaseHandle::PostgreSQL(pool) => {
                sqlx::query_as::<_, ColumnRow>(sql).fetch_all(pool).await
            }
        }
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to read schema: {}", e)))?;

        let mut tables = group_columns(columns);
        if self.sample_rows > 0 {
            for table in &mut tables {
                table.sample_rows = self.sample(&table.name).await;
            }
        }

        tracing::debug!(tables = tables.len(), "Schema loaded");
        Ok(DatabaseSchema { tables })
    }

    /// Fetches a few rows of a table. Failures only cost the samples.
    async fn sample(&self, table: &str) -> Vec<Vec<Option<String>>> {
        let sql = sample_query(self.db_type, table, self.sample_rows);
        let fetched = match &self.handle {
            DatabaseHandle::MySQL(pool) => sqlx::raw_sql(&sql)
                .fetch_all(pool)
                .await
                .map(|rows| text_rows(&rows).1),
            DatabaseHandle::PostgreSQL(pool) => sqlx::raw_sql(&sql)
                .fetch_all(pool)
                .await
                .map(|rows| text_rows(&rows).1),
        };

        fetched.unwrap_or_else(|e| {
            tracing::warn!(table, error = %e, "Sample rows unavailable");
            Vec::new()
        })
    }
}

#[async_trait]
impl SqlGateway for DatabaseGateway {
    async fn schema(&self) -> AppResult<String> {
        Ok(self.describe().await?.render())
    }

    async fn execute(&self, sql: &str) -> QueryOutcome {
        let start = Instant::now();

        let fetched = match &self.handle {
            DatabaseHandle::MySQL(pool) => sqlx::raw_sql(sql)
                .fetch_all(pool)
                .await
                .map(|rows| text_rows(&rows)),
            DatabaseHandle::PostgreSQL(pool) => sqlx::raw_sql(sql)
                .fetch_all(pool)
                .await
                .map(|rows| text_rows(&rows)),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match fetched {
            Ok((columns, cells)) => {
                tracing::info!(rows = cells.len(), elapsed_ms, "Query executed");
                QueryOutcome::Rows(typed_result(columns, cells, elapsed_ms))
            }
            Err(e) => {
                tracing::warn!(error = %e, elapsed_ms, "Query failed");
                QueryOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Connector backed by real database drivers.
pub struct SqlConnector {
    timeout: Duration,
    sample_rows: u32,
}

impl SqlConnector {
    pub fn new(timeout: Duration, sample_rows: u32) -> Self {
        Self {
            timeout,
            sample_rows,
        }
    }
}

#[async_trait]
impl Connector for SqlConnector {
    async fn connect(&self, config: &ConnectionConfig) -> AppResult<Arc<dyn SqlGateway>> {
        let gateway = DatabaseGateway::connect(config, self.timeout, self.sample_rows).await?;
        Ok(Arc::new(gateway))
    }
}

/// Row of the column listing: table, column, type, nullable ("YES"/"NO").
type ColumnRow = (String, String, String, String);

// ============== Engine-specific SQL ==============

fn columns_query(db_type: DbType) -> &'static str {
    match db_type {
        DbType::MySQL => {
            "SELECT CAST(c.TABLE_NAME AS CHAR), CAST(c.COLUMN_NAME AS CHAR),
                    CAST(c.COLUMN_TYPE AS CHAR), CAST(c.IS_NULLABLE AS CHAR)
             FROM information_schema.COLUMNS c
             JOIN information_schema.TABLES t
               ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
             WHERE c.TABLE_SCHEMA = DATABASE() AND t.TABLE_TYPE = 'BASE TABLE'
             ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION"
        }
        DbType::PostgreSQL => {
            "SELECT c.table_name::text, c.column_name::text,
                    CASE WHEN c.character_maximum_length IS NOT NULL
                         THEN c.data_type || '(' || c.character_maximum_length || ')'
                         ELSE c.data_type END::text,
                    c.is_nullable::text
             FROM information_schema.columns c
             JOIN information_schema.tables t
               ON t.table_schema = c.table_schema AND t.table_name = c.table_name
             WHERE c.table_schema = current_schema() AND t.table_type = 'BASE TABLE'
             ORDER BY c.table_name, c.ordinal_position"
        }
    }
}

fn sample_query(db_type: DbType, table: &str, limit: u32) -> String {
    format!("SELECT * FROM {} LIMIT {}", db_type.quote_ident(table), limit)
}

// ============== Row conversion ==============

/// Groups an ordered column listing into tables.
fn group_columns(rows: Vec<ColumnRow>) -> Vec<TableSchema> {
    let mut tables: Vec<TableSchema> = Vec::new();
    for (table, column, data_type, nullable) in rows {
        let column = ColumnSchema {
            name: column,
            data_type,
            nullable: nullable.eq_ignore_ascii_case("YES"),
        };
        match tables.last_mut() {
            Some(last) if last.name == table => last.columns.push(column),
            _ => tables.push(TableSchema {
                name: table,
                columns: vec![column],
                sample_rows: Vec::new(),
            }),
        }
    }
    tables
}

/// Reads column metadata and every cell as text.
fn text_rows<R>(rows: &[R]) -> (Vec<ColumnInfo>, Vec<Vec<Option<String>>>)
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    for<'r> Option<String>: sqlx::Decode<'r, R::Database>,
{
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name().to_string(),
                    data_type: c.type_info().name().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let cells = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|i| {
                    row.try_get_unchecked::<Option<String>, _>(i)
                        .unwrap_or_else(|_| Some("<binary>".to_string()))
                })
                .collect()
        })
        .collect();

    (columns, cells)
}

/// Turns text cells into typed JSON values using the column types.
fn typed_result(
    columns: Vec<ColumnInfo>,
    cells: Vec<Vec<Option<String>>>,
    elapsed_ms: u64,
) -> QueryResult {
    let kinds: Vec<ColumnKind> = columns
        .iter()
        .map(|c| ColumnKind::from_type_name(&c.data_type))
        .collect();

    let rows = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(i, cell)| {
                    kinds
                        .get(i)
                        .copied()
                        .unwrap_or(ColumnKind::Text)
                        .parse_cell(cell)
                })
                .collect()
        })
        .collect();

    QueryResult::from_rows(columns, rows, elapsed_ms)
}
