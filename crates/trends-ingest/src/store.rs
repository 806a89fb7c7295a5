// Relational store
//
// Thin layer over `sqlx::AnyPool` so the same binary appends into SQLite or
// PostgreSQL. Statements use `$N` placeholders, which both backends accept.
// Table and column names come from the family schema and the destination
// lookup; both are validated before they are spliced into SQL.

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyPool, Transaction};
use tracing::{debug, info};
use trends_common::{Result, TrendsError};

use crate::config::StoreConfig;
use crate::family::{validate_identifier, DestinationTables, Family};

/// Rows per multi-row INSERT statement
pub const DEFAULT_INSERT_CHUNK_SIZE: usize = 500;

/// A typed cell restored from staged text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
    Null,
}

/// Source of the artist ids already persisted
#[async_trait]
pub trait KnownArtists: Send + Sync {
    /// Every persisted artist id; a failed lookup is `StoreUnavailable`
    async fn known_artist_ids(&self) -> Result<Vec<String>>;
}

/// Handle to the destination database
#[derive(Debug, Clone)]
pub struct Store {
    pool: AnyPool,
    destinations: DestinationTables,
    insert_chunk_size: usize,
}

impl Store {
    /// Connect using the configured URL
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new().max_connections(config.max_connections);
        if config.database_url.contains(":memory:") {
            // an in-memory SQLite database lives only as long as its connection
            options = options.idle_timeout(None).max_lifetime(None);
        }

        let pool = options.connect(&config.database_url).await.map_err(|e| {
            TrendsError::store_unavailable(format!("Failed to connect to database: {}", e))
        })?;

        info!(max_connections = config.max_connections, "Connected to destination store");

        Ok(Self::from_pool(pool, config.destinations.clone()))
    }

    pub fn from_pool(pool: AnyPool, destinations: DestinationTables) -> Self {
        Self {
            pool,
            destinations,
            insert_chunk_size: DEFAULT_INSERT_CHUNK_SIZE,
        }
    }

    pub fn with_insert_chunk_size(mut self, size: usize) -> Self {
        self.insert_chunk_size = size.max(1);
        self
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn destinations(&self) -> &DestinationTables {
        &self.destinations
    }

    /// Create every destination table that does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        for (family, table) in self.destinations.loaded_families() {
            validate_identifier(table)?;

            let columns = family
                .schema()
                .iter()
                .map(|c| format!("{} {}", c.name, c.column_type.sql_type()))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("CREATE TABLE IF NOT EXISTS {} ({})", table, columns);

            sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
                TrendsError::store_unavailable(format!("Failed to create table {}: {}", table, e))
            })?;

            debug!(%family, table, "Destination table ready");
        }

        Ok(())
    }

    /// Open a transaction; appends made through it land together on `commit`
    pub async fn begin(&self) -> Result<Transaction<'static, Any>> {
        self.pool
            .begin()
            .await
            .map_err(|e| TrendsError::store_unavailable(format!("Failed to begin transaction: {}", e)))
    }

    /// Commit a transaction opened with [`Store::begin`]
    pub async fn commit(&self, tx: Transaction<'static, Any>) -> Result<()> {
        tx.commit()
            .await
            .map_err(|e| TrendsError::store_unavailable(format!("Failed to commit transaction: {}", e)))
    }

    /// Append rows to a table in a transaction of their own
    ///
    /// Returns the number of rows written.
    pub async fn append_rows(&self, table: &str, columns: &[String], rows: &[Vec<SqlValue>]) -> Result<u64> {
        let mut tx = self.begin().await?;
        let written = self.append_rows_in(&mut tx, table, columns, rows).await?;
        self.commit(tx).await?;
        Ok(written)
    }

    /// Append rows inside `tx`, chunked into multi-row INSERT statements
    ///
    /// Nothing is visible until the caller commits; dropping `tx` rolls back
    /// every chunk.
    pub async fn append_rows_in(
        &self,
        tx: &mut Transaction<'_, Any>,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64> {
        validate_identifier(table)?;
        for column in columns {
            validate_identifier(column)?;
        }

        if rows.is_empty() {
            return Ok(0);
        }

        let total_chunks = rows.len().div_ceil(self.insert_chunk_size);
        let mut written = 0u64;

        for (chunk_idx, chunk) in rows.chunks(self.insert_chunk_size).enumerate() {
            debug!(
                "Inserting into {} chunk {} / {} ({} rows)",
                table,
                chunk_idx + 1,
                total_chunks,
                chunk.len()
            );

            let (sql, binds) = insert_statement(table, columns, chunk)?;

            let mut query = sqlx::query(&sql);
            for value in binds {
                query = match value {
                    SqlValue::Integer(v) => query.bind(v),
                    SqlValue::Text(v) => query.bind(v),
                    SqlValue::Null => query,
                };
            }

            let result = query.execute(&mut **tx).await.map_err(|e| {
                TrendsError::store_unavailable(format!("Failed to append to {}: {}", table, e))
            })?;
            written += result.rows_affected();
        }

        Ok(written)
    }

    /// Number of rows in a table
    pub async fn count_rows(&self, table: &str) -> Result<i64> {
        validate_identifier(table)?;
        let sql = format!("SELECT COUNT(*) FROM {}", table);

        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TrendsError::store_unavailable(format!("Failed to count rows of {}: {}", table, e)))
    }

    /// Destination of the artist catalogue
    fn artists_table(&self) -> Result<&str> {
        self.destinations
            .table_for(Family::Artists)
            .ok_or_else(|| TrendsError::config("No destination table configured for artists"))
    }
}

#[async_trait]
impl KnownArtists for Store {
    async fn known_artist_ids(&self) -> Result<Vec<String>> {
        let table = self.artists_table()?;
        validate_identifier(table)?;
        let sql = format!("SELECT artist_id FROM {}", table);

        let ids = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                TrendsError::store_unavailable(format!("Failed to query known artists from {}: {}", table, e))
            })?;

        debug!(known = ids.len(), "Loaded known artist ids");
        Ok(ids)
    }
}

/// Build one multi-row INSERT with `$N` placeholders
///
/// `NULL` cells are written as literals, so the returned binds only hold
/// integers and strings, in placeholder order.
fn insert_statement(
    table: &str,
    columns: &[String],
    rows: &[Vec<SqlValue>],
) -> Result<(String, Vec<SqlValue>)> {
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, columns.join(", "));
    let mut binds = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(TrendsError::staging(format!(
                "Row has {} values but {} columns were given",
                row.len(),
                columns.len()
            )));
        }

        if row_idx > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (col_idx, value) in row.iter().enumerate() {
            if col_idx > 0 {
                sql.push_str(", ");
            }
            match value {
                SqlValue::Null => sql.push_str("NULL"),
                other => {
                    binds.push(other.clone());
                    sql.push_str(&format!("${}", binds.len()));
                }
            }
        }
        sql.push(')');
    }

    Ok((sql, binds))
}
