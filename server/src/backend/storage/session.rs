//! # Database Session
//!
//! One `Session` per physical database. It owns the SQLite pool and hands out [`Batch`]es:
//! each request stages its writes in a batch of its own, with its own transaction, and
//! commits or rolls it back. Batches on one session run one after another. Foreign-key
//! checks inside a batch are deferred to commit time, so a whole batch of staged writes
//! succeeds or fails together.

use serde_json::Value;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteQueryResult, SqliteRow,
};
use sqlx::{migrate::MigrateDatabase, Connection, Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::error::{is_constraint_violation, unique_violation_columns, StorageError};
use super::record::{key_part, Record};
use super::schema::{ColumnKind, EntityDescriptor, PhysicalDatabase};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A SQL statement with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    pub fn bind(mut self, value: Value) -> Self {
        self.binds.push(value);
        self
    }

    fn query(&self) -> SqliteQuery<'_> {
        let query: SqliteQuery<'_> = sqlx::query(&self.sql);
        self.binds
            .iter()
            .fold(query, |query, value| bind_value(query, value))
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decode one row of `entity` into a record
pub(crate) fn decode_row(
    entity: &'static EntityDescriptor,
    row: &SqliteRow,
) -> Result<Record, StorageError> {
    let mut record = Record::new(entity);
    for column in entity.columns {
        let value = match column.kind {
            ColumnKind::Integer => row
                .try_get::<Option<i64>, _>(column.name)?
                .map(Value::from),
            ColumnKind::Boolean => row
                .try_get::<Option<bool>, _>(column.name)?
                .map(Value::Bool),
            _ => row
                .try_get::<Option<String>, _>(column.name)?
                .map(Value::String),
        };
        record.put(column.name, value.unwrap_or(Value::Null));
    }
    Ok(record)
}

pub struct Session {
    database: PhysicalDatabase,
    pool: SqlitePool,
    /// Held by the open batch, if any, from `begin` until it is committed or dropped
    writer: Arc<Mutex<()>>,
}

impl Session {
    /// Open (creating if needed) the database at `url`
    pub async fn open(database: PhysicalDatabase, url: &str) -> Result<Self, StorageError> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("Creating {} database at {}", database, url);
            Sqlite::create_database(url).await?
        }

        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self {
            database,
            pool,
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Open a uniquely named in-memory database
    #[cfg(test)]
    pub async fn open_test(database: PhysicalDatabase) -> Result<Self, StorageError> {
        Self::open(database, &test_database_url(database)).await
    }

    pub fn database(&self) -> PhysicalDatabase {
        self.database
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the tables of `entities` that do not exist yet, in the given order
    pub async fn create_tables(
        &self,
        entities: impl IntoIterator<Item = &'static EntityDescriptor>,
    ) -> Result<(), StorageError> {
        for entity in entities {
            debug!("Ensuring table {}.{}", self.database, entity.table_name);
            sqlx::query(&entity.create_table_sql())
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Start a batch with its own transaction.
    ///
    /// Batches on one session are serialised: this waits until the previous batch has been
    /// committed, rolled back or dropped.
    pub async fn begin(&self) -> Result<Batch, StorageError> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let mut tx = self.pool.begin().await?;
        sqlx::query("PRAGMA defer_foreign_keys = ON")
            .execute(&mut *tx)
            .await?;
        debug!("Began {} batch", self.database);
        Ok(Batch {
            database: self.database,
            pool: self.pool.clone(),
            tx: Some(tx),
            failure: None,
            _writer: writer,
        })
    }

    /// Committed rows only; staged writes of an open batch are not visible here
    pub(crate) async fn fetch_all(&self, statement: &Statement) -> Result<Vec<SqliteRow>, StorageError> {
        Ok(statement.query().fetch_all(&self.pool).await?)
    }

    pub(crate) async fn fetch_optional(
        &self,
        statement: &Statement,
    ) -> Result<Option<SqliteRow>, StorageError> {
        Ok(statement.query().fetch_optional(&self.pool).await?)
    }

    /// Delete every row of `table` with foreign-key enforcement switched off.
    ///
    /// Waits for any open batch to finish first. Enforcement is switched back on whether
    /// or not the delete succeeded; a connection that cannot be restored is closed instead
    /// of going back to the pool.
    pub async fn truncate(&self, table: &str) -> Result<u64, StorageError> {
        let _writer = self.writer.lock().await;

        let mut conn = self.pool.acquire().await?;
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let truncated = sqlx::query(&format!("DELETE FROM \"{}\"", table))
            .execute(&mut *conn)
            .await;
        let restored = sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await;

        if let Err(e) = restored {
            error!(
                "Could not re-enable foreign keys on {} after truncating {}: {}",
                self.database, table, e
            );
            if let Err(close_err) = conn.detach().close().await {
                error!("Failed to close unchecked connection: {}", close_err);
            }
            return Err(e.into());
        }

        let rows = truncated?.rows_affected();
        info!("Truncated {}.{} ({} rows)", self.database, table, rows);
        Ok(rows)
    }

    /// Close the pool once every open batch has released its connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed {} session", self.database);
    }
}

/// Writes staged by one request against one database.
///
/// Owns its transaction and the session's writer lock. Dropping a batch without committing
/// rolls it back.
#[derive(Debug)]
pub struct Batch {
    database: PhysicalDatabase,
    pool: SqlitePool,
    /// `None` once an integrity failure has discarded the transaction
    tx: Option<Transaction<'static, Sqlite>>,
    /// Integrity failure raised while staging, reported by `commit`
    failure: Option<StorageError>,
    _writer: OwnedMutexGuard<()>,
}

impl Batch {
    pub fn database(&self) -> PhysicalDatabase {
        self.database
    }

    /// Execute a write inside the batch transaction.
    ///
    /// Returns `Ok(None)` when the statement was not applied: either the batch already
    /// failed, or this statement hit a constraint and the batch has just been discarded.
    /// Either way `commit` reports the failure.
    pub(crate) async fn stage(
        &mut self,
        statement: &Statement,
        table: &str,
        record: Option<&Record>,
    ) -> Result<Option<SqliteQueryResult>, StorageError> {
        let Some(tx) = self.tx.as_mut() else {
            warn!(
                "Skipping write on {}.{}: batch already failed",
                self.database, table
            );
            return Ok(None);
        };

        debug!("{}: {}", self.database, statement.sql);
        let outcome = statement.query().execute(&mut **tx).await;
        match outcome {
            Ok(result) => Ok(Some(result)),
            Err(err) if is_constraint_violation(&err) => {
                let violation = integrity_violation(self.database, err, Some(table), record);
                warn!("Discarding {} batch: {}", self.database, violation);
                if let Some(tx) = self.tx.take() {
                    discard(self.database, tx).await;
                }
                self.failure = Some(violation);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reads inside the batch see its own staged writes
    pub(crate) async fn fetch_optional(
        &mut self,
        statement: &Statement,
    ) -> Result<Option<SqliteRow>, StorageError> {
        let row = match self.tx.as_mut() {
            Some(tx) => statement.query().fetch_optional(&mut **tx).await?,
            None => statement.query().fetch_optional(&self.pool).await?,
        };
        Ok(row)
    }

    /// Persist every staged write atomically
    pub async fn commit(mut self) -> Result<(), StorageError> {
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        match tx.commit().await {
            Ok(()) => {
                debug!("Committed {} batch", self.database);
                Ok(())
            }
            Err(err) if is_constraint_violation(&err) => {
                let violation = integrity_violation(self.database, err, None, None);
                warn!("Commit rejected: {}", violation);
                Err(violation)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Discard every staged write
    pub async fn rollback(mut self) {
        if let Some(tx) = self.tx.take() {
            discard(self.database, tx).await;
        }
    }
}

async fn discard(database: PhysicalDatabase, tx: Transaction<'static, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        error!("Failed to roll back {} batch: {}", database, e);
    }
}

fn integrity_violation(
    database: PhysicalDatabase,
    err: sqlx::Error,
    table: Option<&str>,
    record: Option<&Record>,
) -> StorageError {
    let message = match &err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    };
    let detail = record.and_then(|record| {
        let pairs: Vec<String> = unique_violation_columns(&message)
            .into_iter()
            .map(|column| format!("{}={}", column, key_part(record.get(&column))))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join(", "))
    });
    StorageError::IntegrityViolation {
        database,
        table: table.map(str::to_string),
        message,
        detail,
    }
}

/// URL of a fresh, uniquely named in-memory database
#[cfg(test)]
pub(crate) fn test_database_url(database: PhysicalDatabase) -> String {
    format!(
        "file:memdb_{}_{}?mode=memory&cache=shared",
        database,
        uuid::Uuid::new_v4().simple()
    )
}
