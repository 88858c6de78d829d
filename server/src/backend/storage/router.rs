//! # Storage Router
//!
//! One logical CRUD + aggregate interface over the two physical databases. The router owns
//! one [`Session`] per database and decides, per call, which of them governs an entity.
//!
//! Writes (`insert`, `update`, `delete`) are staged in a [`Batch`] begun on the target
//! database and only become durable on `commit`. Every request uses a batch of its own.
//! `lookup` and `truncate_all` resolve the entity's home database themselves; `fetch_all`
//! and `count` scan the database the caller names.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

use super::error::StorageError;
use super::record::{Record, RecordKey};
use super::registry::EntityRegistry;
use super::schema::{EntityDescriptor, PhysicalDatabase};
use super::session::{decode_row, Batch, Session, Statement};

/// Connection URLs of the two physical databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTargets {
    pub account_url: String,
    pub commerce_url: String,
}

impl DatabaseTargets {
    pub fn url(&self, database: PhysicalDatabase) -> &str {
        match database {
            PhysicalDatabase::Account => &self.account_url,
            PhysicalDatabase::Commerce => &self.commerce_url,
        }
    }

    /// Two fresh, uniquely named in-memory databases
    #[cfg(test)]
    pub fn in_memory() -> Self {
        use super::session::test_database_url;
        Self {
            account_url: test_database_url(PhysicalDatabase::Account),
            commerce_url: test_database_url(PhysicalDatabase::Commerce),
        }
    }
}

#[derive(Clone)]
struct Sessions {
    account: Arc<Session>,
    commerce: Arc<Session>,
}

impl Sessions {
    fn get(&self, database: PhysicalDatabase) -> &Arc<Session> {
        match database {
            PhysicalDatabase::Account => &self.account,
            PhysicalDatabase::Commerce => &self.commerce,
        }
    }
}

enum RouterState {
    Uninitialized,
    Ready(Sessions),
    Closed,
}

/// Lifecycle: UNINITIALIZED → `initialize_sessions` → READY → `shutdown_sessions` → CLOSED.
/// Every data operation requires READY.
pub struct StorageRouter {
    registry: Arc<EntityRegistry>,
    targets: DatabaseTargets,
    state: RwLock<RouterState>,
}

impl StorageRouter {
    pub fn new(registry: Arc<EntityRegistry>, targets: DatabaseTargets) -> Self {
        Self {
            registry,
            targets,
            state: RwLock::new(RouterState::Uninitialized),
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state.read().as_deref(), Ok(RouterState::Ready(_)))
    }

    /// Open both sessions and create the registered tables of each database
    pub async fn initialize_sessions(&self) -> Result<(), StorageError> {
        {
            let state = self.read_state()?;
            if !matches!(*state, RouterState::Uninitialized) {
                return Err(StorageError::precondition("sessions were already initialized"));
            }
        }

        let mut opened: Vec<Arc<Session>> = Vec::with_capacity(2);
        for database in PhysicalDatabase::ALL {
            match self.open_session(database).await {
                Ok(session) => opened.push(Arc::new(session)),
                Err(e) => {
                    error!("Failed to open {} database: {}", database, e);
                    close_all(&opened).await;
                    return Err(e);
                }
            }
        }
        let (Some(account), Some(commerce)) = (opened.first(), opened.get(1)) else {
            close_all(&opened).await;
            return Err(StorageError::precondition("failed to open both sessions"));
        };
        let sessions = Sessions {
            account: Arc::clone(account),
            commerce: Arc::clone(commerce),
        };

        let installed = match self.write_state() {
            Ok(mut state) if matches!(*state, RouterState::Uninitialized) => {
                *state = RouterState::Ready(sessions);
                Ok(())
            }
            Ok(_) => Err(StorageError::precondition("sessions were initialized concurrently")),
            Err(e) => Err(e),
        };
        if installed.is_err() {
            close_all(&opened).await;
        } else {
            info!("Storage router ready ({} entity types)", self.registry.len());
        }
        installed
    }

    async fn open_session(&self, database: PhysicalDatabase) -> Result<Session, StorageError> {
        info!("Opening {} database", database);
        let session = Session::open(database, self.targets.url(database)).await?;
        if let Err(e) = session
            .create_tables(self.registry.for_database(database))
            .await
        {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Release both sessions once their open batches have finished
    pub async fn shutdown_sessions(&self) -> Result<(), StorageError> {
        let sessions = {
            let mut state = self.write_state()?;
            match std::mem::replace(&mut *state, RouterState::Closed) {
                RouterState::Ready(sessions) => sessions,
                previous => {
                    *state = previous;
                    return Err(StorageError::precondition("sessions are not open"));
                }
            }
        };
        close_all(&[sessions.account, sessions.commerce]).await;
        info!("Storage router closed");
        Ok(())
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, RouterState>, StorageError> {
        self.state
            .read()
            .map_err(|_| StorageError::precondition("router state lock poisoned"))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, RouterState>, StorageError> {
        self.state
            .write()
            .map_err(|_| StorageError::precondition("router state lock poisoned"))
    }

    fn session(&self, database: PhysicalDatabase) -> Result<Arc<Session>, StorageError> {
        match &*self.read_state()? {
            RouterState::Ready(sessions) => Ok(Arc::clone(sessions.get(database))),
            RouterState::Uninitialized => Err(StorageError::precondition(
                "storage used before initialize_sessions",
            )),
            RouterState::Closed => Err(StorageError::precondition(
                "storage used after shutdown_sessions",
            )),
        }
    }

    /// Home database of a registered entity type
    pub fn resolve_database(
        &self,
        entity: &EntityDescriptor,
    ) -> Result<PhysicalDatabase, StorageError> {
        if self.registry.contains(entity) {
            Ok(entity.database)
        } else {
            Err(StorageError::precondition(format!(
                "entity type `{}` is not registered",
                entity.identifier
            )))
        }
    }

    /// Batch operations must target the entity's own database
    fn check_batch(&self, entity: &EntityDescriptor, batch: &Batch) -> Result<(), StorageError> {
        let home = self.resolve_database(entity)?;
        if home != batch.database() {
            return Err(StorageError::precondition(format!(
                "`{}` lives in the {} database, not {}",
                entity.identifier,
                home,
                batch.database()
            )));
        }
        Ok(())
    }

    /// Start a batch of writes on `database`. Waits while another batch is open there.
    pub async fn begin(&self, database: PhysicalDatabase) -> Result<Batch, StorageError> {
        let session = self.session(database)?;
        session.begin().await
    }

    /// All rows of `entity` (or of every type homed in `database` when `None`), keyed by
    /// their composite record key.
    ///
    /// The scan runs against `database`, not the entity's own home. Asking for an entity
    /// under the other database yields no rows.
    pub async fn fetch_all(
        &self,
        entity: Option<&'static EntityDescriptor>,
        database: PhysicalDatabase,
    ) -> Result<BTreeMap<RecordKey, Record>, StorageError> {
        let session = self.session(database)?;
        let entities: Vec<&'static EntityDescriptor> = match entity {
            Some(entity) => {
                self.resolve_database(entity)?;
                vec![entity]
            }
            None => self.registry.for_database(database).collect(),
        };

        let mut found = BTreeMap::new();
        for entity in entities {
            if entity.database != database {
                warn!(
                    "Scanning {} database for `{}`, which lives in {}; no rows can match",
                    database, entity.identifier, entity.database
                );
                continue;
            }
            let statement = Statement::new(format!("SELECT * FROM \"{}\"", entity.table_name));
            for row in session.fetch_all(&statement).await? {
                let record = decode_row(entity, &row)?;
                found.insert(record.key(), record);
            }
        }
        Ok(found)
    }

    /// Stage `record` for insertion. A single-column auto-increment key left unset is filled
    /// with the generated row id.
    pub async fn insert(&self, batch: &mut Batch, record: &mut Record) -> Result<(), StorageError> {
        let entity = record.entity();
        self.check_batch(entity, batch)?;

        let values: Vec<(&'static str, Value)> = record
            .values()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k, v.clone()))
            .collect();

        let mut statement = if values.is_empty() {
            Statement::new(format!("INSERT INTO \"{}\" DEFAULT VALUES", entity.table_name))
        } else {
            let columns: Vec<String> = values.iter().map(|(k, _)| format!("\"{}\"", k)).collect();
            let placeholders = vec!["?"; values.len()].join(", ");
            Statement::new(format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                entity.table_name,
                columns.join(", "),
                placeholders
            ))
        };
        for (_, value) in values {
            statement = statement.bind(value);
        }

        let outcome = batch
            .stage(&statement, entity.table_name, Some(&*record))
            .await?;
        if let Some(result) = outcome {
            if entity.auto_increment && !record.has_complete_key() {
                record.put(entity.primary_key[0], Value::from(result.last_insert_rowid()));
            }
        }
        Ok(())
    }

    /// Stage an update of every non-key column set on `record`, matched on its primary key
    pub async fn update(&self, batch: &mut Batch, record: &Record) -> Result<(), StorageError> {
        let entity = record.entity();
        self.check_batch(entity, batch)?;
        let key_clause = key_predicate(record)?;

        let assignments: Vec<(&'static str, Value)> = record
            .values()
            .filter(|(k, _)| !entity.is_primary_key(k))
            .map(|(k, v)| (k, v.clone()))
            .collect();
        if assignments.is_empty() {
            return Ok(());
        }

        let set: Vec<String> = assignments.iter().map(|(k, _)| format!("\"{}\" = ?", k)).collect();
        let mut statement = Statement::new(format!(
            "UPDATE \"{}\" SET {} WHERE {}",
            entity.table_name,
            set.join(", "),
            key_clause.sql
        ));
        for (_, value) in assignments {
            statement = statement.bind(value);
        }
        for value in key_clause.binds {
            statement = statement.bind(value);
        }

        batch.stage(&statement, entity.table_name, Some(record)).await?;
        Ok(())
    }

    /// Stage deletion of `record`; `None` is a no-op
    pub async fn delete(
        &self,
        batch: &mut Batch,
        record: Option<&Record>,
    ) -> Result<(), StorageError> {
        let Some(record) = record else {
            return Ok(());
        };
        let entity = record.entity();
        self.check_batch(entity, batch)?;
        let key_clause = key_predicate(record)?;

        let mut statement = Statement::new(format!(
            "DELETE FROM \"{}\" WHERE {}",
            entity.table_name, key_clause.sql
        ));
        for value in key_clause.binds {
            statement = statement.bind(value);
        }

        batch.stage(&statement, entity.table_name, Some(record)).await?;
        Ok(())
    }

    /// Persist everything staged in `batch`
    pub async fn commit(&self, batch: Batch) -> Result<(), StorageError> {
        batch.commit().await
    }

    /// Discard everything staged in `batch`
    pub async fn rollback(&self, batch: Batch) {
        batch.rollback().await
    }

    /// First committed row of `entity` whose columns equal every entry of `key_fields`.
    ///
    /// Passing the entity's full primary key gives at-most-one-row semantics; any other
    /// field set returns an arbitrary match.
    pub async fn lookup(
        &self,
        entity: &'static EntityDescriptor,
        key_fields: &Map<String, Value>,
    ) -> Result<Option<Record>, StorageError> {
        let database = self.resolve_database(entity)?;
        let session = self.session(database)?;
        let statement = lookup_statement(entity, key_fields)?;
        match session.fetch_optional(&statement).await? {
            Some(row) => Ok(Some(decode_row(entity, &row)?)),
            None => Ok(None),
        }
    }

    /// Like [`StorageRouter::lookup`], but seen from inside `batch`: rows it staged for
    /// insertion are found and rows it staged for deletion are not.
    pub async fn lookup_in(
        &self,
        batch: &mut Batch,
        entity: &'static EntityDescriptor,
        key_fields: &Map<String, Value>,
    ) -> Result<Option<Record>, StorageError> {
        self.check_batch(entity, batch)?;
        let statement = lookup_statement(entity, key_fields)?;
        match batch.fetch_optional(&statement).await? {
            Some(row) => Ok(Some(decode_row(entity, &row)?)),
            None => Ok(None),
        }
    }

    /// Number of rows of `entity`, or of every registered type, as seen from `database`.
    ///
    /// Types homed in the other database contribute nothing.
    pub async fn count(
        &self,
        entity: Option<&'static EntityDescriptor>,
        database: PhysicalDatabase,
    ) -> Result<usize, StorageError> {
        Ok(self.fetch_all(entity, database).await?.len())
    }

    /// Remove every row of `entity`'s table in its home database. Test fixtures only.
    pub async fn truncate_all(
        &self,
        entity: &'static EntityDescriptor,
    ) -> Result<u64, StorageError> {
        let database = self.resolve_database(entity)?;
        self.session(database)?.truncate(entity.table_name).await
    }
}

async fn close_all(sessions: &[Arc<Session>]) {
    for session in sessions {
        session.close().await;
    }
}

fn lookup_statement(
    entity: &'static EntityDescriptor,
    key_fields: &Map<String, Value>,
) -> Result<Statement, StorageError> {
    if key_fields.is_empty() {
        return Err(StorageError::LookupKeyError {
            entity: entity.identifier.to_string(),
            reason: "no key fields supplied".to_string(),
        });
    }

    let mut predicates = Vec::with_capacity(key_fields.len());
    let mut binds = Vec::with_capacity(key_fields.len());
    for (field, value) in key_fields {
        let column = entity.column(field).ok_or_else(|| StorageError::LookupKeyError {
            entity: entity.identifier.to_string(),
            reason: format!("no column `{}`", field),
        })?;
        if value.is_null() {
            predicates.push(format!("\"{}\" IS NULL", column.name));
        } else {
            predicates.push(format!("\"{}\" = ?", column.name));
            binds.push(value.clone());
        }
    }

    let mut statement = Statement::new(format!(
        "SELECT * FROM \"{}\" WHERE {} LIMIT 1",
        entity.table_name,
        predicates.join(" AND ")
    ));
    for value in binds {
        statement = statement.bind(value);
    }
    Ok(statement)
}

struct KeyPredicate {
    sql: String,
    binds: Vec<Value>,
}

fn key_predicate(record: &Record) -> Result<KeyPredicate, StorageError> {
    let entity = record.entity();
    if !record.has_complete_key() {
        return Err(StorageError::LookupKeyError {
            entity: entity.identifier.to_string(),
            reason: format!("primary key ({}) is not fully set", entity.primary_key.join(", ")),
        });
    }
    let sql = entity
        .primary_key
        .iter()
        .map(|k| format!("\"{}\" = ?", k))
        .collect::<Vec<_>>()
        .join(" AND ");
    let binds = entity
        .primary_key
        .iter()
        .map(|k| record.get(k).cloned().unwrap_or(Value::Null))
        .collect();
    Ok(KeyPredicate { sql, binds })
}
