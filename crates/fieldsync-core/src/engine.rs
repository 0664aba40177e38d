//! The sync engine: locked reads and transactional upserts per entity.

use crate::accessor::{AccessorProvider, FieldHandle, LiveEntities};
use crate::materialized::MaterializedValue;
use crate::registry::SerializerRegistry;
use crate::schema::TableName;
use crate::store::{ConnectionFactory, StoreConnection};
use crate::{EntityId, SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct EngineState {
    connection: Option<Box<dyn StoreConnection>>,
    /// Lower-cased identifiers.
    excluded: HashSet<String>,
}

/// Persists and restores an entity's registered fields in a shared store.
///
/// All public operations are blocking and hold one exclusive lock for their
/// whole duration, so calls on the same instance never interleave. Separate
/// instances (usually separate processes) coordinate only through the store's
/// transactions and row locks.
///
/// The connection opens lazily on first use and stays open until
/// [`close`](Self::close). A connection-level failure drops it, so the next
/// call reconnects.
pub struct SyncEngine<E> {
    provider: Arc<dyn AccessorProvider<E>>,
    registry: Arc<SerializerRegistry>,
    factory: Arc<dyn ConnectionFactory>,
    entities: Arc<dyn LiveEntities<E>>,
    state: Mutex<EngineState>,
}

impl<E: 'static> SyncEngine<E> {
    pub fn new(
        provider: Arc<dyn AccessorProvider<E>>,
        registry: Arc<SerializerRegistry>,
        factory: Arc<dyn ConnectionFactory>,
        entities: Arc<dyn LiveEntities<E>>,
    ) -> Self {
        Self {
            provider,
            registry,
            factory,
            entities,
            state: Mutex::new(EngineState {
                connection: None,
                excluded: HashSet::new(),
            }),
        }
    }

    /// Builder-style [`set_excluded`](Self::set_excluded).
    pub fn with_excluded<I, S>(self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_excluded(identifiers);
        self
    }

    /// Replaces the set of field identifiers that never participate in read
    /// or write. Matching ignores ASCII case.
    pub fn set_excluded<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded: HashSet<String> = identifiers
            .into_iter()
            .map(|s| s.as_ref().to_ascii_lowercase())
            .collect();
        info!(count = excluded.len(), "Updated excluded fields");
        self.state.lock().excluded = excluded;
    }

    /// Currently excluded identifiers, lower-cased and sorted.
    pub fn excluded(&self) -> Vec<String> {
        let mut excluded: Vec<String> = self.state.lock().excluded.iter().cloned().collect();
        excluded.sort();
        excluded
    }

    pub fn registry(&self) -> &Arc<SerializerRegistry> {
        &self.registry
    }

    /// Identifiers that currently take part in read and write, in
    /// registration order.
    pub fn field_identifiers(&self) -> SyncResult<Vec<String>> {
        let state = self.state.lock();
        Ok(self
            .active_fields(&state.excluded)?
            .iter()
            .map(|f| f.identifier().to_string())
            .collect())
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().connection.is_some()
    }

    /// Opens the backing connection. No-op when already open.
    pub fn open(&self) -> SyncResult<()> {
        let mut state = self.state.lock();
        self.ensure_open(&mut state)?;
        Ok(())
    }

    /// Closes the backing connection. No-op when already closed.
    pub fn close(&self) -> SyncResult<()> {
        let mut state = self.state.lock();
        match state.connection.take() {
            Some(conn) => {
                let backend = conn.backend_name();
                conn.close()?;
                info!(backend, "Sync store closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Creates every active field's table without touching any row.
    pub fn provision(&self) -> SyncResult<()> {
        let mut state = self.state.lock();
        let fields = self.active_fields(&state.excluded)?;
        let result = self
            .ensure_open(&mut state)
            .and_then(|conn| provision_all(conn.as_mut(), &fields));
        discard_on_connection_error(&mut state, &result);
        result
    }

    /// Loads the stored value of every active field of `id`.
    ///
    /// Rows are read with a locking select inside one transaction. Fields
    /// with no stored row, or whose value type has no serializer, are left
    /// out of the result. The returned values have not been applied.
    pub fn read(&self, id: EntityId) -> SyncResult<Vec<MaterializedValue<E>>> {
        let mut state = self.state.lock();
        let fields = self.active_fields(&state.excluded)?;
        let result = self.read_locked(&mut state, &id, &fields);
        discard_on_connection_error(&mut state, &result);
        result
    }

    /// Stores the live value of every active field of `id`.
    ///
    /// Does nothing when `id` has no live entity. Otherwise all rows are
    /// written in one transaction: either every field is stored or none is.
    pub fn write(&self, id: EntityId) -> SyncResult<()> {
        let mut state = self.state.lock();
        let fields = self.active_fields(&state.excluded)?;
        let result = self.write_locked(&mut state, &id, &fields);
        discard_on_connection_error(&mut state, &result);
        result
    }

    fn read_locked(
        &self,
        state: &mut EngineState,
        id: &EntityId,
        fields: &[FieldHandle<E>],
    ) -> SyncResult<Vec<MaterializedValue<E>>> {
        let conn = self.ensure_open(state)?.as_mut();
        let provision_in_tx = prepare_tables(conn, fields)?;

        let values = in_transaction(conn, id, |conn| {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                if provision_in_tx {
                    conn.ensure_table(field.table())?;
                }
                let Some(stored) = conn.select_for_update(field.table(), id)? else {
                    debug!(field = field.identifier(), entity = %id, "No stored row");
                    continue;
                };
                match field.materialize(stored, &self.registry)? {
                    Some(value) => values.push(value),
                    None => debug!(
                        field = field.identifier(),
                        value_type = field.value_type(),
                        "No serializer for field, skipping"
                    ),
                }
            }
            Ok(values)
        })?;

        debug!(entity = %id, fields = values.len(), "Read entity");
        Ok(values)
    }

    fn write_locked(
        &self,
        state: &mut EngineState,
        id: &EntityId,
        fields: &[FieldHandle<E>],
    ) -> SyncResult<()> {
        let conn = self.ensure_open(state)?.as_mut();

        let Some(captured) = self.capture_live(id, fields)? else {
            debug!(entity = %id, "Entity not live, nothing to write");
            return Ok(());
        };

        let provision_in_tx = prepare_tables(conn, fields)?;

        let written = in_transaction(conn, id, |conn| {
            let mut written = 0usize;
            for (field, data) in fields.iter().zip(&captured) {
                if provision_in_tx {
                    conn.ensure_table(field.table())?;
                }
                let Some(data) = data else {
                    debug!(
                        field = field.identifier(),
                        value_type = field.value_type(),
                        "No serializer for field, skipping"
                    );
                    continue;
                };
                let exists = conn.select_for_update(field.table(), id)?.is_some();
                conn.upsert(field.table(), id, data, exists)?;
                written += 1;
            }
            Ok(written)
        })?;

        debug!(entity = %id, fields = written, "Wrote entity");
        Ok(())
    }

    /// Serializes every field's live value. `None` when the entity is not
    /// live; per-field `None` when the value type has no serializer.
    fn capture_live(
        &self,
        id: &EntityId,
        fields: &[FieldHandle<E>],
    ) -> SyncResult<Option<Vec<Option<String>>>> {
        let mut captured = None;
        let live = self.entities.inspect(id, &mut |entity| {
            captured = Some(
                fields
                    .iter()
                    .map(|field| field.capture(entity, &self.registry))
                    .collect::<SyncResult<Vec<_>>>(),
            );
        });
        if !live {
            return Ok(None);
        }
        captured.transpose()
    }

    fn ensure_open<'a>(
        &self,
        state: &'a mut EngineState,
    ) -> SyncResult<&'a mut Box<dyn StoreConnection>> {
        if state.connection.is_none() {
            let conn = self.factory.connect()?;
            info!(
                backend = conn.backend_name(),
                store = %self.factory.describe(),
                "Sync store opened"
            );
            state.connection = Some(conn);
        }
        state
            .connection
            .as_mut()
            .ok_or_else(|| SyncError::Connection("connection unavailable".to_string()))
    }

    /// Registered fields minus exclusions. Rejects providers that hand out
    /// two fields backed by the same table.
    fn active_fields(&self, excluded: &HashSet<String>) -> SyncResult<Vec<FieldHandle<E>>> {
        let fields = self.provider.fields();
        {
            let mut seen: HashSet<&TableName> = HashSet::with_capacity(fields.len());
            for field in &fields {
                if !seen.insert(field.table()) {
                    return Err(SyncError::Configuration(format!(
                        "duplicate field identifier {:?}",
                        field.identifier()
                    )));
                }
            }
        }
        Ok(fields
            .into_iter()
            .filter(|f| !excluded.contains(f.table().as_str()))
            .collect())
    }
}

/// Runs provisioning ahead of `BEGIN` for backends whose DDL would commit an
/// open transaction. Returns whether provisioning should happen inside it
/// instead.
fn prepare_tables<E>(conn: &mut dyn StoreConnection, fields: &[FieldHandle<E>]) -> SyncResult<bool> {
    if conn.capabilities().transactional_ddl {
        Ok(true)
    } else {
        provision_all(conn, fields)?;
        Ok(false)
    }
}

fn provision_all<E>(conn: &mut dyn StoreConnection, fields: &[FieldHandle<E>]) -> SyncResult<()> {
    for field in fields {
        conn.ensure_table(field.table())?;
    }
    Ok(())
}

fn in_transaction<T>(
    conn: &mut dyn StoreConnection,
    id: &EntityId,
    body: impl FnOnce(&mut dyn StoreConnection) -> SyncResult<T>,
) -> SyncResult<T> {
    conn.begin()?;
    let result = body(&mut *conn).and_then(|value| conn.commit().map(|()| value));
    if let Err(err) = &result {
        if let Err(rollback_err) = conn.rollback() {
            warn!(
                entity = %id,
                error = %err,
                rollback_error = %rollback_err,
                "Rollback failed"
            );
        }
    }
    result
}

fn discard_on_connection_error<T>(state: &mut EngineState, result: &SyncResult<T>) {
    if let Err(SyncError::Connection(message)) = result {
        if let Some(conn) = state.connection.take() {
            warn!(error = %message, "Dropping sync store connection");
            if let Err(err) = conn.close() {
                debug!(error = %err, "Closing broken connection failed");
            }
        }
    }
}
