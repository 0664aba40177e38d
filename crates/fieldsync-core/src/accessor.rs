//! Field accessors and the capabilities the engine needs from its host.
//!
//! A [`FieldAccessor`] reads and writes one named attribute of a live entity
//! of type `E`. Accessors are registered into a [`FieldSet`], which erases
//! their value types behind [`FieldHandle`] so the engine can iterate them in
//! registration order.

use crate::materialized::MaterializedValue;
use crate::registry::SerializerRegistry;
use crate::schema::TableName;
use crate::serializer::FieldValue;
use crate::{EntityId, SyncError, SyncResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Reads and writes one synchronized attribute of a live entity.
pub trait FieldAccessor<E>: Send + Sync + 'static {
    /// Type of the value this field carries.
    type Value: FieldValue;

    /// Globally unique identifier. Doubles as the backing table name.
    fn identifier(&self) -> &str;

    /// Reads the current value from the live entity. Must not touch any
    /// engine state.
    fn read(&self, entity: &E) -> SyncResult<Self::Value>;

    /// Replaces the field's live state with `value`.
    fn write(&self, entity: &mut E, value: Self::Value) -> SyncResult<()>;

    /// Whether [`apply_standalone`](Self::apply_standalone) is supported.
    fn is_standalone(&self) -> bool {
        false
    }

    /// Applies internally captured data to `entity` without an explicit value.
    ///
    /// Fails with [`SyncError::Unsupported`] unless overridden.
    fn apply_standalone(&self, entity: &mut E) -> SyncResult<()> {
        let _ = entity;
        Err(SyncError::Unsupported(format!(
            "field {} does not support standalone apply",
            self.identifier()
        )))
    }
}

/// Lookup of live entities owned by the host runtime.
pub trait LiveEntities<E>: Send + Sync {
    /// Runs `f` against the live entity for `id`.
    ///
    /// Returns false, without calling `f`, when no entity is live.
    fn inspect(&self, id: &EntityId, f: &mut dyn FnMut(&E)) -> bool;

    /// Runs `f` against the live entity for `id` with mutable access.
    ///
    /// Returns false, without calling `f`, when no entity is live.
    fn modify(&self, id: &EntityId, f: &mut dyn FnMut(&mut E)) -> bool;
}

/// Supplies the accessors the engine synchronizes, in registration order.
pub trait AccessorProvider<E>: Send + Sync {
    fn fields(&self) -> Vec<FieldHandle<E>>;
}

/// Value-type-erased operations on one accessor.
trait ErasedField<E>: Send + Sync {
    fn identifier(&self) -> &str;
    fn table(&self) -> &TableName;
    fn value_type(&self) -> &'static str;
    fn is_standalone(&self) -> bool;
    fn apply_standalone(&self, entity: &mut E) -> SyncResult<()>;
    fn capture(&self, entity: &E, registry: &SerializerRegistry) -> SyncResult<Option<String>>;
    fn materialize(
        &self,
        stored: String,
        registry: &SerializerRegistry,
    ) -> SyncResult<Option<MaterializedValue<E>>>;
}

struct TypedField<A> {
    accessor: Arc<A>,
    table: TableName,
}

impl<E: 'static, A: FieldAccessor<E>> ErasedField<E> for TypedField<A> {
    fn identifier(&self) -> &str {
        self.accessor.identifier()
    }

    fn table(&self) -> &TableName {
        &self.table
    }

    fn value_type(&self) -> &'static str {
        std::any::type_name::<A::Value>()
    }

    fn is_standalone(&self) -> bool {
        self.accessor.is_standalone()
    }

    fn apply_standalone(&self, entity: &mut E) -> SyncResult<()> {
        self.accessor.apply_standalone(entity)
    }

    fn capture(&self, entity: &E, registry: &SerializerRegistry) -> SyncResult<Option<String>> {
        let Some(serializer) = registry.resolve::<A::Value>() else {
            return Ok(None);
        };
        let value = self.accessor.read(entity)?;
        Ok(Some(serializer.serialize(&value)?))
    }

    fn materialize(
        &self,
        stored: String,
        registry: &SerializerRegistry,
    ) -> SyncResult<Option<MaterializedValue<E>>> {
        let Some(serializer) = registry.resolve::<A::Value>() else {
            return Ok(None);
        };
        let value = serializer.deserialize(&stored)?;
        Ok(Some(MaterializedValue::new(
            Arc::clone(&self.accessor),
            value,
            stored,
        )))
    }
}

/// A registered accessor with its value type erased.
pub struct FieldHandle<E> {
    inner: Arc<dyn ErasedField<E>>,
}

impl<E: 'static> FieldHandle<E> {
    /// Wraps `accessor`, validating its identifier as a table name.
    pub fn new<A: FieldAccessor<E>>(accessor: A) -> SyncResult<Self> {
        Self::from_arc(Arc::new(accessor))
    }

    /// Same as [`new`](Self::new) for an accessor that is shared elsewhere.
    pub fn from_arc<A: FieldAccessor<E>>(accessor: Arc<A>) -> SyncResult<Self> {
        let table = TableName::parse(accessor.identifier())?;
        Ok(Self {
            inner: Arc::new(TypedField { accessor, table }),
        })
    }
}

impl<E> FieldHandle<E> {
    /// Identifier as registered.
    pub fn identifier(&self) -> &str {
        self.inner.identifier()
    }

    /// Normalized table name backing this field.
    pub fn table(&self) -> &TableName {
        self.inner.table()
    }

    /// Rust type name of the field's value.
    pub fn value_type(&self) -> &'static str {
        self.inner.value_type()
    }

    pub fn is_standalone(&self) -> bool {
        self.inner.is_standalone()
    }

    /// Delegates to [`FieldAccessor::apply_standalone`].
    pub fn apply_standalone(&self, entity: &mut E) -> SyncResult<()> {
        self.inner.apply_standalone(entity)
    }

    /// Reads and serializes the live value. `None` when the value type has no
    /// serializer.
    pub(crate) fn capture(
        &self,
        entity: &E,
        registry: &SerializerRegistry,
    ) -> SyncResult<Option<String>> {
        self.inner.capture(entity, registry)
    }

    /// Decodes stored text into a [`MaterializedValue`]. `None` when the value
    /// type has no serializer.
    pub(crate) fn materialize(
        &self,
        stored: String,
        registry: &SerializerRegistry,
    ) -> SyncResult<Option<MaterializedValue<E>>> {
        self.inner.materialize(stored, registry)
    }
}

impl<E> Clone for FieldHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> std::fmt::Debug for FieldHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldHandle")
            .field("identifier", &self.identifier())
            .field("value_type", &self.value_type())
            .finish()
    }
}

/// Ordered set of accessors with unique identifiers.
///
/// Identifiers are compared after ASCII case normalization, since they share
/// one namespace of table names.
pub struct FieldSet<E> {
    fields: Vec<FieldHandle<E>>,
    by_table: HashMap<TableName, usize>,
}

impl<E: 'static> FieldSet<E> {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            by_table: HashMap::new(),
        }
    }

    /// Registers `accessor`.
    ///
    /// Fails with [`SyncError::Configuration`] if the identifier is not a
    /// valid table name or collides with an already registered one.
    pub fn register<A: FieldAccessor<E>>(&mut self, accessor: A) -> SyncResult<()> {
        self.register_handle(FieldHandle::new(accessor)?)
    }

    /// Registers an already wrapped accessor.
    pub fn register_handle(&mut self, handle: FieldHandle<E>) -> SyncResult<()> {
        if let Some(&existing) = self.by_table.get(handle.table()) {
            return Err(SyncError::Configuration(format!(
                "field identifier {:?} collides with already registered {:?}",
                handle.identifier(),
                self.fields[existing].identifier()
            )));
        }
        self.by_table.insert(handle.table().clone(), self.fields.len());
        self.fields.push(handle);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<A: FieldAccessor<E>>(mut self, accessor: A) -> SyncResult<Self> {
        self.register(accessor)?;
        Ok(self)
    }
}

impl<E> FieldSet<E> {
    /// Looks up a field by identifier, ignoring ASCII case.
    pub fn get(&self, identifier: &str) -> Option<&FieldHandle<E>> {
        let table = TableName::parse(identifier).ok()?;
        self.by_table.get(&table).map(|&i| &self.fields[i])
    }

    /// Registered identifiers in registration order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.fields.iter().map(FieldHandle::identifier).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E: 'static> Default for FieldSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> AccessorProvider<E> for FieldSet<E> {
    fn fields(&self) -> Vec<FieldHandle<E>> {
        self.fields.clone()
    }
}
