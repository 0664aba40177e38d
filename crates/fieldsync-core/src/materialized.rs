//! Values materialized by a read.

use crate::accessor::FieldAccessor;
use crate::SyncResult;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased captured value plus the accessor that knows how to apply it.
trait Captured<E>: Send {
    fn value_any(&self) -> &dyn Any;
    fn apply(self: Box<Self>, entity: &mut E) -> SyncResult<()>;
}

struct CapturedValue<E, A: FieldAccessor<E>> {
    accessor: Arc<A>,
    value: A::Value,
    _entity: PhantomData<fn(&mut E)>,
}

impl<E, A: FieldAccessor<E>> Captured<E> for CapturedValue<E, A> {
    fn value_any(&self) -> &dyn Any {
        &self.value
    }

    fn apply(self: Box<Self>, entity: &mut E) -> SyncResult<()> {
        let CapturedValue {
            accessor, value, ..
        } = *self;
        accessor.write(entity, value)
    }
}

/// Snapshot of one stored field plus a deferred apply.
///
/// Produced only by [`SyncEngine::read`](crate::SyncEngine::read). The
/// captured value is owned exclusively until [`apply`](Self::apply) consumes
/// it; dropping an unapplied value discards it.
pub struct MaterializedValue<E> {
    identifier: String,
    value_type: &'static str,
    stored: String,
    captured: Box<dyn Captured<E>>,
}

impl<E: 'static> MaterializedValue<E> {
    pub(crate) fn new<A>(
        accessor: Arc<A>,
        value: <A as FieldAccessor<E>>::Value,
        stored: String,
    ) -> Self
    where
        A: FieldAccessor<E>,
    {
        Self {
            identifier: accessor.identifier().to_string(),
            value_type: std::any::type_name::<<A as FieldAccessor<E>>::Value>(),
            stored,
            captured: Box::new(CapturedValue {
                accessor,
                value,
                _entity: PhantomData,
            }),
        }
    }
}

impl<E> MaterializedValue<E> {
    /// Identifier of the field this value belongs to.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Rust type name of the captured value.
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// The text the value was decoded from.
    pub fn stored_text(&self) -> &str {
        &self.stored
    }

    /// Borrows the captured value if it is a `T`.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        self.captured.value_any().downcast_ref::<T>()
    }

    /// Materialized values carry their own data, so they can always be
    /// applied without an explicit argument.
    pub fn is_standalone(&self) -> bool {
        true
    }

    /// Writes the captured value onto `entity` through the field's accessor.
    pub fn apply(self, entity: &mut E) -> SyncResult<()> {
        self.captured.apply(entity)
    }
}

impl<E> std::fmt::Debug for MaterializedValue<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedValue")
            .field("identifier", &self.identifier)
            .field("value_type", &self.value_type)
            .field("stored", &self.stored)
            .finish()
    }
}
