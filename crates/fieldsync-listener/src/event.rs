//! Read events and interceptors.

use fieldsync_core::{EntityId, MaterializedValue};

/// The values read for an arriving entity, before they are applied.
///
/// Interceptors may drop values or cancel the apply altogether.
pub struct ReadEvent<E> {
    entity: EntityId,
    values: Vec<MaterializedValue<E>>,
    cancelled: bool,
}

impl<E> ReadEvent<E> {
    pub fn new(entity: EntityId, values: Vec<MaterializedValue<E>>) -> Self {
        Self {
            entity,
            values,
            cancelled: false,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn values(&self) -> &[MaterializedValue<E>] {
        &self.values
    }

    /// Keeps only the values for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&MaterializedValue<E>) -> bool) {
        self.values.retain(keep);
    }

    /// Removes and returns the value for `identifier`, if present.
    pub fn take(&mut self, identifier: &str) -> Option<MaterializedValue<E>> {
        let index = self
            .values
            .iter()
            .position(|v| v.identifier().eq_ignore_ascii_case(identifier))?;
        Some(self.values.remove(index))
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn into_values(self) -> Vec<MaterializedValue<E>> {
        self.values
    }
}

impl<E> std::fmt::Debug for ReadEvent<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadEvent")
            .field("entity", &self.entity)
            .field("values", &self.values)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Observes, and may alter, read results before they reach the entity.
///
/// Interceptors run in registration order on the async task handling the
/// arrival; they must not block.
pub trait ReadInterceptor<E>: Send + Sync {
    fn on_read(&self, event: &mut ReadEvent<E>);
}

impl<E, F> ReadInterceptor<E> for F
where
    F: Fn(&mut ReadEvent<E>) + Send + Sync,
{
    fn on_read(&self, event: &mut ReadEvent<E>) {
        self(event)
    }
}
