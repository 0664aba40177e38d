//! Arrival and departure handling.

use crate::event::{ReadEvent, ReadInterceptor};
use crate::ListenerResult;
use fieldsync_core::{EntityId, LiveEntities, MaterializedValue, SyncEngine, SyncResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Two ticks at 20 Hz.
pub const DEFAULT_ARRIVAL_DELAY: Duration = Duration::from_millis(100);

/// What happened to an arriving entity's stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// This many values were applied to the live entity.
    Applied(usize),
    /// An interceptor cancelled the apply.
    Cancelled,
    /// The entity left before its values could be applied.
    EntityGone,
}

/// Drives a [`SyncEngine`] from entity lifecycle events.
///
/// Engine calls block, so they run on tokio's blocking pool.
pub struct SyncListener<E> {
    engine: Arc<SyncEngine<E>>,
    entities: Arc<dyn LiveEntities<E>>,
    interceptors: Vec<Arc<dyn ReadInterceptor<E>>>,
    arrival_delay: Duration,
}

impl<E: 'static> SyncListener<E> {
    pub fn new(engine: Arc<SyncEngine<E>>, entities: Arc<dyn LiveEntities<E>>) -> Self {
        Self {
            engine,
            entities,
            interceptors: Vec::new(),
            arrival_delay: DEFAULT_ARRIVAL_DELAY,
        }
    }

    pub fn with_arrival_delay(mut self, delay: Duration) -> Self {
        self.arrival_delay = delay;
        self
    }

    /// Adds an interceptor. Interceptors run in the order they were added.
    pub fn with_interceptor(mut self, interceptor: impl ReadInterceptor<E> + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn engine(&self) -> &Arc<SyncEngine<E>> {
        &self.engine
    }

    /// Loads and applies the stored fields of an entity that just arrived.
    pub async fn on_arrival(&self, id: EntityId) -> ListenerResult<ArrivalOutcome> {
        if !self.arrival_delay.is_zero() {
            tokio::time::sleep(self.arrival_delay).await;
        }

        let engine = Arc::clone(&self.engine);
        let values = tokio::task::spawn_blocking(move || engine.read(id))
            .await?
            .inspect_err(|e| warn!(entity = %id, error = %e, "Arrival read failed"))?;

        let mut event = ReadEvent::new(id, values);
        for interceptor in &self.interceptors {
            interceptor.on_read(&mut event);
        }
        if event.is_cancelled() {
            info!(entity = %id, "Arrival apply cancelled");
            return Ok(ArrivalOutcome::Cancelled);
        }

        // Read results carry their own values, so all of them apply standalone.
        let values = event.into_values();

        let mut pending = Some(values);
        let mut applied: SyncResult<usize> = Ok(0);
        let live = self.entities.modify(&id, &mut |entity| {
            if let Some(values) = pending.take() {
                applied = apply_all(values, entity);
            }
        });
        if !live {
            debug!(entity = %id, "Entity left before apply");
            return Ok(ArrivalOutcome::EntityGone);
        }

        let applied =
            applied.inspect_err(|e| warn!(entity = %id, error = %e, "Applying values failed"))?;
        debug!(entity = %id, applied, "Arrival applied");
        Ok(ArrivalOutcome::Applied(applied))
    }

    /// Stores the fields of an entity that is leaving this process.
    ///
    /// Call before the entity is dropped from the [`LiveEntities`] lookup;
    /// the engine skips entities it cannot find.
    pub async fn on_departure(&self, id: EntityId) -> ListenerResult<()> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.write(id))
            .await?
            .inspect_err(|e| warn!(entity = %id, error = %e, "Departure write failed"))?;
        Ok(())
    }
}

fn apply_all<E>(values: Vec<MaterializedValue<E>>, entity: &mut E) -> SyncResult<usize> {
    let mut applied = 0;
    for value in values {
        value.apply(entity)?;
        applied += 1;
    }
    Ok(applied)
}
