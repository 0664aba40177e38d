//! Engine tests against an in-memory store.
//!
//! - `lifecycle.rs`    - open/close, lazy open, reconnect after connection loss
//! - `reads.rs`        - locked reads, materialization, missing rows and serializers
//! - `writes.rs`       - upserts, absent entities, self-healing tables
//! - `exclusion.rs`    - excluded identifiers on both paths
//! - `atomicity.rs`    - all-or-nothing writes, rollback, non-transactional DDL
//! - `registration.rs` - identifier validation and duplicate detection

mod atomicity;
mod registration;
mod support;

use crate::{EntityId, FallbackCodec, FieldSet, SerializerRegistry, SyncEngine};
use std::sync::Arc;
use support::{Banner, BannerField, HealthField, Knight, MemoryStore, NameField, Roster};

/// Engine wired to a memory store, with handles kept for assertions.
struct World {
    store: MemoryStore,
    roster: Arc<Roster>,
    registry: Arc<SerializerRegistry>,
    engine: SyncEngine<Knight>,
}

impl World {
    fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Health, name and banner fields with the JSON fallback enabled.
    fn with_store(store: MemoryStore) -> Self {
        let fields = FieldSet::new()
            .with(HealthField)
            .unwrap()
            .with(NameField)
            .unwrap()
            .with(BannerField)
            .unwrap();
        Self::with_fields(store, fields)
    }

    fn with_fields(store: MemoryStore, fields: FieldSet<Knight>) -> Self {
        let roster = Arc::new(Roster::default());
        let registry = Arc::new(SerializerRegistry::with_fallback(FallbackCodec::Json));
        let engine = SyncEngine::new(
            Arc::new(fields),
            Arc::clone(&registry),
            Arc::new(store.clone()),
            roster.clone(),
        );
        Self {
            store,
            roster,
            registry,
            engine,
        }
    }

    fn spawn(&self, health: f64, name: &str) -> EntityId {
        let id = EntityId::new();
        self.roster.insert(
            id,
            Knight {
                health,
                name: name.to_string(),
                banner: Banner("lion".to_string()),
            },
        );
        id
    }
}

/// Departure on one engine, arrival on another, sharing one store.
#[test]
fn handoff_between_engines() {
    let origin = World::new();
    let id = origin.spawn(14.0, "Percival");
    origin.engine.write(id).unwrap();
    origin.roster.remove(&id);

    let target = World::with_store(origin.store.clone());
    target.roster.insert(id, Knight::default());

    let values = target.engine.read(id).unwrap();
    let identifiers: Vec<_> = values.iter().map(|v| v.identifier().to_string()).collect();
    assert_eq!(identifiers, vec!["health", "name"]);

    let mut knight = Knight::default();
    for value in values {
        value.apply(&mut knight).unwrap();
    }
    assert_eq!(knight.health, 14.0);
    assert_eq!(knight.name, "Percival");
    assert_eq!(knight.banner, Banner::default());
}
