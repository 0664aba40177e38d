//! Identifier validation and duplicate detection.

use super::support::{HealthField, Knight, MemoryStore};
use super::World;
use crate::{AccessorProvider, FieldAccessor, FieldHandle, FieldSet, SyncError, SyncResult};
use std::sync::Arc;

struct Shouting;

impl FieldAccessor<Knight> for Shouting {
    type Value = f64;

    fn identifier(&self) -> &str {
        "HEALTH"
    }

    fn read(&self, entity: &Knight) -> SyncResult<f64> {
        Ok(entity.health)
    }

    fn write(&self, entity: &mut Knight, value: f64) -> SyncResult<()> {
        entity.health = value;
        Ok(())
    }
}

#[test]
fn case_variants_collide_at_registration() {
    let mut fields = FieldSet::new();
    fields.register(HealthField).unwrap();

    let err = fields.register(Shouting).unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)));
    assert_eq!(fields.len(), 1);
}

/// Provider that bypasses `FieldSet` validation.
struct Careless(Vec<FieldHandle<Knight>>);

impl AccessorProvider<Knight> for Careless {
    fn fields(&self) -> Vec<FieldHandle<Knight>> {
        self.0.clone()
    }
}

#[test]
fn engine_rejects_duplicate_tables_from_any_provider() {
    let world = World::new();
    let provider = Careless(vec![
        FieldHandle::new(HealthField).unwrap(),
        FieldHandle::new(Shouting).unwrap(),
    ]);
    let engine = crate::SyncEngine::new(
        Arc::new(provider),
        Arc::clone(&world.registry),
        Arc::new(MemoryStore::new()),
        world.roster.clone(),
    );

    let err = engine.read(crate::EntityId::new()).unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)));
    assert!(!engine.is_open());
}

#[test]
fn mixed_case_identifier_uses_lowercase_table() {
    let fields = FieldSet::new().with(Shouting).unwrap();
    let world = World::with_fields(MemoryStore::new(), fields);
    let id = world.spawn(3.5, "Uwaine");
    world.engine.write(id).unwrap();

    assert_eq!(
        world.store.db.lock().row("health", &id).as_deref(),
        Some("3.5")
    );
}
