//! All-or-nothing writes and DDL placement.

use super::support::{BrokenField, HealthField, MemoryStore, NameField, Op};
use super::World;
use crate::{FieldSet, SyncError};

#[test]
fn failing_later_field_rolls_back_earlier_ones() {
    let world = World::new();
    let id = world.spawn(11.0, "Mordred");
    world.store.db.lock().fail_upsert_on = Some("name".to_string());

    let err = world.engine.write(id).unwrap_err();
    assert!(matches!(err, SyncError::Query { ref table, .. } if table == "name"));

    let db = world.store.db.lock();
    assert_eq!(db.row("health", &id), None);
    assert_eq!(db.count(|op| *op == Op::Rollback), 1);
    assert_eq!(db.count(|op| *op == Op::Commit), 0);
}

#[test]
fn previous_values_survive_a_failed_write() {
    let world = World::new();
    let id = world.spawn(11.0, "Mordred");
    world.engine.write(id).unwrap();

    world.roster.insert(
        id,
        super::support::Knight {
            health: 0.5,
            ..world.roster.get(&id).unwrap()
        },
    );
    world.store.db.lock().fail_upsert_on = Some("name".to_string());
    assert!(world.engine.write(id).is_err());

    assert_eq!(
        world.store.db.lock().row("health", &id).as_deref(),
        Some("11.0")
    );
}

#[test]
fn accessor_failure_aborts_before_the_transaction() {
    let fields = FieldSet::new()
        .with(HealthField)
        .unwrap()
        .with(BrokenField)
        .unwrap();
    let world = World::with_fields(MemoryStore::new(), fields);
    let id = world.spawn(2.0, "Agravain");

    let err = world.engine.write(id).unwrap_err();
    assert!(matches!(err, SyncError::Accessor { .. }));

    let db = world.store.db.lock();
    assert_eq!(db.mutations(), 0);
    assert_eq!(db.count(|op| *op == Op::Begin), 0);
}

#[test]
fn non_transactional_ddl_runs_before_begin() {
    let store = MemoryStore::without_transactional_ddl();
    let fields = FieldSet::new()
        .with(HealthField)
        .unwrap()
        .with(NameField)
        .unwrap();
    let world = World::with_fields(store, fields);
    let id = world.spawn(10.0, "Lucan");

    world.engine.write(id).unwrap();
    world.engine.read(id).unwrap();

    let db = world.store.db.lock();
    assert_eq!(db.count(|op| matches!(op, Op::ImplicitCommit(_))), 0);

    let begin = db.ops.iter().position(|op| *op == Op::Begin).unwrap();
    let last_ensure = db
        .ops
        .iter()
        .position(|op| *op == Op::Ensure("name".to_string()))
        .unwrap();
    assert!(last_ensure < begin);
    assert_eq!(db.row("health", &id).as_deref(), Some("10.0"));
}

#[test]
fn non_transactional_ddl_still_rolls_back_rows() {
    let world = World::with_store(MemoryStore::without_transactional_ddl());
    let id = world.spawn(10.0, "Lucan");
    world.store.db.lock().fail_upsert_on = Some("name".to_string());

    assert!(world.engine.write(id).is_err());
    let db = world.store.db.lock();
    assert!(db.has_table("health"));
    assert_eq!(db.row("health", &id), None);
}

#[test]
fn non_finite_value_fails_the_write_and_keeps_reads_working() {
    let world = World::new();
    let id = world.spawn(11.0, "Mordred");
    world.engine.write(id).unwrap();

    world.roster.insert(
        id,
        super::support::Knight {
            health: f64::INFINITY,
            ..world.roster.get(&id).unwrap()
        },
    );
    let err = world.engine.write(id).unwrap_err();
    assert!(matches!(err, SyncError::Serialization(ref e) if e.direction == "serialize"));

    {
        let db = world.store.db.lock();
        assert_eq!(db.row("health", &id).as_deref(), Some("11.0"));
        assert_eq!(db.count(|op| *op == Op::Begin), 1);
    }
    assert_eq!(world.engine.read(id).unwrap().len(), 2);
}
