//! In-memory store and a small live-entity world for engine tests.

use crate::{
    ConnectionFactory, EntityId, FieldAccessor, FieldValue, LiveEntities, StoreCapabilities,
    StoreConnection, SyncError, SyncResult, TableName, UpsertMode,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

type Tables = BTreeMap<String, BTreeMap<String, String>>;

/// Store operation as seen by the backend, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Connect,
    Close,
    Begin,
    Commit,
    Rollback,
    Ensure(String),
    Select(String),
    Upsert(String, bool),
    /// DDL ran inside a transaction on a backend without transactional DDL.
    ImplicitCommit(String),
}

#[derive(Default)]
pub struct MemoryDb {
    committed: Tables,
    pub ops: Vec<Op>,
    /// Fail `upsert` on this table.
    pub fail_upsert_on: Option<String>,
    /// Fail `select_for_update` on this table with a connection error.
    pub drop_connection_on: Option<String>,
    pub refuse_connect: bool,
    /// Time `close` takes before it is recorded.
    pub close_delay: Option<Duration>,
}

impl MemoryDb {
    pub fn row(&self, table: &str, id: &EntityId) -> Option<String> {
        self.committed.get(table)?.get(&id.to_column()).cloned()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.committed.get(table).map_or(0, BTreeMap::len)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.committed.contains_key(table)
    }

    pub fn insert_row(&mut self, table: &str, id: &EntityId, data: &str) {
        self.committed
            .entry(table.to_string())
            .or_default()
            .insert(id.to_column(), data.to_string());
    }

    pub fn drop_table(&mut self, table: &str) {
        self.committed.remove(table);
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn mutations(&self) -> usize {
        self.count(|op| matches!(op, Op::Upsert(..)))
    }
}

/// Connection factory over a shared [`MemoryDb`].
#[derive(Clone)]
pub struct MemoryStore {
    pub db: Arc<Mutex<MemoryDb>>,
    capabilities: StoreCapabilities,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            db: Arc::new(Mutex::new(MemoryDb::default())),
            capabilities: StoreCapabilities::default(),
        }
    }

    /// Behaves like MySQL: DDL commits any open transaction.
    pub fn without_transactional_ddl() -> Self {
        Self {
            capabilities: StoreCapabilities {
                transactional_ddl: false,
                upsert: UpsertMode::CheckThenWrite,
            },
            ..Self::new()
        }
    }
}

impl ConnectionFactory for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn connect(&self) -> SyncResult<Box<dyn StoreConnection>> {
        let mut db = self.db.lock();
        if db.refuse_connect {
            return Err(SyncError::Connection("store refused connection".to_string()));
        }
        db.ops.push(Op::Connect);
        Ok(Box::new(MemoryConnection {
            db: Arc::clone(&self.db),
            capabilities: self.capabilities,
            staged: None,
        }))
    }
}

struct MemoryConnection {
    db: Arc<Mutex<MemoryDb>>,
    capabilities: StoreCapabilities,
    staged: Option<Tables>,
}

impl MemoryConnection {
    fn tables<'a>(staged: &'a mut Option<Tables>, db: &'a mut MemoryDb) -> &'a mut Tables {
        match staged {
            Some(tables) => tables,
            None => &mut db.committed,
        }
    }
}

impl StoreConnection for MemoryConnection {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    fn begin(&mut self) -> SyncResult<()> {
        let mut db = self.db.lock();
        db.ops.push(Op::Begin);
        self.staged = Some(db.committed.clone());
        Ok(())
    }

    fn commit(&mut self) -> SyncResult<()> {
        let mut db = self.db.lock();
        db.ops.push(Op::Commit);
        if let Some(tables) = self.staged.take() {
            db.committed = tables;
        }
        Ok(())
    }

    fn rollback(&mut self) -> SyncResult<()> {
        self.db.lock().ops.push(Op::Rollback);
        self.staged = None;
        Ok(())
    }

    fn ensure_table(&mut self, table: &TableName) -> SyncResult<()> {
        let mut db = self.db.lock();
        db.ops.push(Op::Ensure(table.to_string()));
        if !self.capabilities.transactional_ddl {
            if let Some(tables) = self.staged.take() {
                db.ops.push(Op::ImplicitCommit(table.to_string()));
                db.committed = tables;
            }
        }
        Self::tables(&mut self.staged, &mut db)
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    fn select_for_update(
        &mut self,
        table: &TableName,
        id: &EntityId,
    ) -> SyncResult<Option<String>> {
        let mut db = self.db.lock();
        db.ops.push(Op::Select(table.to_string()));
        if db.drop_connection_on.as_deref() == Some(table.as_str()) {
            return Err(SyncError::Connection("connection reset".to_string()));
        }
        let rows = Self::tables(&mut self.staged, &mut db)
            .get(table.as_str())
            .ok_or_else(|| SyncError::query(table.as_str(), "no such table"))?;
        Ok(rows.get(&id.to_column()).cloned())
    }

    fn upsert(
        &mut self,
        table: &TableName,
        id: &EntityId,
        data: &str,
        row_exists: bool,
    ) -> SyncResult<()> {
        let mut db = self.db.lock();
        db.ops.push(Op::Upsert(table.to_string(), row_exists));
        if db.fail_upsert_on.as_deref() == Some(table.as_str()) {
            return Err(SyncError::query(table.as_str(), "disk I/O error"));
        }
        Self::tables(&mut self.staged, &mut db)
            .get_mut(table.as_str())
            .ok_or_else(|| SyncError::query(table.as_str(), "no such table"))?
            .insert(id.to_column(), data.to_string());
        Ok(())
    }

    fn close(self: Box<Self>) -> SyncResult<()> {
        let delay = self.db.lock().close_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.db.lock().ops.push(Op::Close);
        Ok(())
    }
}

/// Opaque value type with no fallback encoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Banner(pub String);

impl FieldValue for Banner {}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Knight {
    pub health: f64,
    pub name: String,
    pub banner: Banner,
}

#[derive(Default)]
pub struct Roster {
    knights: Mutex<HashMap<EntityId, Knight>>,
}

impl Roster {
    pub fn insert(&self, id: EntityId, knight: Knight) {
        self.knights.lock().insert(id, knight);
    }

    pub fn remove(&self, id: &EntityId) -> Option<Knight> {
        self.knights.lock().remove(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<Knight> {
        self.knights.lock().get(id).cloned()
    }
}

impl LiveEntities<Knight> for Roster {
    fn inspect(&self, id: &EntityId, f: &mut dyn FnMut(&Knight)) -> bool {
        match self.knights.lock().get(id) {
            Some(knight) => {
                f(knight);
                true
            }
            None => false,
        }
    }

    fn modify(&self, id: &EntityId, f: &mut dyn FnMut(&mut Knight)) -> bool {
        match self.knights.lock().get_mut(id) {
            Some(knight) => {
                f(knight);
                true
            }
            None => false,
        }
    }
}

pub struct HealthField;

impl FieldAccessor<Knight> for HealthField {
    type Value = f64;

    fn identifier(&self) -> &str {
        "health"
    }

    fn read(&self, entity: &Knight) -> SyncResult<f64> {
        Ok(entity.health)
    }

    fn write(&self, entity: &mut Knight, value: f64) -> SyncResult<()> {
        entity.health = value;
        Ok(())
    }
}

pub struct NameField;

impl FieldAccessor<Knight> for NameField {
    type Value = String;

    fn identifier(&self) -> &str {
        "name"
    }

    fn read(&self, entity: &Knight) -> SyncResult<String> {
        Ok(entity.name.clone())
    }

    fn write(&self, entity: &mut Knight, value: String) -> SyncResult<()> {
        entity.name = value;
        Ok(())
    }
}

pub struct BannerField;

impl FieldAccessor<Knight> for BannerField {
    type Value = Banner;

    fn identifier(&self) -> &str {
        "banner"
    }

    fn read(&self, entity: &Knight) -> SyncResult<Banner> {
        Ok(entity.banner.clone())
    }

    fn write(&self, entity: &mut Knight, value: Banner) -> SyncResult<()> {
        entity.banner = value;
        Ok(())
    }
}

/// Accessor whose live read always fails.
pub struct BrokenField;

impl FieldAccessor<Knight> for BrokenField {
    type Value = i32;

    fn identifier(&self) -> &str {
        "broken"
    }

    fn read(&self, _entity: &Knight) -> SyncResult<i32> {
        Err(SyncError::Accessor {
            identifier: "broken".to_string(),
            message: "sensor offline".to_string(),
        })
    }

    fn write(&self, _entity: &mut Knight, _value: i32) -> SyncResult<()> {
        Ok(())
    }
}

/// Serializer for [`Banner`] used where a test registers one explicitly.
pub struct BannerSerializer;

impl crate::Serializer<Banner> for BannerSerializer {
    fn serialize(&self, value: &Banner) -> Result<String, crate::SerializationError> {
        Ok(format!("banner:{}", value.0))
    }

    fn deserialize(&self, data: &str) -> Result<Banner, crate::SerializationError> {
        data.strip_prefix("banner:")
            .map(|s| Banner(s.to_string()))
            .ok_or_else(|| {
                crate::SerializationError::decode(std::any::type_name::<Banner>(), "missing prefix")
            })
    }
}
