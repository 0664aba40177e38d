//! Per-entity field synchronization over a shared relational store.
//!
//! This crate provides:
//! - [`SyncEngine`]: transactional read/write of every registered field of an
//!   entity, safe under concurrent access from uncoordinated processes
//! - [`FieldAccessor`] and [`FieldSet`]: typed access to one attribute of a
//!   live entity, registered under a unique identifier
//! - [`SerializerRegistry`]: type-keyed codecs with a lazily synthesized JSON
//!   fallback
//! - [`ConnectionFactory`] / [`StoreConnection`]: the seam backend crates
//!   implement
//!
//! # Storage layout
//!
//! Each field identifier owns one table, `(entity_id PRIMARY KEY, data)`,
//! created on demand before every access. A row holds one entity's serialized
//! value for that field.
//!
//! ```ignore
//! let engine = SyncEngine::new(fields, registry, factory, players);
//! engine.write(id)?;                 // on departure
//! for value in engine.read(id)? {    // on arrival
//!     value.apply(&mut player)?;
//! }
//! ```

mod accessor;
mod engine;
mod error;
mod ids;
mod materialized;
mod registry;
pub mod schema;
mod serializer;
mod store;

#[cfg(test)]
mod tests;

pub use accessor::{AccessorProvider, FieldAccessor, FieldHandle, FieldSet, LiveEntities};
pub use engine::SyncEngine;
pub use error::{SerializationError, SyncError, SyncResult};
pub use ids::EntityId;
pub use materialized::MaterializedValue;
pub use registry::{SerializerOrigin, SerializerRegistry};
pub use schema::TableName;
pub use serializer::{FallbackCodec, FieldValue, JsonSerializer, Serializer};
pub use store::{ConnectionFactory, StoreCapabilities, StoreConnection, UpsertMode};
