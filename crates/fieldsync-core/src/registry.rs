//! Serializer registry.
//!
//! Maps a value type to its [`Serializer`]. Entries are keyed by the
//! [`TypeId`] of the value type, which is fixed when a field accessor is
//! registered, so no runtime inspection of values is needed to dispatch.
//!
//! # Locking
//!
//! The registry owns a single mutex over its map. Lookup, registration and
//! fallback synthesis all run under it, which makes synthesis exactly-once per
//! type per registry instance. Serializers handed out are `Arc`s, so no caller
//! holds the lock while encoding or decoding.
//!
//! Construct one registry at startup and share it (`Arc<SerializerRegistry>`).

use crate::serializer::{FallbackCodec, FieldValue, Serializer};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How a registry entry came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializerOrigin {
    /// Added with [`SerializerRegistry::register`].
    Registered,
    /// Built from the fallback codec on first use.
    Synthesized,
}

struct Entry {
    type_name: &'static str,
    origin: SerializerOrigin,
    /// Always an `Arc<dyn Serializer<T>>` for the `T` this entry is keyed by.
    serializer: Box<dyn Any + Send + Sync>,
}

impl Entry {
    fn new<T: FieldValue>(serializer: Arc<dyn Serializer<T>>, origin: SerializerOrigin) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            origin,
            serializer: Box::new(serializer),
        }
    }

    fn get<T: FieldValue>(&self) -> Option<Arc<dyn Serializer<T>>> {
        self.serializer
            .downcast_ref::<Arc<dyn Serializer<T>>>()
            .cloned()
    }
}

/// Type-keyed map of serializers with an optional structured fallback.
pub struct SerializerRegistry {
    entries: Mutex<HashMap<TypeId, Entry>>,
    fallback: Option<FallbackCodec>,
}

impl SerializerRegistry {
    /// Creates a registry that only knows explicitly registered serializers.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fallback: None,
        }
    }

    /// Creates a registry that synthesizes missing serializers with `codec`.
    pub fn with_fallback(codec: FallbackCodec) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fallback: Some(codec),
        }
    }

    /// The configured fallback codec, if any.
    pub fn fallback(&self) -> Option<FallbackCodec> {
        self.fallback
    }

    /// Binds `serializer` to `T`, replacing any previous entry (including a
    /// synthesized one).
    pub fn register<T, S>(&self, serializer: S)
    where
        T: FieldValue,
        S: Serializer<T> + 'static,
    {
        self.register_arc::<T>(Arc::new(serializer));
    }

    /// Same as [`register`](Self::register) for an already shared serializer.
    pub fn register_arc<T: FieldValue>(&self, serializer: Arc<dyn Serializer<T>>) {
        let entry = Entry::new(serializer, SerializerOrigin::Registered);
        debug!(value_type = entry.type_name, "serializer registered");
        self.entries.lock().insert(TypeId::of::<T>(), entry);
    }

    /// Pure lookup: returns the bound serializer without synthesizing.
    pub fn lookup<T: FieldValue>(&self) -> Option<Arc<dyn Serializer<T>>> {
        self.entries
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(Entry::get::<T>)
    }

    /// Returns the serializer for `T`, synthesizing and caching one from the
    /// fallback codec on first use.
    ///
    /// `None` means the type has no serializer. Callers treat that as a skip,
    /// not an error.
    pub fn resolve<T: FieldValue>(&self) -> Option<Arc<dyn Serializer<T>>> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&TypeId::of::<T>()) {
            return entry.get::<T>();
        }

        let codec = self.fallback?;
        let serializer = T::structured(codec)?;
        debug!(
            value_type = std::any::type_name::<T>(),
            ?codec,
            "serializer synthesized from fallback"
        );
        entries.insert(
            TypeId::of::<T>(),
            Entry::new(Arc::clone(&serializer), SerializerOrigin::Synthesized),
        );
        Some(serializer)
    }

    /// How the entry for `T` was created, if it exists.
    pub fn origin<T: FieldValue>(&self) -> Option<SerializerOrigin> {
        self.entries
            .lock()
            .get(&TypeId::of::<T>())
            .map(|entry| entry.origin)
    }

    /// Type names with a bound serializer, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.lock().values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    /// Number of bound serializers.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no serializer is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("types", &self.type_names())
            .field("fallback", &self.fallback)
            .finish()
    }
}
