//! Reference fields for a game player.
//!
//! Provides a live [`PlayerState`], a [`PlayerDirectory`] of online players,
//! accessors for the commonly synchronized attributes, and codecs for the
//! two value types the JSON fallback does not cover.
//!
//! ```ignore
//! let registry = Arc::new(SerializerRegistry::with_fallback(FallbackCodec::Json));
//! register_serializers(&registry);
//! let engine = SyncEngine::new(Arc::new(standard_fields()?), registry, factory, directory);
//! ```

mod codecs;
mod directory;
mod fields;
mod state;

pub use codecs::{InventorySerializer, LocationSerializer};
pub use directory::PlayerDirectory;
pub use fields::{
    ExperienceField, FoodField, HealthField, InventoryField, LevelField, LocationField,
    EXPERIENCE, FOOD, HEALTH, INVENTORY, LEVEL, LOCATION,
};
pub use state::{Inventory, ItemStack, Location, PlayerState, MAX_FOOD};

use fieldsync_core::{FieldSet, SerializerRegistry, SyncResult};

/// All reference fields, in the order they are read and written.
pub fn standard_fields() -> SyncResult<FieldSet<PlayerState>> {
    FieldSet::new()
        .with(HealthField)?
        .with(FoodField)?
        .with(LevelField)?
        .with(ExperienceField)?
        .with(LocationField)?
        .with(InventoryField)
}

/// Registers the codecs for [`Location`] and [`Inventory`].
pub fn register_serializers(registry: &SerializerRegistry) {
    registry.register::<Location, _>(LocationSerializer);
    registry.register::<Inventory, _>(InventorySerializer);
}
