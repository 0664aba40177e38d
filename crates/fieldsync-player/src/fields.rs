//! Accessors for the synchronized player attributes.

use crate::state::{Inventory, Location, PlayerState, MAX_FOOD};
use fieldsync_core::{FieldAccessor, SyncError, SyncResult};

pub const HEALTH: &str = "health";
pub const FOOD: &str = "food";
pub const LEVEL: &str = "level";
pub const EXPERIENCE: &str = "experience";
pub const LOCATION: &str = "location";
pub const INVENTORY: &str = "inventory";

fn rejected(identifier: &str, message: String) -> SyncError {
    SyncError::Accessor {
        identifier: identifier.to_string(),
        message,
    }
}

pub struct HealthField;

impl FieldAccessor<PlayerState> for HealthField {
    type Value = f64;

    fn identifier(&self) -> &str {
        HEALTH
    }

    fn read(&self, player: &PlayerState) -> SyncResult<f64> {
        Ok(player.health)
    }

    fn write(&self, player: &mut PlayerState, value: f64) -> SyncResult<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(rejected(HEALTH, format!("invalid health {value}")));
        }
        player.health = value;
        Ok(())
    }
}

/// Hunger, clamped to `0..=MAX_FOOD` on write.
pub struct FoodField;

impl FieldAccessor<PlayerState> for FoodField {
    type Value = i32;

    fn identifier(&self) -> &str {
        FOOD
    }

    fn read(&self, player: &PlayerState) -> SyncResult<i32> {
        Ok(player.food)
    }

    fn write(&self, player: &mut PlayerState, value: i32) -> SyncResult<()> {
        player.food = value.clamp(0, MAX_FOOD);
        Ok(())
    }
}

pub struct LevelField;

impl FieldAccessor<PlayerState> for LevelField {
    type Value = i32;

    fn identifier(&self) -> &str {
        LEVEL
    }

    fn read(&self, player: &PlayerState) -> SyncResult<i32> {
        Ok(player.level)
    }

    fn write(&self, player: &mut PlayerState, value: i32) -> SyncResult<()> {
        if value < 0 {
            return Err(rejected(LEVEL, format!("negative level {value}")));
        }
        player.level = value;
        Ok(())
    }
}

pub struct ExperienceField;

impl FieldAccessor<PlayerState> for ExperienceField {
    type Value = f32;

    fn identifier(&self) -> &str {
        EXPERIENCE
    }

    fn read(&self, player: &PlayerState) -> SyncResult<f32> {
        Ok(player.experience)
    }

    fn write(&self, player: &mut PlayerState, value: f32) -> SyncResult<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(rejected(
                EXPERIENCE,
                format!("experience progress {value} outside 0..=1"),
            ));
        }
        player.experience = value;
        Ok(())
    }
}

pub struct LocationField;

impl FieldAccessor<PlayerState> for LocationField {
    type Value = Location;

    fn identifier(&self) -> &str {
        LOCATION
    }

    fn read(&self, player: &PlayerState) -> SyncResult<Location> {
        Ok(player.location.clone())
    }

    fn write(&self, player: &mut PlayerState, value: Location) -> SyncResult<()> {
        player.location = value;
        Ok(())
    }
}

/// Replaces slot contents. A stored inventory smaller than the live one
/// leaves the remaining live slots empty; extra stored slots are dropped.
pub struct InventoryField;

impl FieldAccessor<PlayerState> for InventoryField {
    type Value = Inventory;

    fn identifier(&self) -> &str {
        INVENTORY
    }

    fn read(&self, player: &PlayerState) -> SyncResult<Inventory> {
        Ok(player.inventory.clone())
    }

    fn write(&self, player: &mut PlayerState, value: Inventory) -> SyncResult<()> {
        let size = player.inventory.size();
        let mut slots = value.slots().to_vec();
        slots.resize(size, None);
        player.inventory = Inventory::from_slots(slots);
        Ok(())
    }
}
