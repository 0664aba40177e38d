//! Live player state.

use fieldsync_core::FieldValue;
use serde::{Deserialize, Serialize};

/// Full hunger bar.
pub const MAX_FOOD: i32 = 20;

/// Position and facing in a named world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new("world", 0.0, 64.0, 0.0)
    }
}

impl FieldValue for Location {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: String,
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ItemStack {
    pub fn new(material: impl Into<String>, amount: u32) -> Self {
        Self {
            material: material.into(),
            amount,
            display_name: None,
        }
    }
}

/// Fixed-size grid of item slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
}

impl Inventory {
    /// Main inventory plus hotbar.
    pub const PLAYER_SIZE: usize = 36;

    pub fn with_size(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    pub fn from_slots(slots: Vec<Option<ItemStack>>) -> Self {
        Self { slots }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn get(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot)?.as_ref()
    }

    /// Puts `item` in `slot`, returning what was there. Out-of-range slots
    /// are ignored.
    pub fn set(&mut self, slot: usize, item: Option<ItemStack>) -> Option<ItemStack> {
        let cell = self.slots.get_mut(slot)?;
        std::mem::replace(cell, item)
    }
}

impl FieldValue for Inventory {}

/// The live attributes of one online player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub name: String,
    pub health: f64,
    pub food: i32,
    pub level: i32,
    /// Progress towards the next level, `0.0..=1.0`.
    pub experience: f32,
    pub location: Location,
    pub inventory: Inventory,
}

impl PlayerState {
    /// A freshly spawned player.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            health: 20.0,
            food: MAX_FOOD,
            level: 0,
            experience: 0.0,
            location: Location::default(),
            inventory: Inventory::with_size(Inventory::PLAYER_SIZE),
        }
    }
}
