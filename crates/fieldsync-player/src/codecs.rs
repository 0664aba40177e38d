//! Codecs for player value types.

use crate::state::{Inventory, ItemStack, Location};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fieldsync_core::{SerializationError, Serializer};
use std::any::type_name;

const LOCATION_SEPARATOR: char = ':';

/// `world:x:y:z:yaw:pitch`. The world name may itself contain `:`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationSerializer;

impl Serializer<Location> for LocationSerializer {
    fn serialize(&self, value: &Location) -> Result<String, SerializationError> {
        if value.world.is_empty() {
            return Err(SerializationError::encode(
                type_name::<Location>(),
                "world name is empty",
            ));
        }
        Ok(format!(
            "{world}{sep}{x}{sep}{y}{sep}{z}{sep}{yaw}{sep}{pitch}",
            world = value.world,
            sep = LOCATION_SEPARATOR,
            x = value.x,
            y = value.y,
            z = value.z,
            yaw = value.yaw,
            pitch = value.pitch,
        ))
    }

    fn deserialize(&self, data: &str) -> Result<Location, SerializationError> {
        let fail = |message: String| SerializationError::decode(type_name::<Location>(), message);

        let mut parts = data.rsplitn(6, LOCATION_SEPARATOR);
        let mut next = |name: &str| {
            parts
                .next()
                .ok_or_else(|| fail(format!("missing {name} in {data:?}")))
        };
        let pitch = next("pitch")?;
        let yaw = next("yaw")?;
        let z = next("z")?;
        let y = next("y")?;
        let x = next("x")?;
        let world = next("world")?;
        if world.is_empty() {
            return Err(fail(format!("missing world in {data:?}")));
        }

        let coord = |name: &str, raw: &str| {
            raw.parse::<f64>()
                .map_err(|e| fail(format!("bad {name} {raw:?}: {e}")))
        };
        let angle = |name: &str, raw: &str| {
            raw.parse::<f32>()
                .map_err(|e| fail(format!("bad {name} {raw:?}: {e}")))
        };

        Ok(Location {
            world: world.to_string(),
            x: coord("x", x)?,
            y: coord("y", y)?,
            z: coord("z", z)?,
            yaw: angle("yaw", yaw)?,
            pitch: angle("pitch", pitch)?,
        })
    }
}

/// Base64 of a big-endian `u32` slot count followed by the JSON slot list.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventorySerializer;

impl Serializer<Inventory> for InventorySerializer {
    fn serialize(&self, value: &Inventory) -> Result<String, SerializationError> {
        let fail = |message: String| SerializationError::encode(type_name::<Inventory>(), message);

        let size = u32::try_from(value.size())
            .map_err(|_| fail(format!("{} slots do not fit the size prefix", value.size())))?;
        let mut payload = size.to_be_bytes().to_vec();
        serde_json::to_writer(&mut payload, value.slots()).map_err(|e| fail(e.to_string()))?;
        Ok(STANDARD.encode(payload))
    }

    fn deserialize(&self, data: &str) -> Result<Inventory, SerializationError> {
        let fail = |message: String| SerializationError::decode(type_name::<Inventory>(), message);

        let payload = STANDARD
            .decode(data.trim())
            .map_err(|e| fail(format!("invalid base64: {e}")))?;
        if payload.len() < 4 {
            return Err(fail(format!("payload of {} bytes has no size", payload.len())));
        }
        let (prefix, body) = payload.split_at(4);
        let size = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        let slots: Vec<Option<ItemStack>> =
            serde_json::from_slice(body).map_err(|e| fail(e.to_string()))?;
        if slots.len() != size {
            return Err(fail(format!(
                "size prefix says {size} slots, found {}",
                slots.len()
            )));
        }
        Ok(Inventory::from_slots(slots))
    }
}
