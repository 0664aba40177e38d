//! Online player lookup.

use crate::state::PlayerState;
use fieldsync_core::{EntityId, LiveEntities};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Players currently connected to this process.
#[derive(Default)]
pub struct PlayerDirectory {
    players: RwLock<HashMap<EntityId, PlayerState>>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an online player.
    pub fn join(&self, id: EntityId, player: PlayerState) {
        self.players.write().insert(id, player);
    }

    /// Removes a player, returning its last state.
    pub fn leave(&self, id: &EntityId) -> Option<PlayerState> {
        self.players.write().remove(id)
    }

    /// Snapshot of one player's state.
    pub fn get(&self, id: &EntityId) -> Option<PlayerState> {
        self.players.read().get(id).cloned()
    }

    /// Runs `f` on a player, if online.
    pub fn update<R>(&self, id: &EntityId, f: impl FnOnce(&mut PlayerState) -> R) -> Option<R> {
        self.players.write().get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }
}

impl LiveEntities<PlayerState> for PlayerDirectory {
    fn inspect(&self, id: &EntityId, f: &mut dyn FnMut(&PlayerState)) -> bool {
        match self.players.read().get(id) {
            Some(player) => {
                f(player);
                true
            }
            None => false,
        }
    }

    fn modify(&self, id: &EntityId, f: &mut dyn FnMut(&mut PlayerState)) -> bool {
        match self.players.write().get_mut(id) {
            Some(player) => {
                f(player);
                true
            }
            None => false,
        }
    }
}
