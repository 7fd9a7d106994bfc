//! Player persistence hook.
//!
//! Sessions load a player's record once, right after authentication, and
//! save it once, while terminating. Nothing else touches the store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tavern_protocol::{PlayerId, RoomId};
use tokio::sync::Mutex;

/// The record exchanged with a [`PlayerStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    pub player_id: PlayerId,
    /// Application-defined profile data. Opaque to Tavern.
    #[serde(default)]
    pub profile: Value,
    /// The room the player was in when their last session ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_room: Option<RoomId>,
}

impl PlayerData {
    /// A fresh record for a player the store has never seen.
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            profile: Value::Null,
            last_room: None,
        }
    }
}

/// Errors reported by a [`PlayerStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("player store failed: {0}")]
    Backend(String),
}

/// Loads and saves player records.
pub trait PlayerStore: Send + Sync + 'static {
    /// Loads the record for `player_id`. `Ok(None)` means the player is new.
    fn load(
        &self,
        player_id: &PlayerId,
    ) -> impl std::future::Future<Output = Result<Option<PlayerData>, StoreError>> + Send;

    /// Saves `data`, replacing any previous record for the same player.
    fn save(
        &self,
        data: PlayerData,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// A [`PlayerStore`] that keeps records in memory for the life of the
/// process.
#[derive(Debug, Default)]
pub struct MemoryPlayerStore {
    players: Mutex<HashMap<PlayerId, PlayerData>>,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.players.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.lock().await.is_empty()
    }
}

impl PlayerStore for MemoryPlayerStore {
    async fn load(&self, player_id: &PlayerId) -> Result<Option<PlayerData>, StoreError> {
        Ok(self.players.lock().await.get(player_id).cloned())
    }

    async fn save(&self, data: PlayerData) -> Result<(), StoreError> {
        self.players
            .lock()
            .await
            .insert(data.player_id.clone(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_load_unknown_returns_none() {
        let store = MemoryPlayerStore::new();
        assert!(store.load(&PlayerId::new("ghost")).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_save_then_load() {
        let store = MemoryPlayerStore::new();
        let mut data = PlayerData::new(PlayerId::new("alice"));
        data.last_room = Some(RoomId::new("lobby"));
        store.save(data.clone()).await.unwrap();

        assert_eq!(store.load(&PlayerId::new("alice")).await.unwrap(), Some(data));
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_player_data_json_shape() {
        let data = PlayerData::new(PlayerId::new("bob"));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json, serde_json::json!({ "playerId": "bob", "profile": null }));
    }
}
