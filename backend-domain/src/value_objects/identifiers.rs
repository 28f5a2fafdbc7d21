// Identifier value objects

use serde::{Deserialize, Serialize};

/// Composite key for the entity being profiled: a player within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub owner: String,
    pub player_id: String,
}

impl EntityKey {
    pub fn new(owner: &str, player_id: &str) -> Self {
        Self {
            owner: owner.to_string(),
            player_id: player_id.to_string(),
        }
    }

    /// Partition-key form used by the persisted layout.
    pub fn storage_key(&self) -> String {
        format!("{}#{}", self.owner, self.player_id)
    }
}
