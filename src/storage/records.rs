//! One sled record per player, so a save costs one record instead of the
//! whole table.

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;

use crate::game::types::Player;
use crate::storage::errors::StoreError;
use crate::storage::PlayerBackend;

const TREE_PLAYERS: &str = "players";

pub struct RecordsBackend {
    _db: sled::Db,
    players: sled::Tree,
}

impl RecordsBackend {
    /// Open (or create) the record store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        Ok(Self { _db: db, players })
    }

    fn player_key(name: &str) -> Vec<u8> {
        format!("players:{}", name).into_bytes()
    }
}

impl PlayerBackend for RecordsBackend {
    fn load_all(&self) -> Result<Vec<Player>, StoreError> {
        let mut players = Vec::new();
        for entry in self.players.iter() {
            let (key, bytes) = entry?;
            match bincode::deserialize::<Player>(&bytes) {
                Ok(player) => players.push(player),
                Err(e) => warn!(
                    "Skipping unreadable player record {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ),
            }
        }
        Ok(players)
    }

    /// Both records of a PvP go in one batch, so neither lands without the other.
    fn persist(&self, _table: &BTreeMap<String, Player>, changed: &[&Player]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for player in changed {
            batch.insert(Self::player_key(&player.name), bincode::serialize(*player)?);
        }
        self.players.apply_batch(batch)?;
        self.players.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("records ({} players on disk)", self.players.len())
    }
}
