//! # Storage - player record persistence
//!
//! [`PlayerStore`] owns the in-memory table of every player, loaded once at
//! start, and a [`PlayerBackend`] that makes each mutation durable before the
//! call returns.
//!
//! Command handlers follow one shape:
//!
//! ```rust,no_run
//! # use rpgserver::storage::PlayerStore;
//! # async fn demo(store: &PlayerStore) -> Result<(), rpgserver::storage::StoreError> {
//! let _guard = store.lock("alice").await;   // serialize work on this record
//! let mut alice = store.get("alice")?;       // private copy
//! alice.gold += 10;                          // mutate the copy
//! store.save(alice)?;                        // publish + persist
//! # Ok(()) }
//! ```
//!
//! Two backends ship:
//!
//! - [`SnapshotBackend`]: the whole table as one JSON image, replaced
//!   atomically (lock, temp file, rename) on every save.
//! - [`RecordsBackend`]: one sled record per player; a save writes only the
//!   records that changed.
//!
//! ## Locking
//!
//! The table sits behind a short synchronous mutex held only for a lookup or
//! to publish a finished save. Saves are serialized by a separate writer
//! mutex: a save stages the new table, persists it, and only then publishes,
//! so readers never wait on disk and never see a record that is not durable.
//! The persist itself is blocking IO on the calling task's worker thread.
//!
//! Read-modify-save cycles are serialized per name with
//! [`PlayerStore::lock`]; work that touches two records takes both through
//! [`PlayerStore::lock_pair`], which always acquires in name order.

pub mod errors;
pub mod records;
pub mod snapshot;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::{StorageBackend, StorageConfig};
use crate::game::types::Player;

pub use errors::StoreError;
pub use records::RecordsBackend;
pub use snapshot::SnapshotBackend;

/// Number of idle per-name locks kept before unused ones are pruned.
const LOCK_TABLE_SOFT_LIMIT: usize = 1024;

/// Durable home for the player table.
pub trait PlayerBackend: Send + Sync {
    /// Everything on disk, read once at start.
    fn load_all(&self) -> Result<Vec<Player>, StoreError>;

    /// Make `changed` durable. `table` is the full table with `changed`
    /// already applied, for backends that write the whole image.
    fn persist(&self, table: &BTreeMap<String, Player>, changed: &[&Player]) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}

/// Keeps nothing. Records live for the life of the process.
pub struct MemoryBackend;

impl PlayerBackend for MemoryBackend {
    fn load_all(&self) -> Result<Vec<Player>, StoreError> {
        Ok(Vec::new())
    }

    fn persist(&self, _table: &BTreeMap<String, Player>, _changed: &[&Player]) -> Result<(), StoreError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Held while a record is being read, changed and saved.
pub type RecordGuard = OwnedMutexGuard<()>;

pub struct PlayerStore {
    table: Mutex<BTreeMap<String, Player>>,
    writer: Mutex<()>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    backend: Box<dyn PlayerBackend>,
}

impl PlayerStore {
    /// Open the backend named in `config`.
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let backend: Box<dyn PlayerBackend> = match config.backend {
            StorageBackend::Snapshot => Box::new(SnapshotBackend::new(config.snapshot_path())),
            StorageBackend::Records => Box::new(RecordsBackend::open(config.records_path())?),
            StorageBackend::Memory => Box::new(MemoryBackend),
        };
        Self::with_backend(backend)
    }

    /// Load everything `backend` holds. A load failure is returned rather than
    /// starting empty, since the first save would then replace whatever the
    /// backend could not read.
    pub fn with_backend(backend: Box<dyn PlayerBackend>) -> Result<Self, StoreError> {
        let players = backend.load_all().map_err(|e| {
            warn!("Could not load players from {}: {}", backend.describe(), e);
            e
        })?;
        let table: BTreeMap<String, Player> = players.into_iter().map(|p| (p.name.clone(), p)).collect();
        info!("Loaded {} players from {}", table.len(), backend.describe());
        Ok(Self::from_parts(table, backend))
    }

    pub fn in_memory() -> Self {
        Self::from_parts(BTreeMap::new(), Box::new(MemoryBackend))
    }

    fn from_parts(table: BTreeMap<String, Player>, backend: Box<dyn PlayerBackend>) -> Self {
        Self {
            table: Mutex::new(table),
            writer: Mutex::new(()),
            locks: Mutex::new(HashMap::new()),
            backend,
        }
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<String, Player>> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A private copy of the record.
    pub fn get(&self, name: &str) -> Result<Player, StoreError> {
        self.table()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.table().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Snapshot of every record, in name order.
    pub fn all(&self) -> Vec<Player> {
        self.table().values().cloned().collect()
    }

    /// Upsert and persist.
    pub fn save(&self, player: Player) -> Result<(), StoreError> {
        self.commit(vec![player], false)
    }

    /// Upsert two records with a single persist.
    pub fn save_pair(&self, first: Player, second: Player) -> Result<(), StoreError> {
        self.commit(vec![first, second], false)
    }

    /// Insert a record that must not exist yet.
    pub fn insert_new(&self, player: Player) -> Result<(), StoreError> {
        self.commit(vec![player], true)
    }

    /// Persist `players` on top of the current table, then publish them.
    /// The writer lock keeps images reaching the backend in publish order; the
    /// table lock is only taken to stage and to publish. A failed persist
    /// publishes nothing.
    fn commit(&self, players: Vec<Player>, must_be_new: bool) -> Result<(), StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut staged = {
            let table = self.table();
            if must_be_new {
                if let Some(taken) = players.iter().find(|p| table.contains_key(&p.name)) {
                    return Err(StoreError::AlreadyExists(taken.name.clone()));
                }
            }
            table.clone()
        };
        for p in &players {
            staged.insert(p.name.clone(), p.clone());
        }

        let changed: Vec<&Player> = players.iter().collect();
        if let Err(e) = self.backend.persist(&staged, &changed) {
            warn!("Persist to {} failed: {}", self.backend.describe(), e);
            return Err(e);
        }

        let mut table = self.table();
        for p in players {
            table.insert(p.name.clone(), p);
        }
        Ok(())
    }

    fn record_lock(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.len() > LOCK_TABLE_SOFT_LIMIT {
            // Only this map holds an idle lock; anything else is held or awaited.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Exclusive access to one record's read-modify-save cycle.
    pub async fn lock(&self, name: &str) -> RecordGuard {
        self.record_lock(name).lock_owned().await
    }

    /// Exclusive access to two distinct records, acquired in name order so
    /// overlapping pairs cannot deadlock. Guards come back in argument order.
    /// `a` and `b` must differ; locking one name twice never completes.
    pub async fn lock_pair(&self, a: &str, b: &str) -> (RecordGuard, RecordGuard) {
        debug_assert_ne!(a, b);
        if a < b {
            let first = self.lock(a).await;
            let second = self.lock(b).await;
            (first, second)
        } else {
            let first = self.lock(b).await;
            let second = self.lock(a).await;
            (second, first)
        }
    }
}
