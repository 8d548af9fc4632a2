//! Whole-table JSON image, rewritten on every save.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::warn;

use crate::game::types::Player;
use crate::storage::errors::StoreError;
use crate::storage::PlayerBackend;

pub struct SnapshotBackend {
    path: PathBuf,
}

impl SnapshotBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Move an unparseable image out of the way so the next save cannot
    /// overwrite whatever is left in it. Failing to move it fails the load.
    fn quarantine(&self) -> Result<PathBuf, StoreError> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        let mut aside = self.path.clone().into_os_string();
        aside.push(format!(".corrupt-{stamp}"));
        let aside = PathBuf::from(aside);
        fs::rename(&self.path, &aside)?;
        Ok(aside)
    }
}

impl PlayerBackend for SnapshotBackend {
    fn load_all(&self) -> Result<Vec<Player>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<BTreeMap<String, Player>>(&content) {
            Ok(table) => Ok(table.into_values().collect()),
            Err(e) => {
                let aside = self.quarantine()?;
                warn!(
                    "Player image {} is unreadable ({}); moved to {} and starting empty",
                    self.path.display(),
                    e,
                    aside.display()
                );
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, table: &BTreeMap<String, Player>, _changed: &[&Player]) -> Result<(), StoreError> {
        let content = serde_json::to_vec(table)?;
        write_file_locked(&self.path, &content)
    }

    fn describe(&self) -> String {
        format!("snapshot {}", self.path.display())
    }
}

/// Replace `path` with `content`: exclusive lock, write a temp file in the
/// same directory, fsync, rename over the target, fsync the directory.
fn write_file_locked(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let lock_path = dir.join(format!(
        ".{}.lock",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("players.json")
    ));
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;
    lock_file.lock_exclusive()?;

    let base = path.file_name().and_then(|s| s.to_str()).unwrap_or("players.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content)?;
                tmp.flush()?;
                tmp.sync_all()?;
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e.into()),
        }
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    let _ = FileExt::unlock(&lock_file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::CharacterClass;
    use chrono::Utc;
    use tempfile::TempDir;

    fn table_of(players: &[Player]) -> BTreeMap<String, Player> {
        players.iter().map(|p| (p.name.clone(), p.clone())).collect()
    }

    #[test]
    fn missing_image_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let backend = SnapshotBackend::new(dir.path().join("players.json"));
        assert!(backend.load_all().expect("load").is_empty());
    }

    #[test]
    fn persist_then_reload() {
        let dir = TempDir::new().expect("tempdir");
        let backend = SnapshotBackend::new(dir.path().join("nested").join("players.json"));
        let mut alice = Player::new("alice", CharacterClass::Mage, Utc::now());
        alice.gold = 321;
        let bob = Player::new("bob", CharacterClass::Rogue, Utc::now());
        backend.persist(&table_of(&[alice.clone(), bob]), &[&alice]).expect("persist");

        let loaded = backend.load_all().expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.iter().find(|p| p.name == "alice"), Some(&alice));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = TempDir::new().expect("tempdir");
        let backend = SnapshotBackend::new(dir.path().join("players.json"));
        let alice = Player::new("alice", CharacterClass::Warrior, Utc::now());
        for _ in 0..3 {
            backend.persist(&table_of(&[alice.clone()]), &[&alice]).expect("persist");
        }
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn corrupt_image_is_moved_aside() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("players.json");
        fs::write(&path, "{ not json").expect("write");
        let backend = SnapshotBackend::new(&path);
        assert!(backend.load_all().expect("load").is_empty());
        assert!(!path.exists());
        let moved = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with("players.json.corrupt-"));
        assert!(moved);
    }
}
