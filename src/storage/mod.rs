use crate::models::{Show, Snapshot, Video};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_SLOT_KEY: &str = "kflix_v3_store";

/// Durable string storage addressed by slot name.
pub trait SlotStorage {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileSlotStorage {
    dir: PathBuf,
}

impl FileSlotStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SlotStorage for FileSlotStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading slot {}", path.display()))?;
        Ok(Some(content))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating storage dir {}", self.dir.display()))?;

        // Write then rename so a crash never leaves a half-written slot
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

/// In-process slots. `fail_writes` makes every write error, like a full quota.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStorage {
    slots: HashMap<String, String>,
    pub fail_writes: bool,
}

impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("storage quota exceeded writing {}", key);
        }
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stored form before defaults are applied; either collection may be absent.
#[derive(Debug, Deserialize)]
struct StoredSnapshot {
    videos: Option<Vec<Video>>,
    shows: Option<Vec<Show>>,
}

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Parse a stored snapshot. Missing collections come from the seed and
/// missing entity fields take their documented defaults; stored values are
/// kept exactly as written.
pub fn decode_snapshot(raw: &str) -> Result<Snapshot> {
    let stored: StoredSnapshot = serde_json::from_str(raw).context("stored catalog is not valid")?;
    let seed = Snapshot::seed();

    Ok(Snapshot {
        videos: stored.videos.unwrap_or(seed.videos),
        shows: stored.shows.unwrap_or(seed.shows),
    })
}

/// Best-effort write. Failures are logged and reported as `false`, never raised.
#[instrument(skip(storage, snapshot))]
pub fn save_snapshot(storage: &mut dyn SlotStorage, key: &str, snapshot: &Snapshot) -> bool {
    let result = encode_snapshot(snapshot).and_then(|raw| storage.write(key, &raw));
    match result {
        Ok(()) => {
            debug!(
                "Saved catalog: {} videos, {} shows",
                snapshot.videos.len(),
                snapshot.shows.len()
            );
            true
        }
        Err(e) => {
            warn!("Failed to persist catalog, keeping in-memory state: {:#}", e);
            false
        }
    }
}

/// Load the catalog from `key`, seeding (and persisting the seed) when the
/// slot is empty or holds something unreadable.
#[instrument(skip(storage))]
pub fn load_snapshot(storage: &mut dyn SlotStorage, key: &str) -> Snapshot {
    match storage.read(key) {
        Ok(Some(raw)) => match decode_snapshot(&raw) {
            Ok(snapshot) => {
                info!(
                    "Loaded catalog: {} videos, {} shows",
                    snapshot.videos.len(),
                    snapshot.shows.len()
                );
                snapshot
            }
            Err(e) => {
                warn!("Stored catalog is corrupt ({:#}), falling back to seed", e);
                let backup_key = format!("{}.corrupt-{}", key, Utc::now().format("%Y%m%dT%H%M%S%3fZ"));
                if let Err(e) = storage.write(&backup_key, &raw) {
                    warn!("Could not back up corrupt catalog: {:#}", e);
                } else {
                    info!("Corrupt catalog preserved in slot {}", backup_key);
                }
                seed_into(storage, key)
            }
        },
        Ok(None) => {
            info!("No stored catalog found, seeding slot {}", key);
            seed_into(storage, key)
        }
        Err(e) => {
            // Unreadable is not the same as absent; leave whatever is there alone
            warn!("Failed to read catalog ({:#}), using seed for this session", e);
            Snapshot::seed()
        }
    }
}

fn seed_into(storage: &mut dyn SlotStorage, key: &str) -> Snapshot {
    let seed = Snapshot::seed();
    save_snapshot(storage, key, &seed);
    seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Episode, Season, VideoDraft};

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::seed();
        snapshot.videos.push(Video::admin_upload(
            "abc123",
            VideoDraft {
                title: "Fancam".to_string(),
                description: "Stage mix".to_string(),
                category: "Trending".to_string(),
                tags: vec!["live".to_string()],
                thumbnail: Some("data:image/png;base64,AAAA".to_string()),
            },
        ));
        snapshot.videos.push(Video::new("plain0001"));
        snapshot.shows[0].seasons[0].episodes.push(Episode::new("abc123"));
        snapshot.shows[0].seasons.push(Season::empty(2));
        snapshot
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let snapshot = sample();
        let raw = encode_snapshot(&snapshot).unwrap();
        assert_eq!(decode_snapshot(&raw).unwrap(), snapshot);
    }

    #[test]
    fn test_load_after_save_reproduces_snapshot() {
        let mut storage = MemorySlotStorage::new();
        let snapshot = sample();
        assert!(save_snapshot(&mut storage, DEFAULT_SLOT_KEY, &snapshot));
        assert_eq!(load_snapshot(&mut storage, DEFAULT_SLOT_KEY), snapshot);
    }

    #[test]
    fn test_missing_slot_seeds_and_persists() {
        let mut storage = MemorySlotStorage::new();
        let loaded = load_snapshot(&mut storage, DEFAULT_SLOT_KEY);
        assert_eq!(loaded, Snapshot::seed());

        let stored = storage.read(DEFAULT_SLOT_KEY).unwrap().expect("seed persisted");
        assert_eq!(decode_snapshot(&stored).unwrap(), Snapshot::seed());
    }

    #[test]
    fn test_corrupt_slot_is_backed_up_and_reseeded() {
        let mut storage = MemorySlotStorage::new();
        storage.write(DEFAULT_SLOT_KEY, "{not json").unwrap();

        let loaded = load_snapshot(&mut storage, DEFAULT_SLOT_KEY);
        assert_eq!(loaded, Snapshot::seed());

        let stored = storage.read(DEFAULT_SLOT_KEY).unwrap().unwrap();
        assert_eq!(decode_snapshot(&stored).unwrap(), Snapshot::seed());

        let backup: Vec<&str> = storage
            .keys()
            .filter(|k| k.starts_with("kflix_v3_store.corrupt-"))
            .collect();
        assert_eq!(backup.len(), 1);
        assert_eq!(storage.read(backup[0]).unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_partial_snapshot_takes_defaults() {
        let raw = r#"{
            "videos": [{"id": "abc123"}],
            "shows": [{"id": "s1", "title": "Show", "seasons": [
                {"seasonNumber": 2},
                {"seasonNumber": 1, "episodes": [{"id": "e1", "videoId": "abc123"}]}
            ]}]
        }"#;
        let snapshot = decode_snapshot(raw).unwrap();

        let video = &snapshot.videos[0];
        assert_eq!(video.title, "abc123");
        assert_eq!(video.category, "Uncategorized");
        assert!(video.tags.is_empty());
        assert!(!video.added_by_admin);

        let show = &snapshot.shows[0];
        assert_eq!(show.category, "Uncategorized");
        // Stored order is kept as written
        assert_eq!(show.seasons[0].season_number, 2);
        assert!(show.seasons[0].episodes.is_empty());
        assert_eq!(show.seasons[1].episodes[0].id, "e1");
    }

    #[test]
    fn test_round_trip_keeps_values_verbatim() {
        let mut video = Video::new("vid00001");
        video.title = String::new();
        video.category = " Live ".to_string();

        let mut show = Show::with_seasons("Padded", "", 2, None);
        show.category = " Live ".to_string();
        show.seasons.reverse();

        let snapshot = Snapshot {
            videos: vec![video],
            shows: vec![show],
        };
        let raw = encode_snapshot(&snapshot).unwrap();
        let loaded = decode_snapshot(&raw).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.videos[0].title, "");
        assert_eq!(loaded.shows[0].category, " Live ");
        assert_eq!(loaded.shows[0].seasons[0].season_number, 2);
    }

    #[test]
    fn test_missing_collections_come_from_seed() {
        let snapshot = decode_snapshot(r#"{"videos": [{"id": "abc123"}]}"#).unwrap();
        assert_eq!(snapshot.videos.len(), 1);
        assert_eq!(snapshot.shows, Snapshot::seed().shows);

        let snapshot = decode_snapshot(r#"{"videos": null, "shows": []}"#).unwrap();
        assert!(snapshot.videos.is_empty());
        assert!(snapshot.shows.is_empty());
    }

    #[test]
    fn test_failed_write_is_swallowed() {
        let mut storage = MemorySlotStorage::new();
        storage.fail_writes = true;
        assert!(!save_snapshot(&mut storage, DEFAULT_SLOT_KEY, &sample()));

        // Seeding still returns a usable catalog when the write fails
        assert_eq!(load_snapshot(&mut storage, DEFAULT_SLOT_KEY), Snapshot::seed());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut storage = FileSlotStorage::new(dir.path().join("nested"));

        assert_eq!(storage.read("slot").unwrap(), None);
        storage.write("slot", "{\"videos\":[]}").unwrap();
        assert_eq!(storage.read("slot").unwrap().as_deref(), Some("{\"videos\":[]}"));
        assert!(dir.path().join("nested").join("slot.json").exists());

        let snapshot = sample();
        assert!(save_snapshot(&mut storage, DEFAULT_SLOT_KEY, &snapshot));
        let mut reopened = FileSlotStorage::new(storage.dir().to_path_buf());
        assert_eq!(load_snapshot(&mut reopened, DEFAULT_SLOT_KEY), snapshot);
    }
}
