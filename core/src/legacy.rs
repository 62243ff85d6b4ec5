use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::models::UserProfile;

/// Key under which older releases kept the JSON-encoded profile.
pub const LEGACY_PROFILE_KEY: &str = "fitlog-user-profile";

/// A flat string key/value store, the shape of browser local storage.
///
/// Holds the legacy profile copy and small UI preferences.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Key/value pairs persisted as one JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(map)?)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("Store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Read the legacy profile copy.
///
/// A missing key is `None`. An unreadable or malformed value is logged and also
/// treated as `None`; it never blocks startup.
pub fn read_legacy_profile(store: &dyn KeyValueStore) -> Option<UserProfile> {
    let raw = match store.get(LEGACY_PROFILE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "could not read legacy profile");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!(error = %e, "ignoring malformed legacy profile");
            None
        }
    }
}

pub fn write_legacy_profile(store: &dyn KeyValueStore, profile: &UserProfile) -> Result<()> {
    let json = serde_json::to_string(profile)?;
    store.set(LEGACY_PROFILE_KEY, &json)
}

pub fn clear_legacy_profile(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(LEGACY_PROFILE_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileDraft;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_json_file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local-storage.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("fitlog-theme").unwrap(), None);
        store.set("fitlog-theme", "dark").unwrap();
        store.set("fitlog-language", "fr").unwrap();
        store.remove("fitlog-language").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("fitlog-theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(reopened.get("fitlog-language").unwrap(), None);
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonFileStore::new(&path).get("anything").is_err());
    }

    #[test]
    fn test_legacy_profile_roundtrip() {
        let store = MemoryStore::new();
        assert!(read_legacy_profile(&store).is_none());

        let profile = UserProfile::from_draft(ProfileDraft {
            name: Some("Lee".to_string()),
            height_cm: Some(165.0),
            ..ProfileDraft::default()
        });
        write_legacy_profile(&store, &profile).unwrap();
        assert_eq!(read_legacy_profile(&store), Some(profile));

        clear_legacy_profile(&store).unwrap();
        assert!(read_legacy_profile(&store).is_none());
    }

    #[test]
    fn test_malformed_legacy_profile_is_ignored() {
        let store = MemoryStore::new();
        store.set(LEGACY_PROFILE_KEY, "{\"id\": 42").unwrap();
        assert!(read_legacy_profile(&store).is_none());
    }
}
