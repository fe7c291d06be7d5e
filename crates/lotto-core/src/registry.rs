//! Remembered recipient groups.
//!
//! Only group ids are stored. Users and rooms are never persisted, and a legacy
//! `rooms` section found in an old document is dropped on load.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{domain::RecipientId, utils::iso_timestamp_utc, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    #[serde(default)]
    pub remember_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub updated_at: String,
}

/// Persisted document: `{ "settings": {...}, "groups": { id: {...} } }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDoc {
    #[serde(default)]
    pub settings: RegistrySettings,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupEntry>,
    /// Read for migration only; never written back.
    #[serde(default, rename = "rooms", skip_serializing)]
    pub legacy_rooms: Option<serde_json::Value>,
}

/// Backing store for the registry document.
pub trait RegistryStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<RegistryDoc>>;
    fn save(&self, doc: &RegistryDoc) -> Result<()>;
}

/// JSON file store.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Option<RegistryDoc>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let txt = fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&txt)?))
    }

    fn save(&self, doc: &RegistryDoc) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let txt = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, txt)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Recipient registry service.
///
/// Reads never fail: a missing or unreadable store behaves as an empty registry
/// with recall disabled. Writes are best-effort; on failure the in-memory state
/// keeps the change and the error is logged.
pub struct RecipientRegistry {
    store: Arc<dyn RegistryStore>,
    state: Mutex<RegistryDoc>,
}

impl RecipientRegistry {
    pub fn load(store: Arc<dyn RegistryStore>) -> Self {
        let (mut doc, loaded) = match store.load() {
            Ok(Some(doc)) => (doc, true),
            Ok(None) => (RegistryDoc::default(), false),
            Err(e) => {
                warn!(error = %e, "failed to read recipient registry; starting empty");
                (RegistryDoc::default(), false)
            }
        };

        let registry_needs_rewrite = loaded && doc.legacy_rooms.take().is_some();
        if registry_needs_rewrite {
            info!("dropping legacy rooms from recipient registry");
            if let Err(e) = store.save(&doc) {
                warn!(error = %e, "failed to rewrite recipient registry");
            }
        }

        info!(
            groups = doc.groups.len(),
            remember_enabled = doc.settings.remember_enabled,
            "recipient registry loaded"
        );

        Self {
            store,
            state: Mutex::new(doc),
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.settings.remember_enabled
    }

    pub async fn set_enabled(&self, enabled: bool) {
        let mut doc = self.state.lock().await;
        doc.settings.remember_enabled = enabled;
        self.persist(&doc);
    }

    /// Flip `remember_enabled`, returning the new value.
    pub async fn toggle(&self) -> bool {
        let mut doc = self.state.lock().await;
        doc.settings.remember_enabled = !doc.settings.remember_enabled;
        self.persist(&doc);
        doc.settings.remember_enabled
    }

    /// Record (or refresh) a group. No-op while recall is disabled.
    ///
    /// Without a `name` the previous name is kept, or the id is used for a new
    /// entry. Returns whether the entry was written.
    pub async fn upsert(&self, group_id: &str, name: Option<&str>) -> bool {
        let group_id = group_id.trim();
        if group_id.is_empty() {
            return false;
        }

        let mut doc = self.state.lock().await;
        if !doc.settings.remember_enabled {
            return false;
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| doc.groups.get(group_id).map(|g| g.name.clone()))
            .unwrap_or_else(|| group_id.to_string());

        doc.groups.insert(
            group_id.to_string(),
            GroupEntry {
                name,
                updated_at: iso_timestamp_utc(),
            },
        );
        self.persist(&doc);
        true
    }

    /// Every remembered group id except `exclude`.
    pub async fn list_recipients(&self, exclude: Option<&str>) -> Vec<RecipientId> {
        let doc = self.state.lock().await;
        doc.groups
            .keys()
            .filter(|id| Some(id.as_str()) != exclude)
            .map(|id| RecipientId(id.clone()))
            .collect()
    }

    pub async fn group_name(&self, group_id: &str) -> Option<String> {
        let doc = self.state.lock().await;
        doc.groups.get(group_id).map(|g| g.name.clone())
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.groups.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.groups.is_empty()
    }

    fn persist(&self, doc: &RegistryDoc) {
        if let Err(e) = self.store.save(doc) {
            warn!(error = %e, "failed to persist recipient registry");
        }
    }
}

/// In-memory store (tests, or running without a writable disk).
#[derive(Default)]
pub struct MemoryStore {
    doc: std::sync::Mutex<Option<RegistryDoc>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn with_doc(doc: RegistryDoc) -> Self {
        Self {
            doc: std::sync::Mutex::new(Some(doc)),
            fail_writes: false,
        }
    }

    /// A store whose writes always fail.
    pub fn read_only(doc: Option<RegistryDoc>) -> Self {
        Self {
            doc: std::sync::Mutex::new(doc),
            fail_writes: true,
        }
    }

    pub fn snapshot(&self) -> Option<RegistryDoc> {
        self.doc.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<Option<RegistryDoc>> {
        Ok(self.snapshot())
    }

    fn save(&self, doc: &RegistryDoc) -> Result<()> {
        if self.fail_writes {
            return Err(crate::Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "store is read-only",
            )));
        }
        if let Ok(mut guard) = self.doc.lock() {
            *guard = Some(doc.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}/recipients.json"))
    }

    fn enabled_doc(groups: &[&str]) -> RegistryDoc {
        let mut doc = RegistryDoc::default();
        doc.settings.remember_enabled = true;
        for g in groups {
            doc.groups.insert(
                g.to_string(),
                GroupEntry {
                    name: format!("name-{g}"),
                    updated_at: "2024-01-01T00:00:00+00:00".to_string(),
                },
            );
        }
        doc
    }

    #[tokio::test]
    async fn disabled_registry_ignores_upserts() {
        let store = Arc::new(MemoryStore::default());
        let reg = RecipientRegistry::load(store.clone());

        assert!(!reg.is_enabled().await);
        assert!(!reg.upsert("C1", Some("Group one")).await);
        assert!(reg.is_empty().await);
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn enabled_registry_upserts_and_persists() {
        let store = Arc::new(MemoryStore::default());
        let reg = RecipientRegistry::load(store.clone());

        assert!(reg.toggle().await);
        assert!(reg.upsert("C1", Some("Group one")).await);
        assert!(reg.upsert("C1", None).await);
        assert_eq!(reg.group_name("C1").await.as_deref(), Some("Group one"));

        assert!(reg.upsert("C2", None).await);
        assert_eq!(reg.group_name("C2").await.as_deref(), Some("C2"));

        let saved = store.snapshot().unwrap();
        assert!(saved.settings.remember_enabled);
        assert_eq!(saved.groups.len(), 2);
    }

    #[tokio::test]
    async fn list_excludes_origin_group() {
        let store = Arc::new(MemoryStore::with_doc(enabled_doc(&["C1", "C2", "C3"])));
        let reg = RecipientRegistry::load(store);

        let all = reg.list_recipients(None).await;
        assert_eq!(all.len(), 3);

        let others = reg.list_recipients(Some("C2")).await;
        assert_eq!(
            others,
            vec![RecipientId("C1".to_string()), RecipientId("C3".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_writes_keep_in_memory_state() {
        let store = Arc::new(MemoryStore::read_only(None));
        let reg = RecipientRegistry::load(store.clone());

        reg.set_enabled(true).await;
        assert!(reg.upsert("C9", Some("Nine")).await);
        assert!(reg.is_enabled().await);
        assert_eq!(reg.len().await, 1);
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn legacy_rooms_are_dropped_and_never_rewritten() {
        let path = tmp_file("lotto-registry-legacy");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{
              "settings": {"remember_enabled": true},
              "groups": {"C1": {"name": "One", "updated_at": "2024-01-01T00:00:00+00:00"}},
              "rooms": {"R1": {"name": "Room", "updated_at": "2024-01-01T00:00:00+00:00"}}
            }"#,
        )
        .unwrap();

        let reg = RecipientRegistry::load(Arc::new(JsonFileStore::new(&path)));
        assert_eq!(reg.list_recipients(None).await, vec![RecipientId("C1".to_string())]);

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(!rewritten.contains("rooms"));
        assert!(rewritten.contains("C1"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_behaves_as_empty_disabled_registry() {
        let path = tmp_file("lotto-registry-corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let reg = RecipientRegistry::load(Arc::new(JsonFileStore::new(&path)));
        assert!(!reg.is_enabled().await);
        assert!(reg.is_empty().await);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn file_store_round_trips_settings_and_groups() {
        let path = tmp_file("lotto-registry-save");
        let store = Arc::new(JsonFileStore::new(&path));
        let reg = RecipientRegistry::load(store.clone());
        reg.set_enabled(true).await;
        reg.upsert("C1", Some("กลุ่มหวย")).await;

        let reloaded = RecipientRegistry::load(store);
        assert!(reloaded.is_enabled().await);
        assert_eq!(reloaded.group_name("C1").await.as_deref(), Some("กลุ่มหวย"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
