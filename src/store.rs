//! Bounded conversation history and the key-value boundary beneath it.
//!
//! [`ConversationStore`] keeps at most `capacity` conversations, most recently
//! updated first, and mirrors the whole sequence into a [`KeyValueStore`] under
//! [`CONVERSATIONS_KEY`] after every mutation. The theme preference lives next
//! to it under [`THEME_KEY`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::observability::{STORE_EVICTIONS, STORE_MALFORMED_LOADS, STORE_PERSIST_ERRORS};
use crate::types::{Conversation, Theme};

/// Key holding the JSON array of conversations.
pub const CONVERSATIONS_KEY: &str = "conversations";

/// Key holding the theme preference.
pub const THEME_KEY: &str = "theme";

/// Number of conversations kept by default.
pub const DEFAULT_CAPACITY: usize = 10;

///////////////////////////////////////// KeyValueStore ////////////////////////////////////

/// A string-to-string persistence boundary.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value; `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes a value. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile key-value store.
///
/// Clones share the same map, so a test can keep a handle and inspect what a
/// session persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values().remove(key);
        Ok(())
    }
}

/// Key-value store backed by one file per key in a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|err| Error::io(format!("failed to create {}", dir.display()), err))?;
        Ok(Self { dir })
    }

    /// The directory holding the values.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::validation(
                format!("invalid store key {key:?}"),
                Some("key".to_string()),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(format!("failed to read {}", path.display()), err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value)
            .map_err(|err| Error::io(format!("failed to write {}", temp_path.display()), err))?;
        fs::rename(&temp_path, &path)
            .map_err(|err| Error::io(format!("failed to replace {}", path.display()), err))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(format!("failed to remove {}", path.display()), err)),
        }
    }
}

///////////////////////////////////////// Theme ////////////////////////////////////////////

/// Reads the theme preference, defaulting to light when absent or unreadable.
pub fn load_theme(kv: &dyn KeyValueStore) -> Theme {
    match kv.get(THEME_KEY) {
        Ok(Some(value)) => value.parse::<Theme>().unwrap_or_else(|err: String| {
            debug!(key = THEME_KEY, error = %err, "ignoring malformed theme preference");
            STORE_MALFORMED_LOADS.click();
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(err) => {
            debug!(key = THEME_KEY, error = %err, "could not read theme preference");
            Theme::default()
        }
    }
}

/// Persists the theme preference.
pub fn save_theme(kv: &dyn KeyValueStore, theme: Theme) -> Result<()> {
    kv.set(THEME_KEY, theme.as_str()).inspect_err(|_| {
        STORE_PERSIST_ERRORS.click();
    })
}

///////////////////////////////////////// ConversationStore ////////////////////////////////

/// Most-recently-updated-first collection of conversations.
///
/// Every mutation updates the in-memory sequence first and then persists it.
/// A persistence failure is returned to the caller, but the in-memory state
/// has already changed and stays authoritative.
pub struct ConversationStore {
    kv: Arc<dyn KeyValueStore>,
    conversations: Vec<Conversation>,
    capacity: usize,
}

impl ConversationStore {
    /// Loads the persisted history with the default capacity.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(kv, DEFAULT_CAPACITY)
    }

    /// Loads the persisted history, keeping at most `capacity` entries.
    ///
    /// Absent, malformed, or foreign-schema values yield an empty history.
    pub fn with_capacity(kv: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut conversations = match read_conversations(kv.as_ref()) {
            Ok(conversations) => conversations,
            Err(err) => {
                debug!(error = %err, "discarding unreadable conversation history");
                STORE_MALFORMED_LOADS.click();
                Vec::new()
            }
        };
        let mut seen = HashSet::new();
        conversations.retain(|conversation| seen.insert(conversation.id.clone()));
        conversations.truncate(capacity);
        Self {
            kv,
            conversations,
            capacity,
        }
    }

    /// Maximum number of conversations kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Conversations, most recently updated first.
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Number of stored conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Looks a conversation up by id.
    pub fn find(&self, id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == id)
    }

    /// Inserts or replaces `conversation` at the front, evicting from the tail.
    pub fn upsert(&mut self, conversation: Conversation) -> Result<()> {
        self.conversations
            .retain(|existing| existing.id != conversation.id);
        self.conversations.insert(0, conversation);
        if self.conversations.len() > self.capacity {
            let evicted = self.conversations.split_off(self.capacity);
            for conversation in &evicted {
                debug!(id = %conversation.id, title = %conversation.title, "evicting conversation");
            }
            STORE_EVICTIONS.count(evicted.len() as u64);
        }
        self.persist()
    }

    /// Removes a conversation; absent ids are ignored.
    ///
    /// Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.conversations.len();
        self.conversations.retain(|conversation| conversation.id != id);
        if self.conversations.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Forgets every conversation.
    pub fn clear(&mut self) -> Result<()> {
        self.conversations.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let result = serde_json::to_string(&self.conversations)
            .map_err(Error::from)
            .and_then(|json| self.kv.set(CONVERSATIONS_KEY, &json));
        if result.is_err() {
            STORE_PERSIST_ERRORS.click();
        }
        result
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("conversations", &self.conversations)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

fn read_conversations(kv: &dyn KeyValueStore) -> Result<Vec<Conversation>> {
    let Some(json) = kv.get(CONVERSATIONS_KEY)? else {
        return Ok(Vec::new());
    };
    serde_json::from_str(&json).map_err(|err| {
        Error::malformed_state(
            CONVERSATIONS_KEY,
            format!("conversation history is not a list of conversations: {err}"),
            Some(Box::new(err)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, key: &str, _: &str) -> Result<()> {
            Err(Error::io(
                format!("cannot write {key}"),
                io::Error::other("disk full"),
            ))
        }

        fn remove(&self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn titled(title: &str) -> Conversation {
        let mut conversation = Conversation::new();
        conversation.title = title.to_string();
        conversation
    }

    fn store() -> (MemoryStore, ConversationStore) {
        let kv = MemoryStore::new();
        let store = ConversationStore::load(Arc::new(kv.clone()));
        (kv, store)
    }

    #[test]
    fn upsert_inserts_at_front_and_persists() {
        let (kv, mut store) = store();
        store.upsert(titled("a")).unwrap();
        store.upsert(titled("b")).unwrap();
        let titles: Vec<_> = store.list().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);

        let persisted: Vec<Conversation> =
            serde_json::from_str(&kv.get(CONVERSATIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, store.list());
    }

    #[test]
    fn upsert_existing_moves_to_front_without_duplicating() {
        let (_, mut store) = store();
        let mut first = titled("first");
        store.upsert(first.clone()).unwrap();
        store.upsert(titled("second")).unwrap();
        first.push_exchange("hi", "hello");
        store.upsert(first.clone()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[0], first);
    }

    #[test]
    fn eleventh_conversation_evicts_the_oldest() {
        let (_, mut store) = store();
        let oldest = titled("0");
        store.upsert(oldest.clone()).unwrap();
        for i in 1..=10 {
            store.upsert(titled(&i.to_string())).unwrap();
        }
        assert_eq!(store.len(), DEFAULT_CAPACITY);
        assert!(store.find(&oldest.id).is_none());
        assert_eq!(store.list()[0].title, "10");
        assert_eq!(store.list()[9].title, "1");
    }

    #[test]
    fn custom_capacity_is_honored() {
        let kv = Arc::new(MemoryStore::new());
        let mut store = ConversationStore::with_capacity(kv, 2);
        for i in 0..5 {
            store.upsert(titled(&i.to_string())).unwrap();
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_absent_is_a_no_op() {
        let (_, mut store) = store();
        store.upsert(titled("a")).unwrap();
        assert!(!store.delete("missing").unwrap());
        assert_eq!(store.len(), 1);
        let id = store.list()[0].id.clone();
        assert!(store.delete(&id).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_persists_empty_list() {
        let (kv, mut store) = store();
        store.upsert(titled("a")).unwrap();
        store.clear().unwrap();
        assert_eq!(kv.get(CONVERSATIONS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn reload_restores_order() {
        let (kv, mut store) = store();
        store.upsert(titled("a")).unwrap();
        store.upsert(titled("b")).unwrap();
        let reloaded = ConversationStore::load(Arc::new(kv));
        assert_eq!(reloaded.list(), store.list());
    }

    #[test]
    fn malformed_history_loads_empty() {
        for bad in ["not json", r#"{"a":1}"#, r#"[{"id":1}]"#, r#"[{"title":"x"}]"#] {
            let kv = MemoryStore::new();
            kv.set(CONVERSATIONS_KEY, bad).unwrap();
            let store = ConversationStore::load(Arc::new(kv));
            assert!(store.is_empty(), "{bad}");
        }
    }

    #[test]
    fn oversized_or_duplicated_history_is_normalized() {
        let kv = MemoryStore::new();
        let repeated = titled("dup");
        let mut conversations = vec![repeated.clone(), repeated];
        conversations.extend((0..12).map(|i| titled(&i.to_string())));
        kv.set(
            CONVERSATIONS_KEY,
            &serde_json::to_string(&conversations).unwrap(),
        )
        .unwrap();
        let store = ConversationStore::load(Arc::new(kv));
        assert_eq!(store.len(), DEFAULT_CAPACITY);
        assert_eq!(store.list()[0].title, "dup");
        assert_eq!(store.list()[1].title, "0");
    }

    #[test]
    fn persist_failure_keeps_memory_state() {
        let mut store = ConversationStore::load(Arc::new(FailingStore));
        let err = store.upsert(titled("a")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn theme_defaults_to_light() {
        let kv = MemoryStore::new();
        assert_eq!(load_theme(&kv), Theme::Light);
        kv.set(THEME_KEY, "purple").unwrap();
        assert_eq!(load_theme(&kv), Theme::Light);
        save_theme(&kv, Theme::Dark).unwrap();
        assert_eq!(load_theme(&kv), Theme::Dark);
    }

    #[test]
    fn file_store_round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileStore::open(dir.path().join("nested")).unwrap();
        assert_eq!(kv.get(THEME_KEY).unwrap(), None);
        kv.set(THEME_KEY, "dark").unwrap();
        kv.set(THEME_KEY, "light").unwrap();
        assert_eq!(kv.get(THEME_KEY).unwrap().as_deref(), Some("light"));
        assert!(!kv.dir().join("theme.json.tmp").exists());
        kv.remove(THEME_KEY).unwrap();
        kv.remove(THEME_KEY).unwrap();
        assert_eq!(kv.get(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileStore::open(dir.path()).unwrap();
        assert!(kv.set("../escape", "x").unwrap_err().is_validation());
    }

    #[test]
    fn conversation_store_over_files_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut store = ConversationStore::load(kv.clone());
        store.upsert(titled("kept")).unwrap();
        let reopened = ConversationStore::load(kv);
        assert_eq!(reopened.list()[0].title, "kept");
    }
}
