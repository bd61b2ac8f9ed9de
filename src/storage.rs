use std::{
    collections::{HashMap, HashSet},
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, error, info, trace, warn};
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::{Category, Prompt, PromptError, Result, DEFAULT_CATEGORY_COLOR};

/// Key holding the prompt collection
pub const PROMPTS_KEY: &str = "prompts";

/// Key holding the category collection
pub const CATEGORIES_KEY: &str = "categories";

/// A string-keyed persistent store with synchronous get/set.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` if the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store, mostly useful for tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`, replacing files atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the store, making sure the directory exists
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            debug!("Data directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create data directory: {}", e);
                PromptError::Directory { path: dir.clone() }
            })?;
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            trace!("No file for key {}", key);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            PromptError::Io(e)
        })?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        debug!("Writing key {} to {}", key, path.display());

        // Create a temporary file in the same directory (for atomic operation)
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            PromptError::Io(e)
        })?;

        temp_file.write_all(value.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            PromptError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            PromptError::Io(e)
        })?;

        temp_file.persist(&path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            PromptError::Io(e.error)
        })?;

        Ok(())
    }
}

/// Categories may be persisted as full records or as bare names.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCategory {
    Record(Category),
    Name(String),
}

impl From<StoredCategory> for Category {
    fn from(stored: StoredCategory) -> Self {
        match stored {
            StoredCategory::Record(category) => category,
            StoredCategory::Name(name) => {
                Category::new(name, Some(DEFAULT_CATEGORY_COLOR.to_string()))
            }
        }
    }
}

/// Categories read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCategories {
    pub categories: Vec<Category>,
    /// Set when any entry was a bare name and got a freshly generated record
    pub upgraded: bool,
}

/// Serializes the prompt and category collections into a key-value store.
///
/// Every write overwrites the whole collection under its key.
pub struct LibraryStorage<S: KeyValueStore> {
    store: S,
    key_prefix: String,
}

impl<S: KeyValueStore> LibraryStorage<S> {
    pub fn new(store: S, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }

    /// Loads the prompt collection, `None` if it was never saved
    pub fn load_prompts(&self) -> Result<Option<Vec<Prompt>>> {
        let Some(raw) = self.store.get(&self.key(PROMPTS_KEY))? else {
            return Ok(None);
        };

        let prompts: Vec<Prompt> = serde_json::from_str(&raw).map_err(|e| {
            error!("Failed to parse stored prompts: {}", e);
            PromptError::Serialization(e)
        })?;

        // The first record stored under an id wins; later duplicates are dropped
        let mut seen = HashSet::new();
        let valid: Vec<Prompt> = prompts
            .into_iter()
            .filter(|p| {
                if p.id.is_empty() {
                    warn!("Skipping stored prompt with an empty ID: {}", p.title);
                    false
                } else if !seen.insert(p.id.clone()) {
                    warn!("Skipping stored prompt with duplicate ID {}: {}", p.id, p.title);
                    false
                } else {
                    true
                }
            })
            .collect();

        info!("Loaded {} prompts", valid.len());
        Ok(Some(valid))
    }

    /// Loads the category collection, `None` if it was never saved
    pub fn load_categories(&self) -> Result<Option<StoredCategories>> {
        let Some(raw) = self.store.get(&self.key(CATEGORIES_KEY))? else {
            return Ok(None);
        };

        let stored: Vec<StoredCategory> = serde_json::from_str(&raw).map_err(|e| {
            error!("Failed to parse stored categories: {}", e);
            PromptError::Serialization(e)
        })?;

        let upgraded = stored
            .iter()
            .any(|entry| matches!(entry, StoredCategory::Name(_)));
        let categories: Vec<Category> = stored.into_iter().map(Category::from).collect();
        info!("Loaded {} categories", categories.len());
        Ok(Some(StoredCategories {
            categories,
            upgraded,
        }))
    }

    pub fn save_prompts(&mut self, prompts: &[Prompt]) -> Result<()> {
        trace!("Serializing {} prompts", prompts.len());
        let json = serde_json::to_string(prompts)?;
        let key = self.key(PROMPTS_KEY);
        self.store.set(&key, &json)
    }

    pub fn save_categories(&mut self, categories: &[Category]) -> Result<()> {
        trace!("Serializing {} categories", categories.len());
        let json = serde_json::to_string(categories)?;
        let key = self.key(CATEGORIES_KEY);
        self.store.set(&key, &json)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_prompts;

    #[test]
    fn file_store_round_trips_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("data")).unwrap();

        assert_eq!(store.get("prompthub_prompts").unwrap(), None);

        store.set("prompthub_prompts", "[1]").unwrap();
        store.set("prompthub_prompts", "[2]").unwrap();

        assert_eq!(
            store.get("prompthub_prompts").unwrap().as_deref(),
            Some("[2]")
        );
        assert!(dir.path().join("data/prompthub_prompts.json").exists());
    }

    #[test]
    fn prompts_saved_under_prefixed_key() {
        let prompts = sample_prompts();
        let mut storage = LibraryStorage::new(MemoryStore::new(), "prompthub_");
        storage.save_prompts(&prompts).unwrap();

        assert!(storage.store().get("prompthub_prompts").unwrap().is_some());
        assert!(storage.store().get("prompts").unwrap().is_none());
        assert_eq!(storage.load_prompts().unwrap().unwrap(), prompts);
    }

    #[test]
    fn bare_category_names_are_upgraded() {
        let mut store = MemoryStore::new();
        store
            .set("prompthub_categories", r#"["General","Writing"]"#)
            .unwrap();
        let storage = LibraryStorage::new(store, "prompthub_");

        let loaded = storage.load_categories().unwrap().unwrap();
        assert!(loaded.upgraded);
        let categories = loaded.categories;
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["General", "Writing"]);
        assert!(categories.iter().all(|c| c.color == DEFAULT_CATEGORY_COLOR));
        assert_ne!(categories[0].id, categories[1].id);
    }

    #[test]
    fn full_category_records_load_without_count() {
        let mut store = MemoryStore::new();
        store
            .set(
                "prompthub_categories",
                r##"[{"id":"9","name":"Ops","color":"#000000"}]"##,
            )
            .unwrap();
        let storage = LibraryStorage::new(store, "prompthub_");

        let loaded = storage.load_categories().unwrap().unwrap();
        assert!(!loaded.upgraded);
        let categories = loaded.categories;
        assert_eq!(categories[0].id, "9");
        assert_eq!(categories[0].prompt_count, 0);
    }

    #[test]
    fn duplicate_prompt_ids_keep_first_record() {
        let mut prompts = sample_prompts();
        prompts[1].id = prompts[0].id.clone();
        let mut storage = LibraryStorage::new(MemoryStore::new(), "prompthub_");
        storage.save_prompts(&prompts).unwrap();

        let loaded = storage.load_prompts().unwrap().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], prompts[0]);
        assert_eq!(loaded[1], prompts[2]);
    }

    #[test]
    fn corrupt_prompts_are_a_serialization_error() {
        let mut store = MemoryStore::new();
        store.set("prompthub_prompts", "{not json").unwrap();
        let storage = LibraryStorage::new(store, "prompthub_");

        assert!(matches!(
            storage.load_prompts(),
            Err(PromptError::Serialization(_))
        ));
    }
}
