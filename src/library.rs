//! The application state: the prompt and category collections and the store
//! they are persisted to.
//!
//! Every mutation goes through one of the named operations below, each of which
//! validates first and then writes the whole affected collection back.
use log::{debug, error, info, warn};

use crate::{
    default_categories, sample_prompts, visible, with_counts, Category, CategoryCounts,
    CategoryFilter, KeyValueStore, LibraryStorage, Prompt, PromptDraft, PromptError, Result,
};

/// Owns the prompt and category collections.
pub struct PromptLibrary<S: KeyValueStore> {
    storage: LibraryStorage<S>,
    prompts: Vec<Prompt>,
    categories: Vec<Category>,
}

impl<S: KeyValueStore> PromptLibrary<S> {
    /// Loads both collections from the store.
    ///
    /// Missing keys fall back to the default categories and, when
    /// `seed_samples` is set, the sample prompts. Seeded data is written back
    /// immediately.
    pub fn load(storage: LibraryStorage<S>, seed_samples: bool) -> Result<Self> {
        let mut library = Self {
            prompts: Vec::new(),
            categories: Vec::new(),
            storage,
        };

        match library.storage.load_categories()? {
            Some(stored) => {
                library.categories = stored.categories;
                if stored.upgraded {
                    // Bare names get generated ids; store them so ids stay stable
                    debug!("Writing back categories upgraded from bare names");
                    library.persist_categories()?;
                }
            }
            None => {
                debug!("No stored categories, using defaults");
                library.categories = default_categories();
                library.persist_categories()?;
            }
        }

        match library.storage.load_prompts()? {
            Some(prompts) => library.prompts = prompts,
            None if seed_samples => {
                debug!("No stored prompts, seeding samples");
                library.prompts = sample_prompts();
                library.persist_prompts()?;
            }
            None => {}
        }

        info!(
            "Library ready with {} prompts in {} categories",
            library.prompts.len(),
            library.categories.len()
        );
        Ok(library)
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    /// Categories with counts derived from the current prompts
    pub fn categories(&self) -> CategoryCounts {
        with_counts(&self.categories, &self.prompts)
    }

    pub fn get_prompt(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// Prompts passing the category filter and query, in insertion order
    pub fn search(&self, filter: &CategoryFilter, query: &str) -> Vec<&Prompt> {
        visible(&self.prompts, filter, query)
    }

    /// Validates a draft and appends it as a new prompt
    pub fn create_prompt(&mut self, draft: PromptDraft) -> Result<Prompt> {
        let draft = self.check_draft(draft)?;
        let prompt = Prompt::new(draft);
        info!("Creating prompt {} ({})", prompt.id, prompt.title);

        self.prompts.push(prompt.clone());
        if let Err(e) = self.persist_prompts() {
            self.prompts.pop();
            return Err(e);
        }

        Ok(prompt)
    }

    /// Validates a draft and applies it to an existing prompt in place
    pub fn update_prompt(&mut self, id: &str, draft: PromptDraft) -> Result<Prompt> {
        let draft = self.check_draft(draft)?;
        let index = self.index_of(id)?;
        info!("Updating prompt {}", id);

        let original = self.prompts[index].clone();
        self.prompts[index].apply(draft);
        if let Err(e) = self.persist_prompts() {
            self.prompts[index] = original;
            return Err(e);
        }

        Ok(self.prompts[index].clone())
    }

    /// Removes a prompt permanently
    pub fn delete_prompt(&mut self, id: &str) -> Result<Prompt> {
        let index = self.index_of(id)?;
        info!("Deleting prompt {}", id);

        let removed = self.prompts.remove(index);
        if let Err(e) = self.persist_prompts() {
            self.prompts.insert(index, removed);
            return Err(e);
        }

        Ok(removed)
    }

    /// Adds a category; names are trimmed and must be unique (case-sensitive)
    pub fn add_category(&mut self, name: &str, color: Option<String>) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PromptError::validation("Please enter a category name"));
        }
        if self.categories.iter().any(|c| c.name == name) {
            return Err(PromptError::DuplicateCategory {
                name: name.to_string(),
            });
        }

        let category = Category::new(name.to_string(), color);
        info!("Adding category {}", category.name);

        self.categories.push(category.clone());
        if let Err(e) = self.persist_categories() {
            self.categories.pop();
            return Err(e);
        }

        Ok(category)
    }

    /// Removes a category, refusing while any prompt still references it
    pub fn remove_category(&mut self, name: &str) -> Result<Category> {
        let index = self
            .categories
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| PromptError::CategoryNotFound {
                name: name.to_string(),
            })?;

        let count = self.prompts.iter().filter(|p| p.category == name).count();
        if count > 0 {
            return Err(PromptError::CategoryInUse {
                name: name.to_string(),
                count,
            });
        }

        info!("Removing category {}", name);
        let removed = self.categories.remove(index);
        if let Err(e) = self.persist_categories() {
            self.categories.insert(index, removed);
            return Err(e);
        }

        Ok(removed)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PromptError::PromptNotFound { id: id.to_string() })
    }

    fn check_draft(&self, draft: PromptDraft) -> Result<PromptDraft> {
        let draft = draft.validate()?;
        if !self.categories.iter().any(|c| c.name == draft.category) {
            return Err(PromptError::validation(format!(
                "Unknown category: {}",
                draft.category
            )));
        }
        Ok(draft)
    }

    fn persist_prompts(&mut self) -> Result<()> {
        self.storage.save_prompts(&self.prompts).map_err(|e| {
            error!("Failed to persist prompts: {}", e);
            e
        })?;

        // The prompts are saved; a stale count cache is recomputed on next load anyway
        if let Err(e) = self.persist_categories() {
            warn!("Failed to refresh stored category counts: {}", e);
        }
        Ok(())
    }

    fn persist_categories(&mut self) -> Result<()> {
        // Stored counts are only a cache, refresh them on every write
        let counted = with_counts(&self.categories, &self.prompts).categories;
        self.storage.save_categories(&counted).map_err(|e| {
            error!("Failed to persist categories: {}", e);
            e
        })
    }

    pub fn storage(&self) -> &LibraryStorage<S> {
        &self.storage
    }
}
