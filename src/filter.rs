//! Search filtering and derived category counts.
//!
//! Both are pure functions over borrowed collections: nothing here mutates a
//! prompt or caches a result between calls.
use serde::Serialize;

use crate::{Category, Prompt};

/// Sentinel accepted in place of a category name to mean "every category"
pub const ALL_CATEGORIES: &str = "all";

/// Which categories a listing should include
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    /// `None` and the exact string `"all"` select every category
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some(ALL_CATEGORIES) => CategoryFilter::All,
            Some(name) => CategoryFilter::Named(name.to_string()),
        }
    }

    pub fn matches(&self, prompt: &Prompt) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => prompt.category == *name,
        }
    }
}

/// Case-insensitive substring match against title, content and every tag
pub fn matches_query(prompt: &Prompt, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let needle = query.to_lowercase();
    prompt.title.to_lowercase().contains(&needle)
        || prompt.content.to_lowercase().contains(&needle)
        || prompt
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Returns the prompts passing both the category filter and the text query,
/// in their original order.
pub fn visible<'a>(prompts: &'a [Prompt], filter: &CategoryFilter, query: &str) -> Vec<&'a Prompt> {
    prompts
        .iter()
        .filter(|prompt| filter.matches(prompt) && matches_query(prompt, query))
        .collect()
}

/// Categories with freshly derived counts, plus the "All" total
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    /// Number of prompts across every category
    pub all: usize,
    pub categories: Vec<Category>,
}

impl CategoryCounts {
    pub fn count_for(&self, name: &str) -> Option<usize> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.prompt_count)
    }
}

/// Recomputes every category's prompt count from scratch.
///
/// Any `prompt_count` already present on the input is ignored.
pub fn with_counts(categories: &[Category], prompts: &[Prompt]) -> CategoryCounts {
    let categories = categories
        .iter()
        .map(|category| Category {
            prompt_count: prompts
                .iter()
                .filter(|p| p.category == category.name)
                .count(),
            ..category.clone()
        })
        .collect();

    CategoryCounts {
        all: prompts.len(),
        categories,
    }
}
