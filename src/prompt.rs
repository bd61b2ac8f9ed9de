//! Core data structures for the prompthub application.
//!
//! This module contains the prompt and category records, the validated draft
//! used when saving, and the built-in defaults a fresh library starts with.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{parse_tags, PromptError, Result};

/// Color given to categories created without one
pub const DEFAULT_CATEGORY_COLOR: &str = "#6366F1";

/// Represents a single prompt in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Unique identifier for the prompt
    pub id: String,
    /// Prompt title
    pub title: String,
    /// Prompt body text
    pub content: String,
    /// Name of the category this prompt belongs to
    pub category: String,
    /// Tags for organization, in the order they were entered
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the prompt was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Creates a new prompt from a validated draft with a fresh id
    pub fn new(draft: PromptDraft) -> Self {
        let now = Utc::now();

        Prompt {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            content: draft.content,
            category: draft.category,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a validated draft in place, keeping identity and creation time
    pub fn apply(&mut self, draft: PromptDraft) {
        self.title = draft.title;
        self.content = draft.content;
        self.category = draft.category;
        self.tags = draft.tags;
        // Clock skew must never push updated_at behind created_at
        self.updated_at = Utc::now().max(self.created_at);
    }

    /// Field values as a draft, used to seed edits
    pub fn to_draft(&self) -> PromptDraft {
        PromptDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// A named grouping label for prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique identifier for the category
    pub id: String,
    /// Display name, unique and case-sensitive
    pub name: String,
    /// Display color
    #[serde(default = "default_color")]
    pub color: String,
    /// Cached count of prompts in this category, recomputed on every read
    #[serde(default)]
    pub prompt_count: usize,
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

impl Category {
    pub fn new(name: String, color: Option<String>) -> Self {
        Category {
            id: Uuid::new_v4().to_string(),
            name,
            color: color.unwrap_or_else(default_color),
            prompt_count: 0,
        }
    }
}

/// User-supplied prompt fields awaiting validation before save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl PromptDraft {
    /// Builds a draft from raw form input; tags are a comma-separated list
    pub fn from_input(
        title: &str,
        content: &str,
        category: &str,
        tags: Option<String>,
    ) -> Self {
        PromptDraft {
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            tags: parse_tags(tags),
        }
    }

    /// Trims the text fields and rejects the draft if any required field is empty.
    ///
    /// Tags are kept as entered apart from dropping blank entries; duplicates
    /// are not removed.
    pub fn validate(self) -> Result<PromptDraft> {
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();
        let category = self.category.trim().to_string();

        if title.is_empty() || content.is_empty() || category.is_empty() {
            return Err(PromptError::validation("Please fill in all required fields"));
        }

        let tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(PromptDraft {
            title,
            content,
            category,
            tags,
        })
    }
}

/// The categories a brand-new library starts with
pub fn default_categories() -> Vec<Category> {
    [
        ("1", "General", "#6366F1"),
        ("2", "Writing", "#F59E0B"),
        ("3", "Coding", "#10B981"),
        ("4", "Marketing", "#EF4444"),
    ]
    .into_iter()
    .map(|(id, name, color)| Category {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        prompt_count: 0,
    })
    .collect()
}

/// Example prompts seeded into an empty library
pub fn sample_prompts() -> Vec<Prompt> {
    let now = Utc::now();
    let sample = |id: &str, title: &str, category: &str, tags: &[&str], content: &str| Prompt {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at: now,
        updated_at: now,
    };

    vec![
        sample(
            "1",
            "Creative Writing Assistant",
            "Writing",
            &["creative", "storytelling", "fiction"],
            "You are a creative writing assistant. Help me develop compelling characters, \
             engaging plots, and vivid descriptions for my stories. Focus on creating \
             emotional depth and narrative tension.",
        ),
        sample(
            "2",
            "Code Review Expert",
            "Coding",
            &["code-review", "best-practices", "optimization"],
            "Review the following code for best practices, potential bugs, performance \
             issues, and suggest improvements. Provide specific recommendations with \
             explanations.",
        ),
        sample(
            "3",
            "Marketing Copy Generator",
            "Marketing",
            &["marketing", "copywriting", "persuasive"],
            "Create compelling marketing copy that converts. Focus on benefits over \
             features, use emotional triggers, and include clear calls-to-action. \
             Target audience: [specify audience].",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_keeps_duplicate_tags_and_drops_blank_ones() {
        let draft = PromptDraft::from_input(
            "Code Review!",
            "Look for bugs",
            "Coding",
            Some("a, b, b, ,".to_string()),
        )
        .validate()
        .unwrap();

        assert_eq!(draft.tags, vec!["a", "b", "b"]);
    }

    #[test]
    fn draft_requires_title_content_and_category() {
        for (title, content, category) in [
            ("", "body", "Coding"),
            ("Title", "   ", "Coding"),
            ("Title", "body", ""),
        ] {
            let err = PromptDraft::from_input(title, content, category, None)
                .validate()
                .unwrap_err();
            assert!(matches!(err, PromptError::Validation { .. }));
        }
    }

    #[test]
    fn apply_preserves_identity() {
        let mut prompt = Prompt::new(
            PromptDraft::from_input("Old", "old body", "General", None)
                .validate()
                .unwrap(),
        );
        let id = prompt.id.clone();
        let created = prompt.created_at;

        prompt.apply(
            PromptDraft::from_input("New", "new body", "Coding", Some("x".to_string()))
                .validate()
                .unwrap(),
        );

        assert_eq!(prompt.id, id);
        assert_eq!(prompt.created_at, created);
        assert!(prompt.updated_at >= prompt.created_at);
        assert_eq!(prompt.title, "New");
        assert_eq!(prompt.tags, vec!["x"]);
    }

    #[test]
    fn prompt_json_uses_camel_case_fields() {
        let prompt = sample_prompts().remove(0);
        let json = serde_json::to_value(&prompt).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn samples_reference_default_categories() {
        let names: Vec<String> = default_categories().into_iter().map(|c| c.name).collect();
        assert!(sample_prompts()
            .iter()
            .all(|p| names.contains(&p.category)));
    }
}
