//! Shared types for the prompthub application.
//!
//! This module contains the crate-wide `Result` alias, the export layout
//! choice, and the clap subcommands the CLI dispatches on.
use std::{fmt, path::PathBuf, str::FromStr};

use clap::{Args, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::PromptError;

/// A specialized Result type for prompthub operations.
pub type Result<T> = std::result::Result<T, PromptError>;

/// How exported files are arranged inside the archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExportLayout {
    /// Every file in a single `prompts/` folder
    #[default]
    Flat,
    /// One folder per category
    ByCategory,
}

impl fmt::Display for ExportLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportLayout::Flat => write!(f, "flat"),
            ExportLayout::ByCategory => write!(f, "by-category"),
        }
    }
}

impl FromStr for ExportLayout {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "flat" => Ok(ExportLayout::Flat),
            "by-category" | "category" => Ok(ExportLayout::ByCategory),
            other => Err(PromptError::Config {
                message: format!("Unknown export layout: {}", other),
            }),
        }
    }
}

/// Options for listing and searching prompts
#[derive(Args, Debug, Clone)]
pub struct ListPromptsOptions {
    /// Only show prompts in this category ("all" shows every category)
    #[clap(short = 'C', long)]
    pub category: Option<String>,

    /// Case-insensitive text to look for in title, content and tags
    #[clap(short, long)]
    pub query: Option<String>,

    /// Limit the number of prompts returned (0 means no limit)
    #[clap(short = 'n', long, default_value_t = 0)]
    pub limit: usize,

    /// Format output as JSON
    #[clap(short, long)]
    pub json: bool,

    /// Only show prompt IDs and titles
    #[clap(short, long)]
    pub brief: bool,
}

/// Fields accepted when creating or editing a prompt
#[derive(Args, Debug, Clone)]
pub struct EditPromptOptions {
    /// ID of the prompt to edit
    pub id: String,

    /// New title for the prompt
    #[clap(short = 'T', long)]
    pub title: Option<String>,

    /// New category for the prompt
    #[clap(short = 'C', long)]
    pub category: Option<String>,

    /// New content for the prompt
    #[clap(short, long)]
    pub content: Option<String>,

    /// Replacement tags (comma-separated)
    #[clap(short = 't', long)]
    pub tags: Option<String>,

    /// Path to a file containing the new prompt content
    #[clap(short, long)]
    pub file: Option<PathBuf>,

    /// Open content in editor before saving
    #[clap(short, long)]
    pub edit: bool,
}

/// Category sub-operations
#[derive(Subcommand, Debug, Clone)]
pub enum CategoryAction {
    /// Add a new category
    Add {
        /// Name of the category
        name: String,

        /// Display color, e.g. #10B981
        #[clap(long)]
        color: Option<String>,
    },

    /// Remove a category that no prompt uses
    Remove {
        /// Name of the category
        name: String,
    },
}

/// Available subcommands for the prompthub application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new prompt
    Create {
        /// Title of the prompt
        #[clap(short = 'T', long)]
        title: String,

        /// Category the prompt belongs to
        #[clap(short = 'C', long)]
        category: String,

        /// Content of the prompt
        #[clap(short, long)]
        content: Option<String>,

        /// Open content in editor before saving
        #[clap(short, long)]
        edit: bool,

        /// Tags to associate with the prompt (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Path to a file containing the prompt's content
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// View a prompt by ID
    View {
        /// ID of the prompt to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List prompts with optional category and text filters
    List(ListPromptsOptions),

    /// Edit an existing prompt
    Edit(EditPromptOptions),

    /// Delete a prompt by ID
    Delete {
        /// ID of the prompt to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Show categories with their prompt counts
    Categories,

    /// Category management
    Category {
        #[clap(subcommand)]
        action: CategoryAction,
    },

    /// Export all prompts to a zip archive
    Export {
        /// Directory where the archive will be saved (default uses config setting)
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Folder layout inside the archive
        #[clap(short, long, value_enum)]
        layout: Option<ExportLayout>,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a configuration setting (key=value)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_parses_and_displays() {
        assert_eq!("flat".parse::<ExportLayout>().unwrap(), ExportLayout::Flat);
        assert_eq!(
            "by-category".parse::<ExportLayout>().unwrap(),
            ExportLayout::ByCategory
        );
        assert_eq!(ExportLayout::ByCategory.to_string(), "by-category");
        assert!("nested".parse::<ExportLayout>().is_err());
    }
}
