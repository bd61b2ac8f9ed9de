//! Error types for the prompthub application.
//!
//! This module defines custom error types that categorize the different failures
//! that can occur while managing and exporting prompts.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::ExportStatus;

/// The main error type for the prompthub application.
#[derive(Error, Debug)]
pub enum PromptError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to zip operations.
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// A required field was missing or invalid when saving.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// A category with the same name already exists.
    #[error("Category already exists: {name}")]
    DuplicateCategory { name: String },

    /// Prompt was not found when performing an operation.
    #[error("Prompt not found: {id}")]
    PromptNotFound { id: String },

    /// Category was not found when performing an operation.
    #[error("Category not found: {name}")]
    CategoryNotFound { name: String },

    /// Category still has prompts referencing it.
    #[error("Category {name} is used by {count} prompt(s)")]
    CategoryInUse { name: String, count: usize },

    /// Export requested with an empty prompt collection.
    #[error("No prompts to export")]
    EmptyExport,

    /// The archive codec failed to produce a blob.
    #[error("Archive generation failed: {message}")]
    ArchiveGeneration { message: String },

    /// Handing the finished archive to its destination failed.
    #[error("Download failed: {message}")]
    Download { message: String },

    /// The export tracker was driven through an illegal state change.
    #[error("Invalid export transition from {from:?} to {to:?}")]
    InvalidTransition { from: ExportStatus, to: ExportStatus },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    Directory { path: PathBuf },

    /// file not found
    #[error("File not found: {file_path}")]
    FileNotFound { file_path: String },

    #[error("{message}")]
    Editor { message: String },
}

impl PromptError {
    /// Short notice suitable for showing to the user in place of a toast.
    pub fn user_message(&self) -> String {
        match self {
            PromptError::Validation { message } => message.clone(),
            PromptError::DuplicateCategory { .. } => "Category already exists".to_string(),
            PromptError::PromptNotFound { id } => format!("No prompt with id {}", id),
            PromptError::CategoryNotFound { name } => format!("No category named {}", name),
            PromptError::CategoryInUse { name, count } => format!(
                "Category \"{}\" still holds {} prompt{}",
                name,
                count,
                if *count == 1 { "" } else { "s" }
            ),
            PromptError::EmptyExport => "No prompts to export".to_string(),
            PromptError::ArchiveGeneration { .. }
            | PromptError::Download { .. }
            | PromptError::ZipError(_)
            | PromptError::InvalidTransition { .. } => {
                "Export failed. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        PromptError::Validation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_failures_share_generic_notice() {
        let codec = PromptError::ArchiveGeneration {
            message: "disk full".to_string(),
        };
        let download = PromptError::Download {
            message: "permission denied".to_string(),
        };

        assert_eq!(codec.user_message(), "Export failed. Please try again.");
        assert_eq!(download.user_message(), codec.user_message());
    }

    #[test]
    fn in_use_notice_pluralizes() {
        let one = PromptError::CategoryInUse {
            name: "Coding".to_string(),
            count: 1,
        };
        let many = PromptError::CategoryInUse {
            name: "Coding".to_string(),
            count: 3,
        };

        assert_eq!(one.user_message(), "Category \"Coding\" still holds 1 prompt");
        assert_eq!(many.user_message(), "Category \"Coding\" still holds 3 prompts");
    }
}
