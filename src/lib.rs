//! Prompt library manager
//!
//! This library provides functionality for storing, categorizing, searching and
//! exporting a personal collection of AI prompts.

mod cli;
mod config;
mod errors;
mod export;
mod filter;
mod helper;
mod library;
mod prompt;
mod storage;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use export::*;
pub use filter::*;
pub use helper::*;
pub use library::*;
pub use prompt::*;
pub use storage::*;
pub use types::*;
