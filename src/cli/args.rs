use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "prompthub",
    version,
    about = "Organize, search and export a personal library of AI prompts"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the prompt library (overrides config)
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Directory where exported archives are saved (overrides config)
    #[clap(long, value_parser)]
    pub export_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the prompthub application
    #[clap(subcommand)]
    pub command: Commands,
}
