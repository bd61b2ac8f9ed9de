use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use which::which;

use crate::{
    sanitize_filename, ExportLayout, ExportOptions, PromptError, Result, DEFAULT_TIMESTAMP_FORMAT,
};

const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the prompt and category stores
    pub data_dir: PathBuf,

    /// Directory receiving exported archives
    pub export_dir: PathBuf,

    /// Archive names are `<export_base_name>_export_<date>.zip`
    pub export_base_name: String,

    /// Folder arrangement inside exported archives
    pub export_layout: ExportLayout,

    /// chrono format used for timestamps in exported files
    pub timestamp_format: String,

    /// Prepended to every storage key
    pub key_prefix: String,

    /// Whether an empty library starts with the sample prompts
    pub seed_samples: bool,

    /// Default editor command
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        let export_dir = dirs::download_dir().unwrap_or_else(|| data_dir.clone());

        Self {
            data_dir,
            export_dir,
            export_base_name: "prompts".to_string(),
            export_layout: ExportLayout::Flat,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            key_prefix: "prompthub_".to_string(),
            seed_samples: true,
            editor_command: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "prompthub", "prompthub")
}

fn default_data_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prompthub"),
    }
}

/// Location of the config file when `--config` is not given
pub fn default_config_path() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .ok_or_else(|| PromptError::Config {
            message: "Could not determine a configuration directory".to_string(),
        })
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(PromptError::Config {
            message: format!("Expected true or false, got: {}", other),
        }),
    }
}

/// Base names must be a single path segment of file-name-safe characters
fn check_base_name(value: &str) -> Result<()> {
    if value.is_empty() || sanitize_filename(value) != value {
        return Err(PromptError::Config {
            message: format!(
                "export_base_name must be non-empty and use only letters, digits, '-' and '_': {}",
                value
            ),
        });
    }
    Ok(())
}

impl Config {
    /// Reads the config at `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read config {}: {}", path.display(), e);
            PromptError::Io(e)
        })?;

        let config: Config = serde_json::from_str(&raw).map_err(|e| PromptError::Config {
            message: format!("Invalid config file {}: {}", path.display(), e),
        })?;
        check_base_name(&config.export_base_name)?;
        Ok(config)
    }

    /// Writes the config as pretty JSON, replacing any previous file atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            fs::create_dir_all(&parent).map_err(|e| {
                error!("Failed to create config directory: {}", e);
                PromptError::Directory {
                    path: parent.clone(),
                }
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let mut temp_file = NamedTempFile::new_in(&parent)?;
        temp_file.write_all(json.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(path).map_err(|e| {
            error!("Failed to persist config {}: {}", path.display(), e.error);
            PromptError::Io(e.error)
        })?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Applies one `key=value` assignment
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| PromptError::Config {
            message: format!("Expected key=value, got: {}", assignment),
        })?;
        let value = value.trim();

        match key.trim() {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "export_dir" => self.export_dir = PathBuf::from(value),
            "export_base_name" => {
                check_base_name(value)?;
                self.export_base_name = value.to_string();
            }
            "export_layout" => self.export_layout = value.parse()?,
            "timestamp_format" => self.timestamp_format = value.to_string(),
            "key_prefix" => self.key_prefix = value.to_string(),
            "seed_samples" => self.seed_samples = parse_bool(value)?,
            "editor_command" => {
                self.editor_command = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            other => {
                return Err(PromptError::Config {
                    message: format!("Unknown configuration key: {}", other),
                })
            }
        }

        debug!("Set {} = {}", key.trim(), value);
        Ok(())
    }

    /// Export settings derived from this config
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            layout: self.export_layout,
            base_name: self.export_base_name.clone(),
            timestamp_format: self.timestamp_format.clone(),
        }
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.key_prefix, "prompthub_");
        assert_eq!(config.export_base_name, "prompts");
        assert_eq!(config.export_layout, ExportLayout::Flat);
        assert!(config.seed_samples);
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let mut config = Config::default();
        config.set("export_layout=by-category").unwrap();
        config.set("seed_samples=no").unwrap();
        config.set("editor_command=vim -n").unwrap();

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.get_editor_command(), "vim -n");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"export_base_name":"library"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.export_base_name, "library");
        assert_eq!(config.key_prefix, "prompthub_");
        assert_eq!(config.export_options().base_name, "library");
    }

    #[test]
    fn bad_assignments_are_rejected() {
        let mut config = Config::default();

        assert!(matches!(config.set("seed_samples"), Err(PromptError::Config { .. })));
        assert!(config.set("colour=red").is_err());
        assert!(config.set("export_layout=nested").is_err());
        assert!(config.set("export_base_name= ").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn base_name_must_stay_in_export_dir() {
        let mut config = Config::default();

        assert!(config.set("export_base_name=../outside").is_err());
        assert!(config.set("export_base_name=sub/dir").is_err());
        assert!(config.set("export_base_name=my prompts").is_err());
        assert_eq!(config.export_base_name, "prompts");

        config.set("export_base_name=team-library_v2").unwrap();
        assert_eq!(config.export_base_name, "team-library_v2");
    }

    #[test]
    fn hand_edited_unsafe_base_name_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"export_base_name":"../../etc/x"}"#).unwrap();

        assert!(matches!(Config::load(&path), Err(PromptError::Config { .. })));
    }

    #[test]
    fn empty_editor_clears_override() {
        let mut config = Config::default();
        config.set("editor_command=code --wait").unwrap();
        config.set("editor_command=").unwrap();
        assert_eq!(config.editor_command, None);
    }
}
