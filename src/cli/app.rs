//! CLI module for the prompthub application
//!
//! This module handles the command-line interface for interacting with the
//! prompt library and the export pipeline.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use console::{style, Term};
use log::{debug, info};
use shell_words::split;
use tempfile::Builder;
use tokio::sync::Mutex;

use crate::{
    content_preview, format_timestamp, strip_editor_comments, CategoryAction, CategoryFilter,
    Commands, Config, DirectoryTarget, EditPromptOptions, ExportLayout, ExportPipeline,
    ExportProgress, ExportStatus, FileStore, ListPromptsOptions, Prompt, PromptDraft, PromptError,
    PromptLibrary, Result,
};

/// CLI Application handler - processes CLI commands against the prompt library
pub struct App {
    /// The prompt library and its file-backed store
    library: Arc<Mutex<PromptLibrary<FileStore>>>,

    /// Application configuration
    config: Config,

    /// Where `config` is read from and saved to
    config_path: PathBuf,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    pub fn new(
        library: Arc<Mutex<PromptLibrary<FileStore>>>,
        config: Config,
        config_path: PathBuf,
        verbose: bool,
    ) -> Self {
        Self {
            library,
            config,
            config_path,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                category,
                content,
                edit,
                tags,
                file,
            } => {
                self.create_prompt(title, category, content, file, tags, edit)
                    .await?
            }

            Commands::View { id, json } => self.view_prompt(&id, json).await?,

            Commands::List(options) => self.list_prompts(options).await?,

            Commands::Edit(options) => self.handle_edit(options).await?,

            Commands::Delete { id, force } => self.handle_delete(id, force).await?,

            Commands::Categories => self.show_categories().await?,

            Commands::Category { action } => self.handle_category(action).await?,

            Commands::Export { output, layout } => self.handle_export(output, layout).await?,

            Commands::Config { show, set, reset } => self.handle_config(show, set, reset)?,
        }

        Ok(())
    }

    async fn create_prompt(
        &self,
        title: String,
        category: String,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        open_editor: bool,
    ) -> Result<()> {
        if content.is_some() && file.is_some() {
            return Err(PromptError::validation(
                "Cannot specify both --content and --file options",
            ));
        }

        let content = match (content, file) {
            (Some(c), _) => c,
            (_, Some(file_path)) => self.read_content_from_file(&file_path)?,
            (None, None) => String::new(),
        };
        let content = if open_editor || content.is_empty() {
            self.open_editor(&title, &content)?
        } else {
            content
        };

        let draft = PromptDraft::from_input(&title, &content, &category, tags);
        let prompt = self.library.lock().await.create_prompt(draft)?;

        println!("Prompt created with ID: {}", prompt.id);
        Ok(())
    }

    // Helper function for reading content from file
    fn read_content_from_file(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(PromptError::FileNotFound {
                file_path: path.display().to_string(),
            });
        }

        if !path.is_file() {
            return Err(PromptError::validation(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        read_to_string(path).map_err(PromptError::Io)
    }

    /// Opens the configured editor on a template, returning the cleaned content
    fn open_editor(&self, title: &str, existing_content: &str) -> Result<String> {
        let temp_file = Builder::new().prefix("prompthub-").suffix(".txt").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        let editor_cmd = self.config.get_editor_command();
        self.write_editor_template(&temp_path, title, existing_content)?;

        info!("Opening editor to write prompt content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(strip_editor_comments(&content))
    }

    fn write_editor_template(&self, path: &Path, title: &str, existing: &str) -> Result<()> {
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;

        writeln!(file, "<!--")?;
        // A title containing the closing marker would end the header early
        writeln!(file, "Prompt: {}", title.replace("-->", "- ->"))?;
        writeln!(file, "Write the prompt content below.")?;
        writeln!(file, "This header block is removed when you save.")?;
        writeln!(file, "Save and exit the editor when you're done.")?;
        writeln!(file, "-->")?;
        writeln!(file)?;
        if !existing.is_empty() {
            writeln!(file, "{}", existing)?;
        }

        Ok(())
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let path_str = file_path.to_string_lossy();

        // Handle shell-like command parsing
        let args = split(editor_cmd).map_err(|e| PromptError::Editor {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let Some((program, extra_args)) = args.split_first() else {
            return Err(PromptError::Editor {
                message: "Empty editor command".to_string(),
            });
        };

        debug!("Launching editor: {} {:?}", program, extra_args);
        let status = Command::new(program)
            .args(extra_args)
            .arg(path_str.as_ref())
            .status()
            .map_err(|e| PromptError::Editor {
                message: format!("Failed to execute editor command: {}", e),
            })?;

        if !status.success() {
            return Err(PromptError::Editor {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }

    async fn view_prompt(&self, id: &str, json: bool) -> Result<()> {
        let library = self.library.lock().await;
        let prompt = library
            .get_prompt(id)
            .ok_or_else(|| PromptError::PromptNotFound { id: id.to_string() })?;

        if json {
            println!("{}", serde_json::to_string_pretty(prompt)?);
        } else {
            self.print_prompt(prompt, true);
        }

        Ok(())
    }

    /// List prompts according to provided filters and options
    async fn list_prompts(&self, options: ListPromptsOptions) -> Result<()> {
        let filter = CategoryFilter::parse(options.category.as_deref());
        let query = options.query.unwrap_or_default();

        let library = self.library.lock().await;
        let mut shown = library.search(&filter, &query);
        let matched = shown.len();

        // 0 means no limit
        if options.limit > 0 && shown.len() > options.limit {
            shown.truncate(options.limit);
        }

        if options.json {
            println!("{}", serde_json::to_string_pretty(&shown)?);
            return Ok(());
        }

        if shown.is_empty() {
            println!("No prompts found matching the criteria.");
            return Ok(());
        }

        if options.brief {
            for prompt in &shown {
                println!("{}  {}", prompt.id, prompt.title);
            }
        } else {
            self.display_prompts_text(&shown);
        }

        if shown.len() < matched {
            println!(
                "\nShowing {} of {} matching prompts. Use --limit to show more.",
                shown.len(),
                matched
            );
        } else {
            println!(
                "\nFound {} prompt{}",
                matched,
                if matched == 1 { "" } else { "s" }
            );
        }

        Ok(())
    }

    fn display_prompts_text(&self, prompts: &[&Prompt]) {
        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, prompt) in prompts.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }
            self.print_prompt(prompt, false);
        }
    }

    fn print_prompt(&self, prompt: &Prompt, detailed: bool) {
        let format = &self.config.timestamp_format;

        println!(
            "ID: {} | Updated: {}",
            prompt.id,
            format_timestamp(&prompt.updated_at, format)
        );
        println!("Title: {}", style(&prompt.title).bold());
        println!("Category: {}", style(&prompt.category).green());

        if !prompt.tags.is_empty() {
            let tags = prompt
                .tags
                .iter()
                .map(|tag| format!("#{}", tag))
                .collect::<Vec<_>>()
                .join(" ");
            println!("Tags: {}", style(tags).cyan());
        }

        if detailed {
            println!("Created: {}", format_timestamp(&prompt.created_at, format));
            println!("\n{}", prompt.content);
        } else {
            let preview = content_preview(&prompt.content, 100);
            if !preview.is_empty() {
                println!("\n{}", preview);
            }
        }
    }

    async fn handle_edit(&self, options: EditPromptOptions) -> Result<()> {
        if options.content.is_some() && options.file.is_some() {
            return Err(PromptError::validation(
                "Cannot specify both --content and --file options",
            ));
        }

        let mut library = self.library.lock().await;
        let mut draft = library
            .get_prompt(&options.id)
            .map(Prompt::to_draft)
            .ok_or_else(|| PromptError::PromptNotFound {
                id: options.id.clone(),
            })?;

        if let Some(title) = options.title {
            draft.title = title;
        }
        if let Some(category) = options.category {
            draft.category = category;
        }
        if let Some(tags) = options.tags {
            draft.tags = crate::parse_tags(Some(tags));
        }

        if let Some(content) = options.content {
            draft.content = content;
        } else if let Some(file_path) = options.file {
            draft.content = self.read_content_from_file(&file_path)?;
            println!("Content updated from file: {}", file_path.display());
        }
        if options.edit {
            draft.content = self.open_editor(&draft.title, &draft.content)?;
            println!("Content updated from editor");
        }

        let prompt = library.update_prompt(&options.id, draft)?;
        println!("Prompt {} updated successfully", prompt.id);

        Ok(())
    }

    async fn handle_delete(&self, id: String, force: bool) -> Result<()> {
        let mut library = self.library.lock().await;
        let prompt = library
            .get_prompt(&id)
            .cloned()
            .ok_or_else(|| PromptError::PromptNotFound { id: id.clone() })?;

        if !force {
            println!("You are about to delete the following prompt:");
            println!("ID:       {}", prompt.id);
            println!("Title:    {}", prompt.title);
            println!("Category: {}", prompt.category);
            println!("Tags:     {}", prompt.tags.join(", "));

            let preview = content_preview(&prompt.content, 100);
            if !preview.is_empty() {
                println!("\nContent preview:\n{}", preview);
            }

            println!("\nThis action cannot be undone!");
            print!("Are you sure you want to delete this prompt? [y/N]: ");
            stdout().flush().map_err(PromptError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(PromptError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        library.delete_prompt(&id)?;
        println!(
            "Prompt '{}' ({}) has been permanently deleted.",
            prompt.title, prompt.id
        );

        Ok(())
    }

    async fn show_categories(&self) -> Result<()> {
        let counts = self.library.lock().await.categories();

        println!("{:<24} {:>5}", style("All").bold(), counts.all);
        for category in &counts.categories {
            println!(
                "{:<24} {:>5}  {}",
                category.name,
                category.prompt_count,
                style(&category.color).dim()
            );
        }

        Ok(())
    }

    async fn handle_category(&self, action: CategoryAction) -> Result<()> {
        let mut library = self.library.lock().await;

        match action {
            CategoryAction::Add { name, color } => {
                let category = library.add_category(&name, color)?;
                println!("Category '{}' added ({})", category.name, category.color);
            }
            CategoryAction::Remove { name } => {
                let category = library.remove_category(&name)?;
                println!("Category '{}' removed", category.name);
            }
        }

        Ok(())
    }

    async fn handle_export(
        &self,
        output: Option<PathBuf>,
        layout: Option<ExportLayout>,
    ) -> Result<()> {
        let mut options = self.config.export_options();
        if let Some(layout) = layout {
            options.layout = layout;
        }
        let dir = output.unwrap_or_else(|| self.config.export_dir.clone());

        // Export works on a snapshot so the library lock is not held while encoding
        let prompts = self.library.lock().await.prompts().to_vec();

        let pipeline = ExportPipeline::new(options);
        let mut target = DirectoryTarget::new(&dir);
        let term = Term::stderr();
        let interactive = term.is_term() && !self.verbose;

        let result = pipeline
            .run(&prompts, &mut target, |progress| {
                if interactive {
                    draw_progress(&term, progress);
                } else {
                    debug!(
                        "[{}/{}] {:?}: {}",
                        progress.current, progress.total, progress.status, progress.message
                    );
                }
            })
            .await;

        if interactive {
            eprintln!();
        }

        let report = result?;
        println!(
            "Exported {} prompt{} to {} ({} bytes)",
            report.prompt_count,
            if report.prompt_count == 1 { "" } else { "s" },
            report.path.display(),
            report.archive_bytes
        );

        Ok(())
    }

    fn handle_config(&self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        if reset {
            Config::default().save(&self.config_path)?;
            println!("Configuration reset to defaults");
            return Ok(());
        }

        if let Some(assignment) = set {
            let mut config = self.config.clone();
            config.set(&assignment)?;
            config.save(&self.config_path)?;
            println!("Configuration updated: {}", assignment);
            return Ok(());
        }

        if show || self.verbose {
            println!("# {}", self.config_path.display());
        }
        println!("{}", serde_json::to_string_pretty(&self.config)?);

        Ok(())
    }
}

/// One line of export progress fitted into `width` columns
fn progress_line(progress: &ExportProgress, width: usize) -> String {
    let bar_width = width.min(80).saturating_sub(30).max(10);
    let filled = (progress.fraction() * bar_width as f64).round() as usize;
    let filled = filled.min(bar_width);

    let line = format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        "-".repeat(bar_width - filled),
        (progress.fraction() * 100.0).round() as u32,
        progress.message
    );
    line.chars().take(width.saturating_sub(1)).collect()
}

fn draw_progress(term: &Term, progress: &ExportProgress) {
    let width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80);
    let line = progress_line(progress, width);

    let line = match progress.status {
        ExportStatus::Complete => style(line).green().to_string(),
        ExportStatus::Error => style(line).red().to_string(),
        _ => line,
    };

    // A failed redraw is cosmetic only
    let _ = term.clear_line();
    let _ = term.write_str(&line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LibraryStorage;

    fn app_in(dir: &Path) -> App {
        let config = Config {
            data_dir: dir.join("data"),
            export_dir: dir.join("exports"),
            seed_samples: false,
            ..Config::default()
        };
        let store = FileStore::new(&config.data_dir).unwrap();
        let library =
            PromptLibrary::load(LibraryStorage::new(store, config.key_prefix.clone()), false)
                .unwrap();

        App::new(
            Arc::new(Mutex::new(library)),
            config,
            dir.join("config.json"),
            false,
        )
    }

    fn create(title: &str, category: &str, content: &str) -> Commands {
        Commands::Create {
            title: title.to_string(),
            category: category.to_string(),
            content: Some(content.to_string()),
            edit: false,
            tags: Some("a, b, b".to_string()),
            file: None,
        }
    }

    #[test]
    fn progress_line_fits_terminal() {
        let progress = ExportProgress {
            current: 5,
            total: 10,
            status: ExportStatus::Processing,
            message: "Processing \"A very long prompt title that keeps going\"...".to_string(),
        };

        let line = progress_line(&progress, 40);
        assert!(line.chars().count() <= 39);
        assert!(line.starts_with("[#####-----]"));
        assert!(line.contains(" 50% "));
    }

    #[tokio::test]
    async fn create_then_delete_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());

        app.run(create("Code Review!", "Coding", "Check this"))
            .await
            .unwrap();

        let id = {
            let library = app.library.lock().await;
            let prompt = &library.prompts()[0];
            assert_eq!(prompt.tags, vec!["a", "b", "b"]);
            prompt.id.clone()
        };

        app.run(Commands::Delete { id, force: true }).await.unwrap();
        assert!(app.library.lock().await.prompts().is_empty());
    }

    #[tokio::test]
    async fn create_with_unknown_category_fails() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());

        let err = app
            .run(create("Title", "Nope", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::Validation { .. }));
    }

    #[tokio::test]
    async fn edit_replaces_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        app.run(create("Old", "Coding", "Body")).await.unwrap();
        let id = app.library.lock().await.prompts()[0].id.clone();

        app.run(Commands::Edit(EditPromptOptions {
            id: id.clone(),
            title: Some("New".to_string()),
            category: Some("Writing".to_string()),
            content: None,
            tags: None,
            file: None,
            edit: false,
        }))
        .await
        .unwrap();

        let library = app.library.lock().await;
        let prompt = library.get_prompt(&id).unwrap();
        assert_eq!(prompt.title, "New");
        assert_eq!(prompt.category, "Writing");
        assert_eq!(prompt.content, "Body");
        assert_eq!(prompt.tags, vec!["a", "b", "b"]);
    }

    #[tokio::test]
    async fn export_writes_archive_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        app.run(create("Story", "Writing", "Once")).await.unwrap();

        let out = dir.path().join("out");
        app.run(Commands::Export {
            output: Some(out.clone()),
            layout: Some(ExportLayout::ByCategory),
        })
        .await
        .unwrap();

        let names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("prompts_export_"));
    }

    #[tokio::test]
    async fn empty_export_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());

        let err = app
            .run(Commands::Export {
                output: None,
                layout: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "No prompts to export");
        assert!(!dir.path().join("exports").exists());
    }

    #[tokio::test]
    async fn config_set_persists_to_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());

        app.run(Commands::Config {
            show: false,
            set: Some("export_base_name=library".to_string()),
            reset: false,
        })
        .await
        .unwrap();

        let saved = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(saved.export_base_name, "library");
    }
}
