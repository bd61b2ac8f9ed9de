//! Export of the prompt library to a single zip archive.
//!
//! The pipeline walks the prompts in order, renders each one as a plain-text
//! file in a [`VirtualTree`], hands the tree to an [`ArchiveCodec`], and passes
//! the resulting bytes to a [`DownloadTarget`] through a [`ScopedDownload`]
//! that is always released. Progress is reported through a callback after
//! every step.
use std::{
    collections::{HashMap, HashSet},
    io::{Cursor, ErrorKind, Write},
    path::PathBuf,
    sync::Arc,
};

use chrono::{NaiveDate, Utc};
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use tempfile::NamedTempFile;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{format_timestamp, ExportLayout, Prompt, PromptError, Result};

/// Maximum length of the title-derived part of an entry name
pub const MAX_FILENAME_BASE: usize = 50;

/// Number of id characters appended to each entry name
pub const ID_FRAGMENT_LEN: usize = 8;

/// Folder holding every entry in the flat layout
pub const FLAT_FOLDER: &str = "prompts";

/// Attempts at finding a free archive name before giving up
const MAX_NAME_COPIES: usize = 1000;

/// The processing loop hands control back to the runtime this often
const YIELD_EVERY: usize = 10;

const CONTENT_MARKER: &str = "--- PROMPT CONTENT ---";

/// Reduces a title to a filesystem-safe name.
///
/// Keeps ASCII letters and digits, whitespace, `-` and `_`; collapses each run
/// of whitespace to one `_`; truncates to [`MAX_FILENAME_BASE`] characters.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
            in_whitespace = false;
        }
        // anything else is dropped without breaking a whitespace run
    }

    out.chars().take(MAX_FILENAME_BASE).collect()
}

/// Archive file name for an export made on `date`.
///
/// Callers pass the current UTC date, so an export just after local midnight
/// may carry the previous or next day.
pub fn export_filename(base_name: &str, date: NaiveDate) -> String {
    format!("{}_export_{}.zip", base_name, date.format("%Y-%m-%d"))
}

/// `name` for the first copy, then `stem (N).ext` the way browsers rename downloads
pub fn numbered_filename(name: &str, copy: usize) -> String {
    if copy <= 1 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, copy, ext),
        _ => format!("{} ({})", name, copy),
    }
}

/// Renders one prompt as the fixed-layout text record stored in the archive
pub fn render_entry(prompt: &Prompt, timestamp_format: &str) -> String {
    [
        format!("Title: {}", prompt.title),
        format!("Category: {}", prompt.category),
        format!("Tags: {}", prompt.tags.join(", ")),
        format!(
            "Created: {}",
            format_timestamp(&prompt.created_at, timestamp_format)
        ),
        format!(
            "Updated: {}",
            format_timestamp(&prompt.updated_at, timestamp_format)
        ),
        String::new(),
        CONTENT_MARKER.to_string(),
        String::new(),
        prompt.content.clone(),
    ]
    .join("\n")
}

/// Where an export currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Idle,
    Preparing,
    Processing,
    Generating,
    Complete,
    Error,
}

impl ExportStatus {
    fn can_move_to(self, next: ExportStatus) -> bool {
        use ExportStatus::*;
        matches!(
            (self, next),
            (Idle, Preparing)
                | (Preparing, Processing)
                | (Processing, Processing)
                | (Processing, Generating)
                | (Generating, Complete)
                | (Preparing | Processing | Generating, Error)
        )
    }
}

/// One progress report delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub status: ExportStatus,
    pub message: String,
}

impl ExportProgress {
    /// `current / total`, 0 when there is nothing to do
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Drives the export state machine and keeps `current` monotonic.
///
/// A tracker is single-use: once it reaches `Complete` or `Error` every further
/// step is rejected.
#[derive(Debug)]
pub struct ExportTracker {
    status: ExportStatus,
    current: usize,
    total: usize,
}

impl ExportTracker {
    pub fn new(total: usize) -> Self {
        Self {
            status: ExportStatus::Idle,
            current: 0,
            total,
        }
    }

    pub fn status(&self) -> ExportStatus {
        self.status
    }

    fn transition(&mut self, next: ExportStatus, message: String) -> Result<ExportProgress> {
        if !self.status.can_move_to(next) {
            return Err(PromptError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;

        Ok(ExportProgress {
            current: self.current,
            total: self.total,
            status: next,
            message,
        })
    }

    pub fn begin(&mut self) -> Result<ExportProgress> {
        self.transition(ExportStatus::Preparing, "Preparing export...".to_string())
    }

    /// Records one more processed prompt
    pub fn processed(&mut self, title: &str) -> Result<ExportProgress> {
        if self.current >= self.total || !self.status.can_move_to(ExportStatus::Processing) {
            return Err(PromptError::InvalidTransition {
                from: self.status,
                to: ExportStatus::Processing,
            });
        }
        self.current += 1;
        self.transition(ExportStatus::Processing, format!("Processing \"{}\"...", title))
    }

    pub fn generating(&mut self) -> Result<ExportProgress> {
        if self.current != self.total {
            return Err(PromptError::InvalidTransition {
                from: self.status,
                to: ExportStatus::Generating,
            });
        }
        self.transition(ExportStatus::Generating, "Generating ZIP file...".to_string())
    }

    pub fn complete(&mut self) -> Result<ExportProgress> {
        self.transition(ExportStatus::Complete, "Export complete!".to_string())
    }

    pub fn fail(&mut self) -> Result<ExportProgress> {
        self.transition(
            ExportStatus::Error,
            "Export failed. Please try again.".to_string(),
        )
    }
}

/// One text file waiting to be archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    pub path: String,
    pub content: String,
}

/// In-memory mapping of archive path to text content, in insertion order
#[derive(Debug, Clone, Default)]
pub struct VirtualTree {
    files: Vec<VirtualFile>,
    paths: HashSet<String>,
}

impl VirtualTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Adds a prompt's file under `folder` and returns the path it was given.
    ///
    /// The name is `<sanitized title>_<first 8 id chars>.txt`. If another entry
    /// already took that path the whole id is used, then a numeric suffix.
    pub fn add_prompt(&mut self, folder: &str, prompt: &Prompt, content: String) -> String {
        let mut base = sanitize_filename(&prompt.title);
        if base.is_empty() {
            base = "untitled".to_string();
        }

        let safe_id: String = prompt
            .id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        let fragment: String = safe_id.chars().take(ID_FRAGMENT_LEN).collect();

        let mut path = format!("{}/{}_{}.txt", folder, base, fragment);
        if self.contains(&path) {
            debug!("Entry {} already taken, using the full id", path);
            path = format!("{}/{}_{}.txt", folder, base, safe_id);
        }
        let mut suffix = 2;
        while self.contains(&path) {
            path = format!("{}/{}_{}-{}.txt", folder, base, safe_id, suffix);
            suffix += 1;
        }

        self.paths.insert(path.clone());
        self.files.push(VirtualFile {
            path: path.clone(),
            content,
        });
        path
    }
}

/// Turns a virtual tree into one compressed blob.
pub trait ArchiveCodec: Send + Sync {
    fn encode(&self, tree: &VirtualTree) -> Result<Vec<u8>>;
}

/// Deflate-compressed zip archive
#[derive(Debug, Clone)]
pub struct ZipCodec {
    pub compression_level: i64,
}

impl Default for ZipCodec {
    fn default() -> Self {
        Self {
            compression_level: 6,
        }
    }
}

impl ArchiveCodec for ZipCodec {
    fn encode(&self, tree: &VirtualTree) -> Result<Vec<u8>> {
        let archive_error = |e: &dyn std::fmt::Display| PromptError::ArchiveGeneration {
            message: e.to_string(),
        };

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level))
            .unix_permissions(0o644);

        for file in tree.files() {
            zip.start_file(file.path.as_str(), options)
                .map_err(|e| archive_error(&e))?;
            zip.write_all(file.content.as_bytes())
                .map_err(|e| archive_error(&e))?;
        }

        let cursor = zip.finish().map_err(|e| archive_error(&e))?;
        let bytes = cursor.into_inner();
        debug!("Encoded {} entries into {} bytes", tree.len(), bytes.len());
        Ok(bytes)
    }
}

/// Token for a blob registered with a [`DownloadTarget`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DownloadHandle(u64);

impl DownloadHandle {
    pub fn new(id: u64) -> Self {
        DownloadHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Receives the finished archive.
///
/// A blob is registered with `acquire`, delivered at most once with `trigger`,
/// and `release`d afterwards whether or not delivery succeeded.
pub trait DownloadTarget {
    fn acquire(&mut self, blob: Vec<u8>) -> Result<DownloadHandle>;

    fn trigger(&mut self, handle: &DownloadHandle, filename: &str) -> Result<PathBuf>;

    fn release(&mut self, handle: DownloadHandle);
}

/// A registered blob that is released when dropped.
pub struct ScopedDownload<'a, T: DownloadTarget + ?Sized> {
    target: &'a mut T,
    handle: Option<DownloadHandle>,
}

impl<'a, T: DownloadTarget + ?Sized> ScopedDownload<'a, T> {
    pub fn acquire(target: &'a mut T, blob: Vec<u8>) -> Result<Self> {
        let handle = target.acquire(blob)?;
        trace!("Acquired download handle {}", handle.id());
        Ok(Self {
            target,
            handle: Some(handle),
        })
    }

    /// Delivers the blob under `filename`, consuming the handle
    pub fn trigger(mut self, filename: &str) -> Result<PathBuf> {
        let Some(handle) = self.handle.take() else {
            return Err(PromptError::Download {
                message: "Download handle already used".to_string(),
            });
        };

        let result = self.target.trigger(&handle, filename);
        self.target.release(handle);
        result
    }
}

impl<T: DownloadTarget + ?Sized> Drop for ScopedDownload<'_, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Releasing unused download handle {}", handle.id());
            self.target.release(handle);
        }
    }
}

/// Saves archives into a directory.
///
/// Acquired blobs are staged in hidden temp files inside the directory and only
/// renamed to their final name on trigger; releasing an untriggered blob
/// deletes its temp file.
pub struct DirectoryTarget {
    dir: PathBuf,
    staged: HashMap<u64, NamedTempFile>,
    next_id: u64,
}

impl DirectoryTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            staged: HashMap::new(),
            next_id: 0,
        }
    }

    /// Number of blobs acquired but not yet triggered or released
    pub fn pending(&self) -> usize {
        self.staged.len()
    }
}

impl DownloadTarget for DirectoryTarget {
    fn acquire(&mut self, blob: Vec<u8>) -> Result<DownloadHandle> {
        if !self.dir.exists() {
            debug!("Creating export directory: {}", self.dir.display());
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                error!("Failed to create export directory: {}", e);
                PromptError::Directory {
                    path: self.dir.clone(),
                }
            })?;
        }

        let mut staged = tempfile::Builder::new()
            .prefix(".prompthub-")
            .suffix(".zip.part")
            .tempfile_in(&self.dir)?;
        staged.write_all(&blob)?;
        staged.flush()?;

        let id = self.next_id;
        self.next_id += 1;
        self.staged.insert(id, staged);
        Ok(DownloadHandle::new(id))
    }

    fn trigger(&mut self, handle: &DownloadHandle, filename: &str) -> Result<PathBuf> {
        let staged = self
            .staged
            .remove(&handle.id())
            .ok_or_else(|| PromptError::Download {
                message: format!("Unknown download handle {}", handle.id()),
            })?;

        let mut staged = staged;
        let mut copy = 1;
        loop {
            let destination = self.dir.join(numbered_filename(filename, copy));
            // Never replaces an existing file; on failure the temp file comes
            // back inside the error and is deleted on drop
            match staged.persist_noclobber(&destination) {
                Ok(_) => {
                    info!("Archive saved to {}", destination.display());
                    return Ok(destination);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists && copy < MAX_NAME_COPIES => {
                    debug!("{} already exists, trying the next name", destination.display());
                    staged = e.file;
                    copy += 1;
                }
                Err(e) => {
                    error!("Failed to save {}: {}", destination.display(), e.error);
                    return Err(PromptError::Download {
                        message: e.error.to_string(),
                    });
                }
            }
        }
    }

    fn release(&mut self, handle: DownloadHandle) {
        if self.staged.remove(&handle.id()).is_some() {
            debug!("Discarded staged archive for handle {}", handle.id());
        }
    }
}

/// What a finished export produced
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub filename: String,
    pub prompt_count: usize,
    pub archive_bytes: usize,
    pub layout: ExportLayout,
}

/// Settings for one export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub layout: ExportLayout,
    pub base_name: String,
    pub timestamp_format: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            layout: ExportLayout::Flat,
            base_name: "prompts".to_string(),
            timestamp_format: crate::DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Converts a prompt collection into a delivered archive
pub struct ExportPipeline {
    options: ExportOptions,
    codec: Arc<dyn ArchiveCodec>,
}

impl ExportPipeline {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            codec: Arc::new(ZipCodec::default()),
        }
    }

    /// Replaces the default zip codec
    pub fn with_codec(mut self, codec: Arc<dyn ArchiveCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Folder an entry is placed in; all-or-nothing per layout
    fn folder_for(&self, prompt: &Prompt) -> String {
        match self.options.layout {
            ExportLayout::Flat => FLAT_FOLDER.to_string(),
            ExportLayout::ByCategory => {
                let folder = sanitize_filename(&prompt.category);
                if folder.is_empty() {
                    "uncategorized".to_string()
                } else {
                    folder
                }
            }
        }
    }

    /// Builds the archive for `prompts` and delivers it to `target`.
    ///
    /// An empty collection fails with [`PromptError::EmptyExport`] before any
    /// progress is reported. Any later failure reports an `Error` status
    /// before returning.
    pub async fn run<T, F>(
        &self,
        prompts: &[Prompt],
        target: &mut T,
        mut on_progress: F,
    ) -> Result<ExportReport>
    where
        T: DownloadTarget + ?Sized,
        F: FnMut(&ExportProgress),
    {
        if prompts.is_empty() {
            warn!("Export requested with no prompts");
            return Err(PromptError::EmptyExport);
        }

        info!(
            "Exporting {} prompts with {} layout",
            prompts.len(),
            self.options.layout
        );
        let mut tracker = ExportTracker::new(prompts.len());
        on_progress(&tracker.begin()?);

        match self
            .build_and_deliver(prompts, target, &mut tracker, &mut on_progress)
            .await
        {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Export failed: {}", e);
                match tracker.fail() {
                    Ok(progress) => on_progress(&progress),
                    Err(state) => warn!("Could not report export failure: {}", state),
                }
                Err(e)
            }
        }
    }

    async fn build_and_deliver<T, F>(
        &self,
        prompts: &[Prompt],
        target: &mut T,
        tracker: &mut ExportTracker,
        on_progress: &mut F,
    ) -> Result<ExportReport>
    where
        T: DownloadTarget + ?Sized,
        F: FnMut(&ExportProgress),
    {
        let mut tree = VirtualTree::new();

        for (index, prompt) in prompts.iter().enumerate() {
            let content = render_entry(prompt, &self.options.timestamp_format);
            let path = tree.add_prompt(&self.folder_for(prompt), prompt, content);
            trace!("Added {} for prompt {}", path, prompt.id);

            on_progress(&tracker.processed(&prompt.title)?);

            if (index + 1) % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }

        on_progress(&tracker.generating()?);

        let codec = Arc::clone(&self.codec);
        let blob = tokio::task::spawn_blocking(move || codec.encode(&tree))
            .await
            .map_err(|e| PromptError::ArchiveGeneration {
                message: format!("Archive task failed: {}", e),
            })?
            .map_err(|e| match e {
                PromptError::ArchiveGeneration { .. } => e,
                other => PromptError::ArchiveGeneration {
                    message: other.to_string(),
                },
            })?;
        let archive_bytes = blob.len();

        let filename = export_filename(&self.options.base_name, Utc::now().date_naive());
        let download = ScopedDownload::acquire(target, blob)?;
        let path = download.trigger(&filename)?;
        // The target may have picked a numbered name to avoid an existing file
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(filename);

        on_progress(&tracker.complete()?);
        info!("Exported {} prompts to {}", prompts.len(), path.display());

        Ok(ExportReport {
            path,
            filename,
            prompt_count: prompts.len(),
            archive_bytes,
            layout: self.options.layout,
        })
    }
}
