use std::{fs::File, io::Read};

use prompthub::{
    CategoryFilter, DirectoryTarget, ExportLayout, ExportOptions, ExportPipeline, ExportStatus,
    FileStore, LibraryStorage, PromptDraft, PromptError, PromptLibrary,
};
use zip::ZipArchive;

fn open_library(dir: &std::path::Path, seed: bool) -> PromptLibrary<FileStore> {
    let store = FileStore::new(dir).unwrap();
    PromptLibrary::load(LibraryStorage::new(store, "prompthub_"), seed).unwrap()
}

fn draft(title: &str, category: &str, tags: &str) -> PromptDraft {
    PromptDraft::from_input(title, "Some prompt body", category, Some(tags.to_string()))
}

#[test]
fn library_survives_reopen_from_disk() {
    let dir = tempfile::tempdir().unwrap();

    let created = {
        let mut library = open_library(dir.path(), true);
        assert_eq!(library.prompts().len(), 3);

        library.add_category("Research", None).unwrap();
        library
            .create_prompt(draft("Code Review!", "Coding", "a, b, b"))
            .unwrap()
    };

    assert!(dir.path().join("prompthub_prompts.json").exists());
    assert!(dir.path().join("prompthub_categories.json").exists());

    let library = open_library(dir.path(), true);
    let reloaded = library.get_prompt(&created.id).unwrap();
    assert_eq!(reloaded, &created);
    assert_eq!(reloaded.tags, vec!["a", "b", "b"]);

    let counts = library.categories();
    assert_eq!(counts.all, 4);
    assert_eq!(counts.count_for("Coding"), Some(2));
    assert_eq!(counts.count_for("Research"), Some(0));

    let coding = library.search(&CategoryFilter::parse(Some("Coding")), "review");
    assert_eq!(coding.len(), 2);
}

#[test]
fn stored_counts_follow_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let mut library = open_library(dir.path(), true);

    library.delete_prompt("2").unwrap();

    let raw = std::fs::read_to_string(dir.path().join("prompthub_categories.json")).unwrap();
    let stored: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    let coding = stored.iter().find(|c| c["name"] == "Coding").unwrap();
    assert_eq!(coding["promptCount"], 0);

    assert!(matches!(
        library.remove_category("Writing"),
        Err(PromptError::CategoryInUse { count: 1, .. })
    ));
    library.remove_category("Coding").unwrap();
}

#[tokio::test]
async fn exported_archive_matches_library() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut library = open_library(data.path(), false);
    library
        .create_prompt(draft("My Prompt", "General", ""))
        .unwrap();
    library
        .create_prompt(draft("My Prompt", "General", "x"))
        .unwrap();

    let pipeline = ExportPipeline::new(ExportOptions {
        layout: ExportLayout::Flat,
        base_name: "library".to_string(),
        ..ExportOptions::default()
    });
    let mut target = DirectoryTarget::new(out.path());
    let mut statuses = Vec::new();

    let report = pipeline
        .run(library.prompts(), &mut target, |p| statuses.push(p.status))
        .await
        .unwrap();

    assert_eq!(statuses.last(), Some(&ExportStatus::Complete));
    assert!(report.filename.starts_with("library_export_"));
    assert_eq!(report.path, out.path().join(&report.filename));

    let mut archive = ZipArchive::new(File::open(&report.path).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);

    let first_name = archive.by_index(0).unwrap().name().to_string();
    let second_name = archive.by_index(1).unwrap().name().to_string();
    assert_ne!(first_name, second_name);
    assert!(first_name.starts_with("prompts/My_Prompt_"));

    let mut content = String::new();
    archive
        .by_index(0)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert!(content.starts_with("Title: My Prompt\nCategory: General\nTags: \n"));
    assert!(content.ends_with("--- PROMPT CONTENT ---\n\nSome prompt body"));

    // only the finished archive is left in the output directory
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
}
