use std::fs;
use std::path::PathBuf;

use clap::Parser;
use shadowwipe::cli::{Cli, Commands};
use shadowwipe::config::{JsonSettingsStore, ScanSettings, SettingsError, SettingsStore, SizeUnit};

use super::common::{scan, Tree};

fn scan_args(args: &[&str]) -> shadowwipe::cli::ScanArgs {
    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Commands::Scan(args) => args,
        other => panic!("expected scan, got {other:?}"),
    }
}

#[test]
fn test_stored_exclusions_apply_to_scans() {
    let tree = Tree::new();
    tree.file("keep/a.txt", b"same text");
    tree.file("keep/b.txt", b"same text");
    tree.file("archive/c.txt", b"same text");

    let store = JsonSettingsStore::at(tree.root.join("cfg").join("settings.json"));
    let mut stored = ScanSettings::default();
    stored.excluded_dir_names.insert("archive".to_string());
    stored.excluded_dir_names.insert("cfg".to_string());
    store.save(&stored).unwrap();

    let root = tree.root.to_string_lossy().into_owned();
    let settings = scan_args(&["shadowwipe", "scan", &root]).apply_to(store.load());
    assert!(settings.excluded_dir_names.contains("archive"));

    let (groups, summary) = scan(&settings);
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert!(groups[0].paths().iter().all(|p| p.starts_with(tree.root.join("keep"))));
}

#[test]
fn test_arguments_override_stored_values() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = JsonSettingsStore::at(dir.path().join("settings.json"));
    let mut stored = ScanSettings::with_roots([PathBuf::from("/stored/root")]);
    stored.similarity_threshold = 3;
    stored.skip_hidden = true;
    store.save(&stored).unwrap();

    let args = scan_args(&[
        "shadowwipe",
        "scan",
        "/cli/root",
        "--similarity",
        "12",
        "--include-hidden",
        "--min-size",
        "2MiB",
        "-x",
        "build",
    ]);
    let settings = args.apply_to(store.load());

    assert_eq!(settings.roots, vec![PathBuf::from("/cli/root")]);
    assert_eq!(settings.similarity_threshold, 12);
    assert!(!settings.skip_hidden);
    assert_eq!(settings.min_file_size, 2 * 1024 * 1024);
    assert_eq!(settings.min_file_size_unit, SizeUnit::Mb);
    assert!(settings.excluded_dir_names.contains("build"));
    assert!(settings.excluded_dir_names.contains("node_modules"));
}

#[test]
fn test_unset_arguments_keep_stored_values() {
    let mut stored = ScanSettings::default();
    stored.similarity_threshold = 7;
    stored.min_file_size = 512;
    stored.io_threads = Some(3);

    let settings = scan_args(&["shadowwipe", "scan", "/data"]).apply_to(stored);
    assert_eq!(settings.similarity_threshold, 7);
    assert_eq!(settings.min_file_size, 512);
    assert_eq!(settings.io_threads, Some(3));
    assert!(settings.skip_hidden);
}

#[test]
fn test_settings_file_is_readable_json() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = JsonSettingsStore::at(dir.path().join("settings.json"));
    let mut settings = ScanSettings::with_roots([PathBuf::from("/photos")]);
    settings.min_file_size = 1024;
    store.save(&settings).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(json["roots"][0], "/photos");
    assert_eq!(json["min_file_size"], 1024);
    assert_eq!(json["min_file_size_unit"], "KB");
    assert_eq!(json["skip_hidden"], true);
    assert!(json.get("io_threads").is_none());
}

#[test]
fn test_validation_messages() {
    assert_eq!(
        ScanSettings::default().validate().unwrap_err().to_string(),
        "at least one directory to scan is required"
    );

    let mut settings = ScanSettings::with_roots([PathBuf::from("/x")]);
    settings.similarity_threshold = 25;
    let err = settings.validate().unwrap_err();
    assert_eq!(err, SettingsError::ThresholdOutOfRange(25));
    assert_eq!(err.to_string(), "similarity threshold 25 is out of range (0-20)");
}
