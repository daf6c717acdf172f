// tests/disambiguation.rs
//
// Exercises the disambiguator's fan-out and selection algorithm end to end
// using fake probers (no network), covering §4.9's three selection paths
// plus the not-found-drop and audit-write side effect.

mod common;

use std::time::Duration;

use common::{fake, not_found};
use tsuku::disambiguate::Disambiguator;

#[tokio::test]
async fn not_found_probers_are_dropped_and_unique_survivor_wins() {
    let probers = vec![fake("cargo", 500, 4, true), not_found("npm"), not_found("pypi")];
    let disambiguator = Disambiguator::new(probers, Duration::from_secs(5));

    let result = disambiguator.resolve("thing", None, "run-1").await.unwrap();
    let selected = result.selected.unwrap();
    assert_eq!(selected.source, "cargo:thing");
    assert_eq!(selected.selection_reason.as_deref(), Some("unique"));
    assert_eq!(result.all_probes.len(), 1);
}

#[tokio::test]
async fn dominant_downloads_across_real_fanout() {
    let probers = vec![fake("cargo", 10_000, 4, true), fake("npm", 50, 4, true)];
    let disambiguator = Disambiguator::new(probers, Duration::from_secs(5));

    let result = disambiguator.resolve("thing", None, "run-1").await.unwrap();
    let selected = result.selected.unwrap();
    assert_eq!(selected.source, "cargo:thing");
    assert_eq!(selected.selection_reason.as_deref(), Some("dominant_downloads"));
}

#[tokio::test]
async fn audit_entry_is_written_atomically_when_dir_supplied() {
    let probers = vec![fake("homebrew", 100, 2, true), fake("cargo", 95, 2, false)];
    let disambiguator = Disambiguator::new(probers, Duration::from_secs(5));
    let dir = tempfile::tempdir().unwrap();

    disambiguator.resolve("thing", Some(dir.path()), "run-7").await.unwrap();

    let contents = std::fs::read_to_string(dir.path().join("thing.json")).unwrap();
    assert!(contents.contains("\"seeding_run\": \"run-7\""));
    assert!(contents.contains("homebrew:thing"));
}

#[tokio::test]
async fn all_probers_not_found_yields_no_selection() {
    let probers = vec![not_found("cargo"), not_found("npm")];
    let disambiguator = Disambiguator::new(probers, Duration::from_secs(5));

    let result = disambiguator.resolve("ghost-package", None, "run-1").await.unwrap();
    assert!(result.selected.is_none());
    assert!(result.all_probes.is_empty());
}
