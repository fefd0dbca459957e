//! Integration tests for the gleaner CLI commands.
//!
//! Tests run in serial and never let a scraper reach the network: scraping is only exercised with
//! every provider disabled.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use gleaner::draft::EntityDraft;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::tempdir;

// Helper function to create a clean command instance
fn gleaner() -> Command { Command::cargo_bin("gleaner").unwrap() }

// Writes the default configuration into `config_dir`
fn init(config_dir: &Path) {
  gleaner().arg("init").arg("--config").arg(config_dir).arg("--accept-defaults").assert().success();
}

// Initializes a configuration directory and disables every scraper in it
fn offline_config(dir: &Path) -> PathBuf {
  let config_dir = dir.join("config");
  init(&config_dir);

  let preferences = config_dir.join("preferences.toml");
  let content = std::fs::read_to_string(&preferences).unwrap();
  std::fs::write(&preferences, content.replace("enable = true", "enable = false")).unwrap();
  config_dir
}

// Reads a JSON array of drafts
fn read_drafts(path: &Path) -> Vec<EntityDraft> {
  serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

// Points the library of `config_dir` at `library`
fn set_library(config_dir: &Path, library: &Path) {
  let settings = format!("library_path = {:?}\n", library);
  std::fs::write(config_dir.join("config.toml"), settings).unwrap();
}

#[test]
fn test_help_lists_commands() {
  gleaner()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("init"))
    .stdout(predicate::str::contains("scrapers"))
    .stdout(predicate::str::contains("scrape"));
}

#[test]
#[serial]
fn test_init_writes_configuration() {
  let dir = tempdir().unwrap();
  let config_dir = dir.path().join("config");

  gleaner()
    .arg("init")
    .arg("--config")
    .arg(&config_dir)
    .arg("--accept-defaults")
    .assert()
    .success()
    .stdout(predicate::str::contains("Initialized gleaner configuration"));

  assert!(config_dir.join("config.toml").exists());
  assert!(config_dir.join("preferences.toml").exists());
  assert!(config_dir.join("scrapers").join("arxiv.toml").exists());

  // Existing files are reset once the prompt is accepted
  gleaner()
    .arg("init")
    .arg("--config")
    .arg(&config_dir)
    .arg("--accept-defaults")
    .assert()
    .success()
    .stdout(predicate::str::contains("Wrote"));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_scrapers_lists_definitions_and_preferences() {
  let dir = tempdir().unwrap();
  let config_dir = dir.path().join("config");
  init(&config_dir);

  gleaner()
    .arg("scrapers")
    .arg("--config")
    .arg(&config_dir)
    .assert()
    .success()
    .stdout(predicate::str::contains("arxiv"))
    .stdout(predicate::str::contains("dblp"))
    .stdout(predicate::str::contains("no definition"))
    .stdout(predicate::str::contains("scrapers enabled"));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_scrape_without_enabled_scrapers_passes_drafts_through() {
  let dir = tempdir().unwrap();
  let config_dir = offline_config(dir.path());

  let mut draft = EntityDraft::with_title("Neural Nets").doi("10.1/nn");
  draft.year = "2017".into();
  let input = dir.path().join("draft.json");
  std::fs::write(&input, serde_json::to_vec(&draft).unwrap()).unwrap();
  let output = dir.path().join("out.json");

  gleaner()
    .arg("scrape")
    .arg(&input)
    .arg("A Title Given Inline")
    .arg("--config")
    .arg(&config_dir)
    .arg("--output")
    .arg(&output)
    .assert()
    .success()
    .stdout(predicate::str::contains("Neural Nets"))
    .stdout(predicate::str::contains("A Title Given Inline"))
    .stdout(predicate::str::contains("Wrote 2 drafts"));

  let scraped = read_drafts(&output);
  assert_eq!(scraped.len(), 2);
  assert_eq!(scraped[0].doi.as_deref(), Some("10.1/nn"));
  assert_eq!(scraped[0].year, "2017");
  assert_eq!(scraped[0].main_url.as_deref(), Some(input.as_path()));
  assert_eq!(scraped[1].title, "A Title Given Inline");

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_scrape_stores_into_the_library() {
  let dir = tempdir().unwrap();
  let config_dir = offline_config(dir.path());
  let library = dir.path().join("library.json");
  set_library(&config_dir, &library);

  for _ in 0..2 {
    gleaner()
      .arg("scrape")
      .arg("Neural Nets")
      .arg("--config")
      .arg(&config_dir)
      .arg("--store")
      .assert()
      .success()
      .stdout(predicate::str::contains("Stored 1 drafts"));
  }

  assert_eq!(read_drafts(&library).len(), 1);

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_scrape_keeps_the_source_file_of_draft_files() {
  let dir = tempdir().unwrap();
  let config_dir = offline_config(dir.path());

  let draft = EntityDraft::with_title("Neural Nets").main_url("/papers/neural-nets.pdf");
  let input = dir.path().join("draft.json");
  std::fs::write(&input, serde_json::to_vec(&draft).unwrap()).unwrap();
  let output = dir.path().join("out.json");

  gleaner()
    .arg("scrape")
    .arg(&input)
    .arg("--config")
    .arg(&config_dir)
    .arg("--output")
    .arg(&output)
    .assert()
    .success();

  let scraped = read_drafts(&output);
  assert_eq!(scraped[0].main_url.as_deref(), Some(Path::new("/papers/neural-nets.pdf")));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_failed_store_still_writes_the_output() {
  let dir = tempdir().unwrap();
  let config_dir = offline_config(dir.path());
  // A directory cannot be read as a library file
  set_library(&config_dir, dir.path());
  let output = dir.path().join("out.json");

  gleaner()
    .arg("scrape")
    .arg("Neural Nets")
    .arg("--config")
    .arg(&config_dir)
    .arg("--output")
    .arg(&output)
    .arg("--store")
    .assert()
    .failure()
    .stdout(predicate::str::contains("Wrote 1 drafts"))
    .stdout(predicate::str::contains("Stored").not())
    .stderr(predicate::str::is_empty().not());

  assert_eq!(read_drafts(&output)[0].title, "Neural Nets");

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_scrape_from_unknown_scraper_fails() {
  let dir = tempdir().unwrap();
  let config_dir = offline_config(dir.path());

  gleaner()
    .arg("scrape")
    .arg("Neural Nets")
    .arg("--from")
    .arg("googlescholar")
    .arg("--config")
    .arg(&config_dir)
    .assert()
    .failure()
    .stderr(predicate::str::contains("No scraper named \"googlescholar\""));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_zero_chunk_size_is_rejected() {
  let dir = tempdir().unwrap();
  let config_dir = offline_config(dir.path());

  gleaner()
    .arg("scrape")
    .arg("Neural Nets")
    .arg("--chunk-size")
    .arg("0")
    .arg("--config")
    .arg(&config_dir)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Chunk size must be at least 1"));

  dir.close().unwrap();
}
