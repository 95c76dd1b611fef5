//! Config registry tests

use hookd::filesys::dir::Dir;
use hookd::registry::Registry;
use tempfile::TempDir;

const SVC_YAML: &str = "\
name: svc
repos:
  - repoA
  - repoB
path: svc
branch: main
compose_file: docker-compose.yml
services:
  - web
  - worker
";

const OTHER_YAML: &str = "\
name: other-svc
repos: [repoC]
path: other
branch:
  - main
  - staging
";

async fn registry_with(files: &[(&str, &str)]) -> (TempDir, Registry) {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }
    let registry = Registry::load(Dir::new(dir.path())).await.unwrap();
    (dir, registry)
}

#[tokio::test]
async fn test_load_maps_every_repo() {
    let (_dir, registry) =
        registry_with(&[("svc.yml", SVC_YAML), ("other.yaml", OTHER_YAML)]).await;
    let snapshot = registry.snapshot().await;

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.lookup("repoA").unwrap().name, "svc");
    assert_eq!(snapshot.lookup("repoB").unwrap().name, "svc");
    assert_eq!(snapshot.lookup("repoC").unwrap().name, "other-svc");
    assert!(snapshot.lookup("missing").is_none());
}

#[tokio::test]
async fn test_branch_forms() {
    let (_dir, registry) =
        registry_with(&[("svc.yml", SVC_YAML), ("other.yaml", OTHER_YAML)]).await;
    let snapshot = registry.snapshot().await;

    // Bare string is a singleton set
    let svc = snapshot.lookup("repoA").unwrap();
    assert!(svc.branch.contains("main"));
    assert!(!svc.branch.contains("staging"));

    // List form
    let other = snapshot.lookup("repoC").unwrap();
    assert!(other.branch.contains("staging"));
    assert!(!other.branch.contains("dev"));
}

#[tokio::test]
async fn test_branch_defaults_when_absent() {
    let (_dir, registry) =
        registry_with(&[("bare.yml", "name: bare\nrepos: [repoX]\n")]).await;
    let config = registry.snapshot().await.lookup("repoX").unwrap();

    for branch in ["main", "master", "prod"] {
        assert!(config.branch.contains(branch));
    }
    assert!(!config.branch.contains("dev"));
}

#[tokio::test]
async fn test_non_yaml_and_repo_less_files_skipped() {
    let (_dir, registry) = registry_with(&[
        ("svc.yml", SVC_YAML),
        ("notes.txt", "not a config"),
        ("empty.yml", "name: no-repos\n"),
    ])
    .await;

    assert_eq!(registry.snapshot().await.len(), 2);
}

#[tokio::test]
async fn test_duplicate_repo_later_file_wins() {
    let (_dir, registry) = registry_with(&[
        ("a.yml", "name: first\nrepos: [shared]\n"),
        ("b.yml", "name: second\nrepos: [shared]\n"),
    ])
    .await;

    // Files are read in name order
    assert_eq!(registry.snapshot().await.lookup("shared").unwrap().name, "second");
}

#[tokio::test]
async fn test_missing_config_dir_is_empty() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::load(Dir::new(dir.path().join("nope"))).await.unwrap();
    assert!(registry.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_malformed_yaml_aborts_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.yml"), "name: [unclosed\n").unwrap();
    assert!(Registry::load(Dir::new(dir.path())).await.is_err());
}

#[tokio::test]
async fn test_failed_reload_preserves_old_snapshot() {
    let (dir, registry) = registry_with(&[("svc.yml", SVC_YAML)]).await;

    std::fs::write(dir.path().join("bad.yml"), "repos: [broken\n").unwrap();
    assert!(registry.reload().await.is_err());

    // Readers still see the previous mapping in full
    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.lookup("repoA").unwrap().name, "svc");
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn test_reload_replaces_whole_mapping() {
    let (dir, registry) = registry_with(&[("svc.yml", SVC_YAML)]).await;
    let before = registry.snapshot().await;

    std::fs::remove_file(dir.path().join("svc.yml")).unwrap();
    std::fs::write(dir.path().join("new.yml"), OTHER_YAML).unwrap();
    registry.reload().await.unwrap();

    let after = registry.snapshot().await;
    assert!(after.lookup("repoA").is_none());
    assert_eq!(after.lookup("repoC").unwrap().name, "other-svc");

    // The old snapshot is untouched by the swap
    assert_eq!(before.lookup("repoA").unwrap().name, "svc");
}

#[tokio::test]
async fn test_summaries_dedup_by_name() {
    let (_dir, registry) = registry_with(&[
        ("svc.yml", SVC_YAML),
        ("other.yaml", OTHER_YAML),
    ])
    .await;

    let summaries = registry.snapshot().await.summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "other-svc");
    assert_eq!(summaries[1].name, "svc");
    assert_eq!(summaries[1].branch, vec!["main".to_string()]);

    let names = registry.snapshot().await.project_names();
    assert_eq!(names, vec!["other-svc".to_string(), "svc".to_string()]);
}
