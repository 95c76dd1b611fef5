//! Project configuration registry
//!
//! Each YAML document in the config directory describes one deployable
//! project; every repository listed in its `repos` field maps to that
//! document. The registry holds an immutable snapshot behind an
//! atomically swapped reference so readers never observe a partial map.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::HookError;
use crate::filesys::dir::Dir;

/// Branches eligible to trigger a deployment.
///
/// A bare string is treated as a singleton set.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BranchSpec {
    One(String),
    Many(Vec<String>),
}

impl BranchSpec {
    /// Exact-match membership test, no globbing
    pub fn contains(&self, branch: &str) -> bool {
        match self {
            BranchSpec::One(name) => name == branch,
            BranchSpec::Many(names) => names.iter().any(|name| name == branch),
        }
    }

    /// Branch names as a list
    pub fn names(&self) -> Vec<String> {
        match self {
            BranchSpec::One(name) => vec![name.clone()],
            BranchSpec::Many(names) => names.clone(),
        }
    }
}

/// One deployable project, parsed from a YAML config document
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Human-readable project identifier
    #[serde(default = "default_name")]
    pub name: String,

    /// Source repositories that map to this project
    #[serde(default)]
    pub repos: Vec<String>,

    /// Project location, relative to the hosting root
    #[serde(default)]
    pub path: String,

    /// Branches eligible to trigger deployment
    #[serde(default = "default_branches")]
    pub branch: BranchSpec,

    /// Compose file reference passed through to the deploy script
    #[serde(default)]
    pub compose_file: String,

    /// Compose directory passed through to the deploy script
    #[serde(default)]
    pub compose_dir: String,

    /// Service names passed through to the deploy script
    #[serde(default)]
    pub services: Vec<String>,
}

fn default_name() -> String {
    "unknown".to_string()
}

fn default_branches() -> BranchSpec {
    BranchSpec::Many(vec![
        "main".to_string(),
        "master".to_string(),
        "prod".to_string(),
    ])
}

/// Project summary for the listing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub repos: Vec<String>,
    pub path: String,
    pub branch: Vec<String>,
}

/// An immutable repo-to-config mapping, fully rebuilt on each load
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    configs: HashMap<String, Arc<ProjectConfig>>,
}

impl RegistrySnapshot {
    /// Look up the project configured for a repository
    pub fn lookup(&self, repo: &str) -> Option<Arc<ProjectConfig>> {
        self.configs.get(repo).cloned()
    }

    /// Distinct project names, sorted
    pub fn project_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .configs
            .values()
            .map(|config| config.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Project summaries, deduplicated by project name
    pub fn summaries(&self) -> Vec<ProjectSummary> {
        let mut seen = HashMap::new();
        for config in self.configs.values() {
            seen.entry(config.name.clone()).or_insert_with(|| ProjectSummary {
                name: config.name.clone(),
                repos: config.repos.clone(),
                path: config.path.clone(),
                branch: config.branch.names(),
            });
        }
        let mut summaries: Vec<ProjectSummary> = seen.into_values().collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Number of configured repositories
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// The project registry, reloadable on demand
pub struct Registry {
    config_dir: Dir,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl Registry {
    /// Load the registry from a directory of YAML project documents
    pub async fn load(config_dir: Dir) -> Result<Self, HookError> {
        let snapshot = build_snapshot(&config_dir).await?;
        Ok(Self {
            config_dir,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Current snapshot; a cheap clone of the shared reference
    pub async fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Rebuild the mapping from scratch and swap it in.
    ///
    /// The swap is atomic from the reader's point of view; a failed
    /// rebuild leaves the previous snapshot in place.
    pub async fn reload(&self) -> Result<Arc<RegistrySnapshot>, HookError> {
        let rebuilt = Arc::new(build_snapshot(&self.config_dir).await?);
        let mut guard = self.snapshot.write().await;
        *guard = rebuilt.clone();
        info!("Configuration reloaded: {} repos mapped", rebuilt.len());
        Ok(rebuilt)
    }
}

/// Read every `*.yml`/`*.yaml` document and map each listed repo to its
/// full configuration.
///
/// A parse error aborts the whole load. Files are read in name order; if
/// a repo appears in two documents the later one wins, though configs
/// should not overlap.
async fn build_snapshot(config_dir: &Dir) -> Result<RegistrySnapshot, HookError> {
    let mut configs = HashMap::new();

    if !config_dir.exists().await {
        debug!(
            "Config directory {} does not exist, registry is empty",
            config_dir.path().display()
        );
        return Ok(RegistrySnapshot { configs });
    }

    let mut paths = config_dir.list_files().await?;
    paths.sort();

    for path in paths {
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "yml" || ext == "yaml")
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }

        let config: ProjectConfig = crate::filesys::file::File::new(&path).read_yaml().await?;
        if config.repos.is_empty() {
            debug!("Skipping {}: no repos listed", path.display());
            continue;
        }

        let config = Arc::new(config);
        for repo in &config.repos {
            configs.insert(repo.clone(), config.clone());
        }
    }

    Ok(RegistrySnapshot { configs })
}
