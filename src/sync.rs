// src/sync.rs
// Workspace sync orchestration: detect -> resolve -> expand -> fetch -> register

use crate::config::{Category, ContextConfig, ContextSource, FetchSettings, RepoPattern};
use crate::detect::{self, FactSet};
use crate::editor;
use crate::error::{RemctxError, Result};
use crate::fetch::{self, FetchReport, FileSource, ResolvedFile};
use crate::git;
use crate::github::pattern::{expand_patterns, PathPattern};
use crate::github::RemoteSource;
use crate::resolve;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{info, warn};

/// Explicit per-category URL overrides. An overridden category bypasses
/// detection and resolution and lands under the `default` profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub instructions: Option<Vec<String>>,
    pub chatmodes: Option<Vec<String>>,
    pub prompts: Option<Vec<String>>,
}

impl Overrides {
    fn get(&self, category: Category) -> Option<&[String]> {
        match category {
            Category::Instructions => self.instructions.as_deref(),
            Category::Chatmodes => self.chatmodes.as_deref(),
            Category::Prompts => self.prompts.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_none() && self.chatmodes.is_none() && self.prompts.is_none()
    }
}

/// A repository source that could not be expanded; the rest of its
/// category still resolves
#[derive(Debug, Clone, Serialize)]
pub struct ExpansionFailure {
    pub source: String,
    pub category: Category,
    pub error: String,
    pub credential_required: bool,
}

/// Per-project-type resolution summary
#[derive(Debug, Clone, Serialize)]
pub struct TypeResolution {
    pub project_type: String,
    pub profile: Option<String>,
    pub planned_files: usize,
}

/// Aggregate result of one sync run; partial failure is data
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_info: Option<FactSet>,
    pub resolutions: Vec<TypeResolution>,
    pub expansion_failures: Vec<ExpansionFailure>,
    /// Sources dropped at planning time (bad URL, escaping path)
    pub unplannable: Vec<String>,
    pub fetch: FetchReport,
    pub settings_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_error: Option<String>,
}

/// Run a full sync for one workspace.
///
/// The configuration snapshot is loaded once by the caller and immutable
/// for the run. Hard failures (no git repository) propagate; everything
/// downstream is recorded in the report.
pub async fn sync_workspace(
    provider: &dyn RemoteSource,
    config: &ContextConfig,
    workspace: &Path,
    overrides: &Overrides,
    auto_detect: bool,
    settings: &FetchSettings,
) -> Result<SyncReport> {
    let root = git::discover_root(workspace)?;
    info!(workspace = %workspace.display(), root = %root.display(), "Starting context sync");

    let facts = auto_detect.then(|| detect::detect(workspace));

    let mut planner = Planner::new(provider);
    let mut resolutions = Vec::new();
    let mut profiles_used: BTreeSet<String> = BTreeSet::new();

    // Overridden categories land under the `default` profile
    for category in Category::iter() {
        if let Some(urls) = overrides.get(category) {
            let sources: Vec<ContextSource> =
                urls.iter().map(|u| ContextSource::Url(u.clone())).collect();
            planner.plan_category("default", category, &sources).await;
            profiles_used.insert("default".to_string());
        }
    }

    // Each detected project type resolves independently and lands under
    // its own active profile's directories
    if let Some(facts) = &facts {
        for project_type in &facts.project_types {
            let resolved = resolve::resolve(config, project_type, facts);
            let Some(profile) = resolved.profile.clone() else {
                resolutions.push(TypeResolution {
                    project_type: project_type.clone(),
                    profile: None,
                    planned_files: 0,
                });
                continue;
            };

            let before = planner.files.len();
            for category in Category::iter() {
                if overrides.get(category).is_some() {
                    continue;
                }
                planner
                    .plan_category(&profile, category, resolved.get(category))
                    .await;
            }

            profiles_used.insert(profile.clone());
            resolutions.push(TypeResolution {
                project_type: project_type.clone(),
                profile: Some(profile),
                planned_files: planner.files.len() - before,
            });
        }
    }

    let Planner {
        files,
        expansion_failures,
        unplannable,
        ..
    } = planner;

    let fetch_report = fetch::run(provider, &root, files, settings).await;

    let ensure_enabled: Vec<String> = profiles_used.into_iter().collect();
    let (settings_updated, settings_error) =
        match editor::update_settings(&root, config, &ensure_enabled) {
            Ok(_) => (true, None),
            Err(e) => {
                warn!(error = %e, "Editor settings update failed");
                (false, Some(e.to_string()))
            }
        };

    Ok(SyncReport {
        root: root.display().to_string(),
        project_info: facts,
        resolutions,
        expansion_failures,
        unplannable,
        fetch: fetch_report,
        settings_updated,
        settings_error,
    })
}

/// Accumulates planned files across project types, with run-global
/// destination dedup and a per-run tree-listing cache.
struct Planner<'a> {
    provider: &'a dyn RemoteSource,
    files: Vec<ResolvedFile>,
    claimed: BTreeSet<PathBuf>,
    expansion_failures: Vec<ExpansionFailure>,
    unplannable: Vec<String>,
    tree_cache: HashMap<(String, String), Vec<String>>,
}

impl<'a> Planner<'a> {
    fn new(provider: &'a dyn RemoteSource) -> Self {
        Self {
            provider,
            files: Vec::new(),
            claimed: BTreeSet::new(),
            expansion_failures: Vec::new(),
            unplannable: Vec::new(),
            tree_cache: HashMap::new(),
        }
    }

    async fn plan_category(
        &mut self,
        profile: &str,
        category: Category,
        sources: &[ContextSource],
    ) {
        let mut file_sources: Vec<FileSource> = Vec::new();
        for source in sources {
            match source {
                ContextSource::Url(url) => file_sources.push(FileSource::Url(url.clone())),
                ContextSource::Repo(pattern) => match self.expand_repo(pattern).await {
                    Ok(paths) => {
                        file_sources.extend(paths.into_iter().map(|path| FileSource::RepoFile {
                            repo: pattern.repo.clone(),
                            branch: pattern.branch.clone(),
                            path,
                        }));
                    }
                    Err(e) => {
                        warn!(repo = %pattern.repo, category = %category, error = %e, "Pattern expansion failed");
                        self.expansion_failures.push(ExpansionFailure {
                            source: source.describe(),
                            category,
                            credential_required:
                                matches!(e, RemctxError::CredentialRequired(_)),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        let (planned, rejected) =
            fetch::plan_files(profile, category, &file_sources, &mut self.claimed);
        self.files.extend(planned);
        self.unplannable.extend(rejected);
    }

    /// Expand one repository pattern source into concrete paths. Tree
    /// enumeration only happens when a pattern actually carries a
    /// wildcard, and listings are cached per (repo, branch) for the run.
    async fn expand_repo(&mut self, pattern: &RepoPattern) -> Result<Vec<String>> {
        let needs_tree = pattern
            .paths
            .iter()
            .any(|p| !PathPattern::parse(p).is_literal());

        let tree: &[String] = if needs_tree {
            let key = (pattern.repo.clone(), pattern.branch.clone());
            if !self.tree_cache.contains_key(&key) {
                let listing = self
                    .provider
                    .list_tree(&pattern.repo, &pattern.branch)
                    .await?;
                self.tree_cache.insert(key.clone(), listing);
            }
            self.tree_cache
                .get(&key)
                .map(|v| v.as_slice())
                .unwrap_or(&[])
        } else {
            &[]
        };

        Ok(expand_patterns(&pattern.paths, tree))
    }
}
