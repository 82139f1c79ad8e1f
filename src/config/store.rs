// src/config/store.rs
// The context-configuration document: project types -> profiles -> fetch rules

use crate::config::EnvConfig;
use crate::error::{RemctxError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Artifact categories the editor consumes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    Instructions,
    Chatmodes,
    Prompts,
}

/// A context source: a direct URL, or a repository pattern expanded
/// against the repo tree at fetch time.
///
/// In YAML a bare string is a URL; a mapping with `repo` is a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextSource {
    Url(String),
    Repo(RepoPattern),
}

impl ContextSource {
    /// Short display form for reports and logs
    pub fn describe(&self) -> String {
        match self {
            ContextSource::Url(url) => url.clone(),
            ContextSource::Repo(p) => format!("{}@{}:{}", p.repo, p.branch, p.paths.join(",")),
        }
    }
}

/// Repository pattern: owner/repo + branch + ordered glob paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoPattern {
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_paths() -> Vec<String> {
    vec!["*.md".to_string()]
}

/// Ordered source lists per artifact category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<ContextSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chatmodes: Vec<ContextSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompts: Vec<ContextSource>,
}

impl CategorySources {
    pub fn get(&self, category: Category) -> &[ContextSource] {
        match category {
            Category::Instructions => &self.instructions,
            Category::Chatmodes => &self.chatmodes,
            Category::Prompts => &self.prompts,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Vec<ContextSource> {
        match category {
            Category::Instructions => &mut self.instructions,
            Category::Chatmodes => &mut self.chatmodes,
            Category::Prompts => &mut self.prompts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.chatmodes.is_empty() && self.prompts.is_empty()
    }
}

/// One named profile: unconditional rules plus fact-gated additions.
///
/// Conditional rules keep declaration order (IndexMap) - resolution
/// appends them in that order, not in fact-evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "CategorySources::is_empty")]
    pub always_fetch: CategorySources,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub conditional: IndexMap<String, CategorySources>,
}

/// The loaded configuration document. Immutable for the duration of a
/// resolution run; mutations produce a new snapshot via the `with_*`
/// methods and only take effect after a save + reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    #[serde(default)]
    pub project_types: IndexMap<String, IndexMap<String, Profile>>,
}

impl ContextConfig {
    /// Parse a YAML document. Schema violations are ConfigMalformed.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: ContextConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the configured location: a local path (missing file
    /// yields the empty default) or a remote URL fetched through the
    /// shared client.
    pub async fn load(env: &EnvConfig, client: &reqwest::Client) -> Result<Self> {
        if env.config_is_remote() {
            let mut request = client.get(&env.config_file);
            if let Some(token) = &env.github_token {
                if env.config_file.contains("github") {
                    request = request.header("Authorization", format!("token {}", token));
                }
            }
            let response = request.send().await?.error_for_status()?;
            let body = response.text().await?;
            let config = Self::from_yaml(&body)?;
            info!(url = %env.config_file, "Loaded remote configuration");
            return Ok(config);
        }

        match std::fs::read_to_string(&env.config_file) {
            Ok(contents) => {
                let config = Self::from_yaml(&contents)?;
                debug!(path = %env.config_file, "Loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %env.config_file, "Config file not found, using empty defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize back to the local YAML path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| RemctxError::Other(format!("serializing configuration: {}", e)))?;
        std::fs::write(path.as_ref(), yaml)?;
        info!(path = %path.as_ref().display(), "Configuration saved");
        Ok(())
    }

    /// Structural checks beyond the serde schema: at most one active
    /// profile per project type.
    pub fn validate(&self) -> Result<()> {
        for (type_name, profiles) in &self.project_types {
            let active: Vec<&String> = profiles
                .iter()
                .filter(|(_, p)| p.active)
                .map(|(name, _)| name)
                .collect();
            if active.len() > 1 {
                return Err(RemctxError::ConfigMalformed(format!(
                    "project type '{}' has {} active profiles ({}); at most one is allowed",
                    type_name,
                    active.len(),
                    active
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }
        Ok(())
    }

    /// The active profile for a project type, if the type is known and
    /// any profile is flagged active. No fallback: zero active profiles
    /// means the type is inactive.
    pub fn active_profile(&self, project_type: &str) -> Option<(&str, &Profile)> {
        self.project_types
            .get(project_type)?
            .iter()
            .find(|(_, p)| p.active)
            .map(|(name, p)| (name.as_str(), p))
    }

    /// All profile names declared for a project type
    pub fn profile_names(&self, project_type: &str) -> Vec<&str> {
        self.project_types
            .get(project_type)
            .map(|profiles| profiles.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    fn require_profile(&self, project_type: &str, profile_name: &str) -> Result<()> {
        let profiles = self.project_types.get(project_type).ok_or_else(|| {
            RemctxError::InvalidInput(format!(
                "project type '{}' not found in configuration",
                project_type
            ))
        })?;
        if !profiles.contains_key(profile_name) {
            let available: Vec<&str> = profiles.keys().map(|k| k.as_str()).collect();
            return Err(RemctxError::InvalidInput(format!(
                "profile '{}' not found for project type '{}'; available: {}",
                profile_name,
                project_type,
                available.join(", ")
            )));
        }
        Ok(())
    }

    /// New snapshot with exactly one active profile for `project_type`.
    /// The receiver is left untouched.
    pub fn with_active_profile(&self, project_type: &str, profile_name: &str) -> Result<Self> {
        self.require_profile(project_type, profile_name)?;

        let mut next = self.clone();
        if let Some(profiles) = next.project_types.get_mut(project_type) {
            for (name, profile) in profiles.iter_mut() {
                profile.active = name == profile_name;
            }
        }
        Ok(next)
    }

    /// New snapshot with `url` appended to a profile's always-fetch list
    /// for `category`. Duplicates are rejected.
    pub fn with_added_source(
        &self,
        project_type: &str,
        profile_name: &str,
        category: Category,
        source: ContextSource,
    ) -> Result<Self> {
        self.require_profile(project_type, profile_name)?;

        let mut next = self.clone();
        let list = next
            .project_types
            .get_mut(project_type)
            .and_then(|profiles| profiles.get_mut(profile_name))
            .map(|p| p.always_fetch.get_mut(category))
            .ok_or_else(|| RemctxError::Other("profile vanished during update".to_string()))?;

        if list.contains(&source) {
            return Err(RemctxError::InvalidInput(format!(
                "source already present: {}",
                source.describe()
            )));
        }
        list.push(source);
        Ok(next)
    }

    /// New snapshot with `source` removed from a profile's always-fetch
    /// list for `category`.
    pub fn with_removed_source(
        &self,
        project_type: &str,
        profile_name: &str,
        category: Category,
        source: &ContextSource,
    ) -> Result<Self> {
        self.require_profile(project_type, profile_name)?;

        let mut next = self.clone();
        let list = next
            .project_types
            .get_mut(project_type)
            .and_then(|profiles| profiles.get_mut(profile_name))
            .map(|p| p.always_fetch.get_mut(category))
            .ok_or_else(|| RemctxError::Other("profile vanished during update".to_string()))?;

        let before = list.len();
        list.retain(|s| s != source);
        if list.len() == before {
            warn!(source = %source.describe(), "Source not present, nothing removed");
            return Err(RemctxError::InvalidInput(format!(
                "source not present: {}",
                source.describe()
            )));
        }
        Ok(next)
    }
}
