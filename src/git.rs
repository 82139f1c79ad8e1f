// src/git.rs
// Git workspace analysis: root discovery and context metadata

use crate::error::{RemctxError, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One recent commit, for workspace-context enrichment
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

/// Repository metadata for `get_workspace_context`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoInfo {
    pub is_git_repo: bool,
    pub origin_url: Option<String>,
    pub current_branch: Option<String>,
    pub recent_commits: Vec<CommitInfo>,
}

/// Find the work-tree root containing `path`. The output layout is
/// anchored here, so a workspace outside any repository is an error the
/// caller reports.
pub fn discover_root(path: &Path) -> Result<PathBuf> {
    let repo = git2::Repository::discover(path).map_err(|_| {
        RemctxError::InvalidInput(format!(
            "{} is not inside a git repository; context setup requires one",
            path.display()
        ))
    })?;
    repo.workdir()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| RemctxError::InvalidInput("bare repositories are not supported".into()))
}

/// Gather repository metadata. Never fails: a non-repo yields
/// `is_git_repo: false`, and each field degrades independently.
pub fn analyze(path: &Path) -> RepoInfo {
    let Ok(repo) = git2::Repository::discover(path) else {
        return RepoInfo::default();
    };

    let origin_url = repo
        .find_remote("origin")
        .ok()
        .and_then(|r| r.url().map(|u| u.to_string()));

    let current_branch = repo
        .head()
        .ok()
        .and_then(|head| head.shorthand().map(|s| s.to_string()));

    let recent_commits = recent_commits(&repo, 5).unwrap_or_default();

    debug!(
        branch = current_branch.as_deref().unwrap_or("?"),
        commits = recent_commits.len(),
        "Analyzed git repository"
    );

    RepoInfo {
        is_git_repo: true,
        origin_url,
        current_branch,
        recent_commits,
    }
}

fn recent_commits(repo: &git2::Repository, limit: usize) -> Result<Vec<CommitInfo>> {
    let mut walk = repo.revwalk()?;
    walk.push_head()?;

    let mut commits = Vec::new();
    for oid in walk.take(limit) {
        let commit = repo.find_commit(oid?)?;
        let date: Option<DateTime<Utc>> = Utc.timestamp_opt(commit.time().seconds(), 0).single();
        commits.push(CommitInfo {
            hash: commit.id().to_string()[..8].to_string(),
            message: commit.summary().unwrap_or("").to_string(),
            author: commit.author().to_string(),
            date: date.map(|d| d.to_rfc3339()).unwrap_or_default(),
        });
    }
    Ok(commits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(dir: &Path) -> git2::Repository {
        let repo = git2::Repository::init(dir).unwrap();
        {
            let mut index = repo.index().unwrap();
            std::fs::write(dir.join("README.md"), "hello").unwrap();
            index.add_path(Path::new("README.md")).unwrap();
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = git2::Signature::now("tester", "tester@example.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial commit", &tree, &[])
                .unwrap();
        }
        repo
    }

    #[test]
    fn test_discover_root_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        let sub = dir.path().join("src/deep");
        std::fs::create_dir_all(&sub).unwrap();

        let root = discover_root(&sub).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_root_outside_repo_fails() {
        let dir = TempDir::new().unwrap();
        let err = discover_root(dir.path()).unwrap_err();
        assert!(matches!(err, RemctxError::InvalidInput(_)));
    }

    #[test]
    fn test_analyze_non_repo() {
        let dir = TempDir::new().unwrap();
        let info = analyze(dir.path());
        assert!(!info.is_git_repo);
        assert!(info.recent_commits.is_empty());
    }

    #[test]
    fn test_analyze_repo_with_commit() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());

        let info = analyze(dir.path());
        assert!(info.is_git_repo);
        assert_eq!(info.recent_commits.len(), 1);
        assert_eq!(info.recent_commits[0].message, "initial commit");
        assert_eq!(info.recent_commits[0].hash.len(), 8);
    }
}
