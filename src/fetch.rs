// src/fetch.rs
// The fetch pipeline: resolved files -> bytes on disk, with bounded
// concurrency and per-file outcomes

use crate::config::{Category, FetchSettings};
use crate::error::{RemctxError, Result};
use crate::github::{raw_url, RemoteSource};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Where one resolved file comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    Url(String),
    RepoFile {
        repo: String,
        branch: String,
        path: String,
    },
}

impl FileSource {
    /// The fetchable location: URLs verbatim, repository files via the
    /// raw-content host
    pub fn location(&self) -> String {
        match self {
            FileSource::Url(url) => url.clone(),
            FileSource::RepoFile { repo, branch, path } => raw_url(repo, branch, path),
        }
    }
}

/// One concrete fetch operation: category, source, destination relative
/// to the workspace root
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedFile {
    pub category: Category,
    pub source: FileSource,
    pub dest: PathBuf,
}

/// Destination relative path for a source:
/// `.github/<profile>/<category>/<basename-or-relative-path>`.
/// URL sources keep their basename; repository files keep their
/// repository-relative path.
pub fn destination_rel_path(
    profile: &str,
    category: Category,
    source: &FileSource,
) -> Result<PathBuf> {
    let name = match source {
        FileSource::Url(raw) => {
            let parsed = url::Url::parse(raw)
                .map_err(|e| RemctxError::InvalidInput(format!("bad source URL {}: {}", raw, e)))?;
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    RemctxError::InvalidInput(format!("source URL {} has no file name", raw))
                })?
        }
        FileSource::RepoFile { path, .. } => path.clone(),
    };

    let mut rel = PathBuf::from(".github");
    rel.push(profile);
    rel.push(category.to_string());
    let rel = rel.join(&name);
    if rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(RemctxError::InvalidInput(format!(
            "source path escapes the destination tree: {}",
            name
        )));
    }
    Ok(rel)
}

/// Plan resolved files for one category, claiming destinations in
/// `claimed`. A source whose destination was already claimed this run is
/// dropped - first occurrence supersedes.
pub fn plan_files(
    profile: &str,
    category: Category,
    sources: &[FileSource],
    claimed: &mut BTreeSet<PathBuf>,
) -> (Vec<ResolvedFile>, Vec<String>) {
    let mut files = Vec::new();
    let mut rejected = Vec::new();

    for source in sources {
        match destination_rel_path(profile, category, source) {
            Ok(dest) => {
                if !claimed.insert(dest.clone()) {
                    debug!(dest = %dest.display(), "Destination already claimed, dropping source");
                    continue;
                }
                files.push(ResolvedFile {
                    category,
                    source: source.clone(),
                    dest,
                });
            }
            Err(e) => {
                warn!(error = %e, "Unplannable source");
                rejected.push(format!("{}: {}", source.location(), e));
            }
        }
    }
    (files, rejected)
}

/// One recorded failure
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub source: String,
    pub dest: String,
    pub error: String,
    /// Distinguishable so the caller can prompt for a token
    pub credential_required: bool,
}

/// One written file
#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub category: Category,
    pub source: String,
    pub path: String,
}

/// Aggregate pipeline result. Partial failure is data, not an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Unstarted work abandoned at the overall deadline
    pub abandoned: usize,
    pub written: Vec<WrittenFile>,
    pub failures: Vec<FetchFailure>,
}

enum Outcome {
    Written(ResolvedFile, PathBuf),
    Failed(ResolvedFile, RemctxError),
    Abandoned(ResolvedFile),
}

/// Run the pipeline: fetch every resolved file and write it under
/// `root`, overwriting prior content. One file's failure never aborts
/// the batch; outcomes are merged after the stream completes.
pub async fn run(
    provider: &dyn RemoteSource,
    root: &Path,
    files: Vec<ResolvedFile>,
    settings: &FetchSettings,
) -> FetchReport {
    let deadline = settings.deadline.map(|d| Instant::now() + d);

    let outcomes: Vec<Outcome> = stream::iter(files.into_iter().map(|file| async move {
        // Work not yet started past the deadline is abandoned; completed
        // work stays on disk
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Outcome::Abandoned(file);
        }
        match fetch_one(provider, root, &file).await {
            Ok(path) => Outcome::Written(file, path),
            Err(e) => Outcome::Failed(file, e),
        }
    }))
    .buffer_unordered(settings.concurrency.max(1))
    .collect()
    .await;

    let mut report = FetchReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Written(file, path) => {
                report.succeeded += 1;
                report.written.push(WrittenFile {
                    category: file.category,
                    source: file.source.location(),
                    path: path.display().to_string(),
                });
            }
            Outcome::Failed(file, error) => {
                warn!(source = %file.source.location(), error = %error, "Fetch failed");
                report.failed += 1;
                report.failures.push(FetchFailure {
                    source: file.source.location(),
                    dest: file.dest.display().to_string(),
                    credential_required: matches!(error, RemctxError::CredentialRequired(_)),
                    error: error.to_string(),
                });
            }
            Outcome::Abandoned(file) => {
                report.abandoned += 1;
                report.failures.push(FetchFailure {
                    source: file.source.location(),
                    dest: file.dest.display().to_string(),
                    credential_required: false,
                    error: "abandoned: overall deadline exceeded before dispatch".to_string(),
                });
            }
        }
    }
    report
}

async fn fetch_one(
    provider: &dyn RemoteSource,
    root: &Path,
    file: &ResolvedFile,
) -> Result<PathBuf> {
    let dest = root.join(&file.dest);

    // Parent directory is guaranteed before the network call, so it
    // exists even when the fetch later fails
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = provider.fetch_url(&file.source.location()).await?;
    tokio::fs::write(&dest, &bytes).await?;
    debug!(dest = %dest.display(), bytes = bytes.len(), "Wrote context file");
    Ok(dest)
}
