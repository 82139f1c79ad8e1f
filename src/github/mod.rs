// src/github/mod.rs
// Remote content access: raw fetches and repository tree enumeration

pub mod pattern;

use crate::config::FetchSettings;
use crate::error::{RemctxError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default base backoff between retries (doubles each attempt)
const DEFAULT_BASE_BACKOFF_SECS: u64 = 1;

/// Remote access seam for the expander and the fetch pipeline.
/// Production uses `GitHubClient`; tests substitute fakes.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the raw bytes of a URL
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>>;

    /// Enumerate blob paths of a repository tree at a branch.
    /// An incomplete listing is an error, never a silent truncation.
    async fn list_tree(&self, repo: &str, branch: &str) -> Result<Vec<String>>;
}

/// Raw-content URL for a repository file at a branch
pub fn raw_url(repo: &str, branch: &str, path: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/{}/{}/{}",
        repo, branch, path
    )
}

fn is_github_host(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .is_some_and(|host| host == "github.com" || host.ends_with(".github.com") || host == "raw.githubusercontent.com" || host == "api.github.com")
}

/// Shared pause gate: rate-limit responses stop new dispatch until the
/// pause expires, instead of letting every in-flight task fail.
#[derive(Debug, Default)]
struct PauseGate {
    until: Mutex<Option<Instant>>,
}

impl PauseGate {
    /// Extend the pause; never shortens an existing one
    fn pause_for(&self, delay: Duration) {
        let target = Instant::now() + delay;
        let mut guard = self.until.lock().unwrap_or_else(|e| e.into_inner());
        if guard.map(|current| current < target).unwrap_or(true) {
            *guard = Some(target);
        }
    }

    fn remaining(&self) -> Option<Duration> {
        let guard = self.until.lock().unwrap_or_else(|e| e.into_inner());
        guard.and_then(|until| until.checked_duration_since(Instant::now()))
    }

    /// Wait out any active pause before dispatching
    async fn wait(&self) {
        while let Some(remaining) = self.remaining() {
            tokio::time::sleep(remaining).await;
        }
    }
}

/// GitHub-aware HTTP access with retry, backoff, and credential
/// classification. The bearer token is only ever attached to GitHub
/// hosts.
pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
    max_attempts: u32,
    base_backoff: Duration,
    pause: PauseGate,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, token: Option<String>, settings: &FetchSettings) -> Self {
        Self {
            http,
            token,
            max_attempts: settings.max_attempts,
            base_backoff: Duration::from_secs(DEFAULT_BASE_BACKOFF_SECS),
            pause: PauseGate::default(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// GET with retry on transient failures. Rate-limit responses pause
    /// new dispatch across all concurrent callers.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut attempts = 0;
        let mut backoff = self.base_backoff;

        loop {
            self.pause.wait().await;

            let mut request = self.http.get(url);
            if let Some(token) = &self.token {
                if is_github_host(url) {
                    request = request.header("Authorization", format!("token {}", token));
                }
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    if is_rate_limited(&response) {
                        let delay = retry_after(&response).unwrap_or(backoff);
                        self.pause.pause_for(delay);
                        if attempts < self.max_attempts {
                            warn!(url, status = %status, "Rate limited, backing off {:?}", delay);
                            attempts += 1;
                            backoff *= 2;
                            continue;
                        }
                    } else if status.is_server_error() && attempts < self.max_attempts {
                        warn!(url, status = %status, "Transient error, retrying in {:?}", backoff);
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        backoff *= 2;
                        continue;
                    }

                    return Err(self.classify_terminal(url, status));
                }
                Err(e) => {
                    // Only connect/timeout errors are safe to retry; the
                    // request may otherwise have been processed
                    if attempts < self.max_attempts && (e.is_connect() || e.is_timeout()) {
                        warn!(url, error = %e, "Request failed, retrying in {:?}", backoff);
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        backoff *= 2;
                        continue;
                    }
                    return Err(RemctxError::FetchFailed(format!("{}: {}", url, e)));
                }
            }
        }
    }

    /// Map a terminal non-2xx status to an error kind. Missing
    /// credentials must stay distinguishable so the caller can prompt
    /// for a token.
    fn classify_terminal(&self, url: &str, status: reqwest::StatusCode) -> RemctxError {
        use reqwest::StatusCode;

        if status == StatusCode::UNAUTHORIZED {
            return RemctxError::CredentialRequired(format!("{} rejected the credential", url));
        }
        if self.token.is_none()
            && is_github_host(url)
            && matches!(status, StatusCode::FORBIDDEN | StatusCode::NOT_FOUND)
        {
            // GitHub reports private resources as 404 to anonymous callers
            return RemctxError::CredentialRequired(format!(
                "{} returned {} without a token; set GITHUB_TOKEN for private sources",
                url, status
            ));
        }
        RemctxError::FetchFailed(format!("{}: HTTP {}", url, status))
    }
}

fn is_rate_limited(response: &reqwest::Response) -> bool {
    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    response.status() == reqwest::StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false)
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[async_trait]
impl RemoteSource for GitHubClient {
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get_with_retry(url).await?;
        let bytes = response.bytes().await?;
        debug!(url, bytes = bytes.len(), "Fetched remote content");
        Ok(bytes.to_vec())
    }

    async fn list_tree(&self, repo: &str, branch: &str) -> Result<Vec<String>> {
        let url = format!(
            "https://api.github.com/repos/{}/git/trees/{}?recursive=1",
            repo, branch
        );
        let response = self.get_with_retry(&url).await?;
        let listing: TreeResponse = response.json().await?;

        // The trees endpoint does not page; it flags an incomplete
        // listing instead. Expanding against a partial tree would
        // silently drop matches.
        if listing.truncated {
            return Err(RemctxError::PatternExpansion {
                repo: repo.to_string(),
                reason: format!("tree listing for branch '{}' is truncated", branch),
            });
        }

        let paths: Vec<String> = listing
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| entry.path)
            .collect();
        debug!(repo, branch, files = paths.len(), "Enumerated repository tree");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<&str>, max_attempts: u32) -> GitHubClient {
        GitHubClient {
            http: reqwest::Client::new(),
            token: token.map(|t| t.to_string()),
            max_attempts,
            base_backoff: Duration::from_millis(10),
            pause: PauseGate::default(),
        }
    }

    // ========================================================================
    // URL handling
    // ========================================================================

    #[test]
    fn test_raw_url_format() {
        assert_eq!(
            raw_url("acme/context", "main", "instructions/a.md"),
            "https://raw.githubusercontent.com/acme/context/main/instructions/a.md"
        );
    }

    #[test]
    fn test_is_github_host() {
        assert!(is_github_host("https://api.github.com/repos/a/b"));
        assert!(is_github_host("https://raw.githubusercontent.com/a/b/main/x.md"));
        assert!(is_github_host("https://github.com/a/b"));
        assert!(!is_github_host("https://example.com/x.md"));
        assert!(!is_github_host("not a url"));
    }

    // ========================================================================
    // Terminal classification
    // ========================================================================

    #[test]
    fn test_unauthorized_is_credential_required() {
        let c = client(Some("tok"), 0);
        let err = c.classify_terminal(
            "https://api.github.com/x",
            reqwest::StatusCode::UNAUTHORIZED,
        );
        assert!(matches!(err, RemctxError::CredentialRequired(_)));
    }

    #[test]
    fn test_anonymous_github_404_is_credential_required() {
        let c = client(None, 0);
        let err = c.classify_terminal(
            "https://raw.githubusercontent.com/a/b/main/x.md",
            reqwest::StatusCode::NOT_FOUND,
        );
        assert!(matches!(err, RemctxError::CredentialRequired(_)));
    }

    #[test]
    fn test_authenticated_404_is_fetch_failed() {
        let c = client(Some("tok"), 0);
        let err = c.classify_terminal(
            "https://raw.githubusercontent.com/a/b/main/x.md",
            reqwest::StatusCode::NOT_FOUND,
        );
        assert!(matches!(err, RemctxError::FetchFailed(_)));
    }

    #[test]
    fn test_non_github_404_is_fetch_failed() {
        let c = client(None, 0);
        let err =
            c.classify_terminal("https://example.com/x.md", reqwest::StatusCode::NOT_FOUND);
        assert!(matches!(err, RemctxError::FetchFailed(_)));
    }

    // ========================================================================
    // Pause gate
    // ========================================================================

    #[tokio::test]
    async fn test_pause_gate_delays_dispatch() {
        let gate = PauseGate::default();
        gate.pause_for(Duration::from_millis(30));

        let start = Instant::now();
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(25));

        // Expired pause no longer blocks
        let start = Instant::now();
        gate.wait().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn test_pause_gate_never_shortens() {
        let gate = PauseGate::default();
        gate.pause_for(Duration::from_secs(60));
        gate.pause_for(Duration::from_millis(1));
        assert!(gate.remaining().unwrap() > Duration::from_secs(30));
    }

    // ========================================================================
    // Retry behavior (requires tokio + actual sockets)
    // ========================================================================

    #[tokio::test]
    async fn test_connection_refused_exhausts_retries() {
        let c = client(None, 1);
        let result = c.fetch_url("http://127.0.0.1:1/never").await;
        assert!(matches!(result, Err(RemctxError::FetchFailed(_))));
    }
}
