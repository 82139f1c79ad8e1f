// src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tuning knobs for the fetch pipeline
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Maximum concurrent downloads (CONTEXT_FETCH_CONCURRENCY)
    pub concurrency: usize,
    /// Retry attempts for transient failures (CONTEXT_FETCH_ATTEMPTS)
    pub max_attempts: u32,
    /// Per-request timeout (CONTEXT_FETCH_TIMEOUT_SECS)
    pub request_timeout: Duration,
    /// Overall batch deadline; unstarted work past this is abandoned
    /// (CONTEXT_FETCH_DEADLINE_SECS, unset = no deadline)
    pub deadline: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            request_timeout: Duration::from_secs(30),
            deadline: None,
        }
    }
}

impl FetchSettings {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            concurrency: parse_env("CONTEXT_FETCH_CONCURRENCY")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.concurrency),
            max_attempts: parse_env("CONTEXT_FETCH_ATTEMPTS").unwrap_or(defaults.max_attempts),
            request_timeout: parse_env("CONTEXT_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            deadline: parse_env("CONTEXT_FETCH_DEADLINE_SECS").map(Duration::from_secs),
        }
    }
}

/// Environment configuration - all env vars in one place
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// GitHub bearer credential (GITHUB_TOKEN); optional, public sources
    /// still fetch without it
    pub github_token: Option<String>,
    /// Context-configuration document: local path or http(s) URL
    /// (CONTEXT_CONFIG_FILE)
    pub config_file: String,
    /// Default workspace directory (CONTEXT_WORKDIR)
    pub workdir: PathBuf,
    /// Fetch pipeline settings
    pub fetch: FetchSettings,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        // Pick up a .env file when present; absence is fine
        if dotenvy::dotenv().is_ok() {
            debug!("Loaded .env file");
        }

        info!("Loading environment configuration");

        let config = Self {
            github_token: read_var("GITHUB_TOKEN"),
            config_file: read_var("CONTEXT_CONFIG_FILE")
                .unwrap_or_else(|| "context_config.yaml".to_string()),
            workdir: read_var("CONTEXT_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            fetch: FetchSettings::from_env(),
        };

        if config.github_token.is_some() {
            debug!("GitHub token loaded");
        }

        config
    }

    /// Whether the configuration document lives at a remote URL
    pub fn config_is_remote(&self) -> bool {
        self.config_file.starts_with("http://") || self.config_file.starts_with("https://")
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if self.github_token.is_none() {
            validation.add_warning(
                "No GITHUB_TOKEN configured. Public sources still fetch; \
                 private repositories and high-volume tree listings will fail.",
            );
        }

        if self.config_is_remote() {
            validation.add_warning(format!(
                "Configuration is remote ({}); profile mutations cannot be saved.",
                self.config_file
            ));
        }

        validation
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }

        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for warn in &self.warnings {
                lines.push(format!("  - {}", warn));
            }
        }

        if lines.is_empty() {
            "Configuration OK".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Read an env var, filtering empty values
fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    match read_var(name) {
        Some(v) => match v.trim().parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                warn!(var = name, value = %v, "Unparsable env var, using default");
                None
            }
        },
        None => None,
    }
}
