// src/main.rs
// remctx - Remote context files for Copilot workspaces

use anyhow::Result;
use clap::{Parser, Subcommand};
use remctx::config::{ContextConfig, EnvConfig};
use remctx::github::GitHubClient;
use remctx::mcp::RemctxServer;
use remctx::sync::{self, Overrides};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "remctx")]
#[command(about = "Remote context files for Copilot workspaces")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as MCP server (default, stdio transport)
    Serve,

    /// Detect project types and framework facts for a workspace
    Detect {
        /// Workspace path (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Resolve and fetch context files for a workspace
    Sync {
        /// Workspace path (default: CONTEXT_WORKDIR)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Skip project detection (fetch nothing unless URLs are configured)
        #[arg(long)]
        no_detect: bool,
    },

    /// Activate a profile for a project type
    Activate {
        /// Project type (python, javascript, ...)
        project_type: String,

        /// Profile name
        profile_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("remctx=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_mcp_server().await,
        Commands::Detect { path } => run_detect(path),
        Commands::Sync { path, no_detect } => run_sync(path, no_detect).await,
        Commands::Activate {
            project_type,
            profile_name,
        } => run_activate(project_type, profile_name).await,
    }
}

async fn run_mcp_server() -> Result<()> {
    let env = EnvConfig::load();
    for warning in &env.validate().warnings {
        warn!("{}", warning);
    }

    info!(config = %env.config_file, workdir = %env.workdir.display(), "Starting remctx MCP server");

    let server = RemctxServer::new(env);
    let transport = rmcp::transport::io::stdio();
    let service = rmcp::serve_server(server, transport).await?;
    service.waiting().await?;

    Ok(())
}

fn run_detect(path: Option<PathBuf>) -> Result<()> {
    let workspace = match path {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    let facts = remctx::detect::detect(&workspace);
    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}

async fn run_sync(path: Option<PathBuf>, no_detect: bool) -> Result<()> {
    let env = EnvConfig::load();
    for warning in &env.validate().warnings {
        warn!("{}", warning);
    }

    let workspace = path.unwrap_or_else(|| env.workdir.clone());
    let http = remctx::http::create_client_with_timeout(env.fetch.request_timeout);
    let config = ContextConfig::load(&env, &http).await?;
    let github = GitHubClient::new(http, env.github_token.clone(), &env.fetch);

    let report = sync::sync_workspace(
        &github,
        &config,
        &workspace,
        &Overrides::default(),
        !no_detect,
        &env.fetch,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.fetch.failed > 0 {
        warn!(failed = report.fetch.failed, "Some context files failed to fetch");
    }
    Ok(())
}

async fn run_activate(project_type: String, profile_name: String) -> Result<()> {
    let env = EnvConfig::load();
    if env.config_is_remote() {
        anyhow::bail!("configuration is loaded from a remote URL and cannot be modified");
    }

    let http = remctx::http::create_shared_client();
    let config = ContextConfig::load(&env, &http).await?;
    let next = config.with_active_profile(&project_type, &profile_name)?;
    next.save(&env.config_file)?;

    println!(
        "Profile '{}' activated for project type '{}'",
        profile_name, project_type
    );
    Ok(())
}
