// src/mcp/tools/context.rs
// The end-to-end fetch-and-setup tool

use crate::config::ContextConfig;
use crate::mcp::RemctxServer;
use crate::sync::{self, Overrides};
use serde_json::json;
use std::path::PathBuf;

/// Fetch remote instructions, chat modes, and prompts into the workspace
/// and register the directories with the editor.
pub async fn fetch_and_setup(
    server: &RemctxServer,
    workspace_dir: Option<String>,
    instructions_urls: Option<Vec<String>>,
    chatmodes_urls: Option<Vec<String>>,
    prompts_urls: Option<Vec<String>>,
    auto_detect: bool,
) -> Result<String, String> {
    let workspace = workspace_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| server.env.workdir.clone());

    // Configuration parse failures abort before any fetch
    let config = ContextConfig::load(&server.env, &server.http)
        .await
        .map_err(|e| e.to_user_string())?;

    let overrides = Overrides {
        instructions: instructions_urls,
        chatmodes: chatmodes_urls,
        prompts: prompts_urls,
    };

    let report = sync::sync_workspace(
        server.github.as_ref(),
        &config,
        &workspace,
        &overrides,
        auto_detect,
        &server.env.fetch,
    )
    .await
    .map_err(|e| e.to_user_string())?;

    let response = json!({
        "success": true,
        "message": format!(
            "Fetched {} context files ({} failed, {} abandoned)",
            report.fetch.succeeded, report.fetch.failed, report.fetch.abandoned
        ),
        "results": report,
    });
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}
