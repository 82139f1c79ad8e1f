// src/mcp/tools/profiles.rs
// Configuration inspection and mutation tools

use crate::config::{Category, ContextConfig, ContextSource};
use crate::editor;
use crate::error::RemctxError;
use crate::git;
use crate::mcp::RemctxServer;
use serde_json::json;
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::warn;

/// Dump the loaded configuration
pub async fn list_context_config(server: &RemctxServer) -> Result<String, String> {
    let config = ContextConfig::load(&server.env, &server.http)
        .await
        .map_err(|e| e.to_user_string())?;
    serde_json::to_string_pretty(&config).map_err(|e| e.to_string())
}

/// Activate a profile for a project type. Produces a new configuration
/// snapshot, persists it, and re-registers editor directories; the
/// change applies to the next resolution run.
pub async fn set_active_profile(
    server: &RemctxServer,
    project_type: String,
    profile_name: String,
) -> Result<String, String> {
    if server.env.config_is_remote() {
        return Err(RemctxError::InvalidInput(
            "configuration is loaded from a remote URL and cannot be modified".to_string(),
        )
        .into());
    }

    let config = ContextConfig::load(&server.env, &server.http)
        .await
        .map_err(|e| e.to_user_string())?;
    let next = config
        .with_active_profile(&project_type, &profile_name)
        .map_err(|e| e.to_user_string())?;
    next.save(&server.env.config_file)
        .map_err(|e| e.to_user_string())?;

    // Re-register directories when the workspace is a repository; a
    // missing repository only skips this step
    let mut settings_updated = false;
    match git::discover_root(&server.env.workdir) {
        Ok(root) => match editor::update_settings(&root, &next, &[profile_name.clone()]) {
            Ok(_) => settings_updated = true,
            Err(e) => warn!(error = %e, "Editor settings update failed"),
        },
        Err(e) => warn!(error = %e, "No repository for editor settings"),
    }

    let directories: serde_json::Map<String, serde_json::Value> = Category::iter()
        .map(|c| {
            (
                c.to_string(),
                json!(editor::profile_dir(&profile_name, c)),
            )
        })
        .collect();

    let response = json!({
        "success": true,
        "message": format!(
            "Profile '{}' activated for project type '{}'",
            profile_name, project_type
        ),
        "active_profile": {
            "name": profile_name,
            "project_type": project_type,
            "directories": directories,
        },
        "settings_updated": settings_updated,
    });
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

/// List the profiles declared for a project type
pub async fn get_available_profiles(
    server: &RemctxServer,
    project_type: String,
) -> Result<String, String> {
    let config = ContextConfig::load(&server.env, &server.http)
        .await
        .map_err(|e| e.to_user_string())?;

    let Some(profiles) = config.project_types.get(&project_type) else {
        return Err(format!("project type '{}' not found", project_type));
    };

    let mut info = serde_json::Map::new();
    for (name, profile) in profiles {
        let directories: serde_json::Map<String, serde_json::Value> = Category::iter()
            .map(|c| (c.to_string(), json!(editor::profile_dir(name, c))))
            .collect();
        info.insert(
            name.clone(),
            json!({
                "active": profile.active,
                "directories": directories,
                "has_always_fetch": !profile.always_fetch.is_empty(),
                "has_conditional": !profile.conditional.is_empty(),
            }),
        );
    }

    let response = json!({
        "success": true,
        "project_type": project_type,
        "profiles": info,
    });
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

/// Append a URL to a profile's always-fetch list
pub async fn add_context_url(
    server: &RemctxServer,
    project_type: String,
    profile_name: String,
    category: String,
    url: String,
) -> Result<String, String> {
    mutate_sources(server, &project_type, &profile_name, &category, |config, cat| {
        config.with_added_source(
            &project_type,
            &profile_name,
            cat,
            ContextSource::Url(url.clone()),
        )
    })
    .await
}

/// Remove a URL from a profile's always-fetch list
pub async fn remove_context_url(
    server: &RemctxServer,
    project_type: String,
    profile_name: String,
    category: String,
    url: String,
) -> Result<String, String> {
    mutate_sources(server, &project_type, &profile_name, &category, |config, cat| {
        config.with_removed_source(
            &project_type,
            &profile_name,
            cat,
            &ContextSource::Url(url.clone()),
        )
    })
    .await
}

async fn mutate_sources<F>(
    server: &RemctxServer,
    project_type: &str,
    profile_name: &str,
    category: &str,
    mutate: F,
) -> Result<String, String>
where
    F: FnOnce(&ContextConfig, Category) -> crate::error::Result<ContextConfig>,
{
    if server.env.config_is_remote() {
        return Err(RemctxError::InvalidInput(
            "configuration is loaded from a remote URL and cannot be modified".to_string(),
        )
        .into());
    }

    let cat = Category::from_str(category).map_err(|_| {
        format!(
            "unknown category '{}'; expected instructions, chatmodes, or prompts",
            category
        )
    })?;

    let config = ContextConfig::load(&server.env, &server.http)
        .await
        .map_err(|e| e.to_user_string())?;
    let next = mutate(&config, cat).map_err(|e| e.to_user_string())?;
    next.save(&server.env.config_file)
        .map_err(|e| e.to_user_string())?;

    let response = json!({
        "success": true,
        "project_type": project_type,
        "profile": profile_name,
        "category": cat,
    });
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}
