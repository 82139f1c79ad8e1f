// src/mcp/tools/workspace.rs
// Workspace context inspection

use crate::detect;
use crate::git;
use crate::mcp::RemctxServer;
use serde_json::json;
use std::path::PathBuf;

/// Manifests worth summarizing in the context report
const KEY_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
    "tsconfig.json",
];

/// Gather workspace context for use as input to the fetch tools
pub async fn get_workspace_context(
    server: &RemctxServer,
    workspace_path: Option<String>,
    include_git_info: bool,
    include_file_analysis: bool,
) -> Result<String, String> {
    let dir = workspace_path
        .map(PathBuf::from)
        .unwrap_or_else(|| server.env.workdir.clone());
    let absolute = dir
        .canonicalize()
        .unwrap_or_else(|_| dir.clone());

    let facts = detect::detect(&dir);
    let mut context = json!({
        "workspace_path": absolute.display().to_string(),
        "project_types": facts.project_types,
        "detected_conditions": facts.conditions,
    });

    if include_git_info {
        context["git_info"] = serde_json::to_value(git::analyze(&dir)).map_err(|e| e.to_string())?;
    }

    if include_file_analysis {
        let mut key_files = serde_json::Map::new();
        for name in KEY_FILES {
            let path = dir.join(name);
            if !path.exists() {
                continue;
            }
            let entry = match std::fs::read_to_string(&path) {
                Ok(contents) => json!({
                    "exists": true,
                    "size": contents.len(),
                    "lines": contents.lines().count(),
                }),
                Err(_) => json!({ "exists": true, "error": "Could not read file" }),
            };
            key_files.insert(name.to_string(), entry);
        }
        context["key_files"] = serde_json::Value::Object(key_files);
    }

    let mut suggestions: Vec<String> = facts
        .project_types
        .iter()
        .map(|t| format!("Fetch context for {} project", t))
        .collect();
    if facts.condition("has_react") {
        suggestions.push("Consider fetching React-specific docs".to_string());
    }
    if facts.condition("has_django") {
        suggestions.push("Consider fetching Django-specific docs".to_string());
    }
    context["suggested_actions"] = json!(suggestions);

    serde_json::to_string_pretty(&context).map_err(|e| e.to_string())
}
