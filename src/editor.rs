// src/editor.rs
// VS Code settings registration for profile context directories

use crate::config::{Category, ContextConfig};
use crate::error::{RemctxError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::info;

fn settings_key(category: Category) -> &'static str {
    match category {
        Category::Instructions => "chat.instructionsFilesLocations",
        Category::Chatmodes => "chat.modeFilesLocations",
        Category::Prompts => "chat.promptFilesLocations",
    }
}

/// Profile-relative context directory for a category
pub fn profile_dir(profile: &str, category: Category) -> String {
    format!(".github/{}/{}", profile, category)
}

/// Merge the context-location keys into `.vscode/settings.json` under
/// `root`. Every profile known to the configuration is listed, enabled
/// iff its profile is active; profiles in `ensure_enabled` (the current
/// run's) are always enabled. Other settings are preserved.
pub fn update_settings(
    root: &Path,
    config: &ContextConfig,
    ensure_enabled: &[String],
) -> Result<PathBuf> {
    let vscode_dir = root.join(".vscode");
    std::fs::create_dir_all(&vscode_dir)?;
    let settings_path = vscode_dir.join("settings.json");

    let mut settings = read_settings(&settings_path)?;

    for category in Category::iter() {
        let mut locations = Map::new();
        for (_, profiles) in &config.project_types {
            for (profile_name, profile) in profiles {
                let enabled =
                    profile.active || ensure_enabled.iter().any(|p| p == profile_name);
                locations.insert(profile_dir(profile_name, category), Value::Bool(enabled));
            }
        }
        for profile_name in ensure_enabled {
            locations.insert(profile_dir(profile_name, category), Value::Bool(true));
        }
        settings.insert(
            settings_key(category).to_string(),
            Value::Object(locations),
        );
    }

    std::fs::write(
        &settings_path,
        serde_json::to_string_pretty(&Value::Object(settings))?,
    )?;
    info!(path = %settings_path.display(), "Updated editor settings");
    Ok(settings_path)
}

fn read_settings(path: &Path) -> Result<Map<String, Value>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RemctxError::InvalidInput(format!(
            "{} is not a JSON object",
            path.display()
        ))),
        Err(e) => Err(RemctxError::InvalidInput(format!(
            "unparsable settings file {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
project_types:
  python:
    default:
      active: true
    strict: {}
"#;

    #[test]
    fn test_profile_dir_layout() {
        assert_eq!(
            profile_dir("default", Category::Instructions),
            ".github/default/instructions"
        );
        assert_eq!(profile_dir("team", Category::Chatmodes), ".github/team/chatmodes");
    }

    #[test]
    fn test_update_creates_settings() {
        let dir = TempDir::new().unwrap();
        let config = ContextConfig::from_yaml(CONFIG).unwrap();

        let path = update_settings(dir.path(), &config, &["default".to_string()]).unwrap();
        let settings: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        let locations = &settings["chat.instructionsFilesLocations"];
        assert_eq!(locations[".github/default/instructions"], Value::Bool(true));
        assert_eq!(locations[".github/strict/instructions"], Value::Bool(false));
        assert!(settings["chat.promptFilesLocations"].is_object());
        assert!(settings["chat.modeFilesLocations"].is_object());
    }

    #[test]
    fn test_update_preserves_unrelated_settings() {
        let dir = TempDir::new().unwrap();
        let vscode = dir.path().join(".vscode");
        std::fs::create_dir_all(&vscode).unwrap();
        std::fs::write(
            vscode.join("settings.json"),
            r#"{"editor.tabSize": 2}"#,
        )
        .unwrap();

        let config = ContextConfig::from_yaml(CONFIG).unwrap();
        let path = update_settings(dir.path(), &config, &[]).unwrap();

        let settings: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(settings["editor.tabSize"], Value::from(2));
    }

    #[test]
    fn test_malformed_settings_is_an_error() {
        let dir = TempDir::new().unwrap();
        let vscode = dir.path().join(".vscode");
        std::fs::create_dir_all(&vscode).unwrap();
        std::fs::write(vscode.join("settings.json"), "{broken").unwrap();

        let config = ContextConfig::from_yaml(CONFIG).unwrap();
        let err = update_settings(dir.path(), &config, &[]).unwrap_err();
        assert!(matches!(err, RemctxError::InvalidInput(_)));
    }

    #[test]
    fn test_ensure_enabled_overrides_inactive() {
        let dir = TempDir::new().unwrap();
        let config = ContextConfig::from_yaml(CONFIG).unwrap();

        let path = update_settings(dir.path(), &config, &["strict".to_string()]).unwrap();
        let settings: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            settings["chat.promptFilesLocations"][".github/strict/prompts"],
            Value::Bool(true)
        );
    }
}
