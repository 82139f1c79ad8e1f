// src/detect.rs
// Workspace fact detection: project types and framework indicators

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Detected boolean facts about one workspace.
///
/// Project-type facts drive which configuration sections apply;
/// condition facts gate a profile's conditional rules. Both are derived
/// fresh on every run and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FactSet {
    pub project_types: BTreeSet<String>,
    pub conditions: BTreeMap<String, bool>,
}

impl FactSet {
    pub fn is_project_type(&self, name: &str) -> bool {
        self.project_types.contains(name)
    }

    /// A condition fact; absent facts are false
    pub fn condition(&self, name: &str) -> bool {
        self.conditions.get(name).copied().unwrap_or(false)
    }

    fn add_type(&mut self, name: &str) {
        self.project_types.insert(name.to_string());
    }

    fn set(&mut self, name: &str, value: bool) {
        self.conditions.insert(name.to_string(), value);
    }
}

/// Detect project types and framework facts from a workspace root.
///
/// Pure function of workspace state: inspects the immediate file listing
/// and the content of well-known manifests. No network access, no
/// mutation. Unreadable manifests simply leave their dependent facts
/// false.
pub fn detect(root: &Path) -> FactSet {
    let mut facts = FactSet::default();
    let files = list_immediate_files(root);
    let has = |name: &str| files.contains(name);

    // Project types; several may hold at once
    if has("requirements.txt") || has("setup.py") || has("pyproject.toml") || has("__init__.py") {
        facts.add_type("python");
    }
    if has("package.json") {
        facts.add_type("javascript");
        if has("tsconfig.json") || files.iter().any(|f| f.ends_with(".ts")) {
            facts.add_type("typescript");
        }
    }
    if has("Cargo.toml") {
        facts.add_type("rust");
    }
    if has("go.mod") || files.iter().any(|f| f.ends_with(".go")) {
        facts.add_type("go");
    }
    if facts.project_types.is_empty() {
        facts.add_type("generic");
    }

    detect_package_json(root, &mut facts);
    detect_python_manifests(root, &mut facts);

    facts.set("has_setup_py", has("setup.py"));
    facts.set("has_tsconfig", has("tsconfig.json"));
    facts.set("has_cargo_toml", has("Cargo.toml"));
    facts.set("has_go_mod", has("go.mod"));

    debug!(
        types = ?facts.project_types,
        conditions = facts.conditions.values().filter(|v| **v).count(),
        "Workspace facts detected"
    );
    facts
}

/// File names in the immediate listing of the root (no recursion)
fn list_immediate_files(root: &Path) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return files;
    };
    for entry in entries.flatten() {
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.insert(entry.file_name().to_string_lossy().to_string());
        }
    }
    files
}

/// Framework facts from package.json dependencies and devDependencies
fn detect_package_json(root: &Path, facts: &mut FactSet) {
    let Some(data) = read_json(&root.join("package.json")) else {
        return;
    };
    facts.set("has_package_json", true);

    let mut deps: BTreeSet<String> = BTreeSet::new();
    for key in ["dependencies", "devDependencies"] {
        if let Some(map) = data.get(key).and_then(|v| v.as_object()) {
            deps.extend(map.keys().cloned());
        }
    }

    facts.set("has_react", deps.contains("react"));
    facts.set("has_nextjs", deps.contains("next"));
    facts.set("has_express", deps.contains("express"));
    facts.set("has_typescript", deps.contains("typescript"));
}

/// Framework facts from requirements.txt and pyproject.toml content
fn detect_python_manifests(root: &Path, facts: &mut FactSet) {
    let requirements = read_lowercase(&root.join("requirements.txt"));
    if requirements.is_some() {
        facts.set("has_requirements_txt", true);
    }

    let pyproject = read_lowercase(&root.join("pyproject.toml"));
    if pyproject.is_some() {
        facts.set("has_pyproject_toml", true);
    }

    // A framework fact holds when either manifest names it
    let mentions = |keyword: &str| {
        requirements.as_deref().is_some_and(|c| c.contains(keyword))
            || pyproject.as_deref().is_some_and(|c| c.contains(keyword))
    };
    if requirements.is_some() || pyproject.is_some() {
        facts.set("has_django", mentions("django"));
        facts.set("has_flask", mentions("flask"));
        facts.set("has_fastapi", mentions("fastapi"));
    }
}

fn read_json(path: &Path) -> Option<serde_json::Value> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unparsable manifest, skipping");
            None
        }
    }
}

fn read_lowercase(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|c| c.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    // ========================================================================
    // Project types
    // ========================================================================

    #[test]
    fn test_python_only_workspace() {
        let dir = workspace(&[("requirements.txt", "requests==2.31\n")]);
        let facts = detect(dir.path());

        assert!(facts.is_project_type("python"));
        assert!(!facts.is_project_type("javascript"));
        assert!(facts.condition("has_requirements_txt"));
    }

    #[test]
    fn test_javascript_and_typescript() {
        let dir = workspace(&[("package.json", "{}"), ("tsconfig.json", "{}")]);
        let facts = detect(dir.path());

        assert!(facts.is_project_type("javascript"));
        assert!(facts.is_project_type("typescript"));
        assert!(facts.condition("has_tsconfig"));
    }

    #[test]
    fn test_typescript_from_ts_file() {
        let dir = workspace(&[("package.json", "{}"), ("index.ts", "export {};")]);
        let facts = detect(dir.path());
        assert!(facts.is_project_type("typescript"));
    }

    #[test]
    fn test_rust_and_go() {
        let dir = workspace(&[("Cargo.toml", "[package]"), ("go.mod", "module x")]);
        let facts = detect(dir.path());

        assert!(facts.is_project_type("rust"));
        assert!(facts.is_project_type("go"));
        assert!(facts.condition("has_cargo_toml"));
        assert!(facts.condition("has_go_mod"));
    }

    #[test]
    fn test_generic_fallback() {
        let dir = workspace(&[("README.md", "hello")]);
        let facts = detect(dir.path());
        assert_eq!(
            facts.project_types.iter().collect::<Vec<_>>(),
            vec!["generic"]
        );
    }

    #[test]
    fn test_missing_root_yields_generic() {
        let facts = detect(Path::new("/nonexistent/workspace/path"));
        assert!(facts.is_project_type("generic"));
    }

    // ========================================================================
    // Framework conditions
    // ========================================================================

    #[test]
    fn test_nextjs_detection() {
        let dir = workspace(&[(
            "package.json",
            r#"{"dependencies": {"next": "14.0.0", "react": "18.0.0"}}"#,
        )]);
        let facts = detect(dir.path());

        assert!(facts.is_project_type("javascript"));
        assert!(facts.condition("has_nextjs"));
        assert!(facts.condition("has_react"));
        assert!(!facts.condition("has_express"));
    }

    #[test]
    fn test_dev_dependencies_count() {
        let dir = workspace(&[(
            "package.json",
            r#"{"devDependencies": {"typescript": "5.0.0"}}"#,
        )]);
        let facts = detect(dir.path());
        assert!(facts.condition("has_typescript"));
    }

    #[test]
    fn test_django_from_requirements() {
        let dir = workspace(&[("requirements.txt", "Django>=4.2\npsycopg2\n")]);
        let facts = detect(dir.path());

        assert!(facts.condition("has_django"));
        assert!(!facts.condition("has_flask"));
    }

    #[test]
    fn test_fastapi_from_pyproject() {
        let dir = workspace(&[(
            "pyproject.toml",
            "[project]\ndependencies = [\"fastapi\", \"uvicorn\"]\n",
        )]);
        let facts = detect(dir.path());

        assert!(facts.is_project_type("python"));
        assert!(facts.condition("has_pyproject_toml"));
        assert!(facts.condition("has_fastapi"));
    }

    #[test]
    fn test_unreadable_package_json_is_not_fatal() {
        let dir = workspace(&[("package.json", "{not json")]);
        let facts = detect(dir.path());

        // Still a javascript workspace by file presence, but no
        // dependency-derived facts
        assert!(facts.is_project_type("javascript"));
        assert!(!facts.condition("has_package_json"));
        assert!(!facts.condition("has_react"));
    }

    #[test]
    fn test_detection_is_pure() {
        let dir = workspace(&[("requirements.txt", "flask\n"), ("package.json", "{}")]);
        let first = detect(dir.path());
        let second = detect(dir.path());
        assert_eq!(first, second);
    }
}
