// src/resolve.rs
// Rule resolution: active profile + detected facts -> ordered source lists

use crate::config::{Category, CategorySources, ContextConfig, ContextSource};
use crate::detect::FactSet;
use strum::IntoEnumIterator;
use tracing::debug;

/// The resolved source lists for one project type.
///
/// `profile` is None when the type is inactive (no active profile or
/// unknown type); all lists are empty in that case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSources {
    pub project_type: String,
    pub profile: Option<String>,
    pub sources: CategorySources,
}

impl ResolvedSources {
    pub fn is_active(&self) -> bool {
        self.profile.is_some()
    }

    pub fn get(&self, category: Category) -> &[ContextSource] {
        self.sources.get(category)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Resolve the context sources for one project type.
///
/// Pure function: always-fetch entries first in declared order, then
/// conditional additions in configuration declaration order (never
/// fact-evaluation order), deduplicated first-occurrence-wins. A type
/// with no active profile resolves to empty lists - the caller skips it.
pub fn resolve(config: &ContextConfig, project_type: &str, facts: &FactSet) -> ResolvedSources {
    let Some((profile_name, profile)) = config.active_profile(project_type) else {
        debug!(project_type, "No active profile, type inactive");
        return ResolvedSources {
            project_type: project_type.to_string(),
            ..Default::default()
        };
    };

    let mut sources = CategorySources::default();
    for category in Category::iter() {
        let list = sources.get_mut(category);

        for source in profile.always_fetch.get(category) {
            push_unique(list, source);
        }

        // Declaration order of the conditional map is load-bearing
        for (fact_name, additions) in &profile.conditional {
            if facts.condition(fact_name) {
                for source in additions.get(category) {
                    push_unique(list, source);
                }
            }
        }
    }

    debug!(
        project_type,
        profile = profile_name,
        instructions = sources.instructions.len(),
        chatmodes = sources.chatmodes.len(),
        prompts = sources.prompts.len(),
        "Resolved context sources"
    );

    ResolvedSources {
        project_type: project_type.to_string(),
        profile: Some(profile_name.to_string()),
        sources,
    }
}

fn push_unique(list: &mut Vec<ContextSource>, source: &ContextSource) {
    if !list.contains(source) {
        list.push(source.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> ContextConfig {
        ContextConfig::from_yaml(yaml).unwrap()
    }

    fn facts(conditions: &[&str]) -> FactSet {
        let mut facts = FactSet::default();
        for name in conditions {
            facts.conditions.insert(name.to_string(), true);
        }
        facts
    }

    fn url(s: &str) -> ContextSource {
        ContextSource::Url(s.to_string())
    }

    const LAYERED: &str = r#"
project_types:
  python:
    default:
      active: true
      always_fetch:
        instructions:
          - "https://example.com/base.md"
          - "https://example.com/style.md"
      conditional:
        has_django:
          instructions:
            - "https://example.com/django.md"
            - "https://example.com/base.md"
        has_flask:
          instructions:
            - "https://example.com/flask.md"
"#;

    // ========================================================================
    // Inactive types
    // ========================================================================

    #[test]
    fn test_no_active_profile_resolves_empty() {
        let config = config(
            r#"
project_types:
  python:
    default:
      always_fetch:
        instructions:
          - "https://example.com/a.md"
"#,
        );
        let resolved = resolve(&config, "python", &facts(&[]));

        assert!(!resolved.is_active());
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_unknown_type_resolves_empty() {
        let config = config(LAYERED);
        let resolved = resolve(&config, "haskell", &facts(&[]));
        assert!(!resolved.is_active());
        assert!(resolved.is_empty());
    }

    // ========================================================================
    // Ordering and dedup
    // ========================================================================

    #[test]
    fn test_always_fetch_precedes_conditional() {
        let config = config(LAYERED);
        let resolved = resolve(&config, "python", &facts(&["has_django"]));

        assert_eq!(
            resolved.get(Category::Instructions),
            &[
                url("https://example.com/base.md"),
                url("https://example.com/style.md"),
                url("https://example.com/django.md"),
            ]
        );
    }

    #[test]
    fn test_conditional_order_is_declaration_order() {
        let config = config(LAYERED);
        // Both facts true; flask is declared after django
        let resolved = resolve(&config, "python", &facts(&["has_flask", "has_django"]));

        assert_eq!(
            resolved.get(Category::Instructions),
            &[
                url("https://example.com/base.md"),
                url("https://example.com/style.md"),
                url("https://example.com/django.md"),
                url("https://example.com/flask.md"),
            ]
        );
    }

    #[test]
    fn test_duplicate_kept_at_first_occurrence() {
        let config = config(LAYERED);
        // django's additions repeat base.md; it must not appear twice
        let resolved = resolve(&config, "python", &facts(&["has_django"]));

        let list = resolved.get(Category::Instructions);
        assert_eq!(
            list.iter()
                .filter(|s| **s == url("https://example.com/base.md"))
                .count(),
            1
        );
        assert_eq!(list[0], url("https://example.com/base.md"));
    }

    #[test]
    fn test_repo_pattern_dedup_by_triple() {
        let config = config(
            r#"
project_types:
  python:
    default:
      active: true
      always_fetch:
        prompts:
          - repo: acme/context
            branch: main
            paths: ["prompts/*.md"]
      conditional:
        has_django:
          prompts:
            - repo: acme/context
              branch: main
              paths: ["prompts/*.md"]
            - repo: acme/context
              branch: dev
              paths: ["prompts/*.md"]
"#,
        );
        let resolved = resolve(&config, "python", &facts(&["has_django"]));

        // Same triple deduped; different branch survives
        assert_eq!(resolved.get(Category::Prompts).len(), 2);
    }

    #[test]
    fn test_false_facts_contribute_nothing() {
        let config = config(LAYERED);
        let resolved = resolve(&config, "python", &facts(&[]));

        assert_eq!(resolved.get(Category::Instructions).len(), 2);
        assert!(resolved.get(Category::Chatmodes).is_empty());
    }

    // ========================================================================
    // Purity
    // ========================================================================

    #[test]
    fn test_resolution_is_deterministic() {
        let config = config(LAYERED);
        let f = facts(&["has_django", "has_flask"]);

        let first = resolve(&config, "python", &f);
        let second = resolve(&config, "python", &f);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_category_is_not_an_error() {
        let config = config(LAYERED);
        let resolved = resolve(&config, "python", &facts(&[]));
        assert!(resolved.is_active());
        assert!(resolved.get(Category::Chatmodes).is_empty());
    }
}
