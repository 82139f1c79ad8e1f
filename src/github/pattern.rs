// src/github/pattern.rs
// Glob path patterns over repository trees
//
// Grammar: segments split on '/'. `**` is its own segment and matches
// zero or more whole segments; `*` and `?` match within a single segment
// and never cross a '/'.

/// One parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Exact segment text
    Literal(String),
    /// Glob within one segment (`*`, `?`)
    Wildcard(String),
    /// `**`: any number of segments, including none
    Any,
}

/// A parsed path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern. Every string parses; leading and trailing
    /// slashes and empty segments are ignored.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "**" {
                    Segment::Any
                } else if s.contains('*') || s.contains('?') {
                    Segment::Wildcard(s.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// Whether the pattern is a plain path with no wildcard segments
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// The literal path form: parsed segments re-joined
    pub fn literal_path(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) | Segment::Wildcard(text) => text.as_str(),
                Segment::Any => "**",
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Match a repository-relative path (no leading slash)
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match_segments(&self.segments, &parts)
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn match_segments(pattern: &[Segment], parts: &[&str]) -> bool {
    match pattern.first() {
        None => parts.is_empty(),
        Some(Segment::Any) => {
            // `**` may swallow zero or more leading segments
            (0..=parts.len()).any(|skip| match_segments(&pattern[1..], &parts[skip..]))
        }
        Some(segment) => match parts.first() {
            Some(part) => segment_matches(segment, part) && match_segments(&pattern[1..], &parts[1..]),
            None => false,
        },
    }
}

fn segment_matches(segment: &Segment, text: &str) -> bool {
    match segment {
        Segment::Literal(expected) => expected == text,
        Segment::Wildcard(glob) => glob_matches(glob, text),
        Segment::Any => true,
    }
}

/// Single-segment glob: `*` any run of characters, `?` one character.
/// Iterative backtracking, linear in practice.
fn glob_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = backtrack {
            // Let the last star consume one more character
            backtrack = Some((star_pi, star_ti + 1));
            pi = star_pi + 1;
            ti = star_ti + 1;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Expand patterns against a repository tree listing.
///
/// Per pattern, in declared order: wildcard-free patterns pass through as
/// literal paths (existence is confirmed at fetch time); wildcard
/// patterns contribute their tree matches sorted lexicographically.
/// Results concatenate across patterns with first-occurrence-wins dedup.
/// A pattern with no matches contributes nothing.
pub fn expand_patterns(patterns: &[String], tree: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for raw in patterns {
        let pattern = PathPattern::parse(raw);
        if pattern.is_literal() {
            push_unique(&mut result, pattern.literal_path());
            continue;
        }

        let mut matches: Vec<&String> = tree.iter().filter(|p| pattern.matches(p)).collect();
        matches.sort();
        for path in matches {
            push_unique(&mut result, path.clone());
        }
    }
    result
}

fn push_unique(result: &mut Vec<String>, path: String) {
    if !result.contains(&path) {
        result.push(path);
    }
}
