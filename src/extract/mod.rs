//! Per-language entity and import extraction.
//!
//! One strategy per language family. Every strategy takes raw file text and
//! produces an [`Extraction`]: the entity arena, the import strings as
//! written, the dependency tokens derived from them, and the possibly
//! refined language tag. Strategies work line by line with regex heuristics;
//! they tolerate syntactically broken input and never fail.

pub mod css;
pub mod dart;
pub mod html;
pub mod js;
pub mod php;
pub mod python;
pub(crate) mod regexes;

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::detect::Language;
use crate::types::EntityArena;

/// Result of one extractor pass over one file's content.
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    pub entities: EntityArena,
    /// Import statements as written in source, in order.
    pub raw_imports: Vec<String>,
    /// Dependency tokens derived from imports, ordered and de-duplicated.
    pub dependencies: Vec<String>,
    /// Language after reclassification (e.g. javascript promoted to react).
    pub language: Option<Language>,
    /// Non-fatal findings (secret-like names, heuristic misses).
    pub warnings: Vec<String>,
}

impl Extraction {
    pub(crate) fn with_language(language: Language) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }

    /// Add a dependency token, keeping first-seen order and uniqueness.
    pub(crate) fn push_dependency(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !token.is_empty() && !self.dependencies.contains(&token) {
            self.dependencies.push(token);
        }
    }
}

/// Run the extractor matching `language` over `content`.
///
/// Internal extractor failures are caught at this boundary: the caller gets
/// an empty extraction plus a warning instead of a panic, and the scan goes
/// on with the next file.
pub fn extract(content: &str, language: Language) -> Extraction {
    let family = language.family();
    let run = || match family {
        Language::Python => python::extract(content),
        Language::Javascript => js::extract(content),
        Language::Dart => dart::extract(content),
        Language::Php => php::extract(content),
        Language::Html => html::extract(content),
        Language::Css => css::extract(content),
        // No extractor for data files; they only appear in the file list.
        _ => Extraction::with_language(language),
    };

    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(extraction) => extraction,
        Err(_) => {
            tracing::warn!(language = %language, "extractor failed, keeping empty entity list");
            let mut fallback = Extraction::with_language(language);
            fallback
                .warnings
                .push(format!("{language} extractor failed on this file"));
            fallback
        }
    }
}

/// Variable-name fragments that look like credentials.
pub(crate) const SECRET_TOKENS: &[&str] = &["api_key", "apikey", "secret", "token", "password"];

/// Name fragments that mark AI-provider related code.
pub(crate) const AI_NAME_TOKENS: &[&str] = &["api", "gpt", "claude", "openai", "grok"];

pub(crate) fn has_secret_token(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_TOKENS.iter().any(|t| lower.contains(t))
}

pub(crate) fn has_ai_token(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    AI_NAME_TOKENS.iter().any(|t| lower.contains(t))
}

/// Leading whitespace width of a line, tabs counted as one column.
pub(crate) fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Brace-delimited scope span: starting at `start`, return the index of the
/// first later line where the running `{`/`}` depth comes back to zero.
///
/// Single forward pass per entity header; false-positive headers cost one
/// extra pass each, which is acceptable at source-file scale.
pub(crate) fn brace_span_end(lines: &[&str], start: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    for (offset, line) in lines[start..].iter().enumerate() {
        depth += line.matches('{').count() as i64;
        depth -= line.matches('}').count() as i64;
        if offset > 0 && depth <= 0 {
            return Some(start + offset);
        }
    }
    None
}

/// Last path segment with its extension stripped. Relative imports resolve
/// to this token so `./widgets/button.dart` can match a project file later.
pub(crate) fn path_stem(import: &str) -> String {
    let last = import
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(import);
    match last.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => last.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_span_tracks_nested_depth() {
        let src = "class A {\n  fn b() {\n    x\n  }\n}\nafter";
        let lines: Vec<&str> = src.lines().collect();
        assert_eq!(brace_span_end(&lines, 0), Some(4));
        assert_eq!(brace_span_end(&lines, 1), Some(3));
    }

    #[test]
    fn brace_span_is_none_when_scope_never_closes() {
        let lines = vec!["class A {", "  open"];
        assert_eq!(brace_span_end(&lines, 0), None);
    }

    #[test]
    fn path_stem_strips_directories_and_extensions() {
        assert_eq!(path_stem("./widgets/button.dart"), "button");
        assert_eq!(path_stem("../utils"), "utils");
        assert_eq!(path_stem("b.js"), "b");
        assert_eq!(path_stem("plain"), "plain");
    }

    #[test]
    fn dependencies_stay_ordered_and_unique() {
        let mut ex = Extraction::default();
        ex.push_dependency("b");
        ex.push_dependency("a");
        ex.push_dependency("b");
        ex.push_dependency("");
        assert_eq!(ex.dependencies, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn secret_and_ai_tokens_match_case_insensitively() {
        assert!(has_secret_token("OPENAI_API_KEY"));
        assert!(has_secret_token("sessionToken"));
        assert!(!has_secret_token("username"));
        assert!(has_ai_token("call_gpt"));
        assert!(has_ai_token("ClaudeClient"));
        assert!(!has_ai_token("render"));
    }

    #[test]
    fn json_files_yield_empty_extraction() {
        let ex = extract("{\"a\": 1}", Language::Json);
        assert!(ex.entities.is_empty());
        assert!(ex.raw_imports.is_empty());
        assert_eq!(ex.language, Some(Language::Json));
    }
}
