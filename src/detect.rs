//! Language and project-type detection.
//!
//! Pure functions of file extensions and root-level marker files. The
//! extension table is the single source of truth for which files the
//! scanner picks up when no include patterns are given.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Language tag attached to a [`crate::file_record::FileRecord`].
///
/// `React`, `AiJavascript`, `FlutterDart` and `LaravelPhp` are never produced
/// by extension lookup; they come out of the post-extraction reclassification
/// pass once framework imports have been observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Javascript,
    React,
    AiJavascript,
    Dart,
    FlutterDart,
    Php,
    LaravelPhp,
    Html,
    Css,
    Json,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::React => "react",
            Language::AiJavascript => "ai_javascript",
            Language::Dart => "dart",
            Language::FlutterDart => "flutter_dart",
            Language::Php => "php",
            Language::LaravelPhp => "laravel_php",
            Language::Html => "html",
            Language::Css => "css",
            Language::Json => "json",
        }
    }

    /// Collapse framework refinements back to the base family. Used to pick
    /// the extractor: a `react` file still goes through the JS extractor.
    pub fn family(&self) -> Language {
        match self {
            Language::React | Language::AiJavascript => Language::Javascript,
            Language::FlutterDart => Language::Dart,
            Language::LaravelPhp => Language::Php,
            other => *other,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extensions handled per language family, lowercase without the dot.
pub const EXTENSION_TABLE: &[(Language, &[&str])] = &[
    (Language::Python, &["py", "pyw", "pyi"]),
    (Language::Dart, &["dart"]),
    (Language::Php, &["php"]),
    (Language::Javascript, &["js", "jsx", "ts", "tsx"]),
    (Language::Html, &["html", "htm"]),
    (Language::Css, &["css", "scss", "sass"]),
    (Language::Json, &["json"]),
];

/// Map a path to its language tag. Unknown extensions yield `None` and the
/// file is excluded from extraction.
pub fn language_for_path(path: &Path) -> Option<Language> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    // Compound extension; plain `.php` also matches below.
    if name.ends_with(".blade.php") {
        return Some(Language::Php);
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    for (lang, exts) in EXTENSION_TABLE {
        if exts.contains(&ext.as_str()) {
            return Some(*lang);
        }
    }
    None
}

/// True when the scanner should pick the file up without include patterns.
pub fn is_supported(path: &Path) -> bool {
    language_for_path(path).is_some()
}

/// Detect the project type from root-level marker files, falling back to a
/// count of supported extensions when no marker is present.
pub fn detect_project_type(root: &Path) -> String {
    let Ok(entries) = std::fs::read_dir(root) else {
        return "unknown".to_string();
    };
    let names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_ascii_lowercase()))
        .collect();
    let has = |name: &str| names.iter().any(|n| n == name);

    if has("pubspec.yaml") || has("pubspec.yml") {
        return "flutter_dart".to_string();
    }
    if has("composer.json") || has("artisan") {
        return "laravel_php".to_string();
    }
    if has("package.json") {
        return detect_js_project_type(root);
    }
    if has("requirements.txt") || has("setup.py") || has("pyproject.toml") {
        return "python".to_string();
    }
    if has("cargo.toml") {
        return "rust".to_string();
    }
    if has("go.mod") {
        return "golang".to_string();
    }
    if has("pom.xml") {
        return "java_maven".to_string();
    }

    dominant_language(root)
}

/// Distinguish JS flavors by the dependency tables of package.json.
fn detect_js_project_type(root: &Path) -> String {
    let manifest = root.join("package.json");
    let deps: Vec<String> = std::fs::read_to_string(&manifest)
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .map(|pkg| {
            ["dependencies", "devDependencies"]
                .iter()
                .filter_map(|key| pkg.get(key).and_then(|d| d.as_object().cloned()))
                .flat_map(|d| d.keys().cloned().collect::<Vec<_>>())
                .collect()
        })
        .unwrap_or_default();

    if deps.iter().any(|d| d == "react") {
        "react".to_string()
    } else if deps.iter().any(|d| d == "vue") {
        "vue".to_string()
    } else if deps.iter().any(|d| d == "angular" || d == "@angular/core") {
        "angular".to_string()
    } else if deps.iter().any(|d| d == "svelte") {
        "svelte".to_string()
    } else {
        "javascript".to_string()
    }
}

/// Count supported files a few levels deep and pick the most common
/// language. `unknown` when nothing matches.
fn dominant_language(root: &Path) -> String {
    let mut counts: HashMap<Language, usize> = HashMap::new();
    let walker = walkdir::WalkDir::new(root).max_depth(3).into_iter();
    for entry in walker.filter_map(|e| e.ok()) {
        if entry.file_type().is_file()
            && let Some(lang) = language_for_path(entry.path())
            && lang != Language::Json
        {
            *counts.entry(lang).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(lang, _)| lang.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
