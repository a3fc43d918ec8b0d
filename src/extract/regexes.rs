//! Compiled-once regexes shared by the per-language extractors.

use std::sync::OnceLock;

use regex::Regex;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex literal")
}

// ---------------------------------------------------------------------------
// Python

pub(crate) fn regex_py_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"^import\s+(\w+(?:\.\w+)*)"))
}

pub(crate) fn regex_py_from_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"^from\s+([.\w]+)\s+import"))
}

pub(crate) fn regex_py_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"^class\s+(\w+)(?:\(([^)]*)\))?\s*:"))
}

pub(crate) fn regex_py_def() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"^def\s+(\w+)\s*\("))
}

pub(crate) fn regex_py_method() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"^\s+def\s+(\w+)\s*\("))
}

pub(crate) fn regex_py_variable() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"^(\w+)\s*="))
}

// ---------------------------------------------------------------------------
// JavaScript / TypeScript

pub(crate) fn regex_js_import_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"import\s+.*\s+from\s+["']([^"']+)["']"#))
}

pub(crate) fn regex_js_require() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"require\(\s*["']([^"']+)["']\s*\)"#))
}

pub(crate) fn regex_js_dynamic_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"import\(\s*["']([^"']+)["']\s*\)"#))
}

pub(crate) fn regex_js_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"class\s+(\w+)(?:\s+extends\s+(\w+))?"))
}

pub(crate) fn regex_js_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"function\s+(\w+)\s*\("))
}

pub(crate) fn regex_js_component() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r"const\s+(\w+)\s*=\s*(?:React\.)?(?:memo|forwardRef|createClass)?\(?(?:\(\)|function\s*\([^)]*\)|\([^)]*\)\s*=>\s*)",
        )
    })
}

pub(crate) fn regex_js_const() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"const\s+(\w+)\s*="))
}

pub(crate) fn regex_js_let() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"let\s+(\w+)\s*="))
}

pub(crate) fn regex_js_var() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"var\s+(\w+)\s*="))
}

// ---------------------------------------------------------------------------
// Dart / Flutter

pub(crate) fn regex_dart_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"import\s+["']([^"']+)["']"#))
}

pub(crate) fn regex_dart_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"class\s+(\w+)(?:\s+extends\s+(\w+))?(?:\s+implements\s+([^{]+))?"))
}

pub(crate) fn regex_dart_method() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?:@\w+\s+)*(?:void|Future|Widget|[\w<>]+)\s+(\w+)\s*\("))
}

pub(crate) fn regex_dart_variable() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?:final|const|var|late)?\s*(?:[\w<>?]+)\s+(\w+)\s*="))
}

pub(crate) fn regex_dart_state() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"class\s+_(\w+)State\s+extends\s+State<(\w+)>"))
}

// ---------------------------------------------------------------------------
// PHP / Laravel

pub(crate) fn regex_php_namespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"namespace\s+([^;]+);"))
}

pub(crate) fn regex_php_use() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"use\s+([^;]+);"))
}

pub(crate) fn regex_php_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"class\s+(\w+)(?:\s+extends\s+(\w+))?(?:\s+implements\s+([^{]+))?"))
}

pub(crate) fn regex_php_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"function\s+(\w+)\s*\("))
}

pub(crate) fn regex_php_method() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?:public|protected|private)(?:\s+static)?\s+function\s+(\w+)\s*\("))
}

pub(crate) fn regex_php_property() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?:public|protected|private)(?:\s+static)?\s+\$(\w+)"))
}

// ---------------------------------------------------------------------------
// HTML

pub(crate) fn regex_html_title() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"<title>(.*?)</title>"))
}

pub(crate) fn regex_html_script_src() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"<script[^>]*src=["']([^"']+)["']"#))
}

pub(crate) fn regex_html_link_href() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"<link[^>]*href=["']([^"']+)["']"#))
}

pub(crate) fn regex_html_form() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"<form(?:[^>]*id=["']([^"']+)["'])?"#))
}

pub(crate) fn regex_html_div_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"<div[^>]*id=["']([^"']+)["']"#))
}

// ---------------------------------------------------------------------------
// CSS

pub(crate) fn regex_css_selector_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"([^{]+)\{[^}]*\}"))
}

pub(crate) fn regex_css_property() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"([a-zA-Z-]+)\s*:\s*([^;]+);"))
}

// ---------------------------------------------------------------------------
// Complexity

/// Branch-point patterns counted by cyclomatic complexity. One match adds one.
pub(crate) fn branch_regexes() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"\bif\b",
            r"\belse\s+if\b",
            r"\belseif\b",
            r"\bfor\b",
            r"\bwhile\b",
            r"\bcase\b",
            r"\bcatch\b",
            r"\?",
            r"\|\|",
            r"&&",
        ]
        .iter()
        .map(|p| regex(p))
        .collect()
    })
}

/// Comment lines and blank lines removed before similarity comparison.
pub(crate) fn regex_comment_or_blank() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?m)#.*$|//.*$|/\*[\s\S]*?\*/|^\s*$"))
}
