//! JavaScript/TypeScript extractor with React awareness.
//!
//! Handles ES-module, CommonJS and dynamic imports. The language tag is
//! refined after the import pass: any `react` import promotes the file to
//! `react`, any AI-library import to `ai_javascript`.

use tracing::warn;

use super::regexes::*;
use super::{Extraction, brace_span_end, has_secret_token, path_stem};
use crate::detect::Language;
use crate::types::{EntityKind, EntityNode};

/// Import substrings that mark a file as AI-client code.
const AI_LIB_TOKENS: &[&str] = &[
    "openai",
    "claude",
    "anthropic",
    "gpt",
    "langchain",
    "ai",
    "huggingface",
];

/// Function-name fragments that mark AI-related helpers.
const AI_FN_TOKENS: &[&str] = &[
    "ai",
    "chat",
    "completion",
    "gpt",
    "model",
    "generate",
    "predict",
];

/// Reduce an import specifier to the token used for dependency-edge matching.
fn dependency_token(module: &str) -> String {
    if module.starts_with('.') {
        // Relative import: the target file's stem.
        return path_stem(module);
    }
    if let Some((head, rest)) = module.split_once('/') {
        if head.starts_with('@') {
            // Scoped package: keep @scope/pkg.
            let pkg = rest.split('/').next().unwrap_or(rest);
            return format!("{head}/{pkg}");
        }
        return head.to_string();
    }
    module.to_string()
}

pub fn extract(content: &str) -> Extraction {
    let mut out = Extraction::with_language(Language::Javascript);
    let lines: Vec<&str> = content.lines().collect();

    for line in &lines {
        for re in [
            regex_js_import_from(),
            regex_js_require(),
            regex_js_dynamic_import(),
        ] {
            for caps in re.captures_iter(line) {
                let module = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                out.raw_imports.push(module.to_string());
                out.push_dependency(dependency_token(module));
            }
        }
    }

    let joined = out.raw_imports.join(" ").to_ascii_lowercase();
    let has_ai_libs = AI_LIB_TOKENS.iter().any(|t| joined.contains(t));
    let has_react = out
        .raw_imports
        .iter()
        .any(|imp| imp.to_ascii_lowercase().contains("react"));
    if has_ai_libs {
        out.language = Some(Language::AiJavascript);
    } else if has_react {
        out.language = Some(Language::React);
    }

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        let line_no = i + 1;

        if let Some(caps) = regex_js_class().captures(trimmed) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let mut node = EntityNode::new(name, EntityKind::Class, line_no);
            if let Some(parent) = caps.get(2) {
                node.set_prop("extends", parent.as_str());
            }
            if has_react && (line.contains("Component") || line.contains("PureComponent")) {
                node.set_prop("is_react_component", true);
            }
            if let Some(end) = brace_span_end(&lines, i) {
                node.end_line = Some(end + 1);
            }
            out.entities.push_root(node);
        }

        if let Some(caps) = regex_js_function().captures(trimmed) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let mut node = EntityNode::new(name, EntityKind::Function, line_no);
            let is_hook = name.starts_with("use")
                && name.chars().nth(3).is_some_and(|c| c.is_ascii_uppercase());
            if has_react && is_hook {
                node.set_prop("is_react_hook", true);
            }
            let lower = name.to_ascii_lowercase();
            if has_ai_libs && AI_FN_TOKENS.iter().any(|t| lower.contains(t)) {
                node.set_prop("is_ai_related", true);
            }
            if let Some(end) = brace_span_end(&lines, i) {
                node.end_line = Some(end + 1);
            }
            out.entities.push_root(node);
        }

        if has_react
            && let Some(caps) = regex_js_component().captures(trimmed)
        {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let mut node = EntityNode::new(name, EntityKind::Component, line_no);
            node.set_prop("is_react_component", true);
            out.entities.push_root(node);
        }

        for (re, kind) in [
            (regex_js_const(), EntityKind::Constant),
            (regex_js_let(), EntityKind::Variable),
            (regex_js_var(), EntityKind::Variable),
        ] {
            if let Some(caps) = re.captures(trimmed) {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let mut node = EntityNode::new(name, kind, line_no).with_end(line_no);
                if has_secret_token(name) {
                    node.set_prop("is_sensitive", true);
                    let msg =
                        format!("possible credential in variable `{name}` at line {line_no}");
                    warn!("{msg}");
                    out.warnings.push(msg);
                }
                out.entities.push_root(node);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_styles_and_package_tokens() {
        let src = "import React from \"react\";\nimport { get } from \"@scope/http/client\";\nconst fs = require('fs');\nconst mod = import('./lazy/widget.js');\n";
        let ex = extract(src);
        assert_eq!(
            ex.raw_imports,
            vec!["react", "@scope/http/client", "fs", "./lazy/widget.js"]
        );
        assert!(ex.dependencies.contains(&"react".to_string()));
        assert!(ex.dependencies.contains(&"@scope/http".to_string()));
        assert!(ex.dependencies.contains(&"fs".to_string()));
        assert!(ex.dependencies.contains(&"widget".to_string()));
    }

    #[test]
    fn react_import_promotes_language() {
        let ex = extract("import { useState } from \"react\";\n");
        assert_eq!(ex.language, Some(Language::React));
    }

    #[test]
    fn ai_imports_win_over_react() {
        let ex = extract("import React from \"react\";\nimport OpenAI from \"openai\";\n");
        assert_eq!(ex.language, Some(Language::AiJavascript));
    }

    #[test]
    fn plain_js_stays_javascript() {
        let ex = extract("const x = 1;\n");
        assert_eq!(ex.language, Some(Language::Javascript));
    }

    #[test]
    fn class_with_extends_and_brace_span() {
        let src = "class Engine extends Base {\n  run() {\n    return 1;\n  }\n}\n";
        let ex = extract(src);
        let class = ex
            .entities
            .iter()
            .find(|(_, n)| n.kind == EntityKind::Class)
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(class.name, "Engine");
        assert_eq!(
            class.properties.get("extends"),
            Some(&crate::types::PropValue::Text("Base".into()))
        );
        assert_eq!(class.start_line, 1);
        assert_eq!(class.end_line, Some(5));
    }

    #[test]
    fn hooks_are_tagged_when_react_is_present() {
        let src = "import React from 'react';\nfunction useCounter() {\n  return 0;\n}\nfunction plain() {\n  return 1;\n}\n";
        let ex = extract(src);
        let hook = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "useCounter")
            .map(|(_, n)| n)
            .unwrap();
        assert!(hook.flag("is_react_hook"));
        let plain = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "plain")
            .map(|(_, n)| n)
            .unwrap();
        assert!(!plain.flag("is_react_hook"));
    }

    #[test]
    fn arrow_components_detected_for_react_files() {
        let src = "import React from 'react';\nconst Header = (props) => <div/>;\n";
        let ex = extract(src);
        assert!(
            ex.entities
                .iter()
                .any(|(_, n)| n.kind == EntityKind::Component && n.name == "Header")
        );
    }

    #[test]
    fn sensitive_constants_are_flagged() {
        let ex = extract("const API_KEY = \"sk-42\";\n");
        let node = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "API_KEY")
            .map(|(_, n)| n)
            .unwrap();
        assert!(node.flag("is_sensitive"));
        assert_eq!(ex.warnings.len(), 1);
    }

    #[test]
    fn relative_imports_resolve_to_file_stems() {
        let ex = extract("import { b } from './b';\nimport a from '../nested/a.ts';\n");
        assert_eq!(ex.dependencies, vec!["b".to_string(), "a".to_string()]);
    }
}
