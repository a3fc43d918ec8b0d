//! Dart extractor with Flutter awareness.
//!
//! Classes own brace-delimited spans; methods and fields found inside a
//! class span become its children. A class extending a `*Widget` parent is
//! promoted to the `widget` kind, and `_FooState extends State<Foo>`
//! back-links `has_state` onto the `Foo` widget.

use super::regexes::*;
use super::{Extraction, brace_span_end, path_stem};
use crate::detect::Language;
use crate::types::{EntityKind, EntityNode};

fn dependency_token(module: &str) -> Option<String> {
    if let Some((scheme, rest)) = module.split_once(':') {
        // package:name/path.dart -> name; dart:io and friends are skipped.
        if scheme == "package" {
            return rest.split('/').next().map(str::to_string);
        }
        return None;
    }
    // Relative part/import: the target file's stem.
    Some(path_stem(module))
}

pub fn extract(content: &str) -> Extraction {
    let mut out = Extraction::with_language(Language::Dart);
    let lines: Vec<&str> = content.lines().collect();

    for line in &lines {
        for caps in regex_dart_import().captures_iter(line) {
            let module = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            out.raw_imports.push(module.to_string());
            if let Some(token) = dependency_token(module) {
                out.push_dependency(token);
            }
        }
    }

    let has_flutter = out.raw_imports.iter().any(|imp| imp.contains("flutter"));
    if has_flutter {
        out.language = Some(Language::FlutterDart);
    }

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            continue;
        }
        let Some(caps) = regex_dart_class().captures(trimmed) else {
            continue;
        };

        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let parent = caps.get(2).map(|m| m.as_str().to_string());
        let mut node = EntityNode::new(name, EntityKind::Class, i + 1);
        if let Some(parent) = &parent {
            node.set_prop("extends", parent.clone());
        }
        if let Some(implements) = caps.get(3) {
            let list: Vec<String> = implements
                .as_str()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            node.set_prop("implements", list);
        }
        if has_flutter && parent.as_deref().is_some_and(|p| p.contains("Widget")) {
            node.kind = EntityKind::Widget;
            node.set_prop("is_widget", true);
        }

        let class_end = brace_span_end(&lines, i);
        if let Some(end) = class_end {
            node.end_line = Some(end + 1);
        }
        let class_id = out.entities.push_root(node);

        // Members live between the header and the closing brace.
        let end = class_end.unwrap_or(lines.len().saturating_sub(1));
        for (j, body_line) in lines.iter().enumerate().take(end).skip(i + 1) {
            let body = body_line.trim();
            if let Some(m) = regex_dart_method().captures(body) {
                let method_name = m.get(1).map(|c| c.as_str()).unwrap_or_default();
                let mut method = EntityNode::new(method_name, EntityKind::Method, j + 1);
                if has_flutter && method_name == "build" && body_line.contains("Widget") {
                    method.set_prop("is_build_method", true);
                }
                out.entities.push_child(class_id, method);
            }
            if let Some(v) = regex_dart_variable().captures(body) {
                let var_name = v.get(1).map(|c| c.as_str()).unwrap_or_default();
                let var =
                    EntityNode::new(var_name, EntityKind::Variable, j + 1).with_end(j + 1);
                out.entities.push_child(class_id, var);
            }
        }
    }

    // Back-link State classes onto their widgets.
    if has_flutter {
        for line in &lines {
            if let Some(caps) = regex_dart_state().captures(line.trim()) {
                let widget_name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                for (_, node) in out.entities.iter_mut() {
                    if node.name == widget_name && node.parent.is_none() {
                        node.set_prop("has_state", true);
                        break;
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_imports_become_dependencies() {
        let src = "import 'package:flutter/material.dart';\nimport 'package:http/http.dart';\nimport 'dart:io';\nimport './widgets/button.dart';\n";
        let ex = extract(src);
        assert_eq!(
            ex.raw_imports,
            vec![
                "package:flutter/material.dart",
                "package:http/http.dart",
                "dart:io",
                "./widgets/button.dart"
            ]
        );
        assert_eq!(ex.dependencies, vec!["flutter", "http", "button"]);
        assert_eq!(ex.language, Some(Language::FlutterDart));
    }

    #[test]
    fn widget_classes_are_promoted() {
        let src = "import 'package:flutter/material.dart';\nclass Home extends StatelessWidget {\n  Widget build(BuildContext context) {\n    return Container();\n  }\n}\n";
        let ex = extract(src);
        let home = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "Home")
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(home.kind, EntityKind::Widget);
        assert!(home.flag("is_widget"));
        assert_eq!(home.end_line, Some(6));

        let build = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "build")
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(build.kind, EntityKind::Method);
        assert!(build.flag("is_build_method"));
    }

    #[test]
    fn state_class_back_links_its_widget() {
        let src = "import 'package:flutter/material.dart';\nclass Counter extends StatefulWidget {\n}\nclass _CounterState extends State<Counter> {\n}\n";
        let ex = extract(src);
        let counter = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "Counter")
            .map(|(_, n)| n)
            .unwrap();
        assert!(counter.flag("has_state"));
        // The state class itself is still recorded.
        assert!(ex.entities.iter().any(|(_, n)| n.name == "_CounterState"));
    }

    #[test]
    fn plain_dart_class_keeps_class_kind() {
        let src = "class Repo implements Store, Cache {\n  final String name = 'repo';\n}\n";
        let ex = extract(src);
        let repo = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "Repo")
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(repo.kind, EntityKind::Class);
        assert_eq!(
            repo.properties.get("implements"),
            Some(&crate::types::PropValue::List(vec![
                "Store".into(),
                "Cache".into()
            ]))
        );
        assert!(
            ex.entities
                .iter()
                .any(|(_, n)| n.name == "name" && n.kind == EntityKind::Variable)
        );
        assert_eq!(ex.language, Some(Language::Dart));
    }
}
