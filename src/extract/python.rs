//! Python extractor: indentation-scoped classes, functions, methods and
//! module-level variables.
//!
//! Scope boundaries are indentation heuristics, not grammar: a scope closes
//! at the first non-blank line indented at or below its header. Decorators,
//! multi-line signatures and string literals that look like code are
//! accepted as noise.

use tracing::warn;

use super::regexes::*;
use super::{Extraction, has_ai_token, has_secret_token, indent_width};
use crate::detect::Language;
use crate::types::{EntityId, EntityKind, EntityNode};

/// An entity whose indentation scope is still open.
struct OpenScope {
    id: EntityId,
    indent: usize,
    is_class: bool,
}

pub fn extract(content: &str) -> Extraction {
    let mut out = Extraction::with_language(Language::Python);
    let lines: Vec<&str> = content.lines().collect();
    let mut open: Vec<OpenScope> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;

        // Close every scope whose body this line has stepped out of. This
        // runs before the import match: a top-level import is a dedent too.
        let indent = indent_width(line);
        while let Some(scope) = open.last() {
            if indent <= scope.indent {
                let closed = open.pop().expect("checked non-empty");
                if let Some(node) = out.entities.get_mut(closed.id)
                    && node.end_line.is_none()
                {
                    node.end_line = Some(i);
                }
            } else {
                break;
            }
        }

        if let Some(caps) = regex_py_import()
            .captures(line)
            .or_else(|| regex_py_from_import().captures(line))
        {
            let module = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            out.raw_imports.push(module.to_string());
            // Only plain single-segment modules can name a project file.
            if !module.contains('.') {
                out.push_dependency(module);
            }
            continue;
        }

        if let Some(caps) = regex_py_class().captures(line) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let mut node = EntityNode::new(name, EntityKind::Class, line_no);
            if let Some(bases) = caps.get(2).filter(|m| !m.as_str().trim().is_empty()) {
                let parents: Vec<String> = bases
                    .as_str()
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                node.set_prop("parents", parents);
            }
            let id = out.entities.push_root(node);
            open.push(OpenScope {
                id,
                indent,
                is_class: true,
            });
            continue;
        }

        if let Some(caps) = regex_py_def().captures(line) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let id = out
                .entities
                .push_root(EntityNode::new(name, EntityKind::Function, line_no));
            open.push(OpenScope {
                id,
                indent,
                is_class: false,
            });
            continue;
        }

        if let Some(caps) = regex_py_method().captures(line) {
            // Nested defs outside a class are ignored on purpose.
            if let Some(class_id) = open.iter().rev().find(|s| s.is_class).map(|s| s.id) {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let mut node = EntityNode::new(name, EntityKind::Method, line_no);
                if name == "__init__" {
                    node.set_prop("is_constructor", true);
                } else if name.starts_with("__") && name.ends_with("__") {
                    node.set_prop("is_magic_method", true);
                }
                if has_ai_token(name) {
                    node.set_prop("is_ai_related", true);
                }
                let id = out.entities.push_child(class_id, node);
                open.push(OpenScope {
                    id,
                    indent,
                    is_class: false,
                });
            }
            continue;
        }

        if indent == 0
            && let Some(caps) = regex_py_variable().captures(line)
        {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let is_constant = name.chars().any(|c| c.is_alphabetic())
                && !name.chars().any(|c| c.is_lowercase());
            if !name.starts_with('_') && !is_constant {
                out.entities.push_root(
                    EntityNode::new(name, EntityKind::Variable, line_no).with_end(line_no),
                );
            }
            if has_secret_token(name) {
                let msg = format!("possible credential in variable `{name}` at line {line_no}");
                warn!("{msg}");
                out.warnings.push(msg);
            }
        }
    }

    // EOF closes whatever is still open.
    for scope in open.into_iter().rev() {
        if let Some(node) = out.entities.get_mut(scope.id)
            && node.end_line.is_none()
        {
            node.end_line = Some(lines.len());
        }
    }

    out
}
