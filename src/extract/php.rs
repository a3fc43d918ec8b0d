//! PHP extractor with Laravel awareness.
//!
//! `use` statements feed the import list; the `App` and `Illuminate` roots
//! are framework namespaces and never become dependency tokens. Classes get
//! Laravel kind promotion (controller, model, migration, middleware) and
//! controllers get resource-method tagging.

use tracing::warn;

use super::regexes::*;
use super::{Extraction, has_secret_token};
use crate::detect::Language;
use crate::types::{EntityKind, EntityNode};

const RESOURCE_METHODS: &[&str] = &[
    "index", "show", "create", "store", "edit", "update", "destroy",
];

const MODEL_PROPERTIES: &[&str] = &["fillable", "guarded", "casts", "hidden", "table"];

/// Class span in the original's PHP flavor: depth back at zero on a line
/// that actually contains a closing brace. Tolerates the PSR style where
/// the opening brace sits on its own line.
fn class_span_end(lines: &[&str], start: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    for (offset, line) in lines[start..].iter().enumerate() {
        depth += line.matches('{').count() as i64;
        depth -= line.matches('}').count() as i64;
        if offset > 0 && depth <= 0 && line.contains('}') {
            return Some(start + offset);
        }
    }
    None
}

pub fn extract(content: &str) -> Extraction {
    let mut out = Extraction::with_language(Language::Php);
    let lines: Vec<&str> = content.lines().collect();

    let mut namespace: Option<String> = None;
    for line in &lines {
        if let Some(caps) = regex_php_namespace().captures(line) {
            namespace = Some(caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default());
        }
        if let Some(caps) = regex_php_use().captures(line) {
            let import = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            if let Some(root) = import.split('\\').next()
                && import.contains('\\')
                && root != "App"
                && root != "Illuminate"
            {
                out.push_dependency(root);
            }
            out.raw_imports.push(import);
        }
    }

    let has_laravel = out.raw_imports.iter().any(|imp| imp.contains("Illuminate"));
    if has_laravel {
        out.language = Some(Language::LaravelPhp);
    }

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = regex_php_class().captures(line) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let parent = caps.get(2).map(|m| m.as_str().to_string());
            let implements = caps.get(3).map(|m| m.as_str().to_string());

            let mut node = EntityNode::new(name, EntityKind::Class, i + 1);
            if let Some(ns) = &namespace {
                node.set_prop("namespace", ns.clone());
                node.set_prop("full_name", format!("{ns}\\{name}"));
            }
            if let Some(parent) = &parent {
                node.set_prop("extends", parent.clone());
            }
            if let Some(impls) = &implements {
                let list: Vec<String> = impls
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                node.set_prop("implements", list);
            }

            if has_laravel {
                let parent_str = parent.as_deref().unwrap_or_default();
                let implements_str = implements.as_deref().unwrap_or_default();
                if name.contains("Controller") {
                    node.kind = EntityKind::Controller;
                    node.set_prop("is_controller", true);
                } else if parent_str.contains("Model") || line.contains("Eloquent") {
                    node.kind = EntityKind::Model;
                    node.set_prop("is_model", true);
                } else if parent_str.contains("Migration") {
                    node.kind = EntityKind::Migration;
                    node.set_prop("is_migration", true);
                } else if parent_str.contains("Middleware") || implements_str.contains("Middleware")
                {
                    node.kind = EntityKind::Middleware;
                    node.set_prop("is_middleware", true);
                }
            }

            let span_end = class_span_end(&lines, i);
            if let Some(end) = span_end {
                node.end_line = Some(end + 1);
            }
            let is_controller = node.kind == EntityKind::Controller;
            let is_model = node.kind == EntityKind::Model;
            let class_id = out.entities.push_root(node);

            let end = span_end.unwrap_or(lines.len().saturating_sub(1));
            for (j, body_line) in lines.iter().enumerate().take(end).skip(i + 1) {
                if let Some(m) = regex_php_method().captures(body_line) {
                    let method_name = m.get(1).map(|c| c.as_str()).unwrap_or_default();
                    let mut method = EntityNode::new(method_name, EntityKind::Method, j + 1);
                    if has_laravel && is_controller && RESOURCE_METHODS.contains(&method_name) {
                        method.set_prop("is_resource_method", true);
                    }
                    out.entities.push_child(class_id, method);
                    continue;
                }
                if let Some(v) = regex_php_property().captures(body_line) {
                    let prop_name = v.get(1).map(|c| c.as_str()).unwrap_or_default();
                    let mut prop =
                        EntityNode::new(prop_name, EntityKind::Property, j + 1).with_end(j + 1);
                    if has_laravel && is_model && MODEL_PROPERTIES.contains(&prop_name) {
                        prop.set_prop("is_model_property", true);
                    }
                    if has_secret_token(prop_name) || prop_name.to_ascii_lowercase().contains("key")
                    {
                        prop.set_prop("is_sensitive", true);
                        let msg = format!(
                            "possible credential in property `${prop_name}` at line {}",
                            j + 1
                        );
                        warn!("{msg}");
                        out.warnings.push(msg);
                    }
                    out.entities.push_child(class_id, prop);
                }
            }

            i = end + 1;
            continue;
        }

        let trimmed = line.trim_start();
        if let Some(caps) = regex_php_function().captures(line)
            && !trimmed.starts_with("public")
            && !trimmed.starts_with("protected")
            && !trimmed.starts_with("private")
        {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let mut node = EntityNode::new(name, EntityKind::Function, i + 1);
            if let Some(ns) = &namespace {
                node.set_prop("namespace", ns.clone());
            }
            out.entities.push_root(node);
        }

        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_statements_skip_framework_roots() {
        let src = "<?php\nnamespace App\\Http;\nuse Illuminate\\Http\\Request;\nuse App\\Models\\User;\nuse Carbon\\Carbon;\n";
        let ex = extract(src);
        assert_eq!(
            ex.raw_imports,
            vec!["Illuminate\\Http\\Request", "App\\Models\\User", "Carbon\\Carbon"]
        );
        assert_eq!(ex.dependencies, vec!["Carbon"]);
        assert_eq!(ex.language, Some(Language::LaravelPhp));
    }

    #[test]
    fn controller_promotion_and_resource_methods() {
        let src = "<?php\nuse Illuminate\\Routing\\Controller as BaseController;\nclass UserController extends BaseController\n{\n    public function index()\n    {\n    }\n    public function custom()\n    {\n    }\n}\n";
        let ex = extract(src);
        let class = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "UserController")
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(class.kind, EntityKind::Controller);

        let index = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "index")
            .map(|(_, n)| n)
            .unwrap();
        assert!(index.flag("is_resource_method"));
        let custom = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "custom")
            .map(|(_, n)| n)
            .unwrap();
        assert!(!custom.flag("is_resource_method"));
    }

    #[test]
    fn model_promotion_tags_eloquent_properties() {
        let src = "<?php\nuse Illuminate\\Database\\Eloquent\\Model;\nclass User extends Model\n{\n    protected $fillable = ['name'];\n    private $apiKey = 'x';\n}\n";
        let ex = extract(src);
        let class = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "User")
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(class.kind, EntityKind::Model);

        let fillable = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "fillable")
            .map(|(_, n)| n)
            .unwrap();
        assert!(fillable.flag("is_model_property"));

        let api_key = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "apiKey")
            .map(|(_, n)| n)
            .unwrap();
        assert!(api_key.flag("is_sensitive"));
        assert_eq!(ex.warnings.len(), 1);
    }

    #[test]
    fn namespace_recorded_on_classes_and_functions() {
        let src = "<?php\nnamespace App\\Services;\nclass Billing\n{\n}\nfunction helper()\n{\n}\n";
        let ex = extract(src);
        let class = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "Billing")
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(
            class.properties.get("full_name"),
            Some(&crate::types::PropValue::Text("App\\Services\\Billing".into()))
        );
        let helper = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "helper")
            .map(|(_, n)| n)
            .unwrap();
        assert_eq!(helper.kind, EntityKind::Function);
    }

    #[test]
    fn plain_php_without_laravel_keeps_class_kind() {
        let src = "<?php\nclass OrderController\n{\n}\n";
        let ex = extract(src);
        let class = ex
            .entities
            .iter()
            .find(|(_, n)| n.name == "OrderController")
            .map(|(_, n)| n)
            .unwrap();
        // Kind promotion only applies to Laravel projects.
        assert_eq!(class.kind, EntityKind::Class);
        assert_eq!(ex.language, Some(Language::Php));
    }
}
