//! Core data model: the per-file entity arena and derived metrics.
//!
//! Entities are stored flat in an [`EntityArena`] and addressed by index,
//! so parent/child links are index pairs rather than owned references.
//! A file's arena is rebuilt wholesale every time the file is re-parsed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of an entity inside its file's arena.
pub type EntityId = usize;

/// Structural kind of a code entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Class,
    Function,
    Method,
    Variable,
    Property,
    Constant,
    Component,
    Widget,
    Controller,
    Model,
    Migration,
    Middleware,
    Selector,
    Form,
    Script,
    Stylesheet,
    Title,
    Div,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Class => "class",
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::Variable => "variable",
            EntityKind::Property => "property",
            EntityKind::Constant => "constant",
            EntityKind::Component => "component",
            EntityKind::Widget => "widget",
            EntityKind::Controller => "controller",
            EntityKind::Model => "model",
            EntityKind::Migration => "migration",
            EntityKind::Middleware => "middleware",
            EntityKind::Selector => "selector",
            EntityKind::Form => "form",
            EntityKind::Script => "script",
            EntityKind::Stylesheet => "stylesheet",
            EntityKind::Title => "title",
            EntityKind::Div => "div",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form entity property value. Untagged so snapshots stay plain JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
    Table(BTreeMap<String, String>),
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Flag(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Text(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Text(v)
    }
}

impl From<Vec<String>> for PropValue {
    fn from(v: Vec<String>) -> Self {
        PropValue::List(v)
    }
}

/// One structural unit (class, function, selector, ...) with its line span.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub name: String,
    pub kind: EntityKind,
    /// 1-based line of the entity header.
    pub start_line: usize,
    /// 1-based closing line; `None` until the scope-closing heuristic fires.
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
}

impl EntityNode {
    pub fn new(name: impl Into<String>, kind: EntityKind, start_line: usize) -> Self {
        debug_assert!(start_line >= 1, "entity lines are 1-based");
        Self {
            name: name.into(),
            kind,
            start_line,
            end_line: None,
            properties: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn with_end(mut self, end_line: usize) -> Self {
        self.end_line = Some(end_line);
        self
    }

    pub fn set_prop(&mut self, key: &str, value: impl Into<PropValue>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.properties.get(key), Some(PropValue::Flag(true)))
    }
}

/// Flat per-file entity store. Roots are entities with no parent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityArena {
    nodes: Vec<EntityNode>,
    roots: Vec<EntityId>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities, children included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityNode> {
        self.nodes.get_mut(id)
    }

    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut EntityNode)> {
        self.nodes.iter_mut().enumerate()
    }

    /// Insert a top-level entity.
    pub fn push_root(&mut self, node: EntityNode) -> EntityId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.roots.push(id);
        id
    }

    /// Insert a child entity and link both directions.
    pub fn push_child(&mut self, parent: EntityId, mut node: EntityNode) -> EntityId {
        let id = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Qualified name: `Class.method` when the parent is class-like.
    pub fn full_name(&self, id: EntityId) -> Option<String> {
        let node = self.get(id)?;
        if let Some(parent) = node.parent.and_then(|p| self.get(p))
            && matches!(
                parent.kind,
                EntityKind::Class
                    | EntityKind::Widget
                    | EntityKind::Controller
                    | EntityKind::Model
                    | EntityKind::Migration
                    | EntityKind::Middleware
            )
        {
            return Some(format!("{}.{}", parent.name, node.name));
        }
        Some(node.name.clone())
    }

    /// Find entities by name, optionally restricted to one kind. Searches all
    /// nesting levels.
    pub fn find(&self, name: &str, kind: Option<EntityKind>) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, n)| n.name == name && kind.is_none_or(|k| n.kind == k))
            .map(|(id, _)| id)
            .collect()
    }
}

/// Derived per-file quality metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub file_size: u64,
    pub line_count: usize,
    pub entity_count: usize,
    pub cyclomatic_complexity: usize,
    pub nesting_depth: usize,
    /// `0.5 * cyclomatic + 0.3 * nesting + 0.2 * entity_count`, 2 decimals.
    pub complexity_score: f64,
}

/// A quality/security finding attached to a file and to the project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub file_path: String,
    pub line: usize,
    pub severity: String,
    pub message: String,
    pub description: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default = "Issue::default_source")]
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Issue {
    fn default_source() -> String {
        "manual".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_links_parent_and_child_both_ways() {
        let mut arena = EntityArena::new();
        let class = arena.push_root(EntityNode::new("Foo", EntityKind::Class, 1));
        let method = arena.push_child(class, EntityNode::new("bar", EntityKind::Method, 2));

        assert_eq!(arena.get(method).unwrap().parent, Some(class));
        assert!(arena.get(class).unwrap().children.contains(&method));
        assert_eq!(arena.roots(), &[class]);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn full_name_qualifies_methods_with_class() {
        let mut arena = EntityArena::new();
        let class = arena.push_root(EntityNode::new("Foo", EntityKind::Class, 1));
        let method = arena.push_child(class, EntityNode::new("bar", EntityKind::Method, 2));
        let func = arena.push_root(EntityNode::new("baz", EntityKind::Function, 9));

        assert_eq!(arena.full_name(method).as_deref(), Some("Foo.bar"));
        assert_eq!(arena.full_name(func).as_deref(), Some("baz"));
        assert_eq!(arena.full_name(class).as_deref(), Some("Foo"));
    }

    #[test]
    fn find_matches_name_and_kind_at_any_depth() {
        let mut arena = EntityArena::new();
        let class = arena.push_root(EntityNode::new("Foo", EntityKind::Class, 1));
        arena.push_child(class, EntityNode::new("run", EntityKind::Method, 2));
        arena.push_root(EntityNode::new("run", EntityKind::Function, 8));

        assert_eq!(arena.find("run", None).len(), 2);
        assert_eq!(arena.find("run", Some(EntityKind::Method)).len(), 1);
        assert!(arena.find("missing", None).is_empty());
    }

    #[test]
    fn prop_values_round_trip_as_plain_json() {
        let mut node = EntityNode::new("cfg", EntityKind::Variable, 3);
        node.set_prop("is_sensitive", true);
        node.set_prop("extends", "Base");
        let json = serde_json::to_string(&node).unwrap();
        let back: EntityNode = serde_json::from_str(&json).unwrap();
        assert!(back.flag("is_sensitive"));
        assert_eq!(
            back.properties.get("extends"),
            Some(&PropValue::Text("Base".into()))
        );
    }
}
