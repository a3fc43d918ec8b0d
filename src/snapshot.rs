//! JSON snapshot persistence: scan once, reload and query later.
//!
//! The on-disk schema nests entity trees recursively per file instead of
//! exposing arena indices, so snapshots stay readable and stable across
//! re-parses that renumber the arena.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ScopeError;
use crate::detect::Language;
use crate::file_record::FileRecord;
use crate::graph::DependencyGraph;
use crate::types::{EntityArena, EntityId, EntityKind, FileMetrics, Issue, PropValue};

/// Bumped when the snapshot layout changes incompatibly.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub name: String,
    pub root_dir: String,
    pub project_type: String,
    pub file_count: usize,
    pub entity_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub files: BTreeMap<String, FileSnapshot>,
    /// Absent in hand-trimmed snapshots; the loader rebuilds it from `files`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_graph: Option<GraphSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub file_path: String,
    pub relative_path: String,
    pub language: Language,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub entities: Vec<EntitySnapshot>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metrics: FileMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analyzed: Option<DateTime<Utc>>,
}

/// One entity with its children nested inline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub start_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntitySnapshot>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

impl EntitySnapshot {
    fn from_arena(arena: &EntityArena, id: EntityId) -> Option<Self> {
        let node = arena.get(id)?;
        Some(Self {
            name: node.name.clone(),
            kind: node.kind,
            start_line: node.start_line,
            end_line: node.end_line,
            properties: node.properties.clone(),
            children: node
                .children
                .iter()
                .filter_map(|&c| Self::from_arena(arena, c))
                .collect(),
        })
    }

    fn restore_into(&self, arena: &mut EntityArena, parent: Option<EntityId>) {
        let mut node = crate::types::EntityNode::new(self.name.clone(), self.kind, self.start_line);
        node.end_line = self.end_line;
        node.properties = self.properties.clone();
        let id = match parent {
            Some(p) => arena.push_child(p, node),
            None => arena.push_root(node),
        };
        for child in &self.children {
            child.restore_into(arena, Some(id));
        }
    }
}

/// Arena roots as nested snapshot trees.
pub fn entities_to_snapshots(arena: &EntityArena) -> Vec<EntitySnapshot> {
    arena
        .roots()
        .iter()
        .filter_map(|&id| EntitySnapshot::from_arena(arena, id))
        .collect()
}

/// Rebuild a flat arena from nested snapshot trees.
pub fn entities_from_snapshots(roots: &[EntitySnapshot]) -> EntityArena {
    let mut arena = EntityArena::new();
    for root in roots {
        root.restore_into(&mut arena, None);
    }
    arena
}

impl FileSnapshot {
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            file_path: record.path.display().to_string(),
            relative_path: record.relative_path.clone(),
            language: record.language,
            hash: record.content_hash.clone(),
            entities: entities_to_snapshots(&record.entities),
            imports: record.raw_imports.clone(),
            dependencies: record.dependencies.clone(),
            metrics: record.metrics.clone(),
            errors: record.errors.clone(),
            issues: record.issues.clone(),
            last_modified: record.last_modified,
            last_analyzed: record.last_analyzed,
        }
    }

    pub fn into_record(self) -> FileRecord {
        let mut record = FileRecord::new(&self.file_path, self.relative_path, self.language);
        record.content_hash = self.hash;
        record.entities = entities_from_snapshots(&self.entities);
        record.raw_imports = self.imports;
        record.dependencies = self.dependencies;
        record.metrics = self.metrics;
        record.errors = self.errors;
        record.issues = self.issues;
        record.last_modified = self.last_modified;
        record.last_analyzed = self.last_analyzed;
        record
    }
}

impl GraphSnapshot {
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        Self {
            nodes: graph.nodes().map(str::to_string).collect(),
            edges: graph
                .edges()
                .map(|(f, t)| (f.to_string(), t.to_string()))
                .collect(),
        }
    }

    pub fn into_graph(self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for node in self.nodes {
            graph.add_node(node);
        }
        for (from, to) in self.edges {
            graph.add_edge(from, to);
        }
        graph
    }
}

impl ProjectSnapshot {
    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ScopeError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ScopeError> {
        let content = fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&content)?;

        if let Some(serde_json::Value::String(version)) = snapshot.metadata.get("schema_version")
            && version != SNAPSHOT_SCHEMA_VERSION
        {
            warn!(
                found = %version,
                expected = SNAPSHOT_SCHEMA_VERSION,
                "snapshot schema version mismatch, consider re-scanning"
            );
        }
        Ok(snapshot)
    }
}
