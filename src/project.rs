//! Project index: directory scanning, orchestration and derived analyses.
//!
//! Scanning is data-parallel per file: candidates are collected in one
//! walk, parsed concurrently, then merged into the file map by the single
//! writer before any graph or similarity analysis runs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde_json::{Value, json};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::ScopeError;
use crate::detect::{self, Language};
use crate::file_record::FileRecord;
use crate::graph::{DependencyGraph, DependencyReport};
use crate::similarity::{self, SimilarPair};
use crate::snapshot::{
    FileSnapshot, GraphSnapshot, ProjectSnapshot, SNAPSHOT_SCHEMA_VERSION,
};
use crate::types::{EntityKind, EntityNode, Issue};

/// Directory names skipped during every walk, before user excludes apply.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "venv",
    "__pycache__",
    "build",
    "dist",
    ".idea",
    ".vscode",
];

#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
    /// Glob patterns a relative path must match to be scanned. Empty = all.
    pub include: Vec<String>,
    /// Glob patterns that drop a relative path from the scan.
    pub exclude: Vec<String>,
    /// Worker cap for the parallel parse stage. `None` = rayon default.
    pub concurrency: Option<usize>,
}

/// Build a globset from user patterns, skipping invalid ones with a warning.
fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut added = false;
    for pat in patterns {
        if pat.trim().is_empty() {
            continue;
        }
        match Glob::new(pat) {
            Ok(glob) => {
                builder.add(glob);
                added = true;
            }
            Err(err) => warn!(pattern = %pat, %err, "invalid glob pattern, skipping"),
        }
    }
    if !added {
        return None;
    }
    builder.build().ok()
}

fn parse_candidates(
    candidates: Vec<(String, PathBuf, Language)>,
    cancel: &AtomicBool,
) -> Vec<FileRecord> {
    candidates
        .into_par_iter()
        .filter_map(|(relative, path, language)| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let mut record = FileRecord::new(path, relative, language);
            record.parse();
            Some(record)
        })
        .collect()
}

/// The full model of one scanned source tree.
#[derive(Clone, Debug)]
pub struct ProjectIndex {
    pub root_dir: PathBuf,
    pub name: String,
    pub project_type: String,
    pub files: BTreeMap<String, FileRecord>,
    pub dependency_graph: DependencyGraph,
    pub file_count: usize,
    /// Top-level entities across all files.
    pub entity_count: usize,
    pub issues: Vec<Issue>,
    pub metadata: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    cancel: Arc<AtomicBool>,
}

impl ProjectIndex {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ScopeError> {
        let root_dir = root.into();
        if !root_dir.is_dir() {
            return Err(ScopeError::MissingRoot(root_dir));
        }
        let name = root_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project")
            .to_string();
        let project_type = detect::detect_project_type(&root_dir);
        let now = Utc::now();
        Ok(Self {
            root_dir,
            name,
            project_type,
            files: BTreeMap::new(),
            dependency_graph: DependencyGraph::new(),
            file_count: 0,
            entity_count: 0,
            issues: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            last_modified: now,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shared flag for stopping a scan in progress. Workers check it between
    /// files; the file being parsed always completes.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Walk the tree, load and parse every matched file, then rebuild the
    /// dependency graph from scratch. Returns the number of indexed files.
    pub fn scan(&mut self, options: &ScanOptions) -> Result<usize, ScopeError> {
        let include = build_globset(&options.include);
        let exclude = build_globset(&options.exclude);
        self.cancel.store(false, Ordering::Relaxed);

        let mut candidates: Vec<(String, PathBuf, Language)> = Vec::new();
        let walker = WalkDir::new(&self.root_dir).into_iter().filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.file_name()
                    .to_str()
                    .is_some_and(|n| DEFAULT_EXCLUDED_DIRS.contains(&n)))
        });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, "walk error, skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(language) = detect::language_for_path(path) else {
                continue;
            };
            let relative = path
                .strip_prefix(&self.root_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            if let Some(set) = &exclude
                && set.is_match(&relative)
            {
                continue;
            }
            if let Some(set) = &include
                && !set.is_match(&relative)
            {
                continue;
            }
            candidates.push((relative, path.to_path_buf(), language));
        }
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let records = if let Some(threads) = options.concurrency.filter(|&n| n > 0)
            && let Ok(pool) = rayon::ThreadPoolBuilder::new().num_threads(threads).build()
        {
            pool.install(|| parse_candidates(candidates, &self.cancel))
        } else {
            parse_candidates(candidates, &self.cancel)
        };

        // Single-writer merge: workers only produce, this loop alone mutates.
        self.files.clear();
        for record in records {
            self.files.insert(record.relative_path.clone(), record);
        }
        self.file_count = self.files.len();
        self.entity_count = self.files.values().map(|f| f.entities.roots().len()).sum();
        self.build_dependency_graph();
        self.last_modified = Utc::now();
        info!(
            files = self.file_count,
            entities = self.entity_count,
            edges = self.dependency_graph.edge_count(),
            "scan complete"
        );
        Ok(self.file_count)
    }

    /// Rebuild all edges from the files' dependency tokens.
    ///
    /// A token resolves to the first other file (in sorted path order) whose
    /// extension-stripped basename contains it as a substring. First match
    /// wins; ambiguity is not resolved further, which is a deliberate
    /// heuristic limit of the resolver.
    pub fn build_dependency_graph(&mut self) {
        let mut graph = DependencyGraph::new();
        for path in self.files.keys() {
            graph.add_node(path.clone());
        }
        for (path, record) in &self.files {
            for token in &record.dependencies {
                let target = self
                    .files
                    .iter()
                    .find(|(other, rec)| {
                        *other != path && rec.basename_stem().contains(token.as_str())
                    })
                    .map(|(other, _)| other.clone());
                if let Some(target) = target {
                    graph.add_edge(path.clone(), target);
                }
            }
        }
        self.dependency_graph = graph;
    }

    /// Central files, isolated files, external dependency frequencies and
    /// every elementary dependency cycle.
    pub fn analyze_dependencies(&self) -> DependencyReport {
        let mut report = DependencyReport {
            central_files: self.dependency_graph.central_files(10),
            isolated_files: self.dependency_graph.isolated_nodes(),
            ..DependencyReport::default()
        };
        for (path, record) in &self.files {
            for token in &record.dependencies {
                let resolved = self.files.iter().any(|(other, rec)| {
                    other != path && rec.basename_stem().contains(token.as_str())
                });
                if !resolved {
                    *report.external_dependencies.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }
        report.circular_dependencies = self.dependency_graph.find_cycles();
        report
    }

    /// Same-language near-duplicate pairs with Jaccard score >= `threshold`,
    /// sorted by score descending. Loads file content on demand.
    pub fn find_similar_files(&mut self, threshold: f64) -> Vec<SimilarPair> {
        for record in self.files.values_mut() {
            // A record that already failed to read stays failed; retrying
            // every call would grow its error list.
            let read_failed = record.errors.iter().any(|e| e.starts_with("read failed"));
            if record.content.is_none() && !read_failed {
                record.load();
            }
        }

        let files: Vec<(&String, &FileRecord)> = self.files.iter().collect();
        let mut pairs = Vec::new();
        for (i, (path_a, file_a)) in files.iter().enumerate() {
            for (path_b, file_b) in files.iter().skip(i + 1) {
                if file_a.language != file_b.language {
                    continue;
                }
                let (Some(content_a), Some(content_b)) =
                    (file_a.content.as_deref(), file_b.content.as_deref())
                else {
                    continue;
                };
                let score = similarity::similarity(content_a, content_b);
                if score >= threshold {
                    pairs.push(SimilarPair {
                        file_a: (*path_a).clone(),
                        file_b: (*path_b).clone(),
                        score,
                    });
                }
            }
        }
        pairs.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_a.cmp(&b.file_a))
        });
        pairs
    }

    /// All entities named `name` across the project, any nesting level.
    pub fn find_entities(&self, name: &str, kind: Option<EntityKind>) -> Vec<(&str, &EntityNode)> {
        self.files
            .iter()
            .flat_map(|(path, record)| {
                record
                    .entities
                    .find(name, kind)
                    .into_iter()
                    .filter_map(move |id| record.entities.get(id).map(|n| (path.as_str(), n)))
            })
            .collect()
    }

    /// Look a file up by basename or full relative path.
    pub fn find_file(&self, name: &str) -> Option<&FileRecord> {
        self.files
            .get(name)
            .or_else(|| self.files.values().find(|r| r.basename() == name))
    }

    /// Nested directory/file tree with per-file language and entity counts.
    pub fn project_structure(&self) -> Value {
        #[derive(Default)]
        struct DirNode {
            dirs: BTreeMap<String, DirNode>,
            files: Vec<Value>,
        }

        fn render(name: &str, node: &DirNode) -> Value {
            let mut children: Vec<Value> =
                node.dirs.iter().map(|(n, d)| render(n, d)).collect();
            children.extend(node.files.iter().cloned());
            json!({ "name": name, "type": "directory", "children": children })
        }

        let mut root = DirNode::default();
        for (path, record) in &self.files {
            let parts: Vec<&str> = path.split('/').collect();
            let mut cursor = &mut root;
            for part in &parts[..parts.len().saturating_sub(1)] {
                cursor = cursor.dirs.entry((*part).to_string()).or_default();
            }
            cursor.files.push(json!({
                "name": parts.last().copied().unwrap_or(path.as_str()),
                "type": "file",
                "language": record.language.as_str(),
                "entity_count": record.entities.roots().len(),
            }));
        }
        render(&self.name, &root)
    }

    /// Record an issue at project level and on the owning file.
    /// Returns false when no file matches `file`; the project-level record
    /// is kept either way.
    pub fn add_issue(
        &mut self,
        file: &str,
        line: usize,
        severity: &str,
        message: &str,
        description: &str,
        recommendation: &str,
    ) -> bool {
        let issue = Issue {
            file_path: file.to_string(),
            line,
            severity: severity.to_string(),
            message: message.to_string(),
            description: description.to_string(),
            recommendation: recommendation.to_string(),
            source: "manual".to_string(),
            created_at: Utc::now(),
        };
        self.issues.push(issue.clone());
        match self.files.get_mut(file) {
            Some(record) => {
                record.issues.push(issue);
                true
            }
            None => false,
        }
    }

    /// Files ranked by composite complexity score, highest first.
    pub fn most_complex_files(&self, limit: usize) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .files
            .iter()
            .map(|(path, record)| (path.as_str(), record.metrics.complexity_score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(limit);
        ranked
    }

    pub fn to_snapshot(&self) -> ProjectSnapshot {
        let mut metadata = self.metadata.clone();
        metadata.insert(
            "schema_version".to_string(),
            Value::String(SNAPSHOT_SCHEMA_VERSION.to_string()),
        );
        ProjectSnapshot {
            name: self.name.clone(),
            root_dir: self.root_dir.display().to_string(),
            project_type: self.project_type.clone(),
            file_count: self.file_count,
            entity_count: self.entity_count,
            created_at: self.created_at,
            last_modified: self.last_modified,
            files: self
                .files
                .iter()
                .map(|(path, record)| (path.clone(), FileSnapshot::from_record(record)))
                .collect(),
            dependency_graph: Some(GraphSnapshot::from_graph(&self.dependency_graph)),
            issues: self.issues.clone(),
            metadata,
        }
    }

    /// Restore an index from a snapshot. A missing graph section is rebuilt
    /// from the restored files instead of being left empty.
    pub fn from_snapshot(snapshot: ProjectSnapshot) -> Self {
        let mut files = BTreeMap::new();
        for (path, file_snapshot) in snapshot.files {
            files.insert(path, file_snapshot.into_record());
        }
        let mut index = Self {
            root_dir: PathBuf::from(&snapshot.root_dir),
            name: snapshot.name,
            project_type: snapshot.project_type,
            files,
            dependency_graph: DependencyGraph::new(),
            file_count: snapshot.file_count,
            entity_count: snapshot.entity_count,
            issues: snapshot.issues,
            metadata: snapshot.metadata,
            created_at: snapshot.created_at,
            last_modified: snapshot.last_modified,
            cancel: Arc::new(AtomicBool::new(false)),
        };
        match snapshot.dependency_graph {
            Some(graph_snapshot) => index.dependency_graph = graph_snapshot.into_graph(),
            None => index.build_dependency_graph(),
        }
        index
    }

    pub fn save_snapshot(&self, path: &std::path::Path) -> Result<(), ScopeError> {
        self.to_snapshot().save(path)
    }

    pub fn load_snapshot(path: &std::path::Path) -> Result<Self, ScopeError> {
        Ok(Self::from_snapshot(ProjectSnapshot::load(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &std::path::Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(matches!(
            ProjectIndex::new("/nonexistent/project"),
            Err(ScopeError::MissingRoot(_))
        ));
    }

    #[test]
    fn scan_indexes_supported_files_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        write(dir.path(), "notes.txt", "not source\n");
        write(dir.path(), "web/app.js", "function run() {}\n");

        let mut index = ProjectIndex::new(dir.path()).unwrap();
        let count = index.scan(&ScanOptions::default()).unwrap();
        assert_eq!(count, 2);
        assert!(index.files.contains_key("a.py"));
        assert!(index.files.contains_key("web/app.js"));
        assert_eq!(index.entity_count, 2);
    }

    #[test]
    fn edge_resolution_is_first_substring_match_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        // "util" is a substring of both stems; sorted order puts
        // "util_extra.py" before "utils.py", so the edge goes there.
        write(dir.path(), "main.py", "import util\n");
        write(dir.path(), "util_extra.py", "a = 1\n");
        write(dir.path(), "utils.py", "b = 2\n");

        let mut index = ProjectIndex::new(dir.path()).unwrap();
        index.scan(&ScanOptions::default()).unwrap();
        assert!(index.dependency_graph.contains_edge("main.py", "util_extra.py"));
        assert!(!index.dependency_graph.contains_edge("main.py", "utils.py"));
    }

    #[test]
    fn a_file_never_depends_on_itself() {
        let dir = tempfile::tempdir().unwrap();
        // "util" is a substring of this file's own stem "utils"; the
        // resolver must not produce a self-loop for it.
        write(dir.path(), "utils.py", "import util\n");

        let mut index = ProjectIndex::new(dir.path()).unwrap();
        index.scan(&ScanOptions::default()).unwrap();
        assert_eq!(index.dependency_graph.edge_count(), 0);
        let report = index.analyze_dependencies();
        assert_eq!(report.external_dependencies.get("util"), Some(&1));
    }

    #[test]
    fn exclude_globs_drop_matching_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "keep.py", "x = 1\n");
        write(dir.path(), "gen/skip.py", "y = 2\n");

        let mut index = ProjectIndex::new(dir.path()).unwrap();
        let options = ScanOptions {
            exclude: vec!["gen/**".to_string()],
            ..ScanOptions::default()
        };
        index.scan(&options).unwrap();
        assert_eq!(index.file_count, 1);
        assert!(index.files.contains_key("keep.py"));
    }

    #[test]
    fn add_issue_lands_on_project_and_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        let mut index = ProjectIndex::new(dir.path()).unwrap();
        index.scan(&ScanOptions::default()).unwrap();

        assert!(index.add_issue("a.py", 1, "warning", "loose variable", "", ""));
        assert_eq!(index.issues.len(), 1);
        assert_eq!(index.files["a.py"].issues.len(), 1);

        assert!(!index.add_issue("missing.py", 1, "error", "gone", "", ""));
        assert_eq!(index.issues.len(), 2);
    }

    #[test]
    fn project_structure_nests_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.py", "x = 1\n");
        write(dir.path(), "top.py", "y = 2\n");
        let mut index = ProjectIndex::new(dir.path()).unwrap();
        index.scan(&ScanOptions::default()).unwrap();

        let tree = index.project_structure();
        assert_eq!(tree["type"], "directory");
        let children = tree["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["name"], "src");
        assert_eq!(children[0]["children"][0]["name"], "a.py");
        assert_eq!(children[1]["name"], "top.py");
        assert_eq!(children[1]["language"], "python");
    }

    #[test]
    fn cancelled_flag_stops_workers_before_any_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        write(dir.path(), "b.py", "y = 2\n");

        let candidates = vec![
            (
                "a.py".to_string(),
                dir.path().join("a.py"),
                Language::Python,
            ),
            (
                "b.py".to_string(),
                dir.path().join("b.py"),
                Language::Python,
            ),
        ];
        let cancel = AtomicBool::new(true);
        let records = parse_candidates(candidates, &cancel);
        assert!(records.is_empty());
    }

    #[test]
    fn scan_resets_a_stale_cancel_flag() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "x = 1\n");

        let mut index = ProjectIndex::new(dir.path()).unwrap();
        index.request_cancel();
        let count = index.scan(&ScanOptions::default()).unwrap();
        assert_eq!(count, 1);
        assert!(!index.cancel_flag().load(Ordering::Relaxed));
    }

    #[test]
    fn similarity_runs_do_not_accumulate_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        write(dir.path(), "b.py", "x = 1\n");
        let mut index = ProjectIndex::new(dir.path()).unwrap();
        index.scan(&ScanOptions::default()).unwrap();

        // Make b.py unreadable after the scan and drop its cached content so
        // the next analysis has to go back to disk.
        fs::remove_file(dir.path().join("b.py")).unwrap();
        let record = index.files.get_mut("b.py").unwrap();
        record.content = None;
        record.errors.clear();

        index.find_similar_files(0.5);
        index.find_similar_files(0.5);
        let errors = &index.files["b.py"].errors;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("read failed"));
    }

    #[test]
    fn find_file_matches_basename_or_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/service.py", "x = 1\n");
        let mut index = ProjectIndex::new(dir.path()).unwrap();
        index.scan(&ScanOptions::default()).unwrap();

        assert!(index.find_file("service.py").is_some());
        assert!(index.find_file("src/service.py").is_some());
        assert!(index.find_file("absent.py").is_none());
    }
}
