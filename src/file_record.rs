//! Per-file record: content identity, extracted entities, derived metrics.
//!
//! A [`FileRecord`] owns everything known about one scanned file. Loading
//! and parsing never abort the surrounding scan: failures land in the
//! record's `errors` list and the record degrades to an empty entity set.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::detect::Language;
use crate::extract;
use crate::extract::regexes::branch_regexes;
use crate::types::{EntityArena, FileMetrics, Issue};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub relative_path: String,
    /// May be refined during parse (e.g. javascript promoted to react).
    pub language: Language,
    /// Hex SHA-256 of the raw bytes, used for change detection.
    #[serde(default)]
    pub content_hash: String,
    /// Raw text, held only while the record is live. Not persisted.
    #[serde(skip)]
    pub content: Option<String>,
    #[serde(default)]
    pub entities: EntityArena,
    #[serde(default)]
    pub raw_imports: Vec<String>,
    /// Dependency tokens derived from imports, first-seen order.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metrics: FileMetrics,
    /// Non-fatal extraction and I/O problems, kept as data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analyzed: Option<DateTime<Utc>>,
}

fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, relative_path: impl Into<String>, language: Language) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            language,
            content_hash: String::new(),
            content: None,
            entities: EntityArena::new(),
            raw_imports: Vec::new(),
            dependencies: Vec::new(),
            metrics: FileMetrics::default(),
            errors: Vec::new(),
            issues: Vec::new(),
            last_modified: None,
            last_analyzed: None,
        }
    }

    /// File name without directories, extension kept.
    pub fn basename(&self) -> &str {
        Path::new(&self.relative_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.relative_path)
    }

    /// Base filename with the extension stripped; the target of dependency
    /// substring matching.
    pub fn basename_stem(&self) -> &str {
        let name = self.basename();
        match name.split_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Read the file from disk, updating hash, size and line count.
    ///
    /// Non-UTF-8 bytes fall back to a single-byte (Latin-1) decode, so the
    /// only failure mode left is the read itself. Returns false instead of
    /// erroring so one unreadable file never stops a scan.
    pub fn load(&mut self) -> bool {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.errors.push(format!("read failed: {err}"));
                return false;
            }
        };

        self.metrics.file_size = bytes.len() as u64;
        self.content_hash = hash_bytes(&bytes);
        self.last_modified = fs::metadata(&self.path)
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        let content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
        };
        self.metrics.line_count = content.lines().count();
        self.content = Some(content);
        true
    }

    /// Extract entities and imports from the loaded content.
    ///
    /// Loads on demand. Replaces entities, imports, dependencies and metrics
    /// wholesale; extractor warnings are appended to `errors`. Succeeds at
    /// the record level even when extraction degraded to nothing.
    pub fn parse(&mut self) -> bool {
        if self.content.is_none() && !self.load() {
            return false;
        }

        let extraction = extract::extract(self.content.as_deref().unwrap_or(""), self.language);
        if let Some(refined) = extraction.language
            && refined != self.language
        {
            debug!(
                file = %self.relative_path,
                from = %self.language,
                to = %refined,
                "language refined during parse"
            );
            self.language = refined;
        }
        self.entities = extraction.entities;
        self.raw_imports = extraction.raw_imports;
        self.dependencies = extraction.dependencies;
        self.errors.extend(extraction.warnings);

        self.analyze_complexity();
        self.last_analyzed = Some(Utc::now());
        true
    }

    /// Write new content to disk, then refresh hash/size/lines and re-parse.
    pub fn save(&mut self, new_content: &str) -> bool {
        if let Err(err) = fs::write(&self.path, new_content) {
            self.errors.push(format!("write failed: {err}"));
            return false;
        }
        self.content_hash = hash_bytes(new_content.as_bytes());
        self.metrics.file_size = new_content.len() as u64;
        self.metrics.line_count = new_content.lines().count();
        self.content = Some(new_content.to_string());
        self.last_modified = Some(Utc::now());
        self.parse()
    }

    /// True when the on-disk bytes no longer match `content_hash`.
    /// An unreadable file counts as modified.
    pub fn is_modified(&self) -> bool {
        match fs::read(&self.path) {
            Ok(bytes) => hash_bytes(&bytes) != self.content_hash,
            Err(_) => true,
        }
    }

    /// Extract lines `start_line..=end_line` (1-based) with `context` extra
    /// lines on both sides, clamped to the file. `None` when content is not
    /// loaded or the range starts past the end.
    pub fn snippet(&self, start_line: usize, end_line: usize, context: usize) -> Option<String> {
        let content = self.content.as_deref()?;
        let lines: Vec<&str> = content.lines().collect();
        if start_line == 0 || start_line > lines.len() {
            return None;
        }
        let from = (start_line - 1).saturating_sub(context);
        let to = end_line.max(start_line).saturating_add(context).min(lines.len());
        Some(lines[from..to].join("\n"))
    }

    /// Recompute cyclomatic complexity, nesting depth and the composite
    /// score over the loaded content.
    ///
    /// Cyclomatic = 1 + one count per branch pattern occurrence. Nesting is
    /// the running maximum of open minus closed braces, opens on a line
    /// counted before its closes. Composite = `0.5*cyclomatic + 0.3*nesting
    /// + 0.2*entity_count`, rounded to 2 decimals; the coefficients are a
    /// fixed heuristic and downstream consumers rely on the exact values.
    pub fn analyze_complexity(&mut self) -> &FileMetrics {
        self.metrics.entity_count = self.entities.roots().len();

        let Some(content) = self.content.as_deref().filter(|c| !c.is_empty()) else {
            self.metrics.cyclomatic_complexity = 0;
            self.metrics.nesting_depth = 0;
            self.metrics.complexity_score = 0.0;
            return &self.metrics;
        };

        let mut cyclomatic = 1usize;
        for line in content.lines() {
            for re in branch_regexes() {
                cyclomatic += re.find_iter(line).count();
            }
        }

        let mut max_nesting = 0i64;
        let mut depth = 0i64;
        for line in content.lines() {
            depth += line.matches('{').count() as i64;
            max_nesting = max_nesting.max(depth);
            depth -= line.matches('}').count() as i64;
        }
        let nesting = max_nesting.max(0) as usize;

        self.metrics.cyclomatic_complexity = cyclomatic;
        self.metrics.nesting_depth = nesting;
        let score = cyclomatic as f64 * 0.5
            + nesting as f64 * 0.3
            + self.metrics.entity_count as f64 * 0.2;
        self.metrics.complexity_score = (score * 100.0).round() / 100.0;
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn record_with(content: &str, language: Language) -> FileRecord {
        let mut rec = FileRecord::new("/virtual/test", "test", language);
        rec.content = Some(content.to_string());
        rec.metrics.line_count = content.lines().count();
        rec
    }

    #[test]
    fn cyclomatic_is_one_without_branches() {
        let mut rec = record_with("def foo():\n    return 1\n", Language::Python);
        rec.parse();
        assert_eq!(rec.metrics.cyclomatic_complexity, 1);
        assert_eq!(rec.metrics.entity_count, 1);
        // 1*0.5 + 0*0.3 + 1*0.2
        assert_eq!(rec.metrics.complexity_score, 0.7);
    }

    #[test]
    fn branch_patterns_raise_cyclomatic() {
        let src = "function f(a) {\n  if (a && a.x) {\n    for (;;) {}\n  }\n}\n";
        let mut rec = record_with(src, Language::Javascript);
        rec.parse();
        // 1 base + if + && + for
        assert_eq!(rec.metrics.cyclomatic_complexity, 4);
        assert_eq!(rec.metrics.nesting_depth, 3);
    }

    #[test]
    fn empty_content_yields_zero_metrics() {
        let mut rec = record_with("", Language::Python);
        rec.analyze_complexity();
        assert_eq!(rec.metrics.cyclomatic_complexity, 0);
        assert_eq!(rec.metrics.complexity_score, 0.0);
    }

    #[test]
    fn load_parse_and_change_detection_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.py");
        std::fs::write(&path, "class Foo:\n    def bar(self):\n        pass\n").unwrap();

        let mut rec = FileRecord::new(&path, "mod.py", Language::Python);
        assert!(rec.parse());
        assert_eq!(rec.entities.roots().len(), 1);
        assert_eq!(rec.entities.len(), 2);
        assert_eq!(rec.metrics.line_count, 3);
        assert!(!rec.content_hash.is_empty());
        assert!(!rec.is_modified());

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "x = 1").unwrap();
        assert!(rec.is_modified());
    }

    #[test]
    fn save_rewrites_and_reparses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, "function old() {}\n").unwrap();

        let mut rec = FileRecord::new(&path, "app.js", Language::Javascript);
        rec.parse();
        let old_hash = rec.content_hash.clone();

        assert!(rec.save("function brand_new() {}\n"));
        assert_ne!(rec.content_hash, old_hash);
        assert!(!rec.is_modified());
        assert_eq!(rec.entities.find("brand_new", None).len(), 1);
    }

    #[test]
    fn unreadable_file_degrades_instead_of_failing_hard() {
        let mut rec = FileRecord::new("/nonexistent/none.py", "none.py", Language::Python);
        assert!(!rec.load());
        assert!(!rec.parse());
        assert_eq!(rec.errors.len(), 2);
        assert!(rec.entities.is_empty());
    }

    #[test]
    fn latin1_fallback_decodes_non_utf8_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.py");
        std::fs::write(&path, b"# caf\xe9\nx = 1\n").unwrap();

        let mut rec = FileRecord::new(&path, "legacy.py", Language::Python);
        assert!(rec.load());
        assert!(rec.content.as_deref().unwrap().contains("café"));
        assert_eq!(rec.metrics.line_count, 2);
    }

    #[test]
    fn snippet_clamps_context_to_the_file() {
        let rec = record_with("l1\nl2\nl3\nl4\nl5\n", Language::Python);
        assert_eq!(rec.snippet(2, 3, 1).as_deref(), Some("l1\nl2\nl3\nl4"));
        assert_eq!(rec.snippet(1, 5, 10).as_deref(), Some("l1\nl2\nl3\nl4\nl5"));
        assert_eq!(rec.snippet(9, 9, 0), None);
        assert_eq!(rec.snippet(0, 1, 0), None);
    }

    #[test]
    fn basename_stem_strips_directories_and_extension() {
        let rec = FileRecord::new("/p/src/user_service.py", "src/user_service.py", Language::Python);
        assert_eq!(rec.basename(), "user_service.py");
        assert_eq!(rec.basename_stem(), "user_service");
    }
}
