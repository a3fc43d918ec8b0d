//! # codescope
//!
//! **Project-wide source model** - scans a directory tree and builds a
//! lightweight structural model of its code across six language families
//! (Python, JavaScript/TypeScript/React, Dart/Flutter, PHP/Laravel, HTML,
//! CSS) using per-language lexical heuristics rather than full grammars.
//!
//! ## Features
//!
//! - **Entity extraction** - classes, functions, methods, widgets,
//!   controllers and more, per file, with scope spans and properties
//! - **Dependency graph** - directed file graph from import resolution,
//!   with every elementary cycle enumerated
//! - **Near-duplicate detection** - line-set Jaccard similarity between
//!   same-language files
//! - **Complexity scoring** - cyclomatic + nesting + entity count composite
//! - **JSON snapshots** - scan once, persist, reload and query later
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,no_run
//! use codescope::{ProjectIndex, ScanOptions};
//!
//! let mut index = ProjectIndex::new(".").unwrap();
//! index.scan(&ScanOptions::default()).unwrap();
//! let report = index.analyze_dependencies();
//! println!("{} cycles", report.circular_dependencies.len());
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub mod detect;
pub mod extract;
pub mod file_record;
pub mod graph;
pub mod project;
pub mod similarity;
pub mod snapshot;
pub mod types;

/// Library-level error. Per-file problems during a scan never surface here;
/// they are recorded as data on the owning [`FileRecord`].
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot JSON: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("project root does not exist or is not a directory: {}", .0.display())]
    MissingRoot(PathBuf),
}

pub use detect::Language;
pub use file_record::FileRecord;
pub use graph::{CentralFile, DependencyGraph, DependencyReport};
pub use project::{DEFAULT_EXCLUDED_DIRS, ProjectIndex, ScanOptions};
pub use similarity::SimilarPair;
pub use snapshot::ProjectSnapshot;
pub use types::{EntityArena, EntityId, EntityKind, EntityNode, FileMetrics, Issue, PropValue};
