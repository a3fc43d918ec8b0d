//! codescope CLI: scan a source tree and report its structure,
//! dependencies, cycles, near-duplicates and complexity hotspots.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use codescope::{ProjectIndex, ScanOptions};

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

struct ParsedArgs {
    root: PathBuf,
    json: bool,
    include: Vec<String>,
    exclude: Vec<String>,
    threshold: f64,
    snapshot_path: Option<PathBuf>,
    load_path: Option<PathBuf>,
    jobs: Option<usize>,
    show_help: bool,
    show_version: bool,
}

impl Default for ParsedArgs {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            json: false,
            include: Vec::new(),
            exclude: Vec::new(),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            snapshot_path: None,
            load_path: None,
            jobs: None,
            show_help: false,
            show_version: false,
        }
    }
}

fn format_usage() -> &'static str {
    "codescope - project-wide source model\n\n\
Usage: codescope [root] [options]\n\n\
Options:\n  \
  --json                    Output the full report as JSON\n  \
  --include <glob>          Only scan matching relative paths (repeatable)\n  \
  --exclude <glob>          Skip matching relative paths (repeatable)\n  \
  --threshold <0..1>        Similarity threshold (default 0.8)\n  \
  --snapshot <file>         Save a snapshot after scanning\n  \
  --load <file>             Load a snapshot instead of scanning\n  \
  --jobs <N>                Cap parallel parse workers\n  \
  --help, -h                Show this help\n  \
  --version, -V             Show version"
}

fn parse_args(argv: &[String]) -> Result<ParsedArgs, String> {
    let mut args = ParsedArgs::default();
    let mut root_set = false;
    let mut iter = argv.iter();

    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag}: missing value"))
        };
        match arg.as_str() {
            "--json" => args.json = true,
            "--include" => args.include.push(value_for("--include")?),
            "--exclude" => args.exclude.push(value_for("--exclude")?),
            "--threshold" => {
                let raw = value_for("--threshold")?;
                let parsed: f64 = raw
                    .parse()
                    .map_err(|_| format!("--threshold: not a number: '{raw}'"))?;
                if !(0.0..=1.0).contains(&parsed) {
                    return Err(format!("--threshold: out of range 0..1: {parsed}"));
                }
                args.threshold = parsed;
            }
            "--snapshot" => args.snapshot_path = Some(PathBuf::from(value_for("--snapshot")?)),
            "--load" => args.load_path = Some(PathBuf::from(value_for("--load")?)),
            "--jobs" => {
                let raw = value_for("--jobs")?;
                let parsed: usize = raw
                    .parse()
                    .map_err(|_| format!("--jobs: not a number: '{raw}'"))?;
                args.jobs = Some(parsed);
            }
            "--help" | "-h" => args.show_help = true,
            "--version" | "-V" => args.show_version = true,
            other if other.starts_with('-') => return Err(format!("unknown option: {other}")),
            other => {
                if root_set {
                    return Err(format!("unexpected extra argument: {other}"));
                }
                args.root = PathBuf::from(other);
                root_set = true;
            }
        }
    }
    Ok(args)
}

fn print_human_report(index: &ProjectIndex, report: &codescope::DependencyReport, twins: &[codescope::SimilarPair]) {
    println!(
        "Project: {} ({}) at {}",
        index.name,
        index.project_type,
        index.root_dir.display()
    );
    println!(
        "Files: {}   Entities: {}   Edges: {}",
        index.file_count,
        index.entity_count,
        index.dependency_graph.edge_count()
    );

    if report.circular_dependencies.is_empty() {
        println!("\nNo circular dependencies detected.");
    } else {
        println!(
            "\nCircular dependencies ({}):",
            report.circular_dependencies.len()
        );
        for (i, cycle) in report.circular_dependencies.iter().enumerate() {
            println!("  Cycle {}: {}", i + 1, cycle.join(" -> "));
        }
    }

    if !report.central_files.is_empty() {
        println!("\nMost central files:");
        for entry in &report.central_files {
            println!("  {:<40} {:.3}", entry.file, entry.centrality);
        }
    }
    if !report.isolated_files.is_empty() {
        println!("\nIsolated files: {}", report.isolated_files.join(", "));
    }
    if !report.external_dependencies.is_empty() {
        println!("\nExternal dependencies:");
        for (dep, count) in &report.external_dependencies {
            println!("  {dep} ({count})");
        }
    }

    if twins.is_empty() {
        println!("\nNo similar file pairs at this threshold.");
    } else {
        println!("\nSimilar files:");
        for pair in twins {
            println!("  {} ~ {} ({:.2})", pair.file_a, pair.file_b, pair.score);
        }
    }

    let hotspots = index.most_complex_files(5);
    if !hotspots.is_empty() {
        println!("\nMost complex files:");
        for (path, score) in hotspots {
            println!("  {path:<40} {score:.2}");
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv).map_err(|err| anyhow!("{err}\n\n{}", format_usage()))?;

    if args.show_help {
        println!("{}", format_usage());
        return Ok(());
    }
    if args.show_version {
        println!("codescope {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut index = match &args.load_path {
        Some(path) => ProjectIndex::load_snapshot(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        None => {
            let mut index = ProjectIndex::new(&args.root)?;
            index.scan(&ScanOptions {
                include: args.include.clone(),
                exclude: args.exclude.clone(),
                concurrency: args.jobs,
            })?;
            index
        }
    };

    let report = index.analyze_dependencies();
    let twins = index.find_similar_files(args.threshold);

    if args.json {
        let payload = json!({
            "project": {
                "name": index.name,
                "root_dir": index.root_dir.display().to_string(),
                "project_type": index.project_type,
                "file_count": index.file_count,
                "entity_count": index.entity_count,
            },
            "structure": index.project_structure(),
            "dependencies": report,
            "similar_files": twins,
            "most_complex": index
                .most_complex_files(10)
                .into_iter()
                .map(|(path, score)| json!({ "file": path, "score": score }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_human_report(&index, &report, &twins);
    }

    if let Some(path) = &args.snapshot_path {
        index
            .save_snapshot(path)
            .with_context(|| format!("saving snapshot {}", path.display()))?;
        eprintln!("snapshot written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ParsedArgs, String> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_args(&owned)
    }

    #[test]
    fn defaults_scan_the_current_directory() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.root, PathBuf::from("."));
        assert_eq!(args.threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert!(!args.json);
    }

    #[test]
    fn flags_and_root_parse_together() {
        let args = parse(&["src", "--json", "--exclude", "gen/**", "--threshold", "0.5"]).unwrap();
        assert_eq!(args.root, PathBuf::from("src"));
        assert!(args.json);
        assert_eq!(args.exclude, vec!["gen/**".to_string()]);
        assert_eq!(args.threshold, 0.5);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(parse(&["--threshold", "2.0"]).is_err());
        assert!(parse(&["--threshold"]).is_err());
        assert!(parse(&["--wat"]).is_err());
        assert!(parse(&["a", "b"]).is_err());
    }
}
