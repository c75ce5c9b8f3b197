//! CLI binary for methodmap: map methods, call sites and dependencies in
//! Ruby, ERB and JavaScript/TypeScript projects.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use methodmap_core::analysis::CorpusAnalysis;
use methodmap_core::config::AnalyzerConfig;
use methodmap_core::error::Severity;
use methodmap_core::export::{ExportFormat, export};
use methodmap_core::graph::GraphSummary;
use methodmap_core::method::Method;
use methodmap_core::schema::{self, AnalysisReport};
use methodmap_core::source::{Language, SourceFile};
use methodmap_core::storage;
use methodmap_parser::AnalysisContext;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(
    name = "methodmap",
    about = "Method and call-site map for Ruby, ERB and JavaScript/TypeScript projects"
)]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the project and print the result
    Analyze {
        /// Output format: summary, json
        #[arg(short, long, default_value = "summary")]
        format: String,

        /// Glob patterns to include files (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Glob patterns to exclude files (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Save the report to .methodmap/report.json
        #[arg(long)]
        save: bool,
    },

    /// Show where a method is defined
    Definition {
        /// Method name
        name: String,
    },

    /// List the methods that call a name
    Callers {
        /// Callee name
        name: String,
    },

    /// Export the dependency graph as DOT (Graphviz) or Mermaid flowchart
    Graph {
        /// Output format: dot, mermaid
        #[arg(short, long, default_value = "dot")]
        format: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Summary,
    Json,
}

impl OutputFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "summary" | "text" => Some(OutputFormat::Summary),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let project_root = get_project_root(&cli)?;

    match cli.command {
        Commands::Analyze {
            format,
            include,
            exclude,
            save,
        } => cmd_analyze(&project_root, &format, &include, &exclude, save),
        Commands::Definition { name } => cmd_definition(&project_root, &name),
        Commands::Callers { name } => cmd_callers(&project_root, &name),
        Commands::Graph { format } => cmd_graph(&project_root, &format),
    }
}

fn glob_set(patterns: &[String], flag: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        builder.add(Glob::new(p).with_context(|| format!("invalid {flag} glob: {p}"))?);
    }
    let set = builder
        .build()
        .with_context(|| format!("invalid {flag} glob set"))?;
    Ok(Some(set))
}

/// Collect the files some extractor can analyze, honoring `.gitignore`,
/// `.methodmapignore` and the glob filters. Paths are project-relative.
fn collect_source_files(
    project_root: &Path,
    ctx: &AnalysisContext,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<SourceFile>> {
    let include_set = glob_set(include, "--include")?;
    let exclude_set = glob_set(exclude, "--exclude")?;

    let walker = ignore::WalkBuilder::new(project_root)
        .hidden(true)
        .git_ignore(true)
        .add_custom_ignore_filename(".methodmapignore")
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let language = Language::from_path(path);
        if !ctx.factory().supports(language) {
            continue;
        }
        let rel_path = path.strip_prefix(project_root).unwrap_or(path);
        if let Some(ref inc) = include_set
            && !inc.is_match(rel_path)
        {
            continue;
        }
        if let Some(ref exc) = exclude_set
            && exc.is_match(rel_path)
        {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(source) => {
                let rel = rel_path.to_string_lossy().replace('\\', "/");
                files.push(SourceFile::new(rel, language, source));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn analyze_project(
    project_root: &Path,
    include: &[String],
    exclude: &[String],
) -> Result<CorpusAnalysis> {
    let config = AnalyzerConfig::load(project_root)
        .with_context(|| format!("failed to load config for {}", project_root.display()))?;
    let ctx = AnalysisContext::new(config);

    let files = collect_source_files(project_root, &ctx, include, exclude)?;
    if files.is_empty() {
        anyhow::bail!(
            "No Ruby, ERB, JavaScript or TypeScript files found in {}\nAre you in the right directory?",
            project_root.display()
        );
    }
    info!(files = files.len(), root = %project_root.display(), "analyzing project");

    let analysis = ctx.analyze_corpus(&files);
    for (path, diagnostic) in analysis.diagnostics() {
        match diagnostic.severity() {
            Severity::Warning => warn!(path, %diagnostic, "file analysis degraded"),
            Severity::Info | Severity::Debug => debug!(path, %diagnostic, "diagnostic"),
        }
    }
    Ok(analysis)
}

/// The saved report if there is one, otherwise a fresh analysis.
fn load_analysis(project_root: &Path) -> Result<CorpusAnalysis> {
    if storage::report_exists(project_root) {
        debug!(path = %storage::report_file(project_root).display(), "using saved report");
        return Ok(storage::load(project_root)?.into_analysis());
    }
    analyze_project(project_root, &[], &[])
}

fn cmd_analyze(
    project_root: &Path,
    format: &str,
    include: &[String],
    exclude: &[String],
    save: bool,
) -> Result<()> {
    let format = OutputFormat::from_name(format).ok_or_else(|| {
        anyhow::anyhow!("unsupported output format: {} (use summary or json)", format)
    })?;

    let analysis = analyze_project(project_root, include, exclude)?;
    let report = AnalysisReport::from_analysis(&analysis);

    match format {
        OutputFormat::Json => println!("{}", schema::to_json(&report)?),
        OutputFormat::Summary => print_summary(&analysis),
    }

    if save {
        storage::save(project_root, &report)?;
        eprintln!(
            "Saved to: {}",
            storage::report_file(project_root).display()
        );
    }
    Ok(())
}

fn print_summary(analysis: &CorpusAnalysis) {
    let graph = GraphSummary::of(&analysis.dependencies);
    println!("Files: {}", analysis.files.len());
    println!("Methods: {}", analysis.method_count());
    println!("Call sites: {}", analysis.call_count());
    println!(
        "Dependency edges: {} ({} internal, {} external)",
        graph.edges, graph.internal, graph.external
    );
    println!("Resolved calls: {}", graph.resolved_calls);

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for file in &analysis.files {
        for method in &file.methods {
            *kinds.entry(method.kind.as_str()).or_default() += 1;
        }
    }
    if !kinds.is_empty() {
        let parts: Vec<String> = kinds
            .iter()
            .map(|(kind, count)| format!("{kind} {count}"))
            .collect();
        println!("Kinds: {}", parts.join(", "));
    }

    let diagnostics = analysis.diagnostics().count();
    if diagnostics > 0 {
        println!("Diagnostics: {}", diagnostics);
    }
}

fn signature(method: &Method) -> String {
    let params: Vec<&str> = method.parameters.iter().map(|p| p.name.as_str()).collect();
    format!("{}({})", method.name, params.join(", "))
}

fn cmd_definition(project_root: &Path, name: &str) -> Result<()> {
    let analysis = load_analysis(project_root)?;
    let methods = analysis.methods();
    let definitions = methodmap_core::query::find_definitions(&methods, name);
    if definitions.is_empty() {
        anyhow::bail!("no definition named '{}'", name);
    }

    for method in definitions {
        println!(
            "{}:{}-{}  {}  {}",
            method.file_path,
            method.start_line,
            method.end_line,
            method.kind.as_str(),
            signature(method)
        );
    }
    Ok(())
}

fn cmd_callers(project_root: &Path, name: &str) -> Result<()> {
    let analysis = load_analysis(project_root)?;
    let callers = analysis.find_callers(name);
    if callers.is_empty() {
        eprintln!("No callers of '{}'.", name);
        return Ok(());
    }

    for caller in callers {
        for call in caller.calls.iter().filter(|c| c.method_name == name) {
            println!(
                "{}:{}  {}  {}",
                caller.file_path, call.line, caller.name, call.snippet
            );
        }
    }
    Ok(())
}

fn cmd_graph(project_root: &Path, format: &str) -> Result<()> {
    let fmt = ExportFormat::from_name(format).ok_or_else(|| {
        anyhow::anyhow!("unsupported export format: {} (use dot or mermaid)", format)
    })?;
    let analysis = load_analysis(project_root)?;
    print!("{}", export(&analysis.dependencies, fmt));
    Ok(())
}
