//! callscope CLI - who calls this function?
//!
//! Features:
//! - Direct callers and raw call sites of a qualified name
//! - Bounded transitive caller tree
//! - Graphviz DOT caller graph with source links
//! - Live Elasticsearch index or an offline JSON fixture

use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, Parser};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use callscope_core::{
    find_config, format_callers, format_calls, format_summary, generate_dot, init_pretty_logging,
    init_structured_logging, list_callers, list_calls, load_config, node_urls, render_tree,
    to_json, CallContext, CallGraph, CallGraphBuilder, CallscopeConfig, CallscopeError,
    IndexClient, LinkResolver, MemoryIndex, Settings,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Find the callers of a function in a code-intelligence index")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["callers", "calls", "calltree", "dot"])
))]
pub struct Cli {
    /// List the direct callers of a qualified name
    #[arg(long, value_name = "QUALNAME")]
    callers: Option<String>,

    /// List every call site of a qualified name
    #[arg(long, value_name = "QUALNAME")]
    calls: Option<String>,

    /// Print a source link under each call site (with --calls)
    #[arg(long, requires = "calls", conflicts_with_all = ["callers", "calltree", "dot"])]
    links: bool,

    /// Print the transitive caller tree of a qualified name
    #[arg(long, value_name = "QUALNAME")]
    calltree: Option<String>,

    /// Emit the caller graph of a qualified name in Graphviz DOT format
    #[arg(long, value_name = "QUALNAME")]
    dot: Option<String>,

    /// Write DOT output to a file instead of stdout
    #[arg(long, value_name = "FILE", requires = "dot")]
    dot_file: Option<String>,

    /// Maximum caller depth for --calltree and --dot
    #[arg(long)]
    depth: Option<usize>,

    /// Maximum number of functions in a caller graph
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Concurrent index queries
    #[arg(long)]
    concurrency: Option<usize>,

    /// Re-expand functions reached again on a later level
    #[arg(long)]
    no_visited_set: bool,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Search service URL
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Index to query instead of auto-selecting one
    #[arg(long, value_name = "NAME")]
    index: Option<String>,

    /// Query a JSON file of index hits instead of a server
    #[arg(long, value_name = "FILE", conflicts_with_all = ["endpoint", "index"])]
    fixture: Option<PathBuf>,

    /// Configuration file (default: ./callscope.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long)]
    log_json: bool,

    /// Debug logging, including per-query timings
    #[arg(short, long)]
    verbose: bool,
}

/// Security: Validates output file paths to prevent path traversal attacks.
///
/// Rejects:
/// - Absolute paths (must be relative to current directory)
/// - Paths containing `..` (parent directory traversal)
/// - Paths with null bytes (injection attacks)
fn validate_output_path(path: &str) -> Result<PathBuf> {
    if path.contains('\0') {
        return Err(anyhow!("Output path contains null bytes"));
    }

    let p = PathBuf::from(path);

    if p.is_absolute() {
        return Err(anyhow!(
            "Output path must be relative, not absolute: {}",
            path
        ));
    }

    if p
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(anyhow!(
            "Path traversal (..) not allowed in output paths: {}",
            path
        ));
    }

    Ok(p)
}

/// Resolve settings: defaults, then the config file, then flags.
fn build_settings(cli: &Cli, cfg: Option<&CallscopeConfig>) -> Result<Settings> {
    let mut s = cfg.map(Settings::from_config).unwrap_or_default();

    if let Some(endpoint) = &cli.endpoint {
        s.index.endpoint = endpoint.clone();
    }
    if cli.index.is_some() {
        s.index.name = cli.index.clone();
    }
    if let Some(depth) = cli.depth {
        s.traversal.max_depth = depth;
    }
    if let Some(n) = cli.max_nodes {
        s.traversal.max_nodes = n;
    }
    if let Some(n) = cli.concurrency {
        s.traversal.concurrency = n;
    }
    if cli.no_visited_set {
        s.traversal.visited_set = false;
    }

    s.validate().context("Invalid settings")?;
    Ok(s)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let cfg = match &cli.config {
        Some(path) => Some(load_config(path)?),
        None => find_config(Path::new("."))?.map(|(_, cfg)| cfg),
    };
    build_settings(cli, cfg.as_ref())
}

fn open_index(cli: &Cli, settings: &Settings) -> Result<Box<dyn IndexClient>> {
    if let Some(path) = &cli.fixture {
        let index = MemoryIndex::load(path)
            .with_context(|| format!("Failed to load fixture {}", path.display()))?;
        return Ok(Box::new(index));
    }
    connect(settings)
}

#[cfg(feature = "elastic")]
fn connect(settings: &Settings) -> Result<Box<dyn IndexClient>> {
    let index = callscope_core::ElasticIndex::connect(settings.to_elastic_config())
        .with_context(|| format!("Failed to connect to {}", settings.index.endpoint))?;
    Ok(Box::new(index))
}

#[cfg(not(feature = "elastic"))]
fn connect(_settings: &Settings) -> Result<Box<dyn IndexClient>> {
    Err(anyhow!(
        "built without the `elastic` feature; use --fixture to query a JSON dump"
    ))
}

/// Build a caller graph, mapping an unknown root to `None`.
fn build_graph(ctx: &CallContext<'_>, settings: &Settings, qualname: &str) -> Result<Option<CallGraph>> {
    match CallGraphBuilder::new(ctx)
        .with_options(settings.traversal_options())
        .build(qualname)
    {
        Ok(graph) => Ok(Some(graph)),
        Err(CallscopeError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to build caller graph of '{}'", qualname)),
    }
}

fn write_not_found(out: &mut dyn Write, qualname: &str, json: bool) -> Result<()> {
    if json {
        let v = serde_json::json!({ "qualname": qualname, "found": false, "nodes": [], "edges": [] });
        writeln!(out, "{}", serde_json::to_string_pretty(&v)?)?;
    } else {
        writeln!(out, "No definition found for '{}'.", qualname)?;
    }
    Ok(())
}

/// Execute the selected operation, writing results to `out`.
fn run(cli: &Cli, settings: &Settings, index: &dyn IndexClient, out: &mut dyn Write) -> Result<()> {
    let ctx = CallContext::new(index).with_test_filter(settings.test_filter()?);

    if let Some(qualname) = &cli.callers {
        let report = list_callers(&ctx, qualname, settings.traversal.concurrency)?;
        if cli.json {
            writeln!(out, "{}", to_json(&report))?;
        } else {
            write!(out, "{}", format_callers(&report))?;
        }
        return Ok(());
    }

    if let Some(qualname) = &cli.calls {
        let resolver = LinkResolver::new(index);
        let links = cli.links.then_some(&resolver);
        let report = list_calls(&ctx, qualname, links)?;
        if cli.json {
            writeln!(out, "{}", to_json(&report))?;
        } else {
            write!(out, "{}", format_calls(&report))?;
        }
        return Ok(());
    }

    if let Some(qualname) = &cli.calltree {
        let Some(graph) = build_graph(&ctx, settings, qualname)? else {
            return write_not_found(out, qualname, cli.json);
        };
        if cli.json {
            writeln!(out, "{}", to_json(&graph.export()))?;
        } else {
            // Nodes at the depth bound are shown but not expanded
            write!(out, "{}", render_tree(&graph, settings.traversal.max_depth + 1))?;
        }
        eprintln!("{}", format_summary(&graph));
        return Ok(());
    }

    if let Some(qualname) = &cli.dot {
        let Some(graph) = build_graph(&ctx, settings, qualname)? else {
            return write_not_found(out, qualname, cli.json);
        };
        let resolver = LinkResolver::new(index);
        let urls = node_urls(&graph, &resolver)?;
        let dot = generate_dot(&graph, &urls);

        match &cli.dot_file {
            Some(file) => {
                let path = validate_output_path(file)?;
                fs::write(&path, &dot)
                    .with_context(|| format!("Failed to write DOT file {}", path.display()))?;
                eprintln!("DOT graph written to {}", path.display());
            }
            None => write!(out, "{}", dot)?,
        }
        eprintln!("{}", format_summary(&graph));
        return Ok(());
    }

    Err(anyhow!("no operation selected"))
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] callscope internal error: {}", info);
        eprintln!("[PANIC] The process will exit with a non-zero status.");
    }));

    let cli = Cli::parse();

    if cli.log_json {
        init_structured_logging();
    } else {
        init_pretty_logging(cli.verbose);
    }

    let settings = load_settings(&cli)?;
    let index = open_index(&cli, &settings)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&cli, &settings, index.as_ref(), &mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use callscope_core::FunctionDefinition;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["callscope"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn index() -> MemoryIndex {
        MemoryIndex::new()
            .define("x.cpp", 5, "A", &["ns::A"])
            .define("y.cpp", 100, "target", &["ns::target"])
            .define("z.cpp", 1, "B", &["ns::B"])
            .call("x.cpp", 8, "ns::target")
            .call("z.cpp", 4, "ns::A")
            .call("x_test.cpp", 2, "ns::target")
    }

    fn run_to_string(args: &[&str]) -> String {
        let cli = cli(args);
        let settings = build_settings(&cli, None).unwrap();
        let mut out = Vec::new();
        run(&cli, &settings, &index(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    // --- validate_output_path TESTS ---

    #[test]
    fn test_validate_output_path_accepts_relative() {
        assert!(validate_output_path("graph.dot").is_ok());
        assert!(validate_output_path("out/graph.dot").is_ok());
    }

    #[test]
    fn test_validate_output_path_rejects_traversal() {
        assert!(validate_output_path("../graph.dot").is_err());
        assert!(validate_output_path("out/../../graph.dot").is_err());
    }

    #[test]
    fn test_validate_output_path_rejects_absolute_and_nul() {
        assert!(validate_output_path("/tmp/graph.dot").is_err());
        assert!(validate_output_path("graph\0.dot").is_err());
    }

    // --- argument parsing TESTS ---

    #[test]
    fn test_mode_is_required() {
        assert!(Cli::try_parse_from(["callscope"]).is_err());
        assert!(Cli::try_parse_from(["callscope", "--callers", "a", "--calls", "b"]).is_err());
    }

    #[test]
    fn test_links_requires_calls() {
        assert!(Cli::try_parse_from(["callscope", "--callers", "a", "--links"]).is_err());
        assert!(Cli::try_parse_from(["callscope", "--calltree", "a", "--links"]).is_err());
        assert!(Cli::try_parse_from(["callscope", "--dot", "a", "--links"]).is_err());
        assert!(cli(&["--calls", "a", "--links"]).links);
    }

    #[test]
    fn test_fixture_conflicts_with_endpoint() {
        assert!(Cli::try_parse_from([
            "callscope", "--dot", "a", "--fixture", "f.json", "--endpoint", "http://x"
        ])
        .is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cfg: CallscopeConfig =
            toml_config("[traversal]\nmax_depth = 9\nmax_nodes = 11\n[index]\nname = \"dxr_a\"\n");
        let c = cli(&["--calltree", "a", "--depth", "2", "--no-visited-set", "--index", "dxr_b"]);
        let s = build_settings(&c, Some(&cfg)).unwrap();
        assert_eq!(s.traversal.max_depth, 2);
        assert_eq!(s.traversal.max_nodes, 11);
        assert!(!s.traversal.visited_set);
        assert_eq!(s.index.name.as_deref(), Some("dxr_b"));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let c = cli(&["--calltree", "a", "--concurrency", "0"]);
        assert!(build_settings(&c, None).is_err());
    }

    fn toml_config(text: &str) -> CallscopeConfig {
        let dir = std::env::temp_dir()
            .join("callscope_cli_test")
            .join(format!("{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{:x}.toml", text.len()));
        fs::write(&path, text).unwrap();
        load_config(&path).unwrap()
    }

    // --- operation TESTS ---

    #[test]
    fn test_callers_output() {
        let text = run_to_string(&["--callers", "ns::target"]);
        assert_eq!(text, "Found 1 callers of 'ns::target':\nA , x.cpp:5\n");
        let single = run_to_string(&["--callers", "ns::target", "--concurrency", "1"]);
        assert_eq!(single, text);
    }

    #[test]
    fn test_calls_output_includes_test_sites() {
        let text = run_to_string(&["--calls", "ns::target"]);
        assert!(text.starts_with("Found 2 calls to 'ns::target':\n"));
        assert!(text.contains("x_test.cpp:2"));
    }

    #[test]
    fn test_calltree_output() {
        let text = run_to_string(&["--calltree", "ns::target", "--depth", "1"]);
        assert_eq!(text, "> ns::target\n||> ns::A\n");
    }

    #[test]
    fn test_dot_output() {
        let text = run_to_string(&["--dot", "ns::target"]);
        assert!(text.starts_with("strict digraph callscope {"));
        assert_eq!(text.matches("->").count(), 2);
    }

    #[test]
    fn test_unknown_name_is_zero_results() {
        let text = run_to_string(&["--calltree", "ns::missing"]);
        assert_eq!(text, "No definition found for 'ns::missing'.\n");
        let text = run_to_string(&["--callers", "ns::missing", "--json"]);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["callers"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_calltree_json() {
        let text = run_to_string(&["--calltree", "ns::target", "--json"]);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["nodes"].as_array().unwrap().len(), 3);
        let root = FunctionDefinition::new("y.cpp", 100, "target", ["ns::target"]).key();
        assert_eq!(v["root"], callscope_core::node_id(&root));
    }
}
