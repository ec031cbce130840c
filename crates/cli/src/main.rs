use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use context_graph::{BuildReport, GraphNode, GraphStats, NodeType};
use context_search::{CodeEngine, EngineConfig, IndexReport, SearchHit, STATE_DIR_NAME};
use context_vector_store::Embedder;
use serde::Serialize;
use std::path::{Path, PathBuf};

mod scanner;

use scanner::FileScanner;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Parser)]
#[command(name = "context-graph")]
#[command(about = "Graph-aware code search for TypeScript and JavaScript projects", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Engine config (TOML). Defaults to <root>/.context/config.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON on stdout (implies --quiet)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the code graph and vector index of a project
    Index(IndexArgs),

    /// Search indexed code with graph-aware ranking
    Search(SearchArgs),

    /// Show node and edge counts of the indexed graph
    Stats(StatsArgs),

    /// Show the direct graph neighbourhood of a node
    Neighbors(NeighborsArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Project root
    path: PathBuf,
}

#[derive(Args)]
struct SearchArgs {
    /// Project root
    path: PathBuf,

    /// Natural-language or code query
    query: String,

    /// Number of results (default from config)
    #[arg(short = 'k', long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct StatsArgs {
    /// Project root
    path: PathBuf,
}

#[derive(Args)]
struct NeighborsArgs {
    /// Project root
    path: PathBuf,

    /// Node id, e.g. `file:src/a.ts` or `function:src/a.ts:main`
    node_id: String,
}

#[derive(Serialize)]
struct IndexOutput {
    root: PathBuf,
    files_scanned: usize,
    graph: BuildReport,
    index: IndexReport,
    stats: Option<GraphStats>,
}

#[derive(Serialize)]
struct SearchResult {
    id: String,
    file: Option<String>,
    symbol: Option<String>,
    start_line: Option<u64>,
    end_line: Option<u64>,
    score: f32,
    similarity: f32,
    multiplier: f32,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        let metadata = &hit.record.metadata;
        Self {
            symbol: metadata.get("symbol").and_then(|v| v.as_str()).map(ToString::to_string),
            start_line: metadata.get("start_line").and_then(serde_json::Value::as_u64),
            end_line: metadata.get("end_line").and_then(serde_json::Value::as_u64),
            file: hit.file_path,
            score: hit.score,
            similarity: hit.similarity,
            multiplier: hit.multiplier,
            id: hit.record.id,
        }
    }
}

#[derive(Serialize)]
struct SearchOutput {
    query: String,
    results: Vec<SearchResult>,
}

#[derive(Serialize)]
struct NeighborsOutput {
    node: GraphNode,
    contains: Vec<GraphNode>,
    callers: Vec<GraphNode>,
    callees: Vec<GraphNode>,
    imports: Vec<GraphNode>,
    importers: Vec<GraphNode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config_path = cli.config.clone();
    match cli.command {
        Commands::Index(args) => run_index(args, config_path.as_deref(), cli.json).await?,
        Commands::Search(args) => run_search(args, config_path.as_deref(), cli.json).await?,
        Commands::Stats(args) => run_stats(args, config_path.as_deref(), cli.json).await?,
        Commands::Neighbors(args) => run_neighbors(args, config_path.as_deref(), cli.json).await?,
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>, root: &Path) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = root.join(STATE_DIR_NAME).join(CONFIG_FILE_NAME);
    if default_path.is_file() {
        return EngineConfig::load(&default_path)
            .with_context(|| format!("Failed to load config {}", default_path.display()));
    }
    Ok(EngineConfig::default())
}

async fn open_engine(path: &Path, config_path: Option<&Path>) -> Result<CodeEngine> {
    let root = path.canonicalize().context("Invalid project path")?;
    let config = load_config(config_path, &root)?;
    let mut engine = CodeEngine::new(root, config)?;
    let state = engine.load_persisted_state().await?;
    if !state.graph_loaded && state.vectors_loaded == 0 {
        log::warn!(
            "No index found under {}; run `context-graph index` first",
            engine.root().display()
        );
    }
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build graph and vectors from scratch, keeping only the embedding cache
async fn run_index(args: IndexArgs, config_path: Option<&Path>, json: bool) -> Result<()> {
    let root = args.path.canonicalize().context("Invalid project path")?;
    let config = load_config(config_path, &root)?;

    let files = FileScanner::new(&root).scan();
    let mut engine = CodeEngine::new(root.clone(), config)?;
    let warm = engine.load_embedding_cache()?;
    if warm > 0 {
        log::debug!("Reusing {warm} cached embeddings");
    }

    let built = engine.build_complete_graph(&files).await?;
    let indexed = engine.index_files(&files).await?;
    engine.save_index().await.context("Failed to save vector index")?;
    if let Err(e) = engine.persist_caches() {
        log::warn!("Failed to persist embedding cache: {e}");
    }

    let output = IndexOutput {
        root,
        files_scanned: files.len(),
        stats: engine.graph_stats(),
        graph: built.report,
        index: indexed,
    };

    if json {
        return print_json(&output);
    }

    let (nodes, edges) = output
        .stats
        .as_ref()
        .map_or((0, 0), |s| (s.total_nodes, s.total_edges));
    eprintln!(
        "Indexed {} files, {} chunks; graph has {nodes} nodes, {edges} edges",
        output.index.files_indexed, output.index.chunks_indexed
    );
    if !output.graph.skipped.is_empty() {
        eprintln!("{} files skipped", output.graph.skipped.len());
    }
    if !output.graph.diagnostics.is_empty() {
        eprintln!("{} files indexed with parse errors", output.graph.diagnostics.len());
    }
    if output.graph.imports_unresolved > 0 {
        eprintln!("{} relative imports could not be resolved", output.graph.imports_unresolved);
    }
    if engine.embedder().model_id() == "hash" {
        eprintln!("fallback embeddings used (no embedding provider configured)");
    } else if output.index.fallback_batches > 0 {
        eprintln!(
            "fallback embeddings used for {} batches",
            output.index.fallback_batches
        );
    }
    Ok(())
}

async fn run_search(args: SearchArgs, config_path: Option<&Path>, json: bool) -> Result<()> {
    let engine = open_engine(&args.path, config_path).await?;
    let limit = args.limit.unwrap_or(engine.config().search.default_limit);

    let hits = engine.search(&args.query, limit).await?;

    let output = SearchOutput {
        query: args.query,
        results: hits.into_iter().map(SearchResult::from).collect(),
    };

    if json {
        return print_json(&output);
    }

    if output.results.is_empty() {
        eprintln!("No results");
    }
    for (i, result) in output.results.iter().enumerate() {
        println!(
            "{}. {} (score: {:.3})",
            i + 1,
            result.file.as_deref().unwrap_or(&result.id),
            result.score
        );
        if let Some(symbol) = &result.symbol {
            println!("   Symbol: {symbol}");
        }
        if let (Some(start), Some(end)) = (result.start_line, result.end_line) {
            println!("   Lines: {start}-{end}");
        }
        println!();
    }
    Ok(())
}

async fn run_stats(args: StatsArgs, config_path: Option<&Path>, json: bool) -> Result<()> {
    let engine = open_engine(&args.path, config_path).await?;
    let Some(stats) = engine.graph_stats() else {
        bail!("No code graph found; run `context-graph index` first");
    };

    if json {
        return print_json(&stats);
    }

    println!("Nodes: {}", stats.total_nodes);
    for (node_type, count) in &stats.nodes_by_type {
        println!("  {:<10} {count}", node_type.as_str());
    }
    println!("Edges: {}", stats.total_edges);
    for (edge_type, count) in &stats.edges_by_type {
        println!("  {:<10} {count}", edge_type.as_str());
    }
    println!("Vectors: {}", engine.retriever().index().len());
    Ok(())
}

async fn run_neighbors(args: NeighborsArgs, config_path: Option<&Path>, json: bool) -> Result<()> {
    let mut engine = open_engine(&args.path, config_path).await?;
    let Some(graph) = engine.graph() else {
        bail!("No code graph found; run `context-graph index` first");
    };
    let Some(node) = graph.node(&args.node_id).cloned() else {
        bail!("Unknown node id '{}'", args.node_id);
    };

    let contains = graph.symbols_in(&node.id).into_iter().cloned().collect();
    let (imports, importers) = if node.node_type == NodeType::File {
        (engine.imports_of(&node.id)?, engine.importers_of(&node.id)?)
    } else {
        (Vec::new(), Vec::new())
    };
    let output = NeighborsOutput {
        callers: engine.callers_of(&node.id)?,
        callees: engine.callees_of(&node.id)?,
        contains,
        imports,
        importers,
        node,
    };

    if json {
        return print_json(&output);
    }

    println!("{} ({})", output.node.id, output.node.node_type.as_str());
    for (title, nodes) in [
        ("contains", &output.contains),
        ("callers", &output.callers),
        ("callees", &output.callees),
        ("imports", &output.imports),
        ("imported by", &output.importers),
    ] {
        if nodes.is_empty() {
            continue;
        }
        println!("  {title}:");
        for n in nodes {
            println!("    {}", n.id);
        }
    }
    Ok(())
}
