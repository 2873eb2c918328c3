use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use scene_engine::{
    EngineConfig, ExecutorExtensions, FlowEngine, FlowGraph, HttpAssetStore,
    ManifestAssetStore, NodeCatalogue, Result,
};

#[derive(Parser, Debug)]
#[command(name = "scene-compile", version, about = "Compile a node graph into scenes")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a graph and print its scene partitions as JSON.
    Compile(CompileArgs),
    /// Print the built-in node definitions as JSON.
    Nodes,
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Graph JSON with `nodes` and `edges`.
    graph: PathBuf,

    /// Engine configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset manifest JSON mapping asset ids to `{path, width, height}`.
    #[arg(long, conflicts_with = "asset_url")]
    manifest: Option<PathBuf>,

    /// Base URL of an asset service.
    #[arg(long)]
    asset_url: Option<String>,

    /// Run only up to this node and print its execution log.
    #[arg(long)]
    debug_target: Option<String>,

    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compile(args) => compile(args).await,
        Command::Nodes => {
            let catalogue = NodeCatalogue::builtin();
            println!("{}", serde_json::to_string_pretty(catalogue.all())?);
            Ok(())
        }
    }
}

async fn compile(args: CompileArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path).await?,
        None => EngineConfig::default(),
    };

    let mut extensions = ExecutorExtensions::new();
    if let Some(path) = &args.manifest {
        let store = ManifestAssetStore::load(path).await?;
        log::info!("Using asset manifest with {} entries", store.len());
        extensions.set_asset_store(Arc::new(store));
    } else if let Some(url) = &args.asset_url {
        log::info!("Using asset service at {}", url);
        extensions.set_asset_store(Arc::new(HttpAssetStore::new(url.as_str())));
    }

    let content = tokio::fs::read_to_string(&args.graph).await?;
    let graph: FlowGraph = serde_json::from_str(&content)?;
    log::info!(
        "Loaded {} nodes and {} edges from {}",
        graph.nodes.len(),
        graph.edges.len(),
        args.graph.display()
    );

    let engine = FlowEngine::new(config).with_extensions(Arc::new(extensions));

    let output = match &args.debug_target {
        Some(target) => {
            let ctx = engine
                .execute_flow_debug(graph.nodes, graph.edges, target)
                .await?;
            serde_json::json!({
                "runId": ctx.run_id(),
                "log": ctx.execution_log(),
                "scenes": ctx.scenes(),
            })
        }
        None => serde_json::to_value(engine.compile(&graph).await?)?,
    };

    let text = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", text);
    Ok(())
}
