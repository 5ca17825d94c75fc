//! Road Network - command line and Axum server
//!
//! Replay a queries file: `road-network run graph.json queries.json -o output.json`
//! Serve the HTTP API:    `road-network serve` then open http://localhost:7860/q/swagger-ui

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use road_network::config::{ReplayConfig, ServerConfig};
use road_network::demo_data::{self, DemoData};
use road_network::document::{GraphDocument, OutputDocument, QueriesDocument};
use road_network::{api, console, events};

#[derive(Parser)]
#[command(name = "road-network", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a queries document against a graph document.
    Run {
        graph: PathBuf,
        queries: PathBuf,
        /// Output document path.
        #[arg(short, long, env = "ROAD_NETWORK_OUTPUT")]
        output: Option<PathBuf>,
        /// Write single-line JSON.
        #[arg(long)]
        compact: bool,
        /// Omit per-event processing_time.
        #[arg(long)]
        no_timing: bool,
    },
    /// Serve the REST API.
    Serve {
        #[arg(long, env = "ROAD_NETWORK_ADDR")]
        addr: Option<SocketAddr>,
    },
    /// Write a demo graph and a matching queries document.
    Demo {
        /// SMALL, MEDIUM or LARGE.
        name: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Number of generated events.
        #[arg(long, default_value_t = 1000)]
        queries: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("road_network=info".parse()?))
        .init();

    match Cli::parse().command {
        Command::Run {
            graph,
            queries,
            output,
            compact,
            no_timing,
        } => {
            let mut config = ReplayConfig::from_env()
                .with_pretty(!compact)
                .with_record_timing(!no_timing);
            if let Some(output) = output {
                config = config.with_output(output);
            }
            run(&graph, &queries, &config)
        }
        Command::Serve { addr } => {
            let mut config = ServerConfig::from_env();
            if let Some(addr) = addr {
                config = config.with_addr(addr);
            }
            serve(&config).await
        }
        Command::Demo {
            name,
            out_dir,
            queries,
            seed,
        } => demo(&name, &out_dir, queries, seed),
    }
}

fn run(graph_path: &Path, queries_path: &Path, config: &ReplayConfig) -> Result<()> {
    console::print_banner();

    let graph_doc = GraphDocument::load(graph_path)?;
    let queries = QueriesDocument::load(queries_path)?;

    let graph_id = graph_doc.meta.id.clone();
    let mut graph = graph_doc.into_graph();
    console::print_graph_loaded(&graph_id, &graph.stats());

    let result = events::replay(&queries.events, &mut graph, config.record_timing);
    console::print_replay_summary(&result.summary);

    let output = OutputDocument {
        meta: queries.meta,
        results: result.results,
    };
    output
        .write(&config.output, config.pretty)
        .with_context(|| format!("writing {}", config.output.display()))?;
    console::print_output_written(&config.output, output.results.len());
    Ok(())
}

async fn serve(config: &ServerConfig) -> Result<()> {
    console::print_banner();

    let app = api::create_router();
    println!("Server listening on http://{}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn demo(name: &str, out_dir: &Path, count: usize, seed: u64) -> Result<()> {
    let demo = name
        .parse::<DemoData>()
        .map_err(|_| {
            anyhow::anyhow!(
                "unknown dataset '{}', expected one of {:?}",
                name,
                demo_data::available_datasets()
            )
        })?;

    let graph = demo_data::generate(demo);
    let queries = demo_data::generate_queries(&graph, count, seed);

    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let graph_path = out_dir.join("graph.json");
    let queries_path = out_dir.join("queries.json");
    std::fs::write(&graph_path, serde_json::to_string_pretty(&graph)?)
        .with_context(|| format!("writing {}", graph_path.display()))?;
    std::fs::write(&queries_path, serde_json::to_string_pretty(&queries)?)
        .with_context(|| format!("writing {}", queries_path.display()))?;

    info!(
        "Wrote {} ({} nodes, {} edges) and {} ({} events)",
        graph_path.display(),
        graph.nodes.len(),
        graph.edges.len(),
        queries_path.display(),
        queries.events.len()
    );
    Ok(())
}
