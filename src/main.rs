use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use graphbolt::config::BoltConfig;
use graphbolt::error::{GraphBoltError, Result};
use graphbolt::util::{random_hetero_graph, random_homo_graph};
use graphbolt::{load_csc_sampling_graph, save_csc_sampling_graph, CSCSamplingGraph};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// The task to be performed: convert, generate, info or subgraph.
    #[arg(short, long, default_value_t = String::from("info"))]
    task: String,

    /// Text graph file read by the convert task.
    #[arg(short, long, default_value_t = String::from("data/example.graph"))]
    dataset: String,

    /// Archive written by convert/generate and read by info/subgraph.
    #[arg(short, long, default_value_t = String::from("example.gbolt"))]
    archive: String,

    /// Comma separated node ids for the subgraph task.
    #[arg(long, default_value_t = String::new())]
    nodes: String,

    /// Node count of a generated graph.
    #[arg(long, default_value_t = 1000)]
    num_nodes: usize,

    /// Edge count of a generated graph.
    #[arg(long, default_value_t = 50000)]
    num_edges: usize,

    /// Node type count of a generated graph, 0 generates a homogeneous graph.
    #[arg(long, default_value_t = 0)]
    num_ntypes: usize,

    /// Edge type count of a generated heterogeneous graph.
    #[arg(long, default_value_t = 1)]
    num_etypes: usize,

    /// Optional YAML configuration file.
    #[arg(short, long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    let args: Args = Args::parse();

    let config = match &args.config {
        Some(path) => match BoltConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => BoltConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    debug!(?args, ?config, "starting");

    if config.num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()
        {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    }

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &BoltConfig) -> Result<()> {
    let start = Instant::now();
    match args.task.as_str() {
        "convert" => {
            let graph = CSCSamplingGraph::from_graph_file(&args.dataset)?;
            save_csc_sampling_graph(&graph, &args.archive)?;
            println!(
                "Converted {} into {} ({} nodes, {} edges).",
                args.dataset,
                args.archive,
                graph.num_nodes(),
                graph.num_edges()
            );
        }
        "generate" => {
            let graph = if args.num_ntypes == 0 {
                let (indptr, indices) = random_homo_graph(args.num_nodes, args.num_edges)?;
                CSCSamplingGraph::from_csc_with(indptr, indices, None, None, None, config.validation)?
            } else {
                let parts = random_hetero_graph(args.num_nodes, args.num_edges, args.num_ntypes, args.num_etypes)?;
                CSCSamplingGraph::from_csc_with(
                    parts.indptr,
                    parts.indices,
                    Some(parts.node_type_offset),
                    Some(parts.type_per_edge),
                    Some(parts.metadata),
                    config.validation,
                )?
            };
            save_csc_sampling_graph(&graph, &args.archive)?;
            println!(
                "Generated {} ({} nodes, {} edges).",
                args.archive,
                graph.num_nodes(),
                graph.num_edges()
            );
        }
        "info" => {
            let graph = load_csc_sampling_graph(&args.archive)?;
            println!("Nodes: {}, Edges: {}", graph.num_nodes(), graph.num_edges());
            if let (Some(metadata), Some(offsets)) = (graph.metadata(), graph.node_type_offset()) {
                for (name, id) in metadata.node_type_to_id() {
                    let id = *id as usize;
                    println!("  node type {id} {name}: [{}, {})", offsets[id], offsets[id + 1]);
                }
                for (etype, id) in metadata.edge_type_to_id() {
                    println!("  edge type {id} {etype}");
                }
            }
        }
        "subgraph" => {
            let graph = load_csc_sampling_graph(&args.archive)?;
            let nodes = parse_nodes(&args.nodes)?;
            let subgraph = graph.in_subgraph(&nodes)?;
            println!("indptr: {:?}", subgraph.indptr);
            println!("indices: {:?}", subgraph.indices);
            println!("reverse_column_node_ids: {:?}", subgraph.reverse_column_node_ids);
            println!("reverse_edge_ids: {:?}", subgraph.reverse_edge_ids);
            if let Some(type_per_edge) = &subgraph.type_per_edge {
                println!("type_per_edge: {:?}", type_per_edge);
            }
        }
        other => {
            return Err(GraphBoltError::Config(format!(
                "unknown task {other:?}, expected convert, generate, info or subgraph"
            )))
        }
    }
    println!("Elapsed Time: {:?} us", start.elapsed().as_micros());
    Ok(())
}

fn parse_nodes(text: &str) -> Result<Vec<u64>> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u64>()
                .map_err(|_| GraphBoltError::Config(format!("{token:?} is not a node id")))
        })
        .collect()
}
