use anyhow::Result;
use clap::{Parser, Subcommand};
use gridcore::{EventSink, Graph, NodeSpec, SessionEvent};
use gridruntime::{GridRuntime, NodeRegistry, RuntimeConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gridflow")]
#[command(about = "Grid pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a graph file
    Run {
        /// Path to graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List available node types
    Nodes,

    /// Create a new example graph
    Init {
        /// Output file path
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, verbose } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_graph(file).await?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_graph(output)?;
        }
    }

    Ok(())
}

fn build_runtime() -> GridRuntime {
    let mut registry = NodeRegistry::new();
    gridnodes::register_all(&mut registry);
    GridRuntime::with_config(Arc::new(registry), RuntimeConfig::default())
}

async fn run_graph(file: PathBuf) -> Result<()> {
    println!("loading graph from: {}", file.display());

    let graph_json = std::fs::read_to_string(&file)?;
    let graph: Graph = serde_json::from_str(&graph_json)?;
    println!("graph: {} nodes", graph.len());
    println!();

    let runtime = build_runtime();
    let (sink, mut events) = EventSink::channel();

    // Print events as they arrive; the channel closes with the sink.
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Log { message } => println!("  {message}"),
                SessionEvent::Progress {
                    task_id,
                    progress,
                    message,
                } => {
                    if message.is_empty() {
                        println!("  [{task_id}] {progress}%");
                    } else {
                        println!("  [{task_id}] {progress}% - {message}");
                    }
                }
                SessionEvent::Error { message } => println!("error: {message}"),
                SessionEvent::Done { message } => println!("{message}"),
                SessionEvent::Pong => {}
            }
        }
    });

    let outcome = runtime.run(&graph, &sink).await;
    drop(sink);
    let _ = printer.await;

    outcome?;
    Ok(())
}

fn list_nodes() {
    println!("available node types:");
    println!();

    let mut registry = NodeRegistry::new();
    gridnodes::register_all(&mut registry);

    for (type_name, descriptor) in registry.list_all() {
        let mut traits = Vec::new();
        if descriptor.is_terminal {
            traits.push("terminal");
        }
        if descriptor.is_blocking {
            traits.push("blocking");
        }
        if descriptor.accepts_progress {
            traits.push("progress");
        }
        let suffix = if traits.is_empty() {
            String::new()
        } else {
            format!(" [{}]", traits.join(", "))
        };
        println!(
            "  • {} ({}){}",
            type_name, descriptor.category, suffix
        );
        println!("    {}", descriptor.display_name);
    }
}

fn create_example_graph(output: PathBuf) -> Result<()> {
    let mut graph = Graph::new();
    graph.insert(
        "load",
        NodeSpec::new("grid.reader").with_literal("path", "mock:demo"),
    );
    graph.insert(
        "smooth",
        NodeSpec::new("grid.filter")
            .with_reference("grid", "load", 0)
            .with_literal("algorithm", "gaussian")
            .with_literal("sigma", 2.0),
    );
    graph.insert(
        "save",
        NodeSpec::new("grid.writer")
            .with_reference("grid", "smooth", 0)
            .with_reference("metadata", "load", 1)
            .with_literal("compression", "zstd"),
    );

    let json = serde_json::to_string_pretty(&graph)?;
    std::fs::write(&output, json)?;

    println!("created example graph: {}", output.display());
    println!();
    println!("run it with:");
    println!("  gridflow run --file {}", output.display());

    Ok(())
}
