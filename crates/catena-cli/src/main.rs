//! CLI binary for validating, inspecting, and running serialized Catena pipelines.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use catena_pipeline::{default_registry, Document, Node, NodeRef, Record};

#[derive(Parser)]
#[command(name = "catena", version, about = "Run and inspect typed node pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline document against a JSON record
    Run {
        /// Path to the pipeline .json document
        pipeline: PathBuf,

        /// Input record as inline JSON
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Input record read from a JSON file
        #[arg(long)]
        input_file: Option<PathBuf>,
    },

    /// Validate a pipeline document (re-runs composition checks)
    Validate {
        /// Path to the pipeline .json document
        pipeline: PathBuf,
    },

    /// Show the node tree and schemas of a pipeline document
    Info {
        /// Path to the pipeline .json document
        pipeline: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            pipeline,
            input,
            input_file,
        } => cmd_run(&pipeline, input.as_deref(), input_file.as_deref()),
        Commands::Validate { pipeline } => cmd_validate(&pipeline),
        Commands::Info { pipeline } => cmd_info(&pipeline),
    }
}

fn load_pipeline(path: &Path) -> anyhow::Result<NodeRef> {
    let doc = Document::load(path)?;
    let registry = default_registry();
    tracing::debug!(path = %path.display(), type_id = %doc.type_id, "Restoring pipeline");
    Ok(registry.restore(&doc)?)
}

fn read_record(input: Option<&str>, input_file: Option<&Path>) -> anyhow::Result<Record> {
    let text = match (input, input_file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Ok(Record::new()),
    };
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Ok(Record::try_from(value)?)
}

fn cmd_run(path: &Path, input: Option<&str>, input_file: Option<&Path>) -> anyhow::Result<()> {
    let pipeline = load_pipeline(path)?;
    let record = read_record(input, input_file)?;

    tracing::info!(pipeline = %pipeline.name(), fields = record.len(), "Running pipeline");
    let output = pipeline.invoke(&record)?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_validate(path: &Path) -> anyhow::Result<()> {
    match load_pipeline(path) {
        Ok(pipeline) => {
            println!("Pipeline is valid: {}", pipeline.name());
            Ok(())
        }
        Err(err) => {
            println!("[ERROR] {err}");
            std::process::exit(1);
        }
    }
}

fn cmd_info(path: &Path) -> anyhow::Result<()> {
    let pipeline = load_pipeline(path)?;

    println!("Pipeline: {}", pipeline.name());
    println!("Input: {}", pipeline.input_schema());
    println!("Output: {}", pipeline.output_schema());
    if let Some(seq) = pipeline.as_sequence() {
        println!("Accumulated: {}", seq.accumulated());
    }

    println!("\nNodes:");
    print_tree(pipeline.as_ref(), 1);
    Ok(())
}

fn print_tree(node: &dyn Node, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} [{}] {} -> {}",
        node.name(),
        node.node_type(),
        node.input_schema(),
        node.output_schema()
    );
    for child in node.children() {
        print_tree(child.as_ref(), depth + 1);
    }
}
