use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;

use crate::config::load_options;
use crate::engine::LayoutEngine;
use crate::layout::branch::compute_branch_layout;
use crate::model::{self, CanvasGraph, PreviewLink};

#[derive(Parser, Debug)]
#[command(
    name = "canvasflow",
    version,
    about = "Deterministic top-down layout for marketing workflow canvases"
)]
pub struct Args {
    /// Input graph JSON file ({nodes, edges, previewLinks}) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Layout options file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout engine to run
    #[arg(short = 'e', long = "engine", value_enum, default_value = "hierarchy")]
    pub engine: EngineKind,

    /// Verbose log output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum EngineKind {
    /// Tree-based pipeline with layer alignment and centering
    Hierarchy,
    /// Topological leveling with preview-space reservation and drag points
    Branch,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let options = load_options(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph(&input)?;

    let output = match args.engine {
        EngineKind::Hierarchy => {
            let mut engine = LayoutEngine::new(options);
            let result = engine.calculate_layout(&graph);
            serde_json::to_value(&result)?
        }
        EngineKind::Branch => {
            let layout = compute_branch_layout(&graph, &options)?;
            serde_json::json!({
                "success": true,
                "positions": layout.positions,
                "dragPoints": layout.drag_points,
            })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            Ok(buffer)
        }
    }
}

/// Accepts the loose canvas export shape: node kind under `type`, `data.type`
/// or `data.nodeType`; edge endpoints flat or `{ cell }`; preview links under
/// `previewLinks` or `preview_links`.
fn parse_graph(input: &str) -> Result<CanvasGraph> {
    let value: Value = serde_json::from_str(input).context("parsing graph JSON")?;
    let nodes = value
        .get("nodes")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(model::node_from_value).collect())
        .unwrap_or_default();
    let edges = value
        .get("edges")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(model::edge_from_value).collect())
        .unwrap_or_default();
    let preview_links = value
        .get("previewLinks")
        .or_else(|| value.get("preview_links"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| parse_preview_link(item))
                .collect()
        })
        .unwrap_or_default();
    Ok(CanvasGraph {
        nodes,
        edges,
        preview_links,
    })
}

fn parse_preview_link(value: &Value) -> Option<PreviewLink> {
    let id = value.get("id")?.as_str()?.to_string();
    let source = value
        .get("source")
        .or_else(|| value.get("sourceNodeId"))?
        .as_str()?
        .to_string();
    let branch_index = value
        .get("branchIndex")
        .or_else(|| value.get("branch_index"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let target = value
        .get("target")
        .or_else(|| value.get("targetNodeId"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(PreviewLink {
        id,
        source,
        branch_index,
        target,
    })
}
