use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info};

use crate::canvas::{self, Canvas};
use crate::config::LayoutOptions;
use crate::layout::{self, LayoutResult, Positions};
use crate::layout::tree::{TidyTree, TreeLayout};
use crate::model::{self, CanvasGraph, NodeKind};
use crate::sanitize::{Stage, sanitize};

const WRITE_BACK_FALLBACK_X: f32 = 200.0;
const WRITE_BACK_FALLBACK_Y: f32 = 100.0;

/// Snapshot of engine internals for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub cache_entries: usize,
    pub layouts_computed: u64,
    pub last_hash: Option<String>,
}

struct PendingRequest {
    graph: CanvasGraph,
    deadline: Instant,
}

/// Owns the layout pipeline plus its cache and debounce state. One engine per
/// canvas; drop it to release everything.
pub struct LayoutEngine {
    options: LayoutOptions,
    tree: Box<dyn TreeLayout>,
    cache: HashMap<String, LayoutResult>,
    pending: Option<PendingRequest>,
    layouts_computed: u64,
    last_hash: Option<String>,
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self::with_tree_layout(options, Box::new(TidyTree))
    }

    /// Swaps in a different tree-layout collaborator. Output is re-sanitized
    /// regardless of the implementation.
    pub fn with_tree_layout(options: LayoutOptions, tree: Box<dyn TreeLayout>) -> Self {
        Self {
            options,
            tree,
            cache: HashMap::new(),
            pending: None,
            layouts_computed: 0,
            last_hash: None,
        }
    }

    /// Runs (or serves from cache) one layout. Never panics; every failure is
    /// folded into the returned `LayoutResult`.
    pub fn calculate_layout(&mut self, graph: &CanvasGraph) -> LayoutResult {
        if graph.nodes.is_empty() {
            return LayoutResult::failed("graph data is empty or has no nodes");
        }
        let hash = structural_hash(graph, &self.options);
        if self.options.performance.enable_cache {
            if let Some(hit) = self.cache.get(&hash) {
                debug!(hash = hash.as_str(), "layout cache hit");
                return hit.clone();
            }
        }

        let result = match layout::perform_layout(graph, self.tree.as_ref(), &self.options) {
            Ok(positions) => LayoutResult::ok(positions),
            Err(err) => LayoutResult::failed(err.to_string()),
        };
        if self.options.debug {
            debug!(
                nodes = graph.nodes.len(),
                edges = graph.edges.len(),
                success = result.success,
                "layout computed"
            );
        }
        self.layouts_computed += 1;
        // Failures are recoverable on the next call, so they never enter the
        // cache.
        if self.options.performance.enable_cache && result.success {
            self.cache.insert(hash.clone(), result.clone());
        }
        self.last_hash = Some(hash);
        result
    }

    /// Schedules a trailing-edge debounced layout. A new request before the
    /// quiescence window elapses replaces the pending graph and restarts the
    /// window; superseded requests are answered by the last request's
    /// parameters. With debounce disabled the request fires on the next poll.
    pub fn request_layout(&mut self, graph: CanvasGraph, now: Instant) {
        let delay = if self.options.performance.enable_debounce {
            Duration::from_millis(self.options.performance.debounce_delay_ms)
        } else {
            Duration::ZERO
        };
        self.pending = Some(PendingRequest {
            graph,
            deadline: now + delay,
        });
    }

    /// Fires the pending request once its window has elapsed. Time is
    /// caller-supplied so scheduling stays runtime-agnostic and testable.
    pub fn poll(&mut self, now: Instant) -> Option<LayoutResult> {
        if self.pending.as_ref()?.deadline > now {
            return None;
        }
        let pending = self.pending.take()?;
        Some(self.calculate_layout(&pending.graph))
    }

    pub fn pending_request(&self) -> bool {
        self.pending.is_some()
    }

    /// Full round trip against a live canvas: read, filter transient
    /// artifacts, lay out, write every position back re-sanitized. A failed
    /// layout writes nothing.
    pub fn execute_layout(&mut self, canvas: &mut dyn Canvas) -> LayoutResult {
        let nodes: Vec<model::GraphNode> = canvas
            .nodes()
            .iter()
            .filter(|value| !canvas::is_transient_node(value))
            .filter_map(model::node_from_value)
            .collect();
        let edges: Vec<model::GraphEdge> = canvas
            .edges()
            .iter()
            .filter(|value| !canvas::is_transient_edge(value))
            .filter_map(model::edge_from_value)
            .collect();

        if nodes.is_empty() {
            info!("no eligible nodes; skipping layout");
            return LayoutResult::ok(Positions::new());
        }
        if nodes.len() == 1 && nodes[0].kind == NodeKind::Start {
            info!(node = nodes[0].id.as_str(), "single start node; skipping layout");
            return LayoutResult::ok(Positions::new());
        }

        let graph = CanvasGraph {
            nodes,
            edges,
            preview_links: Vec::new(),
        };
        let result = self.calculate_layout(&graph);
        if result.success {
            for (id, position) in &result.positions {
                let x = sanitize(position.x, WRITE_BACK_FALLBACK_X, id, Stage::WriteBack);
                let y = sanitize(position.y, WRITE_BACK_FALLBACK_Y, id, Stage::WriteBack);
                canvas.set_position(id, x, y);
            }
        }
        result
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Options changes invalidate every cached result.
    pub fn update_options(&mut self, options: LayoutOptions) {
        self.options = options;
        self.cache.clear();
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache_entries: self.cache.len(),
            layouts_computed: self.layouts_computed,
            last_hash: self.last_hash.clone(),
        }
    }
}

/// Content fingerprint of a graph plus the active options: stable
/// serialization of sorted (id, kind) node pairs, sorted (source, target)
/// edge pairs and (id, source) preview pairs. Two structurally identical
/// graphs hash identically regardless of input order.
pub fn structural_hash(graph: &CanvasGraph, options: &LayoutOptions) -> String {
    let mut nodes: Vec<(&str, &str)> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.kind.as_str()))
        .collect();
    nodes.sort_unstable();
    let mut edges: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    edges.sort_unstable();
    let mut previews: Vec<(&str, &str)> = graph
        .preview_links
        .iter()
        .map(|p| (p.id.as_str(), p.source.as_str()))
        .collect();
    previews.sort_unstable();
    json!({
        "nodes": nodes,
        "edges": edges,
        "previews": previews,
        "options": options,
    })
    .to_string()
}
