use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

use crate::config::LayoutOptions;
use crate::error::LayoutError;
use crate::model::{CanvasGraph, GraphNode, NodeKind};

use super::preview::{self, DragPoint};
use super::{NodePosition, Positions};

/// Fixed visual vocabulary: a node's band in the layout is decided by its
/// kind, not by graph distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SemanticLevel {
    Start = 0,
    Process = 1,
    Split = 2,
    Branch = 3,
    Merge = 4,
    End = 5,
}

/// Output capacity of a kind: a constant, or derived from the node's config.
#[derive(Debug, Clone, Copy)]
pub enum OutputCap {
    Fixed(u32),
    FromConfig,
}

pub struct ConnectionRule {
    pub max_outputs: OutputCap,
    pub max_inputs: Option<u32>,
    pub allowed_targets: &'static [&'static str],
    pub level: SemanticLevel,
}

const PROCESS_TARGETS: &[&str] = &[
    "audience-split",
    "event-split",
    "sms",
    "ai-call",
    "manual-call",
    "ab-test",
    "wait",
    "blacklist",
    "end",
];

const SPLIT_TARGETS: &[&str] = &[
    "sms",
    "ai-call",
    "manual-call",
    "ab-test",
    "wait",
    "blacklist",
    "end",
];

static CONNECTION_RULES: Lazy<HashMap<&'static str, ConnectionRule>> = Lazy::new(|| {
    let process = |targets: &'static [&'static str]| ConnectionRule {
        max_outputs: OutputCap::Fixed(1),
        max_inputs: Some(1),
        allowed_targets: targets,
        level: SemanticLevel::Process,
    };
    let mut rules = HashMap::new();
    rules.insert(
        "start",
        ConnectionRule {
            max_outputs: OutputCap::Fixed(1),
            max_inputs: None,
            allowed_targets: PROCESS_TARGETS,
            level: SemanticLevel::Start,
        },
    );
    rules.insert(
        "audience-split",
        ConnectionRule {
            max_outputs: OutputCap::FromConfig,
            max_inputs: None,
            allowed_targets: SPLIT_TARGETS,
            level: SemanticLevel::Split,
        },
    );
    rules.insert(
        "event-split",
        ConnectionRule {
            max_outputs: OutputCap::Fixed(2),
            max_inputs: None,
            allowed_targets: SPLIT_TARGETS,
            level: SemanticLevel::Split,
        },
    );
    rules.insert(
        "ab-test",
        ConnectionRule {
            max_outputs: OutputCap::FromConfig,
            max_inputs: None,
            allowed_targets: &[
                "sms",
                "ai-call",
                "manual-call",
                "wait",
                "blacklist",
                "end",
            ],
            level: SemanticLevel::Split,
        },
    );
    rules.insert("sms", process(PROCESS_TARGETS));
    rules.insert("ai-call", process(PROCESS_TARGETS));
    rules.insert("manual-call", process(PROCESS_TARGETS));
    rules.insert("wait", process(PROCESS_TARGETS));
    rules.insert("blacklist", process(&["end"]));
    rules.insert(
        "end",
        ConnectionRule {
            max_outputs: OutputCap::Fixed(0),
            max_inputs: None,
            allowed_targets: &[],
            level: SemanticLevel::End,
        },
    );
    rules
});

pub fn connection_rule(kind: &NodeKind) -> Option<&'static ConnectionRule> {
    CONNECTION_RULES.get(kind.as_str())
}

/// Unknown kinds fall into the process band rather than failing the layout.
pub fn semantic_level(kind: &NodeKind) -> SemanticLevel {
    connection_rule(kind)
        .map(|rule| rule.level)
        .unwrap_or(SemanticLevel::Process)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("node {node} not found in the graph")]
    MissingNode { node: String },

    #[error("node {node} has unknown kind {kind}")]
    UnknownKind { node: String, kind: String },

    #[error("node {node} already has its maximum of {max} outgoing connections")]
    OutputsFull { node: String, max: u32 },

    #[error("node {node} already has its maximum of {max} incoming connections")]
    InputsFull { node: String, max: u32 },

    #[error("{source_kind} nodes may not connect to {target_kind} nodes")]
    TargetNotAllowed {
        source_kind: String,
        target_kind: String,
    },
}

/// Maximum outgoing connections a node may have, with config-derived counts
/// resolved against the node's data.
pub fn max_outputs(node: &GraphNode) -> Option<u32> {
    let rule = connection_rule(&node.kind)?;
    Some(match rule.max_outputs {
        OutputCap::Fixed(max) => max,
        OutputCap::FromConfig => configured_branches(node).unwrap_or(2) as u32,
    })
}

fn configured_branches(node: &GraphNode) -> Option<usize> {
    let config = node.data.get("config")?;
    match node.kind {
        NodeKind::AudienceSplit => config
            .get("crowdLayers")
            .and_then(|v| v.as_array())
            .map(|layers| layers.len() + 1)
            .or_else(|| {
                config
                    .get("audiences")
                    .and_then(|v| v.as_array())
                    .map(Vec::len)
            }),
        NodeKind::AbTest => config
            .get("branches")
            .and_then(|v| v.as_array())
            .map(Vec::len),
        _ => None,
    }
}

/// Checks whether a new source→target edge would be legal under the
/// per-kind connection rules, given the edges already present.
pub fn validate_connection(
    graph: &CanvasGraph,
    source_id: &str,
    target_id: &str,
) -> Result<(), ConnectionError> {
    let find = |id: &str| {
        graph
            .nodes
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| ConnectionError::MissingNode {
                node: id.to_string(),
            })
    };
    let source = find(source_id)?;
    let target = find(target_id)?;

    let source_rule =
        connection_rule(&source.kind).ok_or_else(|| ConnectionError::UnknownKind {
            node: source.id.clone(),
            kind: source.kind.as_str().to_string(),
        })?;
    let target_rule =
        connection_rule(&target.kind).ok_or_else(|| ConnectionError::UnknownKind {
            node: target.id.clone(),
            kind: target.kind.as_str().to_string(),
        })?;

    let outputs = graph.edges.iter().filter(|e| e.source == source_id).count() as u32;
    if let Some(max) = max_outputs(source) {
        if outputs >= max {
            return Err(ConnectionError::OutputsFull {
                node: source.id.clone(),
                max,
            });
        }
    }

    if let Some(max) = target_rule.max_inputs {
        let inputs = graph.edges.iter().filter(|e| e.target == target_id).count() as u32;
        if inputs >= max {
            return Err(ConnectionError::InputsFull {
                node: target.id.clone(),
                max,
            });
        }
    }

    if !source_rule
        .allowed_targets
        .contains(&target.kind.as_str())
    {
        return Err(ConnectionError::TargetNotAllowed {
            source_kind: source.kind.as_str().to_string(),
            target_kind: target.kind.as_str().to_string(),
        });
    }
    Ok(())
}

/// Number of independent output branches the node fans out. Stored branch data
/// wins over config-derived counts and per-kind defaults.
pub fn branch_count(node: &GraphNode) -> usize {
    if let Some(branches) = node.data.get("branches").and_then(|v| v.as_array()) {
        return branches.len();
    }
    if let Some(count) = node.data.get("branchCount").and_then(|v| v.as_u64()) {
        return count as usize;
    }
    match node.kind {
        NodeKind::AudienceSplit | NodeKind::AbTest => configured_branches(node).unwrap_or(2),
        NodeKind::EventSplit => 2,
        NodeKind::End => 0,
        _ => 1,
    }
}

/// Primary leveling: nodes are grouped purely by their kind's semantic band,
/// independent of graph distance. Enforces the fixed visual vocabulary when
/// topology is unavailable or untrusted.
pub fn assign_semantic_levels(graph: &CanvasGraph) -> Vec<Vec<String>> {
    let by_id: HashMap<&str, &GraphNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut bands: BTreeMap<SemanticLevel, Vec<&str>> = BTreeMap::new();
    for node in &graph.nodes {
        bands
            .entry(semantic_level(&node.kind))
            .or_default()
            .push(node.id.as_str());
    }
    bands
        .into_values()
        .map(|mut band| {
            sort_level(&mut band, &by_id);
            band.iter().map(|id| id.to_string()).collect()
        })
        .collect()
}

/// Kahn layering over real edges plus resolved preview links, which count as
/// virtual edges so a candidate target already sits a level below its source.
/// Cyclic leftovers land on a trailing level instead of vanishing.
pub fn assign_levels(graph: &CanvasGraph) -> Vec<Vec<String>> {
    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let known: HashSet<&str> = ids.iter().copied().collect();
    let by_id: HashMap<&str, &GraphNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for id in &ids {
        adjacency.entry(*id).or_default();
        in_degree.entry(*id).or_insert(0);
    }
    let mut seen_pairs: HashSet<(&str, &str)> = HashSet::new();
    let real = graph
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()));
    let virtual_edges = graph
        .preview_links
        .iter()
        .filter_map(|p| p.target.as_deref().map(|t| (p.source.as_str(), t)));
    for (source, target) in real.chain(virtual_edges) {
        if !known.contains(source) || !known.contains(target) {
            continue;
        }
        if !seen_pairs.insert((source, target)) {
            continue;
        }
        adjacency.entry(source).or_default().push(target);
        *in_degree.entry(target).or_insert(0) += 1;
    }

    let mut queue: VecDeque<&str> = ids
        .iter()
        .copied()
        .filter(|id| in_degree[id] == 0)
        .collect();
    if queue.is_empty() {
        queue = ids
            .iter()
            .copied()
            .filter(|id| by_id[id].kind == NodeKind::Start)
            .collect();
        debug!(seeds = queue.len(), "no in-degree-zero node; seeding from start nodes");
    }

    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut placed: HashSet<&str> = HashSet::new();
    while !queue.is_empty() {
        let mut level: Vec<&str> = Vec::new();
        let mut next: VecDeque<&str> = VecDeque::new();
        while let Some(id) = queue.pop_front() {
            if !placed.insert(id) {
                continue;
            }
            level.push(id);
            for target in &adjacency[id] {
                let degree = in_degree.get_mut(target).map(|d| {
                    *d = d.saturating_sub(1);
                    *d
                });
                if degree == Some(0) {
                    next.push_back(*target);
                }
            }
        }
        if !level.is_empty() {
            sort_level(&mut level, &by_id);
            levels.push(level.iter().map(|id| id.to_string()).collect());
        }
        queue = next;
    }

    // Cyclic or unreachable leftovers.
    let mut leftovers: Vec<&str> = ids
        .iter()
        .copied()
        .filter(|id| !placed.contains(id))
        .collect();
    if !leftovers.is_empty() {
        sort_level(&mut leftovers, &by_id);
        levels.push(leftovers.iter().map(|id| id.to_string()).collect());
    }
    levels
}

fn sort_level(level: &mut [&str], by_id: &HashMap<&str, &GraphNode>) {
    level.sort_by(|a, b| {
        let branches_a = branch_count(by_id[a]);
        let branches_b = branch_count(by_id[b]);
        branches_b.cmp(&branches_a).then_with(|| a.cmp(b))
    });
}

/// Result of the branch pipeline: positions plus the drag-point anchors for
/// every preview link.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchLayout {
    pub positions: Positions,
    pub drag_points: BTreeMap<String, DragPoint>,
}

/// Level-by-level placement that reserves vertical room under each level for
/// its nodes' unresolved preview links, then computes the anchors those links
/// hang from.
pub fn compute_branch_layout(
    graph: &CanvasGraph,
    options: &LayoutOptions,
) -> Result<BranchLayout, LayoutError> {
    if graph.nodes.is_empty() {
        return Err(LayoutError::EmptyGraph);
    }
    let by_id: HashMap<&str, &GraphNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut pending: HashMap<&str, usize> = HashMap::new();
    for link in &graph.preview_links {
        if !link.is_resolved() {
            *pending.entry(link.source.as_str()).or_insert(0) += 1;
        }
    }

    let levels = assign_levels(graph);
    let branch = &options.branch;
    let mut positions = Positions::new();
    let mut y = 0.0_f32;
    for level in &levels {
        let total = (level.len().saturating_sub(1)) as f32 * branch.node_spacing;
        let start_x = -total / 2.0;
        for (index, id) in level.iter().enumerate() {
            let size = by_id
                .get(id.as_str())
                .map(|node| node.resolved_size(&options.node))
                .unwrap_or(crate::model::Size {
                    width: options.node.width,
                    height: options.node.height,
                });
            positions.insert(
                id.clone(),
                NodePosition {
                    x: start_x + index as f32 * branch.node_spacing,
                    y,
                    width: size.width,
                    height: size.height,
                },
            );
        }
        let preview_space = level
            .iter()
            .map(|id| {
                pending.get(id.as_str()).copied().unwrap_or(0) as f32
                    * options.preview.line_spacing
            })
            .fold(0.0_f32, f32::max);
        y += branch.row_height + preview_space;
    }

    shift_and_snap(&mut positions, branch.margin, branch.grid_size);
    let drag_points = preview::compute_drag_points(graph, &positions, options);
    Ok(BranchLayout {
        positions,
        drag_points,
    })
}

/// Moves the whole layout into the positive quadrant with a margin, then snaps
/// every coordinate to the grid. Row membership survives because every y in a
/// row receives the identical shift and snap.
fn shift_and_snap(positions: &mut Positions, margin: f32, grid_size: f32) {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    for position in positions.values() {
        min_x = min_x.min(position.x);
        min_y = min_y.min(position.y);
    }
    if !min_x.is_finite() || !min_y.is_finite() {
        return;
    }
    let dx = -min_x + margin;
    let dy = -min_y + margin;
    let snap = |v: f32| {
        if grid_size > 0.0 {
            (v / grid_size).round() * grid_size
        } else {
            v
        }
    };
    for position in positions.values_mut() {
        position.x = snap(position.x + dx);
        position.y = snap(position.y + dy);
    }
}
