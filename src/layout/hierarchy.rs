use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::NodeOptions;
use crate::error::LayoutError;
use crate::model::CanvasGraph;
use crate::sanitize::{Stage, sanitize};

use super::{NodePosition, Positions};

/// Synthetic root unifying a forest; never emitted in the output.
pub const VIRTUAL_ROOT_ID: &str = "virtual_root";

/// Rooted ordered tree in the shape the tree-layout collaborator expects.
/// Coordinates are mutated in place by the layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub x: f32,
    pub y: f32,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    fn leaf(id: String, width: f32, height: f32) -> Self {
        Self {
            id,
            width,
            height,
            x: 0.0,
            y: 0.0,
            children: Vec::new(),
        }
    }

    pub fn is_virtual_root(&self) -> bool {
        self.id == VIRTUAL_ROOT_ID
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::count).sum::<usize>()
    }
}

/// Converts the flat node/edge graph into a rooted tree. Roots are the
/// in-degree-zero nodes in input order; a forest gets a virtual root. With no
/// in-degree-zero node at all (pure cycle) the first input node is used — an
/// input-order heuristic, not a stable contract.
pub fn build_hierarchy(
    graph: &CanvasGraph,
    node_options: &NodeOptions,
) -> Result<HierarchyNode, LayoutError> {
    if graph.nodes.is_empty() {
        return Err(LayoutError::EmptyGraph);
    }

    let by_id: HashMap<&str, &crate::model::GraphNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for node in &graph.nodes {
        adjacency.entry(node.id.as_str()).or_default();
        in_degree.entry(node.id.as_str()).or_insert(0);
    }
    for edge in &graph.edges {
        let (source, target) = (edge.source.as_str(), edge.target.as_str());
        if !by_id.contains_key(source) || !by_id.contains_key(target) {
            debug!(edge = edge.id.as_str(), "skipping edge with unknown endpoint");
            continue;
        }
        adjacency.entry(source).or_default().push(target);
        *in_degree.entry(target).or_insert(0) += 1;
    }

    let mut roots: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| in_degree.get(n.id.as_str()).copied().unwrap_or(0) == 0)
        .map(|n| n.id.as_str())
        .collect();
    if roots.is_empty() {
        let first = graph.nodes[0].id.as_str();
        warn!(root = first, "no in-degree-zero node; falling back to first input node");
        roots.push(first);
    }

    let mut path: Vec<String> = Vec::new();
    if roots.len() == 1 {
        Ok(build_subtree(
            roots[0],
            &by_id,
            &adjacency,
            &mut path,
            node_options,
        ))
    } else {
        let children = roots
            .iter()
            .map(|root| build_subtree(root, &by_id, &adjacency, &mut path, node_options))
            .collect();
        Ok(HierarchyNode {
            id: VIRTUAL_ROOT_ID.to_string(),
            width: 0.0,
            height: 0.0,
            x: 0.0,
            y: 0.0,
            children,
        })
    }
}

fn build_subtree(
    node_id: &str,
    by_id: &HashMap<&str, &crate::model::GraphNode>,
    adjacency: &HashMap<&str, Vec<&str>>,
    path: &mut Vec<String>,
    node_options: &NodeOptions,
) -> HierarchyNode {
    let size = by_id
        .get(node_id)
        .map(|node| node.resolved_size(node_options))
        .unwrap_or(crate::model::Size {
            width: node_options.width,
            height: node_options.height,
        });
    let mut tree_node = HierarchyNode::leaf(node_id.to_string(), size.width, size.height);

    path.push(node_id.to_string());
    if let Some(children) = adjacency.get(node_id) {
        for child in children {
            // Revisiting a node on the current path is a cycle; prune the
            // offending link. Convergent paths through other branches are fine.
            if path.iter().any(|seen| seen == child) {
                warn!(node = *child, parent = node_id, "cycle detected; pruning child link");
                continue;
            }
            tree_node
                .children
                .push(build_subtree(child, by_id, adjacency, path, node_options));
        }
    }
    path.pop();

    tree_node
}

/// Flattens the laid-out tree back into a position map, skipping the virtual
/// root. Every coordinate from the opaque collaborator is re-validated here.
pub fn collect_positions(root: &HierarchyNode) -> Positions {
    let mut positions = Positions::new();
    collect_into(root, &mut positions);
    positions
}

fn collect_into(node: &HierarchyNode, positions: &mut Positions) {
    if !node.is_virtual_root() {
        positions.insert(
            node.id.clone(),
            NodePosition {
                x: sanitize(node.x, 0.0, &node.id, Stage::TreeLayout),
                y: sanitize(node.y, 0.0, &node.id, Stage::TreeLayout),
                width: sanitize(node.width, 0.0, &node.id, Stage::TreeLayout).max(0.0),
                height: sanitize(node.height, 0.0, &node.id, Stage::TreeLayout).max(0.0),
            },
        );
    }
    for child in &node.children {
        collect_into(child, positions);
    }
}
