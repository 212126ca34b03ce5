pub mod branch;
pub mod hierarchy;
pub mod post;
pub mod preview;
pub mod tree;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LayoutOptions;
use crate::error::LayoutError;
use crate::model::CanvasGraph;

use tree::TreeLayout;

/// Final per-node placement. Width and height ride along so consumers can
/// compute ports and bounding boxes without going back to the input graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Node id to placement, ordered for deterministic iteration.
pub type Positions = BTreeMap<String, NodePosition>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub success: bool,
    pub error: Option<String>,
    pub positions: Positions,
}

impl LayoutResult {
    pub fn ok(positions: Positions) -> Self {
        Self {
            success: true,
            error: None,
            positions,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            positions: Positions::new(),
        }
    }
}

/// Runs the hierarchy pipeline: graph → tree → tree layout → position map →
/// post-processing. Pure with respect to the input graph.
pub fn perform_layout(
    graph: &CanvasGraph,
    tree_layout: &dyn TreeLayout,
    options: &LayoutOptions,
) -> Result<Positions, LayoutError> {
    let mut root = hierarchy::build_hierarchy(graph, &options.node)?;
    tree_layout.layout(&mut root, &options.tree)?;
    let mut positions = hierarchy::collect_positions(&root);
    post::align_layers(&mut positions, options.layer.height);
    post::enforce_min_spacing(&mut positions, options.node.spacing, options.node.width);
    post::center_horizontally(&mut positions);
    Ok(positions)
}
