use crate::config::{Alignment, Direction, TreeOptions};
use crate::error::LayoutError;

use super::hierarchy::HierarchyNode;

/// Boundary to the tree-layout collaborator. The pipeline treats whatever sits
/// behind this trait as a black box and re-validates every coordinate it
/// produces.
pub trait TreeLayout {
    fn layout(&self, root: &mut HierarchyNode, config: &TreeOptions) -> Result<(), LayoutError>;
}

/// Default layered tidy-tree placement. A subtree occupies a contiguous span
/// wide enough for all its children; parents sit over (or beside, in LR) the
/// centre of that span.
#[derive(Debug, Default, Clone)]
pub struct TidyTree;

impl TreeLayout for TidyTree {
    fn layout(&self, root: &mut HierarchyNode, config: &TreeOptions) -> Result<(), LayoutError> {
        let span = subtree_span(root, config);
        place(root, 0.0, span, 0.0, config);
        Ok(())
    }
}

fn breadth(node: &HierarchyNode, direction: Direction) -> f32 {
    match direction {
        Direction::TopBottom => node.width,
        Direction::LeftRight => node.height,
    }
}

/// Total cross-axis extent a subtree needs, including sibling separation.
fn subtree_span(node: &HierarchyNode, config: &TreeOptions) -> f32 {
    let own = breadth(node, config.direction);
    if node.children.is_empty() {
        return own;
    }
    let children: f32 = node
        .children
        .iter()
        .map(|child| subtree_span(child, config))
        .sum::<f32>()
        + config.node_sep * (node.children.len() - 1) as f32;
    own.max(children)
}

fn place(
    node: &mut HierarchyNode,
    span_start: f32,
    span: f32,
    depth_offset: f32,
    config: &TreeOptions,
) {
    let own = breadth(node, config.direction);
    let cross = match config.align {
        Alignment::Center => span_start + (span - own) / 2.0,
        Alignment::Start => span_start,
    };
    match config.direction {
        Direction::TopBottom => {
            node.x = cross;
            node.y = depth_offset;
        }
        Direction::LeftRight => {
            node.x = depth_offset;
            node.y = cross;
        }
    }

    if node.children.is_empty() {
        return;
    }

    let child_spans: Vec<f32> = node
        .children
        .iter()
        .map(|child| subtree_span(child, config))
        .collect();
    let total: f32 =
        child_spans.iter().sum::<f32>() + config.node_sep * (node.children.len() - 1) as f32;
    let mut cursor = match config.align {
        Alignment::Center => span_start + (span - total) / 2.0,
        Alignment::Start => span_start,
    };
    let next_depth = depth_offset + config.rank_sep;
    for (child, child_span) in node.children.iter_mut().zip(child_spans) {
        place(child, cursor, child_span, next_depth, config);
        cursor += child_span + config.node_sep;
    }
}
