use thiserror::Error;

/// Failure channel for the layout pipeline. The orchestrator folds these into
/// `LayoutResult` at its boundary instead of letting them escape.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("graph data is empty or has no nodes")]
    EmptyGraph,

    #[error("tree layout failed: {0}")]
    TreeLayout(String),
}
