use std::fmt;

use tracing::warn;

/// Checkpoint at which a coordinate crossed a component boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    TreeLayout,
    WriteBack,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingest => f.write_str("ingest"),
            Stage::TreeLayout => f.write_str("tree-layout"),
            Stage::WriteBack => f.write_str("write-back"),
        }
    }
}

/// Finite values pass through untouched; NaN and infinities are replaced with
/// the fallback and logged so a degraded layout stays discoverable.
pub fn sanitize(value: f32, fallback: f32, node_id: &str, stage: Stage) -> f32 {
    if value.is_finite() {
        value
    } else {
        warn!(
            node = node_id,
            stage = %stage,
            value = %value,
            fallback,
            "replacing non-finite coordinate"
        );
        fallback
    }
}
