use std::path::Path;

use serde::{Deserialize, Serialize};

/// Layout direction. The canvas flows top-down; left-right is kept for the
/// horizontal page variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "LR")]
    LeftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Center,
    Start,
}

/// Default node dimensions and same-layer spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    pub width: f32,
    pub height: f32,
    pub spacing: f32,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            width: 120.0,
            height: 60.0,
            spacing: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerOptions {
    pub height: f32,
    pub spacing: f32,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            height: 200.0,
            spacing: 100.0,
        }
    }
}

/// Configuration handed to the tree-layout collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    pub direction: Direction,
    pub node_sep: f32,
    pub rank_sep: f32,
    pub align: Alignment,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            node_sep: 50.0,
            rank_sep: 200.0,
            align: Alignment::Center,
        }
    }
}

/// Space reservation and anchor geometry for preview links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewOptions {
    /// Vertical space reserved per pending preview link on a level.
    pub line_spacing: f32,
    /// Fan-out spacing between sibling branch anchors.
    pub branch_spacing: f32,
    /// Lateral length of an unresolved preview line from a multi-branch node.
    pub line_length: f32,
    /// Drop below a single-output node for its unresolved anchor.
    pub drop: f32,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            line_spacing: 80.0,
            branch_spacing: 40.0,
            line_length: 200.0,
            drop: 100.0,
        }
    }
}

/// Tunables for the topological branch engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchOptions {
    pub row_height: f32,
    pub node_spacing: f32,
    pub branch_spacing: f32,
    pub grid_size: f32,
    pub margin: f32,
}

impl Default for BranchOptions {
    fn default() -> Self {
        Self {
            row_height: 150.0,
            node_spacing: 120.0,
            branch_spacing: 180.0,
            grid_size: 20.0,
            margin: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceOptions {
    pub enable_cache: bool,
    pub enable_debounce: bool,
    pub debounce_delay_ms: u64,
}

impl Default for PerformanceOptions {
    fn default() -> Self {
        Self {
            enable_cache: true,
            enable_debounce: true,
            debounce_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub node: NodeOptions,
    pub layer: LayerOptions,
    pub tree: TreeOptions,
    pub preview: PreviewOptions,
    pub branch: BranchOptions,
    pub performance: PerformanceOptions,
    pub debug: bool,
}

/// Loads options from a JSON or JSON5 file; a missing path yields defaults.
/// Partial files are fine — every section falls back field by field.
pub fn load_options(path: Option<&Path>) -> anyhow::Result<LayoutOptions> {
    let Some(path) = path else {
        return Ok(LayoutOptions::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let options: LayoutOptions = json5::from_str(&contents)?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_constants() {
        let options = LayoutOptions::default();
        assert_eq!(options.node.width, 120.0);
        assert_eq!(options.node.height, 60.0);
        assert_eq!(options.layer.height, 200.0);
        assert_eq!(options.tree.rank_sep, 200.0);
        assert_eq!(options.preview.line_spacing, 80.0);
        assert!(options.performance.enable_cache);
        assert_eq!(options.performance.debounce_delay_ms, 100);
        assert!(!options.debug);
    }

    #[test]
    fn partial_json5_overrides_only_named_fields() {
        let parsed: LayoutOptions =
            json5::from_str("{ node: { width: 90 }, debug: true }").unwrap();
        assert_eq!(parsed.node.width, 90.0);
        assert_eq!(parsed.node.height, 60.0);
        assert!(parsed.debug);
        assert_eq!(parsed.layer.height, 200.0);
    }

    #[test]
    fn direction_serializes_as_short_codes() {
        let json = serde_json::to_string(&Direction::TopBottom).unwrap();
        assert_eq!(json, "\"TB\"");
        let back: Direction = serde_json::from_str("\"LR\"").unwrap();
        assert_eq!(back, Direction::LeftRight);
    }
}
