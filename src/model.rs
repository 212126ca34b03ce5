use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::NodeOptions;
use crate::sanitize::{Stage, sanitize};

/// Workflow node kinds understood by the connection rules. Anything else is
/// carried through as `Other` and treated as a plain process node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Start,
    AudienceSplit,
    EventSplit,
    AbTest,
    Sms,
    AiCall,
    ManualCall,
    Wait,
    Blacklist,
    End,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Start => "start",
            NodeKind::AudienceSplit => "audience-split",
            NodeKind::EventSplit => "event-split",
            NodeKind::AbTest => "ab-test",
            NodeKind::Sms => "sms",
            NodeKind::AiCall => "ai-call",
            NodeKind::ManualCall => "manual-call",
            NodeKind::Wait => "wait",
            NodeKind::Blacklist => "blacklist",
            NodeKind::End => "end",
            NodeKind::Other(name) => name.as_str(),
        }
    }

    /// Kinds with multiple independent outputs that fan out preview links.
    pub fn is_branching(&self) -> bool {
        matches!(
            self,
            NodeKind::AudienceSplit | NodeKind::EventSplit | NodeKind::AbTest
        )
    }
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "start" => NodeKind::Start,
            "audience-split" | "crowd-split" => NodeKind::AudienceSplit,
            "event-split" => NodeKind::EventSplit,
            "ab-test" => NodeKind::AbTest,
            "sms" => NodeKind::Sms,
            "ai-call" => NodeKind::AiCall,
            "manual-call" => NodeKind::ManualCall,
            "wait" => NodeKind::Wait,
            "blacklist" => NodeKind::Blacklist,
            "end" => NodeKind::End,
            _ => NodeKind::Other(value),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Real,
    Preview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: EdgeKind,
}

/// Candidate edge from a branch node whose target may not be chosen yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewLink {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub branch_index: usize,
    #[serde(default)]
    pub target: Option<String>,
}

impl PreviewLink {
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

/// Per-call layout input: ordered nodes and edges plus any preview links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub preview_links: Vec<PreviewLink>,
}

impl GraphNode {
    /// Resolves the node size through the accessor chain: the typed field,
    /// then `data.size.{width,height}`, then raw `data.{width,height}`, then
    /// the configured defaults. Every resolved number is sanitized.
    pub fn resolved_size(&self, defaults: &NodeOptions) -> Size {
        let width = self
            .size
            .map(|s| s.width)
            .or_else(|| number_field(&self.data, &["size", "width"]))
            .or_else(|| number_field(&self.data, &["width"]))
            .unwrap_or(defaults.width);
        let height = self
            .size
            .map(|s| s.height)
            .or_else(|| number_field(&self.data, &["size", "height"]))
            .or_else(|| number_field(&self.data, &["height"]))
            .unwrap_or(defaults.height);
        let width = sanitize(width, defaults.width, &self.id, Stage::Ingest).max(0.0);
        let height = sanitize(height, defaults.height, &self.id, Stage::Ingest).max(0.0);
        Size { width, height }
    }

    /// Resolves the pre-layout position, if any, through the same chain.
    /// A present-but-garbage coordinate sanitizes to the origin rather than
    /// poisoning downstream arithmetic.
    pub fn resolved_position(&self) -> Option<Point> {
        let x = self
            .position
            .map(|p| p.x)
            .or_else(|| number_field(&self.data, &["position", "x"]))
            .or_else(|| number_field(&self.data, &["x"]));
        let y = self
            .position
            .map(|p| p.y)
            .or_else(|| number_field(&self.data, &["position", "y"]))
            .or_else(|| number_field(&self.data, &["y"]));
        match (x, y) {
            (Some(x), Some(y)) => Some(Point {
                x: sanitize(x, 0.0, &self.id, Stage::Ingest),
                y: sanitize(y, 0.0, &self.id, Stage::Ingest),
            }),
            _ => None,
        }
    }
}

fn number_field(data: &Value, path: &[&str]) -> Option<f32> {
    let mut current = data;
    for key in path {
        current = current.get(key)?;
    }
    current.as_f64().map(|v| v as f32)
}

/// Normalizes a loose node description (the shape the canvas collaborator
/// hands over) into a typed `GraphNode`. The id is required; the kind is
/// looked up under `type`, `data.type`, then `data.nodeType`.
pub fn node_from_value(value: &Value) -> Option<GraphNode> {
    let id = value.get("id")?.as_str()?.to_string();
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/data/type").and_then(Value::as_str))
        .or_else(|| value.pointer("/data/nodeType").and_then(Value::as_str))
        .unwrap_or("unknown");
    let size = match (
        value.pointer("/size/width").and_then(Value::as_f64),
        value.pointer("/size/height").and_then(Value::as_f64),
    ) {
        (Some(width), Some(height)) => Some(Size {
            width: width as f32,
            height: height as f32,
        }),
        _ => None,
    };
    let position = match (
        value.pointer("/position/x").and_then(Value::as_f64),
        value.pointer("/position/y").and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Some(Point {
            x: x as f32,
            y: y as f32,
        }),
        _ => None,
    };
    Some(GraphNode {
        id,
        kind: NodeKind::from(kind.to_string()),
        size,
        position,
        data: value.get("data").cloned().unwrap_or(Value::Null),
    })
}

/// Normalizes a loose edge description. Source and target accept either the
/// flat `source`/`target` string fields or the nested `{ cell }` form.
pub fn edge_from_value(value: &Value) -> Option<GraphEdge> {
    let id = value.get("id")?.as_str()?.to_string();
    let source = endpoint_id(value.get("source")?)?;
    let target = endpoint_id(value.get("target")?)?;
    Some(GraphEdge {
        id,
        source,
        target,
        kind: EdgeKind::Real,
    })
}

fn endpoint_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("cell").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> NodeOptions {
        NodeOptions::default()
    }

    #[test]
    fn kind_round_trips_through_strings() {
        let kind = NodeKind::from("audience-split".to_string());
        assert_eq!(kind, NodeKind::AudienceSplit);
        assert_eq!(String::from(kind), "audience-split");
        let other = NodeKind::from("mystery".to_string());
        assert_eq!(other.as_str(), "mystery");
    }

    #[test]
    fn crowd_split_aliases_audience_split() {
        assert_eq!(
            NodeKind::from("crowd-split".to_string()),
            NodeKind::AudienceSplit
        );
    }

    #[test]
    fn size_falls_back_through_the_chain() {
        let node = GraphNode {
            id: "n1".to_string(),
            kind: NodeKind::Sms,
            size: None,
            position: None,
            data: json!({ "size": { "width": 80.0, "height": 40.0 } }),
        };
        let size = node.resolved_size(&defaults());
        assert_eq!(size.width, 80.0);
        assert_eq!(size.height, 40.0);

        let node = GraphNode {
            id: "n2".to_string(),
            kind: NodeKind::Sms,
            size: None,
            position: None,
            data: json!({ "width": 90.0, "height": 45.0 }),
        };
        let size = node.resolved_size(&defaults());
        assert_eq!(size.width, 90.0);
        assert_eq!(size.height, 45.0);

        let node = GraphNode {
            id: "n3".to_string(),
            kind: NodeKind::Sms,
            size: None,
            position: None,
            data: Value::Null,
        };
        let size = node.resolved_size(&defaults());
        assert_eq!(size.width, defaults().width);
        assert_eq!(size.height, defaults().height);
    }

    #[test]
    fn non_finite_size_is_replaced_with_defaults() {
        let node = GraphNode {
            id: "bad".to_string(),
            kind: NodeKind::Sms,
            size: Some(Size {
                width: f32::NAN,
                height: f32::INFINITY,
            }),
            position: None,
            data: Value::Null,
        };
        let size = node.resolved_size(&defaults());
        assert!(size.width.is_finite());
        assert!(size.height.is_finite());
        assert_eq!(size.width, defaults().width);
        assert_eq!(size.height, defaults().height);
    }

    #[test]
    fn negative_size_clamps_to_zero() {
        let node = GraphNode {
            id: "neg".to_string(),
            kind: NodeKind::Sms,
            size: Some(Size {
                width: -10.0,
                height: 20.0,
            }),
            position: None,
            data: Value::Null,
        };
        let size = node.resolved_size(&defaults());
        assert_eq!(size.width, 0.0);
        assert_eq!(size.height, 20.0);
    }

    #[test]
    fn garbage_position_sanitizes_to_origin() {
        let node = GraphNode {
            id: "p".to_string(),
            kind: NodeKind::Sms,
            size: None,
            position: Some(Point {
                x: f32::NAN,
                y: 5.0,
            }),
            data: Value::Null,
        };
        let pos = node.resolved_position().unwrap();
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 5.0);
    }

    #[test]
    fn node_from_value_reads_nested_kind() {
        let value = json!({
            "id": "a",
            "data": { "nodeType": "sms" },
            "position": { "x": 10.0, "y": 20.0 }
        });
        let node = node_from_value(&value).unwrap();
        assert_eq!(node.kind, NodeKind::Sms);
        assert_eq!(node.position.unwrap().x, 10.0);
    }

    #[test]
    fn node_from_value_requires_an_id() {
        assert!(node_from_value(&json!({ "type": "sms" })).is_none());
    }

    #[test]
    fn edge_from_value_accepts_both_endpoint_shapes() {
        let flat = json!({ "id": "e1", "source": "a", "target": "b" });
        let nested = json!({
            "id": "e2",
            "source": { "cell": "a", "port": "out" },
            "target": { "cell": "b", "port": "in" }
        });
        assert_eq!(edge_from_value(&flat).unwrap().source, "a");
        assert_eq!(edge_from_value(&nested).unwrap().target, "b");
    }
}
