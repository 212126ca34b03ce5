use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::LayoutOptions;
use crate::model::{CanvasGraph, GraphNode, NodeKind, Point, PreviewLink};
use crate::sanitize::{Stage, sanitize};

use super::Positions;

// Connector bends, matching the canvas renderer's curve handles.
const VERTICAL_BEND: f32 = 30.0;
const LATERAL_BEND: f32 = 50.0;

/// Suggested multi-point connector for a preview line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewPath {
    pub start: Point,
    pub control_points: Vec<Point>,
    pub end: Point,
}

/// Anchor for a preview link's loose end, plus the connector path leading to
/// it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragPoint {
    pub x: f32,
    pub y: f32,
    pub source: String,
    pub branch_index: usize,
    pub path: PreviewPath,
}

pub fn drag_point_id(source: &str, branch_index: usize) -> String {
    format!("{source}_branch_{branch_index}")
}

static PORT_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());

/// Lenient numeric-suffix parse: `out-2` → 2, `out` → None.
fn port_index(id: &str) -> Option<u32> {
    PORT_INDEX
        .captures(id)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

struct PortDef<'a> {
    id: &'a str,
    position_name: Option<&'a str>,
    args: Option<&'a Value>,
}

fn ports_in_group<'a>(node: &'a GraphNode, group: &str) -> Vec<PortDef<'a>> {
    let Some(items) = node.data.pointer("/ports/items").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut ports: Vec<PortDef<'a>> = items
        .iter()
        .filter(|item| {
            item.get("group").and_then(Value::as_str) == Some(group)
                || item.get("id").and_then(Value::as_str) == Some(group)
        })
        .filter_map(|item| {
            Some(PortDef {
                id: item.get("id").and_then(Value::as_str)?,
                position_name: item.pointer("/position/name").and_then(Value::as_str),
                args: item.pointer("/position/args"),
            })
        })
        .collect();
    ports.sort_by_key(|port| port_index(port.id).unwrap_or(0));
    ports
}

/// `args.y` accepts a percentage string (`"50%"`) of the node height.
fn y_fraction(args: Option<&Value>) -> f32 {
    args.and_then(|a| a.get("y"))
        .and_then(Value::as_str)
        .filter(|s| s.ends_with('%'))
        .and_then(|s| s.trim_end_matches('%').parse::<f32>().ok())
        .map(|percent| percent / 100.0)
        .unwrap_or(0.5)
}

fn arg_offset(args: Option<&Value>, key: &str) -> f32 {
    args.and_then(|a| a.get(key))
        .and_then(Value::as_f64)
        .unwrap_or(0.0) as f32
}

/// Output port anchor: explicit right-side port config first, right-center
/// geometric fallback otherwise. Branch nodes with several out ports pick the
/// one matching the branch index.
fn output_anchor(
    node: Option<&GraphNode>,
    position: super::NodePosition,
    branch_index: usize,
) -> Point {
    let fallback = Point {
        x: position.x + position.width,
        y: position.y + position.height / 2.0,
    };
    let Some(node) = node else {
        return fallback;
    };
    let ports = ports_in_group(node, "out");
    let port = ports.get(branch_index).or_else(|| ports.first());
    match port {
        // Port args come straight from node data, so the anchor gets the same
        // ingestion checkpoint as sizes and positions.
        Some(port) if port.position_name == Some("right") => {
            let x = position.x + position.width + arg_offset(port.args, "dx");
            let y = position.y
                + position.height * y_fraction(port.args)
                + arg_offset(port.args, "dy");
            Point {
                x: sanitize(x, fallback.x, &node.id, Stage::Ingest),
                y: sanitize(y, fallback.y, &node.id, Stage::Ingest),
            }
        }
        _ => fallback,
    }
}

/// Input port anchor: explicit left-side port config first, left-center
/// geometric fallback otherwise.
fn input_anchor(node: Option<&GraphNode>, position: super::NodePosition) -> Point {
    let fallback = Point {
        x: position.x,
        y: position.y + position.height / 2.0,
    };
    let Some(node) = node else {
        return fallback;
    };
    let ports = ports_in_group(node, "in");
    match ports.first() {
        Some(port) if port.position_name == Some("left") => {
            let x = position.x + arg_offset(port.args, "dx");
            let y = position.y
                + position.height * y_fraction(port.args)
                + arg_offset(port.args, "dy");
            Point {
                x: sanitize(x, fallback.x, &node.id, Stage::Ingest),
                y: sanitize(y, fallback.y, &node.id, Stage::Ingest),
            }
        }
        _ => fallback,
    }
}

/// Computes the anchor and connector path for every preview link whose source
/// has a position. Unresolved siblings fan out symmetrically; resolved links
/// land on their target's input port.
pub fn compute_drag_points(
    graph: &CanvasGraph,
    positions: &Positions,
    options: &LayoutOptions,
) -> BTreeMap<String, DragPoint> {
    let mut by_source: BTreeMap<&str, Vec<&PreviewLink>> = BTreeMap::new();
    for link in &graph.preview_links {
        by_source.entry(link.source.as_str()).or_default().push(link);
    }
    for siblings in by_source.values_mut() {
        siblings.sort_by_key(|link| link.branch_index);
    }

    let node_of = |id: &str| graph.nodes.iter().find(|n| n.id == id);
    let mut drag_points = BTreeMap::new();

    for (source_id, siblings) in &by_source {
        let Some(source_position) = positions.get(*source_id).copied() else {
            continue;
        };
        let source_node = node_of(source_id);
        let total = siblings.len();
        let is_start = source_node
            .map(|n| n.kind == NodeKind::Start)
            .unwrap_or(false);
        // Start nodes and single preview lines hang straight down; branch fans
        // run laterally from the output port.
        let vertical = is_start || total == 1;

        for (fan_index, link) in siblings.iter().enumerate() {
            let output = output_anchor(source_node, source_position, link.branch_index);
            let offset = if total > 1 {
                (fan_index as f32 - (total as f32 - 1.0) / 2.0) * options.preview.branch_spacing
            } else {
                0.0
            };

            let end = match link
                .target
                .as_deref()
                .and_then(|target| positions.get(target).copied().map(|p| (target, p)))
            {
                Some((target, target_position)) => {
                    input_anchor(node_of(target), target_position)
                }
                None if vertical => Point {
                    x: source_position.x + source_position.width / 2.0,
                    y: source_position.y
                        + source_position.height
                        + options.preview.drop
                        + offset,
                },
                None => Point {
                    x: output.x + options.preview.line_length,
                    y: output.y + offset,
                },
            };

            let start = if vertical {
                Point {
                    x: source_position.x + source_position.width / 2.0,
                    y: source_position.y + source_position.height,
                }
            } else {
                output
            };
            let control_points = if vertical {
                vec![
                    Point {
                        x: start.x,
                        y: start.y + VERTICAL_BEND,
                    },
                    Point {
                        x: end.x,
                        y: end.y - VERTICAL_BEND,
                    },
                ]
            } else {
                vec![
                    Point {
                        x: output.x + LATERAL_BEND,
                        y: output.y,
                    },
                    Point {
                        x: end.x - LATERAL_BEND,
                        y: end.y,
                    },
                ]
            };

            drag_points.insert(
                drag_point_id(source_id, link.branch_index),
                DragPoint {
                    x: end.x,
                    y: end.y,
                    source: source_id.to_string(),
                    branch_index: link.branch_index,
                    path: PreviewPath {
                        start,
                        control_points,
                        end,
                    },
                },
            );
        }
    }
    drag_points
}
