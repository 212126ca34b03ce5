use serde_json::Value;

/// Surface of the live canvas collaborator: the engine reads loose node and
/// edge descriptions and writes positions back through the canvas's own
/// setter. Nothing else about the collaborator is assumed.
pub trait Canvas {
    fn nodes(&self) -> Vec<Value>;
    fn edges(&self) -> Vec<Value>;
    fn set_position(&mut self, id: &str, x: f32, y: f32);
}

/// Drag-point hints and preview endpoints live on the canvas as ordinary
/// nodes; they must never participate in layout.
pub fn is_transient_node(value: &Value) -> bool {
    let id = value.get("id").and_then(Value::as_str).unwrap_or("");
    if id.contains("hint") {
        return true;
    }
    data_flag(value, "isEndpoint") || data_flag(value, "isPreview")
}

/// Preview lines are rendered as edges on the canvas; filter them the same
/// way.
pub fn is_transient_edge(value: &Value) -> bool {
    let id = value.get("id").and_then(Value::as_str).unwrap_or("");
    if id.contains("preview") {
        return true;
    }
    data_flag(value, "isPreview") || data_flag(value, "isPersistentPreview")
}

fn data_flag(value: &Value, key: &str) -> bool {
    value
        .pointer(&format!("/data/{key}"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// In-memory canvas over plain JSON node/edge lists. Backs the CLI and the
/// integration tests; an embedding application supplies its own impl.
#[derive(Debug, Default, Clone)]
pub struct JsonCanvas {
    nodes: Vec<Value>,
    edges: Vec<Value>,
}

impl JsonCanvas {
    pub fn new(nodes: Vec<Value>, edges: Vec<Value>) -> Self {
        Self { nodes, edges }
    }

    pub fn position_of(&self, id: &str) -> Option<(f32, f32)> {
        let node = self
            .nodes
            .iter()
            .find(|n| n.get("id").and_then(Value::as_str) == Some(id))?;
        let x = node.pointer("/position/x")?.as_f64()? as f32;
        let y = node.pointer("/position/y")?.as_f64()? as f32;
        Some((x, y))
    }

    pub fn into_nodes(self) -> Vec<Value> {
        self.nodes
    }
}

impl Canvas for JsonCanvas {
    fn nodes(&self) -> Vec<Value> {
        self.nodes.clone()
    }

    fn edges(&self) -> Vec<Value> {
        self.edges.clone()
    }

    fn set_position(&mut self, id: &str, x: f32, y: f32) {
        for node in &mut self.nodes {
            if node.get("id").and_then(Value::as_str) == Some(id) {
                node["position"] = serde_json::json!({ "x": x, "y": y });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hint_ids_are_transient() {
        assert!(is_transient_node(&json!({ "id": "hint_abc" })));
        assert!(is_transient_node(&json!({ "id": "drag_hint_1" })));
        assert!(!is_transient_node(&json!({ "id": "node_1" })));
    }

    #[test]
    fn endpoint_and_preview_flags_are_transient() {
        assert!(is_transient_node(
            &json!({ "id": "n", "data": { "isEndpoint": true } })
        ));
        assert!(is_transient_node(
            &json!({ "id": "n", "data": { "isPreview": true } })
        ));
        assert!(!is_transient_node(
            &json!({ "id": "n", "data": { "isPreview": false } })
        ));
    }

    #[test]
    fn preview_edges_are_transient() {
        assert!(is_transient_edge(&json!({ "id": "unified_preview_3" })));
        assert!(is_transient_edge(&json!({ "id": "preview_e1" })));
        assert!(is_transient_edge(
            &json!({ "id": "e", "data": { "isPersistentPreview": true } })
        ));
        assert!(!is_transient_edge(&json!({ "id": "e1" })));
    }

    #[test]
    fn json_canvas_records_written_positions() {
        let mut canvas = JsonCanvas::new(vec![json!({ "id": "a" })], vec![]);
        canvas.set_position("a", 40.0, 80.0);
        assert_eq!(canvas.position_of("a"), Some((40.0, 80.0)));
    }
}
