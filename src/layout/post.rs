use tracing::debug;

use super::Positions;

/// Snaps each node's y to the nearest layer boundary. A non-positive or
/// non-finite layer height disables the pass rather than corrupting the map.
pub fn align_layers(positions: &mut Positions, layer_height: f32) {
    if !layer_height.is_finite() || layer_height <= 0.0 {
        debug!(layer_height, "skipping layer alignment");
        return;
    }
    for position in positions.values_mut() {
        let snapped = (position.y / layer_height).round() * layer_height;
        if snapped.is_finite() {
            position.y = snapped;
        }
    }
}

/// Pushes horizontally-overlapping nodes apart, left to right. Ordering is by
/// x then id so ties resolve the same way on every run.
pub fn enforce_min_spacing(positions: &mut Positions, min_spacing: f32, default_width: f32) {
    if !min_spacing.is_finite() || min_spacing <= 0.0 {
        debug!(min_spacing, "skipping spacing enforcement");
        return;
    }
    let mut order: Vec<String> = positions.keys().cloned().collect();
    order.sort_by(|a, b| {
        let ax = positions[a].x;
        let bx = positions[b].x;
        ax.partial_cmp(&bx)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(b))
    });

    let mut prev_edge: Option<f32> = None;
    for id in order {
        let Some(position) = positions.get_mut(&id) else {
            continue;
        };
        if let Some(edge) = prev_edge {
            let min_x = edge + min_spacing;
            if position.x < min_x {
                position.x = min_x;
            }
        }
        let width = if position.width > 0.0 {
            position.width
        } else {
            default_width
        };
        prev_edge = Some(position.x + width);
    }
}

/// Shifts the whole map so its horizontal bounding box is centred on x = 0.
pub fn center_horizontally(positions: &mut Positions) {
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    for position in positions.values() {
        min_x = min_x.min(position.x);
        max_x = max_x.max(position.x + position.width);
    }
    if !min_x.is_finite() || !max_x.is_finite() {
        return;
    }
    let offset = (min_x + max_x) / 2.0;
    for position in positions.values_mut() {
        position.x -= offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::NodePosition;

    fn at(x: f32, y: f32) -> NodePosition {
        NodePosition {
            x,
            y,
            width: 120.0,
            height: 60.0,
        }
    }

    fn map(entries: &[(&str, NodePosition)]) -> Positions {
        entries
            .iter()
            .map(|(id, p)| (id.to_string(), *p))
            .collect()
    }

    #[test]
    fn align_snaps_to_layer_multiples() {
        let mut positions = map(&[("a", at(0.0, 95.0)), ("b", at(0.0, 310.0))]);
        align_layers(&mut positions, 200.0);
        assert_eq!(positions["a"].y, 0.0);
        assert_eq!(positions["b"].y, 400.0);
    }

    #[test]
    fn align_skips_on_zero_layer_height() {
        let mut positions = map(&[("a", at(0.0, 95.0))]);
        align_layers(&mut positions, 0.0);
        assert_eq!(positions["a"].y, 95.0);
    }

    #[test]
    fn spacing_pushes_overlapping_nodes_apart() {
        let mut positions = map(&[("a", at(0.0, 0.0)), ("b", at(10.0, 0.0))]);
        enforce_min_spacing(&mut positions, 50.0, 120.0);
        assert_eq!(positions["a"].x, 0.0);
        assert_eq!(positions["b"].x, 170.0);
    }

    #[test]
    fn spacing_uses_default_width_for_degenerate_nodes() {
        let mut positions = map(&[
            (
                "a",
                NodePosition {
                    x: 0.0,
                    y: 0.0,
                    width: 0.0,
                    height: 0.0,
                },
            ),
            ("b", at(10.0, 0.0)),
        ]);
        enforce_min_spacing(&mut positions, 50.0, 120.0);
        assert_eq!(positions["b"].x, 170.0);
    }

    #[test]
    fn spacing_ties_break_by_id() {
        let mut positions = map(&[("b", at(0.0, 0.0)), ("a", at(0.0, 0.0))]);
        enforce_min_spacing(&mut positions, 50.0, 120.0);
        assert_eq!(positions["a"].x, 0.0);
        assert_eq!(positions["b"].x, 170.0);
    }

    #[test]
    fn centering_balances_the_bounding_box() {
        let mut positions = map(&[("a", at(0.0, 0.0)), ("b", at(280.0, 0.0))]);
        center_horizontally(&mut positions);
        let min = positions["a"].x;
        let max = positions["b"].x + positions["b"].width;
        assert!((min + max).abs() < 0.01);
    }

    #[test]
    fn chain_is_idempotent() {
        let mut positions = map(&[
            ("a", at(0.0, 95.0)),
            ("b", at(10.0, 95.0)),
            ("c", at(400.0, 310.0)),
        ]);
        let run = |p: &mut Positions| {
            align_layers(p, 200.0);
            enforce_min_spacing(p, 50.0, 120.0);
            center_horizontally(p);
        };
        run(&mut positions);
        let once = positions.clone();
        run(&mut positions);
        assert_eq!(once, positions);
    }

    #[test]
    fn empty_map_is_a_no_op() {
        let mut positions = Positions::new();
        align_layers(&mut positions, 200.0);
        enforce_min_spacing(&mut positions, 50.0, 120.0);
        center_horizontally(&mut positions);
        assert!(positions.is_empty());
    }
}
