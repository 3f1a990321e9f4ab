//! Edge rendering utilities.
//!
//! Handles drawing bezier curves between port anchors and hit-testing them
//! for deletion.

use egui::{Color32, Pos2, Stroke};

/// Control points for the curve from an output anchor to an input anchor.
pub fn bezier_control_points(p1: Pos2, p2: Pos2) -> (Pos2, Pos2) {
    let control_offset = ((p2.x - p1.x).abs() * 0.5).max(50.0);
    (
        Pos2::new(p1.x + control_offset, p1.y),
        Pos2::new(p2.x - control_offset, p2.y),
    )
}

fn bezier_point(p1: Pos2, c1: Pos2, c2: Pos2, p2: Pos2, t: f32) -> Pos2 {
    let it = 1.0 - t;
    (it.powi(3) * p1.to_vec2()
        + 3.0 * it.powi(2) * t * c1.to_vec2()
        + 3.0 * it * t.powi(2) * c2.to_vec2()
        + t.powi(3) * p2.to_vec2())
    .to_pos2()
}

/// Interpolate between two colors.
pub fn lerp_color(c1: Color32, c2: Color32, t: f32) -> Color32 {
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t) as u8;
    Color32::from_rgba_premultiplied(
        mix(c1.r(), c2.r()),
        mix(c1.g(), c2.g()),
        mix(c1.b(), c2.b()),
        mix(c1.a(), c2.a()),
    )
}

/// Draw a bezier edge, blending from `c1_color` to `c2_color` when they differ.
pub fn draw_bezier(
    painter: &egui::Painter,
    p1: Pos2,
    p2: Pos2,
    c1_color: Color32,
    c2_color: Color32,
    width: f32,
) {
    let (c1, c2) = bezier_control_points(p1, p2);

    if c1_color == c2_color {
        let curve = egui::epaint::CubicBezierShape::from_points_stroke(
            [p1, c1, c2, p2],
            false,
            Color32::TRANSPARENT,
            Stroke::new(width, c1_color),
        );
        painter.add(curve);
        return;
    }

    let steps = 40;
    let mut prev = p1;
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        let p = bezier_point(p1, c1, c2, p2, t);
        painter.line_segment([prev, p], Stroke::new(width, lerp_color(c1_color, c2_color, t)));
        prev = p;
    }
}

/// Test if a point is within `threshold` of the edge curve.
pub fn hit_test_bezier(pos: Pos2, p1: Pos2, p2: Pos2, threshold: f32) -> bool {
    let (c1, c2) = bezier_control_points(p1, p2);
    let steps = 20;
    let mut prev = p1;
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        let current = bezier_point(p1, c1, c2, p2, t);
        if distance_to_segment(pos, prev, current) < threshold {
            return true;
        }
        prev = current;
    }
    false
}

/// Calculate the distance from a point to a line segment.
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    if ab.length_sq() < 1e-6 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / ab.length_sq()).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(-4.0, 3.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Pos2::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn test_hit_test_endpoints_and_miss() {
        let p1 = Pos2::new(0.0, 0.0);
        let p2 = Pos2::new(200.0, 100.0);
        assert!(hit_test_bezier(p1, p1, p2, 2.0));
        assert!(hit_test_bezier(p2, p1, p2, 2.0));
        assert!(!hit_test_bezier(Pos2::new(0.0, 300.0), p1, p2, 10.0));
    }

    #[test]
    fn test_lerp_color() {
        let black = Color32::from_rgb(0, 0, 0);
        let white = Color32::from_rgb(255, 255, 255);
        assert_eq!(lerp_color(black, white, 0.0), black);
        assert_eq!(lerp_color(black, white, 1.0), white);
    }
}
