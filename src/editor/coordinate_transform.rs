//! Coordinate transformation utilities for the pipeline canvas.
//!
//! Handles conversions between graph coordinates and screen coordinates,
//! accounting for pan and zoom.

use egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 2.0;

/// Convert graph coordinates to screen coordinates.
///
/// # Arguments
/// * `pos` - Position in graph space
/// * `pan` - Current pan offset
/// * `zoom` - Current zoom level
/// * `canvas_offset` - Top-left corner of the canvas in screen space
pub fn to_screen(pos: Pos2, pan: Vec2, zoom: f32, canvas_offset: Pos2) -> Pos2 {
    canvas_offset + pan + pos.to_vec2() * zoom
}

/// Convert screen coordinates to graph coordinates.
pub fn from_screen(screen_pos: Pos2, pan: Vec2, zoom: f32, canvas_offset: Pos2) -> Pos2 {
    let relative = screen_pos - canvas_offset - pan;
    (relative / zoom).to_pos2()
}

/// New `(pan, zoom)` after scaling by `factor` around `anchor`, so the graph
/// point under the anchor stays put. `anchor` is relative to the canvas.
pub fn zoom_around(pan: Vec2, zoom: f32, factor: f32, anchor: Vec2) -> (Vec2, f32) {
    let new_zoom = (zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    let ratio = new_zoom / zoom;
    (anchor - (anchor - pan) * ratio, new_zoom)
}
