//! Editor styling.
//!
//! Header colors are looked up by the schema's `category`.

use egui::Color32;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Visual styling configuration for the pipeline editor.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorStyle {
    pub header_colors: HashMap<String, Color32>,
    pub body_color: Color32,
    pub port_color: Color32,
    pub use_gradient_connections: bool,
    pub font_size: f32,
}

impl Default for EditorStyle {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert("Input".into(), Color32::from_rgb(200, 150, 50));
        map.insert("Output".into(), Color32::from_rgb(180, 50, 50));
        map.insert("Function".into(), Color32::from_rgb(50, 100, 200));
        map.insert("String".into(), Color32::from_rgb(200, 100, 100));
        map.insert("Data".into(), Color32::from_rgb(50, 150, 150));
        map.insert("Time".into(), Color32::from_rgb(100, 200, 100));
        map.insert("Default".into(), Color32::from_rgb(100, 100, 100));
        Self {
            header_colors: map,
            body_color: Color32::from_gray(64),
            port_color: Color32::from_rgb(230, 230, 230),
            use_gradient_connections: true,
            font_size: 14.0,
        }
    }
}

impl EditorStyle {
    pub fn header_color(&self, category: &str) -> Color32 {
        self.header_colors
            .get(category)
            .or_else(|| self.header_colors.get("Default"))
            .copied()
            .unwrap_or(Color32::GRAY)
    }
}
