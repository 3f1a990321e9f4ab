//! # Pipeline Editor
//!
//! The canvas that hosts node instances from the graph store.
//!
//! ## Submodules
//! - [`node_renderer`]: Generic schema-driven node rendering
//! - [`wrappers`]: Registry key to renderer bindings
//! - [`connection_renderer`]: Edge drawing and hit testing
//! - [`coordinate_transform`]: Graph/screen coordinate conversion
//! - [`style`]: Editor styling
//!
//! ## Main Type
//! [`GraphEditor`] - The canvas widget

pub mod connection_renderer;
pub mod coordinate_transform;
pub mod node_renderer;
pub mod style;
pub mod wrappers;

pub use style::EditorStyle;

use crate::graph::{Edge, PipelineGraph};
use crate::node_types::PortRole;
use coordinate_transform::{from_screen, to_screen, zoom_around};
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};
use node_renderer::NodeRenderer;
use std::collections::HashSet;
use uuid::Uuid;
use wrappers::NodeBindings;

/// What one frame did to the graph, as far as the undo history cares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GraphChange {
    #[default]
    None,
    /// A single field of a single node was edited.
    Field { node: Uuid, field: String },
    /// Nodes, edges or positions changed, or several fields were edited.
    Structure,
}

impl GraphChange {
    pub fn merge(self, other: GraphChange) -> GraphChange {
        match (self, other) {
            (GraphChange::None, change) | (change, GraphChange::None) => change,
            (a, b) if a == b => a,
            _ => GraphChange::Structure,
        }
    }
}

/// Drag-and-drop payload carried from the palette to the canvas.
#[derive(Clone, Debug)]
pub struct PaletteItem(pub String);

pub struct GraphEditor {
    pub pan: Vec2,
    pub zoom: f32,
    /// Anchor a new edge starts from: (node, port id, role).
    pub connection_start: Option<(Uuid, String, PortRole)>,
    pub selected_nodes: HashSet<Uuid>,
    pub style: EditorStyle,
    /// Counter for z-order assignment (incremented each time a node is raised)
    pub next_z_order: u64,
    canvas_rect: Rect,
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            connection_start: None,
            selected_nodes: HashSet::new(),
            style: EditorStyle::default(),
            next_z_order: 1,
            canvas_rect: Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)),
        }
    }
}

/// Screen position of a port anchor among this frame's renderers.
fn anchor_screen_pos(
    renderers: &[(Uuid, Pos2, NodeRenderer<'_>)],
    zoom: f32,
    node_id: Uuid,
    port_id: &str,
    role: PortRole,
) -> Option<Pos2> {
    let (_, origin, renderer) = renderers.iter().find(|(id, _, _)| *id == node_id)?;
    let layout = renderer.layout();
    let port = layout.find_port(port_id, role)?;
    Some(*origin + layout.anchor_offset(port) * zoom)
}

impl GraphEditor {
    pub fn with_style(style: EditorStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Draws the canvas and applies the user's edits to `graph`.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        graph: &mut PipelineGraph,
        bindings: &NodeBindings,
    ) -> GraphChange {
        let mut change = GraphChange::None;
        let clip_rect = ui.max_rect();
        self.canvas_rect = clip_rect;
        let canvas_offset = clip_rect.min;
        let pointer_pos = ui.ctx().pointer_latest_pos();
        let pointer_in_bounds = ui.rect_contains_pointer(clip_rect);
        let editing_text = ui.ctx().memory(|m| m.focused().is_some());

        let (primary_released, secondary_clicked, input_escape, input_delete, shift) =
            ui.input(|i| {
                if pointer_in_bounds {
                    // Pan with Middle Mouse or Alt + Left Mouse
                    if i.pointer.middle_down() || (i.modifiers.alt && i.pointer.primary_down()) {
                        self.pan += i.pointer.delta();
                    }
                    let zoom_delta = i.zoom_delta();
                    if zoom_delta != 1.0 {
                        if let Some(hover) = i.pointer.hover_pos() {
                            let (pan, zoom) =
                                zoom_around(self.pan, self.zoom, zoom_delta, hover - canvas_offset);
                            self.pan = pan;
                            self.zoom = zoom;
                        }
                    } else {
                        self.pan += i.smooth_scroll_delta;
                    }
                }
                (
                    i.pointer.primary_released(),
                    i.pointer.secondary_clicked(),
                    i.key_pressed(egui::Key::Escape),
                    i.key_pressed(egui::Key::Delete),
                    i.modifiers.shift,
                )
            });
        let zoom = self.zoom;

        let background = ui.interact(clip_rect, ui.id().with("pipeline_canvas"), Sense::click());
        let painter = ui.painter().clone();
        painter.rect_filled(clip_rect, 0.0, Color32::from_gray(32));

        if background.clicked() && !shift {
            self.selected_nodes.clear();
        }
        if let Some(item) = background.dnd_release_payload::<PaletteItem>() {
            if let Some(pos) = pointer_pos {
                let graph_pos = from_screen(pos, self.pan, zoom, canvas_offset);
                self.place_node(graph, &item.0, graph_pos);
                change = change.merge(GraphChange::Structure);
            }
        }

        // One render session per node, back to front
        let mut renderers = Vec::with_capacity(graph.nodes.len());
        for node in graph.nodes_by_z_order() {
            match bindings.get(&node.node_type) {
                Ok(wrapper) => {
                    let origin = to_screen(
                        Pos2::new(node.position.0, node.position.1),
                        self.pan,
                        zoom,
                        canvas_offset,
                    );
                    renderers.push((node.id, origin, wrapper.renderer(node.id, &node.data)));
                }
                Err(err) => log::error!("cannot render node {}: {}", node.id, err),
            }
        }

        // Edges under nodes. Edges whose handle no longer exists are skipped.
        let mut edge_to_remove = None;
        for edge in &graph.edges {
            let source = anchor_screen_pos(&renderers, zoom, edge.source, &edge.source_handle, PortRole::Output);
            let target = anchor_screen_pos(&renderers, zoom, edge.target, &edge.target_handle, PortRole::Input);
            let (Some(p1), Some(p2)) = (source, target) else {
                continue;
            };
            let (c1, c2) = if self.style.use_gradient_connections {
                (
                    self.node_color(graph, bindings, edge.source),
                    self.node_color(graph, bindings, edge.target),
                )
            } else {
                (Color32::WHITE, Color32::WHITE)
            };
            connection_renderer::draw_bezier(&painter, p1, p2, c1, c2, 2.0 * zoom);

            if secondary_clicked {
                if let Some(pos) = pointer_pos {
                    if connection_renderer::hit_test_bezier(pos, p1, p2, 8.0) {
                        edge_to_remove = Some(edge.id.clone());
                    }
                }
            }
        }

        let pending_start = self.connection_start.as_ref().and_then(|(id, port, role)| {
            anchor_screen_pos(&renderers, zoom, *id, port, *role)
        });

        let mut edits: Vec<(Uuid, String, String)> = Vec::new();
        let mut drag: Option<(Uuid, Vec2)> = None;
        let mut drag_finished = false;
        let mut pressed_node = None;
        let mut port_event: Option<(Uuid, String, PortRole)> = None;
        let mut hovered_anchor = None;
        let hitbox = if self.connection_start.is_some() { 24.0 } else { 16.0 };

        for (node_id, origin, renderer) in renderers.iter_mut() {
            let node_id = *node_id;
            let selected = self.selected_nodes.contains(&node_id);
            let response = renderer.show(ui, *origin, zoom, &self.style, selected, &mut |name, value| {
                edits.push((node_id, name.to_string(), value.to_string()));
            });

            for anchor in &response.anchors {
                let rect = Rect::from_center_size(anchor.pos, Vec2::splat((hitbox * zoom).max(8.0)));
                let port_response = ui.interact(
                    rect,
                    ui.id().with(node_id).with(anchor.id.as_str()).with(anchor.role),
                    Sense::click_and_drag(),
                );
                if port_response.drag_started()
                    || port_response.clicked()
                    || (port_response.contains_pointer() && primary_released)
                {
                    port_event = Some((node_id, anchor.id.clone(), anchor.role));
                }
                if port_response.contains_pointer() {
                    hovered_anchor = Some(anchor.pos);
                }
            }

            if response.drag_delta != Vec2::ZERO {
                drag = Some((node_id, response.drag_delta));
            }
            drag_finished |= response.drag_stopped;
            if response.clicked || response.pressed {
                pressed_node = Some(node_id);
            }
        }
        drop(renderers);

        if let Some(pos) = hovered_anchor {
            painter.circle_stroke(pos, 8.0 * zoom, Stroke::new(2.0, Color32::YELLOW));
        }

        if let Some(id) = pressed_node {
            if shift {
                if !self.selected_nodes.remove(&id) {
                    self.selected_nodes.insert(id);
                }
            } else if !self.selected_nodes.contains(&id) {
                self.selected_nodes.clear();
                self.selected_nodes.insert(id);
            }
            if let Some(node) = graph.nodes.get_mut(&id) {
                if node.z_order + 1 < self.next_z_order {
                    node.z_order = self.next_z_order;
                    self.next_z_order += 1;
                }
            }
        }

        if let Some((id, delta)) = drag {
            if !self.selected_nodes.contains(&id) {
                self.selected_nodes.clear();
                self.selected_nodes.insert(id);
            }
            let delta = delta / zoom;
            for selected in &self.selected_nodes {
                if let Some(node) = graph.nodes.get_mut(selected) {
                    node.position.0 += delta.x;
                    node.position.1 += delta.y;
                }
            }
        }
        if drag_finished {
            change = change.merge(GraphChange::Structure);
        }

        if let Some((id, port, role)) = port_event {
            match self.connection_start.take() {
                Some((start_id, start_port, start_role)) if start_role != role && start_id != id => {
                    let edge = match start_role {
                        PortRole::Output => Edge::new(start_id, &start_port, id, &port),
                        PortRole::Input => Edge::new(id, &port, start_id, &start_port),
                    };
                    let edge_id = edge.id.clone();
                    if graph.connect(edge) {
                        log::info!("connected {}", edge_id);
                        change = change.merge(GraphChange::Structure);
                    }
                }
                _ => self.connection_start = Some((id, port, role)),
            }
        } else if primary_released && self.connection_start.is_some() {
            self.connection_start = None;
        }
        if input_escape || secondary_clicked {
            self.connection_start = None;
        }

        // Connection in progress
        if let (Some(start), Some(pos)) = (pending_start, pointer_pos) {
            if self.connection_start.is_some() {
                connection_renderer::draw_bezier(&painter, start, pos, Color32::WHITE, Color32::WHITE, 2.0 * zoom);
            }
        }

        for (id, name, value) in edits {
            if graph.set_field(&id, &name, &value) {
                log::debug!("node {} field `{}` = {:?}", id, name, value);
                change = change.merge(GraphChange::Field { node: id, field: name });
            }
        }

        if let Some(edge_id) = edge_to_remove {
            if graph.disconnect(&edge_id) {
                log::info!("removed edge {}", edge_id);
                change = change.merge(GraphChange::Structure);
            }
        }

        if input_delete && !editing_text && !self.selected_nodes.is_empty() {
            for id in self.selected_nodes.drain() {
                graph.remove_node(&id);
            }
            change = change.merge(GraphChange::Structure);
        }

        change
    }

    /// Adds a node of kind `key` at `graph_pos` and selects it.
    pub fn place_node(&mut self, graph: &mut PipelineGraph, key: &str, graph_pos: Pos2) -> Uuid {
        let id = graph.add_node(key, (graph_pos.x, graph_pos.y), self.next_z_order);
        self.next_z_order += 1;
        self.selected_nodes.clear();
        self.selected_nodes.insert(id);
        log::info!("placed `{}` node {} at ({:.0}, {:.0})", key, id, graph_pos.x, graph_pos.y);
        id
    }

    /// Graph position currently at the middle of the canvas.
    pub fn canvas_center(&self) -> Pos2 {
        from_screen(self.canvas_rect.center(), self.pan, self.zoom, self.canvas_rect.min)
    }

    pub fn zoom_by(&mut self, factor: f32) {
        let anchor = self.canvas_rect.size() / 2.0;
        let (pan, zoom) = zoom_around(self.pan, self.zoom, factor, anchor);
        self.pan = pan;
        self.zoom = zoom;
    }

    /// Resets zoom and centers the view on the bounding box of all nodes.
    pub fn center_on(&mut self, graph: &PipelineGraph) {
        self.zoom = 1.0;
        if graph.nodes.is_empty() {
            self.pan = Vec2::ZERO;
            return;
        }
        let (mut min, mut max) = (Pos2::new(f32::INFINITY, f32::INFINITY), Pos2::new(f32::NEG_INFINITY, f32::NEG_INFINITY));
        for node in graph.nodes.values() {
            let p = Pos2::new(node.position.0, node.position.1);
            min = min.min(p);
            max = max.max(p);
        }
        let middle = min + (max - min) / 2.0;
        self.pan = self.canvas_rect.size() / 2.0 - middle.to_vec2();
    }

    fn node_color(&self, graph: &PipelineGraph, bindings: &NodeBindings, node_id: Uuid) -> Color32 {
        graph
            .nodes
            .get(&node_id)
            .and_then(|node| bindings.get(&node.node_type).ok())
            .map(|wrapper| self.style.header_color(&wrapper.schema().category))
            .unwrap_or(Color32::WHITE)
    }
}
