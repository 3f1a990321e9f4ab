//! Generic node rendering.
//!
//! A node is drawn from a [`NodeView`] (schema plus the input ports to show)
//! and the instance's current field values. Rendering happens in two steps:
//!
//! - [`FieldState::seed`] and [`NodeLayout::compute`] are pure. They turn the
//!   view and data into field values, node size and port offsets in node-local
//!   units, and give identical results for identical input.
//! - [`NodeRenderer::show`] paints that layout on the canvas, hosts the field
//!   editors and reports every edit through the `on_field_change` callback.
//!
//! The renderer never writes to the graph store. Its field cache is reseeded
//! from the instance's data on every frame.

use crate::editor::style::EditorStyle;
use crate::graph::NodeData;
use crate::node_types::{Field, FieldKind, NodeSchema, Port, PortRole};
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};
use std::borrow::Cow;
use uuid::Uuid;

pub const HEADER_HEIGHT: f32 = 40.0;
pub const BODY_PADDING: f32 = 8.0;
pub const LABEL_HEIGHT: f32 = 16.0;
pub const SINGLE_LINE_HEIGHT: f32 = 22.0;
pub const TEXT_ROW_HEIGHT: f32 = 16.0;
pub const FIELD_SPACING: f32 = 6.0;
pub const PORT_RADIUS: f32 = 5.0;
/// Below this zoom level field values are painted as plain text.
pub const MIN_EDIT_ZOOM: f32 = 0.5;

/// What a node shows: its schema and the input ports to place on the left
/// edge. Outputs always come from the schema.
#[derive(Clone, Debug)]
pub struct NodeView<'a> {
    pub schema: &'a NodeSchema,
    pub inputs: Cow<'a, [Port]>,
}

impl<'a> NodeView<'a> {
    pub fn from_schema(schema: &'a NodeSchema) -> Self {
        Self {
            schema,
            inputs: Cow::Borrowed(&schema.inputs),
        }
    }

    pub fn with_inputs(schema: &'a NodeSchema, inputs: Vec<Port>) -> Self {
        Self {
            schema,
            inputs: Cow::Owned(inputs),
        }
    }

    pub fn outputs(&self) -> &[Port] {
        &self.schema.outputs
    }
}

/// Local edit cache for one node, in schema field order.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    values: Vec<(String, String)>,
}

impl FieldState {
    /// Instance value if present, else the field default, else empty.
    pub fn seed(schema: &NodeSchema, data: &NodeData) -> Self {
        let values = schema
            .fields
            .iter()
            .map(|field| {
                let value = data
                    .get(&field.name)
                    .cloned()
                    .or_else(|| field.default_value.clone())
                    .unwrap_or_default();
                (field.name.clone(), value)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Stores `value` for one field and reports it upward exactly once.
    /// Unknown field names are ignored.
    pub fn edit(
        &mut self,
        name: &str,
        value: String,
        on_field_change: &mut dyn FnMut(&str, &str),
    ) -> bool {
        let Some(slot) = self.values.iter_mut().find(|(n, _)| n == name) else {
            return false;
        };
        slot.1 = value;
        on_field_change(name, &slot.1);
        true
    }
}

/// Editor chosen for a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldWidget {
    SingleLine,
    MultiLine { rows: usize },
    Choice { options: Vec<String> },
}

impl FieldWidget {
    pub fn for_field(field: &Field, value: &str) -> Self {
        match field.kind {
            FieldKind::Enumerated => FieldWidget::Choice {
                options: field.options.clone(),
            },
            FieldKind::MultiLine => FieldWidget::MultiLine {
                rows: field.visible_rows(value),
            },
            FieldKind::SingleLine => FieldWidget::SingleLine,
        }
    }

    fn editor_height(&self) -> f32 {
        match self {
            FieldWidget::MultiLine { rows } => *rows as f32 * TEXT_ROW_HEIGHT + BODY_PADDING,
            FieldWidget::SingleLine | FieldWidget::Choice { .. } => SINGLE_LINE_HEIGHT,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayout {
    pub name: String,
    pub label: String,
    pub widget: FieldWidget,
    /// Offset of the label from the node's top edge.
    pub top: f32,
    pub editor_height: f32,
}

/// Node geometry in unscaled node-local units.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeLayout {
    pub size: Vec2,
    pub fields: Vec<FieldLayout>,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

impl NodeLayout {
    pub fn compute(view: &NodeView<'_>, state: &FieldState) -> Self {
        let mut fields = Vec::with_capacity(view.schema.fields.len());
        let mut y = HEADER_HEIGHT + BODY_PADDING;

        for field in &view.schema.fields {
            let value = state.get(&field.name).unwrap_or_default();
            let widget = FieldWidget::for_field(field, value);
            let editor_height = widget.editor_height();
            fields.push(FieldLayout {
                name: field.name.clone(),
                label: field.label.clone(),
                widget,
                top: y,
                editor_height,
            });
            y += LABEL_HEIGHT + editor_height + FIELD_SPACING;
        }

        let content_height = if fields.is_empty() {
            HEADER_HEIGHT
        } else {
            y - FIELD_SPACING + BODY_PADDING
        };
        let height = view.schema.min_height.max(content_height);

        Self {
            size: Vec2::new(view.schema.width, height),
            fields,
            inputs: with_role(&view.inputs, PortRole::Input),
            outputs: with_role(view.outputs(), PortRole::Output),
        }
    }

    /// Offset of a port anchor from the node's top-left corner. Inputs sit on
    /// the left edge, outputs on the right, `position`% of the way down.
    pub fn anchor_offset(&self, port: &Port) -> Vec2 {
        let x = match port.role {
            PortRole::Input => 0.0,
            PortRole::Output => self.size.x,
        };
        Vec2::new(x, self.size.y * port.position / 100.0)
    }

    pub fn find_port(&self, id: &str, role: PortRole) -> Option<&Port> {
        let ports = match role {
            PortRole::Input => &self.inputs,
            PortRole::Output => &self.outputs,
        };
        ports.iter().find(|p| p.id == id)
    }
}

/// Copies `ports`, taking the edge from the list rather than from each entry.
fn with_role(ports: &[Port], role: PortRole) -> Vec<Port> {
    ports
        .iter()
        .map(|port| Port {
            role,
            ..port.clone()
        })
        .collect()
}

/// Screen-space anchor produced while painting a node.
#[derive(Clone, Debug, PartialEq)]
pub struct PortAnchor {
    pub id: String,
    pub role: PortRole,
    pub pos: Pos2,
}

#[derive(Default)]
pub struct NodeResponse {
    /// Header drag this frame, in screen units.
    pub drag_delta: Vec2,
    pub drag_stopped: bool,
    pub clicked: bool,
    pub pressed: bool,
    pub anchors: Vec<PortAnchor>,
}

/// One render session of one node instance.
pub struct NodeRenderer<'a> {
    instance_id: Uuid,
    view: NodeView<'a>,
    fields: FieldState,
    layout: NodeLayout,
}

impl<'a> NodeRenderer<'a> {
    pub fn new(instance_id: Uuid, view: NodeView<'a>, fields: FieldState) -> Self {
        let layout = NodeLayout::compute(&view, &fields);
        Self {
            instance_id,
            view,
            fields,
            layout,
        }
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn fields(&self) -> &FieldState {
        &self.fields
    }

    /// Paints the node with its top-left corner at `origin` and hosts the
    /// field editors. Edits are reported through `on_field_change` as they
    /// happen.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        origin: Pos2,
        zoom: f32,
        style: &EditorStyle,
        selected: bool,
        on_field_change: &mut dyn FnMut(&str, &str),
    ) -> NodeResponse {
        let schema = self.view.schema;
        let node_rect = Rect::from_min_size(origin, self.layout.size * zoom);
        let header_rect = Rect::from_min_size(
            node_rect.min,
            Vec2::new(node_rect.width(), HEADER_HEIGHT * zoom),
        );

        let body_response = ui.interact(
            node_rect,
            ui.id().with(self.instance_id).with("body"),
            Sense::click(),
        );
        let header_response = ui.interact(
            header_rect,
            ui.id().with(self.instance_id).with("header"),
            Sense::click_and_drag(),
        );

        let mut response = NodeResponse {
            clicked: body_response.clicked() || header_response.clicked(),
            pressed: header_response.drag_started() || body_response.is_pointer_button_down_on(),
            drag_stopped: header_response.drag_stopped(),
            ..Default::default()
        };
        if header_response.dragged() {
            response.drag_delta = header_response.drag_delta();
        }

        let painter = ui.painter().clone();
        let header_color = style.header_color(&schema.category);

        if selected {
            painter.rect_stroke(
                node_rect.expand(2.0),
                7.0,
                Stroke::new(2.0, Color32::YELLOW),
                egui::StrokeKind::Middle,
            );
        }
        painter.rect_filled(node_rect, 5.0 * zoom, style.body_color);
        painter.rect_stroke(
            node_rect,
            5.0 * zoom,
            Stroke::new(1.0, Color32::BLACK),
            egui::StrokeKind::Middle,
        );
        painter.rect_filled(header_rect, 5.0 * zoom, header_color);

        let title_pos = header_rect.left_top() + Vec2::new(BODY_PADDING, 6.0) * zoom;
        painter.text(
            title_pos,
            egui::Align2::LEFT_TOP,
            &schema.title,
            egui::FontId::proportional(style.font_size * zoom),
            Color32::WHITE,
        );
        if !schema.subtitle.is_empty() {
            painter.text(
                title_pos + Vec2::new(0.0, (style.font_size + 3.0) * zoom),
                egui::Align2::LEFT_TOP,
                &schema.subtitle,
                egui::FontId::proportional((style.font_size - 3.0) * zoom),
                Color32::from_gray(220),
            );
        }

        for index in 0..self.layout.fields.len() {
            self.show_field(ui, &painter, node_rect, index, zoom, style, on_field_change);
        }

        for port in self.layout.inputs.iter().chain(&self.layout.outputs) {
            let pos = node_rect.min + self.layout.anchor_offset(port) * zoom;
            painter.circle_filled(pos, PORT_RADIUS * zoom, style.port_color);
            painter.circle_stroke(pos, PORT_RADIUS * zoom, Stroke::new(1.0, Color32::BLACK));
            response.anchors.push(PortAnchor {
                id: port.id.clone(),
                role: port.role,
                pos,
            });
        }

        response
    }

    #[allow(clippy::too_many_arguments)]
    fn show_field(
        &mut self,
        ui: &mut egui::Ui,
        painter: &egui::Painter,
        node_rect: Rect,
        index: usize,
        zoom: f32,
        style: &EditorStyle,
        on_field_change: &mut dyn FnMut(&str, &str),
    ) {
        let field = &self.layout.fields[index];
        let inner_width = (node_rect.width() - 2.0 * BODY_PADDING * zoom).max(1.0);
        let label_pos = node_rect.min + Vec2::new(BODY_PADDING, field.top) * zoom;
        painter.text(
            label_pos,
            egui::Align2::LEFT_TOP,
            &field.label,
            egui::FontId::proportional((style.font_size - 2.0) * zoom),
            Color32::from_gray(200),
        );

        let editor_rect = Rect::from_min_size(
            label_pos + Vec2::new(0.0, LABEL_HEIGHT * zoom),
            Vec2::new(inner_width, field.editor_height * zoom),
        );
        let current = self.fields.get(&field.name).unwrap_or_default().to_string();

        if zoom < MIN_EDIT_ZOOM {
            painter.text(
                editor_rect.left_top(),
                egui::Align2::LEFT_TOP,
                &current,
                egui::FontId::proportional((style.font_size - 2.0) * zoom),
                Color32::WHITE,
            );
            return;
        }

        let id = ui.id().with(self.instance_id).with(&field.name);
        let mut buffer = current.clone();
        let changed = ui
            .scope_builder(egui::UiBuilder::new().max_rect(editor_rect), |ui| {
                match &field.widget {
                    FieldWidget::SingleLine => ui
                        .add(
                            egui::TextEdit::singleline(&mut buffer)
                                .id(id)
                                .desired_width(inner_width),
                        )
                        .changed(),
                    FieldWidget::MultiLine { rows } => ui
                        .add(
                            egui::TextEdit::multiline(&mut buffer)
                                .id(id)
                                .desired_rows(*rows)
                                .desired_width(inner_width),
                        )
                        .changed(),
                    FieldWidget::Choice { options } => {
                        egui::ComboBox::from_id_salt(id)
                            .selected_text(buffer.clone())
                            .width(inner_width)
                            .show_ui(ui, |ui| {
                                for option in options {
                                    ui.selectable_value(&mut buffer, option.clone(), option.as_str());
                                }
                            });
                        buffer != current
                    }
                }
            })
            .inner;

        if changed {
            let name = field.name.clone();
            log::debug!("field `{}` of node {} edited", name, self.instance_id);
            self.fields.edit(&name, buffer, on_field_change);
        }
    }
}
