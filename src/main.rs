mod editor;
mod graph;
mod history;
mod node_configs;
mod node_types;
mod settings;
mod submit;
mod variable_ports;

use chrono::Local;
use editor::wrappers::NodeBindings;
use editor::{GraphChange, GraphEditor, PaletteItem};
use eframe::egui;
use graph::PipelineGraph;
use history::UndoStack;
use node_configs::{ConfigError, NodeTypeRegistry};
use settings::{AppSettings, SETTINGS_FILE};
use submit::{PipelinePayload, Submission};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = match PipelineApp::new() {
        Ok(app) => app,
        Err(err) => {
            if let Some(config_err) = err.downcast_ref::<ConfigError>() {
                log::error!("invalid node configuration: {}", config_err);
            } else {
                log::error!("startup failed: {:#}", err);
            }
            return Err(err);
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Pipeline Builder",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}

struct PipelineApp {
    registry: NodeTypeRegistry,
    bindings: NodeBindings,
    graph: PipelineGraph,
    editor: GraphEditor,
    undo_stack: UndoStack,
    settings: AppSettings,
    logs: Vec<String>,
    show_log_window: bool,
    submission: Option<Submission>,
    /// Text of the last finished submission, shown until dismissed.
    result_message: Option<String>,
}

impl PipelineApp {
    fn new() -> anyhow::Result<Self> {
        let registry = NodeTypeRegistry::builtin()?;
        let bindings = NodeBindings::bind_all(&registry)?;
        let settings = AppSettings::load(SETTINGS_FILE);
        log::info!("loaded {} node types, posting to {}", registry.len(), settings.analysis_url);

        let graph = PipelineGraph::default();
        let mut undo_stack = UndoStack::with_capacity(settings.history_max_records);
        undo_stack.push(&graph); // Initial state
        let editor = GraphEditor::with_style(settings.style.clone());

        let mut app = Self {
            registry,
            bindings,
            graph,
            editor,
            undo_stack,
            settings,
            logs: Vec::new(),
            show_log_window: true,
            submission: None,
            result_message: None,
        };
        app.log("[System] Ready");
        Ok(app)
    }

    fn log(&mut self, msg: impl AsRef<str>) {
        let time_str = Local::now().format("%H:%M:%S").to_string();
        self.logs.push(format!("[{}] {}", time_str, msg.as_ref()));
    }

    fn save_settings(&mut self) {
        self.settings.style = self.editor.style.clone();
        self.settings.history_max_records = self.undo_stack.max_records;
        if let Err(e) = self.settings.save(SETTINGS_FILE) {
            log::error!("failed to save settings: {:#}", e);
            self.log(format!("[Error] Saving settings failed: {:#}", e));
        }
    }

    fn add_from_palette(&mut self, key: &str) {
        let center = self.editor.canvas_center();
        self.editor.place_node(&mut self.graph, key, center);
        self.undo_stack.push(&self.graph);
    }

    fn submit(&mut self) {
        if self.submission.is_some() {
            return;
        }
        let payload = PipelinePayload::from_graph(&self.graph);
        self.log(format!(
            "[Submit] Sending {} nodes and {} edges",
            payload.nodes.len(),
            payload.edges.len()
        ));
        self.submission = Some(Submission::start(self.settings.analysis_url.clone(), payload));
    }

    fn poll_submission(&mut self, ctx: &egui::Context) {
        let Some(submission) = &self.submission else {
            return;
        };
        match submission.poll() {
            Some(outcome) => {
                let message = submit::outcome_message(&outcome);
                self.log(format!("[Submit] {}", message.replace('\n', ", ")));
                self.result_message = Some(message);
                self.submission = None;
            }
            None => ctx.request_repaint_after(std::time::Duration::from_millis(100)),
        }
    }

    fn palette(&mut self, ui: &mut egui::Ui) {
        let mut clicked = None;
        for key in self.registry.keys() {
            let Some(schema) = self.registry.get(key) else {
                continue;
            };
            let response = ui
                .add(egui::Button::new(&schema.title).sense(egui::Sense::click_and_drag()))
                .on_hover_text(&schema.subtitle);
            response.dnd_set_drag_payload(PaletteItem(key.to_string()));
            if response.clicked() {
                clicked = Some(key.to_string());
            }
        }
        if let Some(key) = clicked {
            self.add_from_palette(&key);
        }
    }
}

impl eframe::App for PipelineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_submission(ctx);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label("Nodes:");
                self.palette(ui);
            });
            ui.horizontal(|ui| {
                if ui.button("Zoom In").clicked() {
                    self.editor.zoom_by(1.1);
                }
                if ui.button("Zoom Out").clicked() {
                    self.editor.zoom_by(1.0 / 1.1);
                }
                if ui.button("Center").clicked() {
                    self.editor.center_on(&self.graph);
                }
                ui.separator();
                if ui.button("Undo").clicked() {
                    if let Some(prev) = self.undo_stack.undo() {
                        self.graph = prev;
                    }
                }
                if ui.button("Redo").clicked() {
                    if let Some(next) = self.undo_stack.redo() {
                        self.graph = next;
                    }
                }
                if ui.button("Clear").clicked() && !self.graph.nodes.is_empty() {
                    self.graph = PipelineGraph::default();
                    self.editor.selected_nodes.clear();
                    self.undo_stack.push(&self.graph);
                    self.log("[System] Canvas cleared");
                }
                ui.separator();
                ui.checkbox(&mut self.editor.style.use_gradient_connections, "Gradient edges");
                if ui.button("Save Settings").clicked() {
                    self.save_settings();
                    self.log("[System] Settings saved");
                }
                ui.checkbox(&mut self.show_log_window, "Log");
                ui.separator();
                let busy = self.submission.is_some();
                if ui.add_enabled(!busy, egui::Button::new("Submit")).clicked() {
                    self.submit();
                }
                if busy {
                    ui.spinner();
                }
            });
        });

        egui::Window::new("Output Log")
            .open(&mut self.show_log_window)
            .resizable(true)
            .collapsible(true)
            .default_width(500.0)
            .default_height(180.0)
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        self.logs.clear();
                    }
                    ui.separator();
                    ui.label(format!("Count: {}", self.logs.len()));
                });
                ui.separator();
                egui::ScrollArea::both()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for line in &self.logs {
                            ui.monospace(line);
                        }
                    });
            });

        if let Some(message) = &self.result_message {
            let mut dismissed = false;
            egui::Window::new("Pipeline Analysis")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    for line in message.lines() {
                        ui.label(line);
                    }
                    ui.separator();
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            if dismissed {
                self.result_message = None;
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            // Shortcuts are left to text editors while one has focus
            let editing_text = ctx.memory(|m| m.focused().is_some());
            if !editing_text {
                let (undo, redo) = ui.input(|i| {
                    let z = i.modifiers.command && i.key_pressed(egui::Key::Z);
                    let y = i.modifiers.command && i.key_pressed(egui::Key::Y);
                    (z && !i.modifiers.shift, y || (z && i.modifiers.shift))
                });
                if undo {
                    if let Some(prev) = self.undo_stack.undo() {
                        self.graph = prev;
                    }
                }
                if redo {
                    if let Some(next) = self.undo_stack.redo() {
                        self.graph = next;
                    }
                }
            }

            match self.editor.show(ui, &mut self.graph, &self.bindings) {
                GraphChange::None => {}
                GraphChange::Field { node, field } => {
                    self.undo_stack.push_merged(&self.graph, &format!("{}:{}", node, field));
                }
                GraphChange::Structure => self.undo_stack.push(&self.graph),
            }
        });
    }
}

impl Drop for PipelineApp {
    fn drop(&mut self) {
        self.save_settings();
    }
}
