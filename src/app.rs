use egui::{
    Align, Align2, Color32, CornerRadius, FontId, Key, Layout, Modifiers, Painter, Pos2, Rect,
    Sense, Stroke, StrokeKind, Ui, Vec2, vec2,
};

use crate::{
    config::CanvasConfig,
    db::Circuit,
    demo::{self, DEMO_GROUP, PrimeDemo},
    scene::{ElementId, PathCmd, Shape, Transform, flatten_path},
};

pub const DEBUG_PANEL_WIDTH: f32 = 320.0;
pub const FOCUS_RING_EXPAND: f32 = 4.0;
pub const FOCUS_RING_THICKNESS: f32 = 2.0;

pub const COLOR_BOX_FILL: Color32 = Color32::from_rgb(28, 31, 38);
pub const COLOR_NODE_FILL: Color32 = Color32::from_rgb(20, 22, 27);
pub const COLOR_CANVAS: Color32 = Color32::from_rgb(20, 22, 27);
pub const COLOR_LABEL: Color32 = Color32::from_rgb(200, 204, 212);

/// Viewer for a circuit diagram, holding the prime detector by default.
pub struct App {
    circuit: Circuit,
    demo: Option<PrimeDemo>,
    /// Index into the circuit's sources
    focus: Option<usize>,
    show_debug: bool,
    show_logs: bool,
    /// Canvas size the group was last centered for
    canvas_size: Vec2,
}

impl Default for App {
    fn default() -> Self {
        match demo::build_prime_circuit(CanvasConfig::default()) {
            Ok((circuit, demo)) => Self::with_circuit(circuit, Some(demo)),
            Err(e) => {
                log::error!("Failed to build demo circuit: {e}");
                Self::with_circuit(Circuit::default(), None)
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                let is_web = cfg!(target_arch = "wasm32");

                ui.menu_button("File", |ui| {
                    if ui.button("Export SVG").clicked()
                        && let Err(e) = self.export_svg()
                    {
                        log::error!("Failed to export diagram: {e}");
                    }
                    if !is_web {
                        ui.separator();
                        if ui.button("Quit").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    }
                });
                ui.add_space(16.0);

                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.show_debug, "Circuit Debug");
                    ui.checkbox(&mut self.show_logs, "Debug logs");
                });
                ui.add_space(16.0);

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    egui::widgets::global_theme_preference_buttons(ui);
                    ui.add_space(16.0);
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_main(ui);
        });
    }
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        Self::default()
    }

    pub fn with_circuit(circuit: Circuit, demo: Option<PrimeDemo>) -> Self {
        Self {
            circuit,
            demo,
            focus: None,
            show_debug: false,
            show_logs: false,
            canvas_size: Vec2::ZERO,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn demo(&self) -> Option<&PrimeDemo> {
        self.demo.as_ref()
    }

    pub fn draw_main(&mut self, ui: &mut Ui) {
        if self.show_logs {
            egui::Window::new("Debug logs").show(ui.ctx(), |ui| {
                egui_logger::logger_ui().show(ui);
            });
        }

        ui.with_layout(Layout::left_to_right(Align::Min), |ui| {
            if self.show_debug {
                let full_h = ui.available_height();
                ui.allocate_ui(vec2(DEBUG_PANEL_WIDTH, full_h), |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| self.draw_debug(ui));
                });
                ui.separator();
            }
            ui.vertical(|ui| {
                ui.label("click a bit or press Tab then Space/Enter to toggle it");
                self.draw_canvas(ui);
            });
        });
    }

    fn draw_debug(&self, ui: &mut Ui) {
        ui.heading("Simulation");
        ui.label(format!("{:?}", self.circuit.status));

        egui::CollapsingHeader::new("Snapshot")
            .default_open(true)
            .show(ui, |ui| {
                let mut json = match serde_json::to_string_pretty(&self.circuit.snapshot()) {
                    Ok(json) => json,
                    Err(e) => format!("snapshot failed: {e}"),
                };
                ui.add(
                    egui::TextEdit::multiline(&mut json)
                        .code_editor()
                        .desired_width(DEBUG_PANEL_WIDTH),
                );
            });

        egui::CollapsingHeader::new("Tree").show(ui, |ui| {
            let mut tree = self.circuit.display();
            ui.add(
                egui::TextEdit::multiline(&mut tree)
                    .code_editor()
                    .desired_width(DEBUG_PANEL_WIDTH),
            );
        });
    }

    fn draw_canvas(&mut self, ui: &mut Ui) {
        let (resp, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let canvas_rect = resp.rect;
        painter.rect_filled(canvas_rect, CornerRadius::ZERO, COLOR_CANVAS);

        if canvas_rect.size() != self.canvas_size {
            self.canvas_size = canvas_rect.size();
            self.center_group(DEMO_GROUP);
        }

        if resp.clicked()
            && let Some(mouse) = resp.interact_pointer_pos()
        {
            self.click(mouse - canvas_rect.min.to_vec2());
        }
        self.handle_keys(ui);

        let screen = Transform::new(canvas_rect.min.x, canvas_rect.min.y, 1.0);
        self.paint_element(&painter, self.circuit.scene.root(), screen, false);
        self.paint_focus(&painter, screen);
    }

    /// Moves `group` so its drawing sits in the middle of the canvas.
    fn center_group(&mut self, group: &str) {
        let size = self.canvas_size;
        let Ok(mut m) = self.circuit.module(group) else {
            return;
        };
        let Ok(element) = m.element() else {
            return;
        };
        let scale = m.scale();
        let bbox = match m.circuit().scene.bbox(element) {
            Ok(bbox) => bbox,
            Err(e) => {
                log::debug!("Cannot center {group}: {e}");
                return;
            }
        };
        let offset = centered_offset(bbox, scale, size);
        if let Err(e) = m.set_transform(offset.x, offset.y, Some(scale)) {
            log::error!("Failed to move {group}: {e}");
        }
    }

    fn click(&mut self, pos: Pos2) {
        let Some(id) = self.circuit.hit_test_source(pos) else {
            return;
        };
        self.focus = self.circuit.sources().iter().position(|s| *s == id);
        if let Err(e) = self.circuit.toggle_source(id) {
            log::error!("Failed to toggle source: {e}");
        }
    }

    fn handle_keys(&mut self, ui: &Ui) {
        let count = self.circuit.sources().len();
        if count == 0 {
            return;
        }
        // Shift+Tab first: a plain Tab match also accepts the shifted key.
        let (prev, next, toggle) = ui.input_mut(|i| {
            (
                i.consume_key(Modifiers::SHIFT, Key::Tab),
                i.consume_key(Modifiers::NONE, Key::Tab),
                i.consume_key(Modifiers::NONE, Key::Space)
                    || i.consume_key(Modifiers::NONE, Key::Enter),
            )
        });

        if next {
            self.focus = Some(self.focus.map_or(0, |f| (f + 1) % count));
        }
        if prev {
            self.focus = Some(self.focus.map_or(count - 1, |f| (f + count - 1) % count));
        }
        if toggle
            && let Some(id) = self.focus.and_then(|f| self.circuit.sources().get(f).copied())
            && let Err(e) = self.circuit.toggle_source(id)
        {
            log::error!("Failed to toggle source: {e}");
        }
    }

    fn paint_focus(&self, painter: &Painter, screen: Transform) {
        let Some(c) = self
            .focus
            .and_then(|f| self.circuit.sources().get(f).copied())
            .and_then(|id| self.circuit.component(id))
        else {
            return;
        };
        let t = screen.then(self.circuit.scene.world_transform(c.visual.root));
        let rect = t.apply_rect(c.bounds.expand(FOCUS_RING_EXPAND));
        painter.rect_stroke(
            rect,
            corner(self.circuit.config.box_corner * t.scale),
            Stroke::new(FOCUS_RING_THICKNESS, self.circuit.config.color_focus),
            StrokeKind::Outside,
        );
    }

    /// Paints `id` and its subtree. `active` is inherited from ancestors.
    fn paint_element(&self, painter: &Painter, id: ElementId, parent: Transform, active: bool) {
        let Some(el) = self.circuit.scene.get(id) else {
            return;
        };
        let config = &self.circuit.config;
        let t = el.transform.map_or(parent, |own| parent.then(own));
        let active = active || el.has_class("active");
        let high = el.has_class("high");

        let color = if high || (active && el.has_class("bit-rect")) {
            config.color_high
        } else {
            config.color_idle
        };
        let thickness = if el.has_class("wire") {
            config.wire_thickness
        } else {
            config.outline_thickness
        };
        let stroke = Stroke::new(thickness * t.scale, color);
        let unfilled = el.attrs.iter().any(|(k, v)| k == "fill" && v == "none");

        match &el.shape {
            Shape::Group => {}
            Shape::Rect { rect, corner: r } => {
                let rect = t.apply_rect(*rect);
                if el.has_class("module-frame") {
                    painter.rect_stroke(
                        rect,
                        corner(r * t.scale),
                        Stroke::new(config.outline_thickness, config.color_frame),
                        StrokeKind::Middle,
                    );
                } else {
                    let fill = if active {
                        config.color_active_fill
                    } else {
                        COLOR_BOX_FILL
                    };
                    painter.rect(rect, corner(r * t.scale), fill, stroke, StrokeKind::Middle);
                }
            }
            Shape::Circle { center, radius } => {
                let fill = if high { config.color_high } else { COLOR_NODE_FILL };
                painter.circle(t.apply(*center), radius * t.scale, fill, stroke);
            }
            Shape::Line { from, to } => {
                painter.line_segment([t.apply(*from), t.apply(*to)], stroke);
            }
            Shape::Polyline { points } => {
                let points = points.iter().map(|p| t.apply(*p)).collect();
                painter.add(egui::Shape::line(points, stroke));
            }
            Shape::Polygon { points } => {
                let points = points.iter().map(|p| t.apply(*p)).collect();
                let fill = if unfilled {
                    Color32::TRANSPARENT
                } else {
                    COLOR_BOX_FILL
                };
                painter.add(egui::Shape::convex_polygon(points, fill, stroke));
            }
            Shape::Path { commands } => {
                let points: Vec<Pos2> = flatten_path(commands)
                    .into_iter()
                    .map(|p| t.apply(p))
                    .collect();
                if matches!(commands.last(), Some(PathCmd::Close)) {
                    painter.add(egui::Shape::closed_line(points, stroke));
                } else {
                    painter.add(egui::Shape::line(points, stroke));
                }
            }
            Shape::Text {
                anchor,
                content,
                font_size,
            } => {
                painter.text(
                    t.apply(*anchor),
                    Align2::CENTER_CENTER,
                    content,
                    FontId::proportional(font_size * t.scale),
                    COLOR_LABEL,
                );
            }
        }

        for &child in &el.children {
            self.paint_element(painter, child, t, active);
        }
    }
}

fn corner(radius: f32) -> CornerRadius {
    CornerRadius::same(radius.round().clamp(0.0, u8::MAX as f32) as u8)
}

/// Translation that centers `bbox`, drawn at `scale`, inside a `size` canvas.
pub fn centered_offset(bbox: Rect, scale: f32, size: Vec2) -> Vec2 {
    vec2(
        (size.x - scale * bbox.width()) / 2.0 - scale * bbox.min.x,
        (size.y - scale * bbox.height()) / 2.0 - scale * bbox.min.y,
    )
}

#[cfg(test)]
mod tests {
    use egui::pos2;

    use super::*;

    #[test]
    fn centered_offset_puts_the_box_in_the_middle() {
        let bbox = Rect::from_min_max(pos2(10.0, 20.0), pos2(110.0, 70.0));
        let offset = centered_offset(bbox, 2.0, vec2(400.0, 300.0));
        let t = Transform::new(offset.x, offset.y, 2.0);
        let placed = t.apply_rect(bbox);
        assert!((placed.center().x - 200.0).abs() < 1e-4);
        assert!((placed.center().y - 150.0).abs() < 1e-4);
    }

    #[test]
    fn centering_keeps_the_group_rigid() {
        let mut app = App::default();
        let before: Vec<Pos2> = app.circuit().pins().map(|(_, p)| p.pos).collect();

        app.canvas_size = vec2(1200.0, 800.0);
        app.center_group(DEMO_GROUP);

        let after: Vec<Pos2> = app.circuit().pins().map(|(_, p)| p.pos).collect();
        assert_eq!(before, after);
        let group = app.circuit().group_id(DEMO_GROUP).unwrap();
        let group = app.circuit().group(group).unwrap();
        assert_eq!(group.scale, demo::DEMO_SCALE);
        let bbox = app.circuit().scene.bbox(group.element).unwrap();
        let placed = group.transform().apply_rect(bbox);
        assert!((placed.center().x - 600.0).abs() < 1e-2);
        assert!((placed.center().y - 400.0).abs() < 1e-2);
    }

    #[test]
    fn clicking_a_source_toggles_and_focuses_it() {
        let mut app = App::default();
        let Some(demo) = app.demo().copied() else {
            panic!("demo did not build");
        };
        let a = demo.inputs[0];
        let c = app.circuit().component(a).unwrap();
        let world = app.circuit().scene.world_transform(c.visual.root);
        let inside = world.apply(c.bounds.center());

        app.click(inside);
        assert!(app.circuit().source_state(a).unwrap());
        assert_eq!(app.focus, Some(0));

        app.click(pos2(-1000.0, -1000.0));
        assert!(app.circuit().source_state(a).unwrap());
    }

    #[test]
    fn svg_document_reflects_state() {
        let mut app = App::default();
        let demo = app.demo().copied().unwrap();
        // n = 5
        app.circuit.toggle_source(demo.inputs[0]).unwrap();
        app.circuit.toggle_source(demo.inputs[2]).unwrap();
        let svg = app.svg_document();
        assert!(svg.contains("1: Prime"));
        assert!(svg.contains("id=\"mod-demo1\""));
    }
    fn press(app: &mut App, key: Key, modifiers: Modifiers) {
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            events: vec![egui::Event::Key {
                key,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers,
            }],
            modifiers,
            ..Default::default()
        };
        let _full_output = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| app.handle_keys(ui));
        });
    }

    #[test]
    fn tab_and_shift_tab_cycle_focus_both_ways() {
        let mut app = App::default();
        let count = app.circuit().sources().len();
        assert_eq!(count, 4);

        press(&mut app, Key::Tab, Modifiers::SHIFT);
        assert_eq!(app.focus, Some(count - 1));
        press(&mut app, Key::Tab, Modifiers::SHIFT);
        assert_eq!(app.focus, Some(count - 2));

        press(&mut app, Key::Tab, Modifiers::NONE);
        press(&mut app, Key::Tab, Modifiers::NONE);
        assert_eq!(app.focus, Some(0));
    }

    #[test]
    fn space_toggles_the_focused_source() {
        let mut app = App::default();
        let demo = app.demo().copied().unwrap();
        press(&mut app, Key::Tab, Modifiers::NONE);
        press(&mut app, Key::Space, Modifiers::NONE);
        assert!(app.circuit().source_state(demo.inputs[0]).unwrap());
        assert!(!app.circuit().source_state(demo.inputs[1]).unwrap());
    }
}
