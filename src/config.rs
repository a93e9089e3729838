use egui::{Color32, Vec2, vec2};

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct CanvasConfig {
    /// Radius of an ordinary pin / junction node
    pub node_radius: f32,
    /// Radius of the inverting bubble on a NOT output
    pub bubble_radius: f32,
    /// Gap kept between the last routing point and a destination pin
    pub approach_margin: f32,
    /// Space between a module's content and its frame
    pub frame_padding: f32,
    pub frame_corner: f32,
    /// Upper bound of wire/gate rounds per propagation pass
    pub settle_rounds: usize,
    pub source_size: Vec2,
    pub display_size: Vec2,
    pub box_corner: f32,
    pub display_on_text: String,
    pub display_off_text: String,
    pub label_font_size: f32,
    pub wire_thickness: f32,
    pub outline_thickness: f32,
    pub color_idle: Color32,
    pub color_high: Color32,
    pub color_active_fill: Color32,
    pub color_frame: Color32,
    pub color_focus: Color32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            node_radius: 4.0,
            bubble_radius: 5.0,
            approach_margin: 6.0,
            frame_padding: 8.0,
            frame_corner: 10.0,
            settle_rounds: 16,
            source_size: vec2(64.0, 48.0),
            display_size: vec2(132.0, 36.0),
            box_corner: 8.0,
            display_on_text: "1: Prime".to_owned(),
            display_off_text: "0: Composite".to_owned(),
            label_font_size: 14.0,
            wire_thickness: 2.0,
            outline_thickness: 1.5,
            color_idle: Color32::from_rgb(120, 130, 150),
            color_high: Color32::from_rgb(46, 204, 113),
            color_active_fill: Color32::from_rgb(30, 90, 60),
            color_frame: Color32::from_rgb(80, 80, 80),
            color_focus: Color32::LIGHT_BLUE,
        }
    }
}
