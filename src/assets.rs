use std::fmt::Display;

use egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::config::CanvasConfig;
use crate::scene::{PathCmd, Shape};

/// Side length of a gate's layout box at scale 1
pub const GATE_SIZE: f32 = 72.0;
/// Width of the NOT triangle at scale 1
pub const NOT_WIDTH: f32 = 44.0;

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    Input,
    Output,
}

impl Display for PinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => f.write_str("In"),
            Self::Output => f.write_str("Out"),
        }
    }
}

/// Role a pin plays on its component.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Out,
    InA,
    InB,
    In,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::InA => "inA",
            Self::InB => "inB",
            Self::In => "in",
        }
    }

    pub fn kind(self) -> PinKind {
        match self {
            Self::Out => PinKind::Output,
            Self::InA | Self::InB | Self::In => PinKind::Input,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinGraphics {
    pub role: Role,
    /// Offset from the gate origin at scale 1
    pub offset: Vec2,
    /// Inverting bubble: pushed one bubble radius past the offset, unscaled
    pub bubble: bool,
}

impl PinGraphics {
    /// Resolved center and radius for a gate placed at `origin` with `scale`.
    pub fn place(&self, origin: Pos2, scale: f32, config: &CanvasConfig) -> (Pos2, f32) {
        let mut pos = origin + self.offset * scale;
        if self.bubble {
            pos.x += config.bubble_radius;
            (pos, config.bubble_radius)
        } else {
            (pos, config.node_radius)
        }
    }
}

pub struct GateGraphics {
    pub pins: &'static [PinGraphics],
    pub outline: fn(Pos2, f32) -> Shape,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    And,
    Or,
    Not,
}

impl Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Not => f.write_str("NOT"),
        }
    }
}

impl GateKind {
    pub fn graphics(&self) -> &'static GateGraphics {
        match self {
            Self::And => &AND_GRAPHICS,
            Self::Or => &OR_GRAPHICS,
            Self::Not => &NOT_GRAPHICS,
        }
    }
}

pub static AND_GRAPHICS: GateGraphics = GateGraphics {
    pins: &[
        PinGraphics {
            role: Role::InA,
            offset: Vec2::new(0.0, 8.0),
            bubble: false,
        },
        PinGraphics {
            role: Role::InB,
            offset: Vec2::new(0.0, 64.0),
            bubble: false,
        },
        PinGraphics {
            role: Role::Out,
            offset: Vec2::new(GATE_SIZE, GATE_SIZE / 2.0),
            bubble: false,
        },
    ],
    outline: and_outline,
};

pub static OR_GRAPHICS: GateGraphics = GateGraphics {
    pins: &[
        PinGraphics {
            role: Role::InA,
            offset: Vec2::new(4.0, 8.0),
            bubble: false,
        },
        PinGraphics {
            role: Role::InB,
            offset: Vec2::new(4.0, 64.0),
            bubble: false,
        },
        PinGraphics {
            role: Role::Out,
            offset: Vec2::new(GATE_SIZE, GATE_SIZE / 2.0),
            bubble: false,
        },
    ],
    outline: or_outline,
};

pub static NOT_GRAPHICS: GateGraphics = GateGraphics {
    pins: &[
        PinGraphics {
            role: Role::In,
            offset: Vec2::new(0.0, GATE_SIZE / 2.0),
            bubble: false,
        },
        PinGraphics {
            role: Role::Out,
            offset: Vec2::new(NOT_WIDTH, GATE_SIZE / 2.0),
            bubble: true,
        },
    ],
    outline: not_outline,
};

/// Flat back, half-disc front.
fn and_outline(o: Pos2, s: f32) -> Shape {
    let h = GATE_SIZE * s;
    let r = GATE_SIZE / 2.0 * s;
    Shape::Path {
        commands: vec![
            PathCmd::MoveTo(o),
            PathCmd::LineTo(pos2(o.x + r, o.y)),
            PathCmd::ArcTo {
                radius: r,
                large_arc: false,
                sweep: true,
                to: pos2(o.x + r, o.y + h),
            },
            PathCmd::LineTo(pos2(o.x, o.y + h)),
            PathCmd::Close,
        ],
    }
}

fn or_outline(o: Pos2, s: f32) -> Shape {
    let w = GATE_SIZE * s;
    let h = GATE_SIZE * s;
    let (x, y) = (o.x, o.y);
    Shape::Path {
        commands: vec![
            PathCmd::MoveTo(o),
            PathCmd::CubicTo {
                c1: pos2(x + 24.0 * s, y),
                c2: pos2(x + 60.0 * s, y + 12.0 * s),
                to: pos2(x + w, y + h / 2.0),
            },
            PathCmd::CubicTo {
                c1: pos2(x + 60.0 * s, y + h - 12.0 * s),
                c2: pos2(x + 24.0 * s, y + h),
                to: pos2(x, y + h),
            },
            PathCmd::CubicTo {
                c1: pos2(x + 12.0 * s, y + h - 16.0 * s),
                c2: pos2(x + 12.0 * s, y + 16.0 * s),
                to: o,
            },
        ],
    }
}

fn not_outline(o: Pos2, s: f32) -> Shape {
    let h = GATE_SIZE * s;
    Shape::Polygon {
        points: vec![
            pos2(o.x, o.y + 12.0 * s),
            pos2(o.x, o.y + h - 12.0 * s),
            pos2(o.x + NOT_WIDTH * s, o.y + h / 2.0),
        ],
    }
}

/// Rounded box used by sources and displays.
pub fn box_outline(origin: Pos2, size: Vec2, config: &CanvasConfig) -> Shape {
    Shape::Rect {
        rect: Rect::from_min_size(origin, size),
        corner: config.box_corner,
    }
}

/// Output pin of a source sits just right of its box, vertically centered.
pub fn source_out_pin(origin: Pos2, config: &CanvasConfig) -> Pos2 {
    origin + vec2(config.source_size.x + config.node_radius, config.source_size.y / 2.0)
}

/// Input pin of a display sits on its left edge, vertically centered.
pub fn display_in_pin(origin: Pos2, size: Vec2) -> Pos2 {
    origin + vec2(0.0, size.y / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_pins_scale_with_the_gate() {
        let config = CanvasConfig::default();
        let origin = pos2(300.0, 160.0);
        let pins: Vec<_> = GateKind::And
            .graphics()
            .pins
            .iter()
            .map(|p| (p.role, p.place(origin, 0.75, &config).0))
            .collect();
        assert_eq!(pins[0], (Role::InA, pos2(300.0, 166.0)));
        assert_eq!(pins[1], (Role::InB, pos2(300.0, 208.0)));
        assert_eq!(pins[2], (Role::Out, pos2(354.0, 187.0)));
    }

    #[test]
    fn not_output_is_a_bubble() {
        let config = CanvasConfig::default();
        let out = NOT_GRAPHICS.pins[1];
        let (pos, radius) = out.place(pos2(0.0, 0.0), 1.0, &config);
        assert_eq!(pos, pos2(49.0, 36.0));
        assert_eq!(radius, config.bubble_radius);
    }

    #[test]
    fn outlines_fill_the_gate_box() {
        for kind in [GateKind::And, GateKind::Or] {
            let b = (kind.graphics().outline)(pos2(10.0, 10.0), 1.0)
                .bounds()
                .expect("outline has bounds");
            assert!((b.max.x - 82.0).abs() < 0.5, "{kind}: {b:?}");
            assert!((b.max.y - 82.0).abs() < 0.5, "{kind}: {b:?}");
        }
    }
}
