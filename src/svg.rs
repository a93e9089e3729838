//! Standalone SVG serialization of a [`Scene`].

use std::fmt::Write as _;

use egui::{Pos2, Rect};

use crate::scene::{ElementId, PathCmd, Scene, Shape, Transform};

const VIEW_MARGIN: f32 = 10.0;

const CANVAS_STYLES: &str = r#"
.logic-canvas { background: #14161b; }
.logic-canvas text {
  font-family: "Inter", "Segoe UI", "Arial", sans-serif;
  font-size: 14px;
  text-anchor: middle;
  dominant-baseline: middle;
  fill: #c8ccd4;
  pointer-events: none;
}
.wire { fill: none; stroke: #788296; stroke-width: 2; }
.wire.high { stroke: #2ecc71; }
.node { fill: #14161b; stroke: #788296; stroke-width: 1.5; }
.node.high { fill: #2ecc71; stroke: #2ecc71; }
.gate-shape { fill: #1c1f26; stroke: #788296; stroke-width: 1.5; }
.gate-shape.high { stroke: #2ecc71; }
.bit-rect { fill: #1c1f26; stroke: #788296; stroke-width: 1.5; cursor: pointer; }
.bit.active .bit-rect, .display.active .bit-rect { fill: #1e5a3c; stroke: #2ecc71; }
.bit-label { font-weight: 600; }
.module-frame { fill: none; stroke: #505050; stroke-dasharray: 4 3; }
"#;

pub fn escape_xml_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

pub fn escape_xml_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Shortest decimal form: integers without a fraction, others trimmed to
/// three decimals.
pub fn format_number(n: f32) -> String {
    if !n.is_finite() {
        return "0".to_owned();
    }
    let rounded = (n * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() {
        return format!("{}", rounded as i64);
    }
    let s = format!("{rounded:.3}");
    s.trim_end_matches('0').to_owned()
}

fn format_points(points: &[Pos2]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", format_number(p.x), format_number(p.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_transform(t: Transform) -> String {
    format!(
        "translate({},{}) scale({})",
        format_number(t.translate.x),
        format_number(t.translate.y),
        format_number(t.scale)
    )
}

pub fn path_data(commands: &[PathCmd]) -> String {
    let n = format_number;
    commands
        .iter()
        .map(|cmd| match *cmd {
            PathCmd::MoveTo(p) => format!("M {} {}", n(p.x), n(p.y)),
            PathCmd::LineTo(p) => format!("L {} {}", n(p.x), n(p.y)),
            PathCmd::ArcTo {
                radius,
                large_arc,
                sweep,
                to,
            } => format!(
                "A {r} {r} 0 {} {} {} {}",
                u8::from(large_arc),
                u8::from(sweep),
                n(to.x),
                n(to.y),
                r = n(radius)
            ),
            PathCmd::CubicTo { c1, c2, to } => format!(
                "C {} {}, {} {}, {} {}",
                n(c1.x),
                n(c1.y),
                n(c2.x),
                n(c2.y),
                n(to.x),
                n(to.y)
            ),
            PathCmd::Close => "Z".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn view_box(scene: &Scene) -> (Rect, f32, f32) {
    match scene.bbox(scene.root()) {
        Ok(b) => {
            let left = b.min.x.floor() - VIEW_MARGIN;
            let top = b.min.y.floor() - VIEW_MARGIN;
            let width = (b.max.x - left).ceil() + VIEW_MARGIN;
            let height = (b.max.y - top).ceil() + VIEW_MARGIN;
            (
                Rect::from_min_size(egui::pos2(left, top), egui::vec2(width, height)),
                width,
                height,
            )
        }
        Err(_) => (
            Rect::from_min_size(Pos2::ZERO, egui::vec2(100.0, 100.0)),
            100.0,
            100.0,
        ),
    }
}

/// Serializes the whole scene, viewBox fitted to the root's bounds.
pub fn render_svg(scene: &Scene) -> String {
    let (vb, width, height) = view_box(scene);
    let mut svg = String::new();
    write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"{} {} {} {}\" class=\"logic-canvas\">",
        format_number(width),
        format_number(height),
        format_number(vb.min.x),
        format_number(vb.min.y),
        format_number(vb.width()),
        format_number(vb.height()),
    )
    .ok();
    svg.push_str("<style>");
    svg.push_str(CANVAS_STYLES);
    svg.push_str("</style>");
    write_element(scene, scene.root(), &mut svg);
    svg.push_str("</svg>");
    svg
}

fn write_element(scene: &Scene, el: ElementId, out: &mut String) {
    let Some(e) = scene.get(el) else {
        return;
    };
    let tag = e.shape.tag();
    let n = format_number;
    write!(out, "<{tag}").ok();
    if let Some(id) = &e.id {
        write!(out, " id=\"{}\"", escape_xml_attr(id)).ok();
    }
    if !e.classes.is_empty() {
        let classes = e.classes.iter().cloned().collect::<Vec<_>>().join(" ");
        write!(out, " class=\"{}\"", escape_xml_attr(&classes)).ok();
    }
    if let Some(t) = e.transform {
        write!(out, " transform=\"{}\"", format_transform(t)).ok();
    }
    match &e.shape {
        Shape::Group | Shape::Text { .. } => {}
        Shape::Rect { rect, corner } => {
            write!(
                out,
                " x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\"",
                n(rect.min.x),
                n(rect.min.y),
                n(rect.width()),
                n(rect.height()),
                n(*corner)
            )
            .ok();
        }
        Shape::Circle { center, radius } => {
            write!(
                out,
                " cx=\"{}\" cy=\"{}\" r=\"{}\"",
                n(center.x),
                n(center.y),
                n(*radius)
            )
            .ok();
        }
        Shape::Line { from, to } => {
            write!(
                out,
                " x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\"",
                n(from.x),
                n(from.y),
                n(to.x),
                n(to.y)
            )
            .ok();
        }
        Shape::Polyline { points } | Shape::Polygon { points } => {
            write!(out, " points=\"{}\"", format_points(points)).ok();
        }
        Shape::Path { commands } => {
            write!(out, " d=\"{}\"", path_data(commands)).ok();
        }
    }
    if let Shape::Text {
        anchor, font_size, ..
    } = &e.shape
    {
        write!(
            out,
            " x=\"{}\" y=\"{}\" font-size=\"{}\"",
            n(anchor.x),
            n(anchor.y),
            n(*font_size)
        )
        .ok();
    }
    for (name, value) in &e.attrs {
        write!(out, " {name}=\"{}\"", escape_xml_attr(value)).ok();
    }

    if let Shape::Text { content, .. } = &e.shape {
        write!(out, ">{}</{tag}>", escape_xml_text(content)).ok();
    } else if e.children.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        for &child in &e.children {
            write_element(scene, child, out);
        }
        write!(out, "</{tag}>").ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    #[test]
    fn numbers_are_shortest() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(0.75), "0.75");
        assert_eq!(format_number(1.0 / 3.0), "0.333");
        assert_eq!(format_number(f32::NAN), "0");
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_xml_text("a<b & c>"), "a&lt;b &amp; c&gt;");
        assert_eq!(escape_xml_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn path_data_matches_svg_syntax() {
        let d = path_data(&[
            PathCmd::MoveTo(pos2(0.0, 0.0)),
            PathCmd::LineTo(pos2(27.0, 0.0)),
            PathCmd::ArcTo {
                radius: 27.0,
                large_arc: false,
                sweep: true,
                to: pos2(27.0, 54.0),
            },
            PathCmd::Close,
        ]);
        assert_eq!(d, "M 0 0 L 27 0 A 27 27 0 0 1 27 54 Z");
    }

    #[test]
    fn renders_nested_elements() {
        let mut scene = Scene::new();
        let g = scene.create_in(scene.root(), Shape::Group);
        scene.set_transform(g, Transform::new(10.0, 5.0, 1.2));
        let r = scene.create_in(
            g,
            Shape::Rect {
                rect: Rect::from_min_size(pos2(0.0, 0.0), vec2(64.0, 48.0)),
                corner: 8.0,
            },
        );
        scene.add_class(r, "bit-rect");
        let t = scene.create_in(
            g,
            Shape::Text {
                anchor: pos2(32.0, 24.0),
                content: "A & B".to_owned(),
                font_size: 14.0,
            },
        );
        scene.add_class(t, "bit-label");

        let svg = render_svg(&scene);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("viewBox="));
        assert!(svg.contains("transform=\"translate(10,5) scale(1.2)\""));
        assert!(svg.contains(
            "<rect class=\"bit-rect\" x=\"0\" y=\"0\" width=\"64\" height=\"48\" rx=\"8\"/>"
        ));
        assert!(svg.contains(">A &amp; B</text>"));
    }

    #[test]
    fn empty_scene_gets_default_view_box() {
        let svg = render_svg(&Scene::new());
        assert!(svg.contains("viewBox=\"0 0 100 100\""));
    }
}
