//! Orthogonal wire routing between two pins.

use egui::{Pos2, pos2};

use crate::scene::Shape;

const EPSILON: f32 = 1e-6;

/// A pin as seen by the router: center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub pos: Pos2,
    pub radius: f32,
}

impl Endpoint {
    pub fn new(pos: Pos2, radius: f32) -> Self {
        Self { pos, radius }
    }
}

fn same(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn dir(from: f32, to: f32) -> f32 {
    if to >= from { 1.0 } else { -1.0 }
}

/// Polyline from `a` to `b`, clipped by both pin radii.
///
/// Without waypoints the route is a straight segment when the pins are
/// aligned, otherwise a vertical exit turning into a horizontal approach.
/// With waypoints the exit follows the first waypoint and the final leg into
/// `b` is always horizontal; `margin` is the gap kept in front of `b` when an
/// approach point has to be inserted.
pub fn route(a: Endpoint, b: Endpoint, via: &[Pos2], margin: f32) -> Vec<Pos2> {
    let (pa, pb) = (a.pos, b.pos);

    let (Some(first), Some(last)) = (via.first(), via.last()) else {
        if same(pa.x, pb.x) {
            let dy = dir(pa.y, pb.y);
            return vec![
                pos2(pa.x, pa.y + dy * a.radius),
                pos2(pb.x, pb.y - dy * b.radius),
            ];
        }
        if same(pa.y, pb.y) {
            let dx = dir(pa.x, pb.x);
            return vec![
                pos2(pa.x + dx * a.radius, pa.y),
                pos2(pb.x - dx * b.radius, pb.y),
            ];
        }
        let dy = dir(pa.y, pb.y);
        let dx = dir(pa.x, pb.x);
        return vec![
            pos2(pa.x, pa.y + dy * a.radius),
            pos2(pa.x, pb.y),
            pos2(pb.x - dx * b.radius, pb.y),
        ];
    };

    let mut points = Vec::with_capacity(via.len() + 3);
    if same(first.x, pa.x) {
        points.push(pos2(pa.x, pa.y + dir(pa.y, first.y) * a.radius));
    } else {
        points.push(pos2(pa.x + dir(pa.x, first.x) * a.radius, pa.y));
    }
    points.extend_from_slice(via);

    let dx = dir(last.x, pb.x);
    if !same(last.y, pb.y) {
        points.push(pos2(pb.x - dx * (b.radius + margin), pb.y));
    }
    points.push(pos2(pb.x - dx * b.radius, pb.y));
    points
}

/// Two points draw as a line, anything longer as a polyline.
pub fn wire_shape(points: Vec<Pos2>) -> Shape {
    match points.as_slice() {
        [from, to] => Shape::Line {
            from: *from,
            to: *to,
        },
        _ => Shape::Polyline { points },
    }
}
