//! Retained vector scene the circuit draws into.
//!
//! Elements live in a slotmap and form a tree under a single root group, the
//! same way an SVG document does. Elements that are not reachable from the
//! root cannot be measured.

use std::collections::BTreeSet;
use std::f32::consts::TAU;

use egui::{Pos2, Rect, Vec2, pos2, vec2};
use slotmap::SlotMap;

use crate::error::RenderError;

const CURVE_SEGMENTS: usize = 16;
/// Rough advance width of one glyph relative to the font size
const GLYPH_WIDTH: f32 = 0.6;

slotmap::new_key_type! {
    pub struct ElementId;
}

/// `translate(x, y) scale(s)`, applied right to left.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Transform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translate: Vec2::ZERO,
        scale: 1.0,
    };

    pub fn new(x: f32, y: f32, scale: f32) -> Self {
        Self {
            translate: vec2(x, y),
            scale,
        }
    }

    pub fn apply(&self, p: Pos2) -> Pos2 {
        pos2(
            self.translate.x + p.x * self.scale,
            self.translate.y + p.y * self.scale,
        )
    }

    pub fn invert(&self, p: Pos2) -> Pos2 {
        pos2(
            (p.x - self.translate.x) / self.scale,
            (p.y - self.translate.y) / self.scale,
        )
    }

    pub fn apply_rect(&self, r: Rect) -> Rect {
        Rect::from_two_pos(self.apply(r.min), self.apply(r.max))
    }

    /// `self` applied after `inner`.
    pub fn then(&self, inner: Self) -> Self {
        Self {
            translate: self.translate + inner.translate * self.scale,
            scale: self.scale * inner.scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    MoveTo(Pos2),
    LineTo(Pos2),
    /// Circular arc, flags as in SVG `A`
    ArcTo {
        radius: f32,
        large_arc: bool,
        sweep: bool,
        to: Pos2,
    },
    CubicTo {
        c1: Pos2,
        c2: Pos2,
        to: Pos2,
    },
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Group,
    Rect { rect: Rect, corner: f32 },
    Circle { center: Pos2, radius: f32 },
    Line { from: Pos2, to: Pos2 },
    Polyline { points: Vec<Pos2> },
    Polygon { points: Vec<Pos2> },
    Path { commands: Vec<PathCmd> },
    Text { anchor: Pos2, content: String, font_size: f32 },
}

impl Shape {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Group => "g",
            Self::Rect { .. } => "rect",
            Self::Circle { .. } => "circle",
            Self::Line { .. } => "line",
            Self::Polyline { .. } => "polyline",
            Self::Polygon { .. } => "polygon",
            Self::Path { .. } => "path",
            Self::Text { .. } => "text",
        }
    }

    /// Bounds of the shape itself in its own user space.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Self::Group => None,
            Self::Rect { rect, .. } => Some(*rect),
            Self::Circle { center, radius } => {
                Some(Rect::from_center_size(*center, Vec2::splat(radius * 2.0)))
            }
            Self::Line { from, to } => Some(Rect::from_two_pos(*from, *to)),
            Self::Polyline { points } | Self::Polygon { points } => points_bounds(points),
            Self::Path { commands } => points_bounds(&flatten_path(commands)),
            Self::Text {
                anchor,
                content,
                font_size,
            } => {
                let width = content.chars().count() as f32 * font_size * GLYPH_WIDTH;
                Some(Rect::from_center_size(*anchor, vec2(width, *font_size)))
            }
        }
    }
}

fn points_bounds(points: &[Pos2]) -> Option<Rect> {
    if points.is_empty() {
        None
    } else {
        Some(Rect::from_points(points))
    }
}

/// Approximates a path by a polyline. Curves and arcs are sampled evenly.
pub fn flatten_path(commands: &[PathCmd]) -> Vec<Pos2> {
    let mut out = Vec::new();
    let mut start = Pos2::ZERO;
    let mut cur = Pos2::ZERO;
    for cmd in commands {
        match *cmd {
            PathCmd::MoveTo(p) => {
                start = p;
                cur = p;
                out.push(p);
            }
            PathCmd::LineTo(p) => {
                cur = p;
                out.push(p);
            }
            PathCmd::ArcTo {
                radius,
                large_arc,
                sweep,
                to,
            } => {
                out.extend(arc_points(cur, to, radius, large_arc, sweep));
                cur = to;
            }
            PathCmd::CubicTo { c1, c2, to } => {
                for i in 1..=CURVE_SEGMENTS {
                    let t = i as f32 / CURVE_SEGMENTS as f32;
                    let u = 1.0 - t;
                    let p = cur.to_vec2() * (u * u * u)
                        + c1.to_vec2() * (3.0 * u * u * t)
                        + c2.to_vec2() * (3.0 * u * t * t)
                        + to.to_vec2() * (t * t * t);
                    out.push(p.to_pos2());
                }
                cur = to;
            }
            PathCmd::Close => {
                cur = start;
                out.push(start);
            }
        }
    }
    out
}

fn arc_points(from: Pos2, to: Pos2, radius: f32, large_arc: bool, sweep: bool) -> Vec<Pos2> {
    let half = (from - to) / 2.0;
    let len_sq = half.length_sq();
    if len_sq <= f32::EPSILON {
        return Vec::new();
    }
    // Radii too small for the chord are scaled up to reach it.
    let r = radius.abs().max(len_sq.sqrt());
    let k = ((r * r - len_sq).max(0.0) / len_sq).sqrt();
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let mid = from + (to - from) / 2.0;
    let center = mid + vec2(half.y, -half.x) * k * sign;

    let a0 = (from - center).angle();
    let a1 = (to - center).angle();
    let mut delta = a1 - a0;
    if sweep && delta < 0.0 {
        delta += TAU;
    } else if !sweep && delta > 0.0 {
        delta -= TAU;
    }

    (1..=CURVE_SEGMENTS)
        .map(|i| {
            let a = a0 + delta * (i as f32 / CURVE_SEGMENTS as f32);
            center + Vec2::angled(a) * r
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Element {
    pub shape: Shape,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    /// Extra presentation attributes written out verbatim
    pub attrs: Vec<(String, String)>,
    pub transform: Option<Transform>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
}

impl Element {
    fn new(shape: Shape) -> Self {
        Self {
            shape,
            id: None,
            classes: BTreeSet::new(),
            attrs: Vec::new(),
            transform: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

pub struct Scene {
    elements: SlotMap<ElementId, Element>,
    root: ElementId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut elements = SlotMap::with_key();
        let mut root = Element::new(Shape::Group);
        root.id = Some("root".to_owned());
        let root = elements.insert(root);
        Self { elements, root }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Creates a detached element.
    pub fn create(&mut self, shape: Shape) -> ElementId {
        self.elements.insert(Element::new(shape))
    }

    /// Creates an element and appends it to `parent`.
    pub fn create_in(&mut self, parent: ElementId, shape: Shape) -> ElementId {
        let el = self.create(shape);
        self.append(parent, el);
        el
    }

    pub fn get(&self, el: ElementId) -> Option<&Element> {
        self.elements.get(el)
    }

    pub fn get_mut(&mut self, el: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(el)
    }

    /// Moves `child` to the end of `parent`'s children. Ignored when `parent`
    /// lies inside `child`'s subtree.
    pub fn append(&mut self, parent: ElementId, child: ElementId) {
        if !self.elements.contains_key(parent) || self.is_within(parent, child) {
            return;
        }
        self.detach(child);
        if let Some(c) = self.elements.get_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.elements.get_mut(parent) {
            p.children.push(child);
        }
    }

    pub fn detach(&mut self, child: ElementId) {
        let Some(parent) = self.elements.get_mut(child).and_then(|c| c.parent.take()) else {
            return;
        };
        if let Some(p) = self.elements.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
    }

    pub fn is_attached(&self, el: ElementId) -> bool {
        self.is_within(el, self.root)
    }

    /// Whether `ancestor` is `el` or one of its parents.
    fn is_within(&self, el: ElementId, ancestor: ElementId) -> bool {
        let mut cur = Some(el);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.elements.get(id).and_then(|e| e.parent);
        }
        false
    }

    pub fn set_id(&mut self, el: ElementId, id: impl Into<String>) {
        if let Some(e) = self.elements.get_mut(el) {
            e.id = Some(id.into());
        }
    }

    pub fn set_attr(&mut self, el: ElementId, name: &str, value: impl Into<String>) {
        let Some(e) = self.elements.get_mut(el) else {
            return;
        };
        let value = value.into();
        if let Some(slot) = e.attrs.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            e.attrs.push((name.to_owned(), value));
        }
    }

    pub fn add_class(&mut self, el: ElementId, class: &str) {
        self.toggle_class(el, class, true);
    }

    pub fn toggle_class(&mut self, el: ElementId, class: &str, on: bool) {
        let Some(e) = self.elements.get_mut(el) else {
            return;
        };
        if on {
            e.classes.insert(class.to_owned());
        } else {
            e.classes.remove(class);
        }
    }

    pub fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.elements.get(el).is_some_and(|e| e.has_class(class))
    }

    pub fn set_text(&mut self, el: ElementId, text: &str) {
        if let Some(Element {
            shape: Shape::Text { content, .. },
            ..
        }) = self.elements.get_mut(el)
            && content != text
        {
            text.clone_into(content);
        }
    }

    pub fn text(&self, el: ElementId) -> Option<&str> {
        match &self.elements.get(el)?.shape {
            Shape::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn set_shape(&mut self, el: ElementId, shape: Shape) {
        if let Some(e) = self.elements.get_mut(el) {
            e.shape = shape;
        }
    }

    pub fn set_transform(&mut self, el: ElementId, transform: Transform) {
        if let Some(e) = self.elements.get_mut(el) {
            e.transform = Some(transform);
        }
    }

    /// Combined transform from `el`'s user space to root space.
    pub fn world_transform(&self, el: ElementId) -> Transform {
        let mut acc = Transform::IDENTITY;
        let mut cur = Some(el);
        while let Some(id) = cur {
            let Some(e) = self.elements.get(id) else {
                break;
            };
            if let Some(t) = e.transform {
                acc = t.then(acc);
            }
            cur = e.parent;
        }
        acc
    }

    /// Bounding box of `el` and its descendants in `el`'s user space, ignoring
    /// `el`'s own transform but honoring every descendant's.
    pub fn bbox(&self, el: ElementId) -> Result<Rect, RenderError> {
        if !self.is_attached(el) {
            return Err(RenderError::Detached);
        }
        self.local_bounds(el).ok_or(RenderError::EmptyBounds)
    }

    fn local_bounds(&self, el: ElementId) -> Option<Rect> {
        let e = self.elements.get(el)?;
        let mut acc = e.shape.bounds();
        for &child in &e.children {
            let Some(mut r) = self.local_bounds(child) else {
                continue;
            };
            if let Some(t) = self.elements.get(child).and_then(|c| c.transform) {
                r = t.apply_rect(r);
            }
            acc = Some(acc.map_or(r, |a| a.union(r)));
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn bbox_unions_children_with_transforms() {
        let mut scene = Scene::new();
        let g = scene.create_in(scene.root(), Shape::Group);
        scene.set_transform(g, Transform::new(10.0, 20.0, 2.0));
        let inner = scene.create_in(g, Shape::Group);
        scene.create_in(
            inner,
            Shape::Rect {
                rect: Rect::from_min_size(pos2(0.0, 0.0), vec2(10.0, 10.0)),
                corner: 0.0,
            },
        );
        scene.create_in(
            inner,
            Shape::Circle {
                center: pos2(30.0, 5.0),
                radius: 5.0,
            },
        );

        // Own transform is ignored when measuring the element itself.
        let local = scene.bbox(g).expect("attached group");
        assert!(approx(local.min.x, 0.0) && approx(local.max.x, 35.0), "{local:?}");

        let root = scene.bbox(scene.root()).expect("root");
        assert!(approx(root.min.x, 10.0), "{root:?}");
        assert!(approx(root.max.x, 80.0), "{root:?}");
        assert!(approx(root.max.y, 40.0), "{root:?}");
    }

    #[test]
    fn detached_elements_cannot_be_measured() {
        let mut scene = Scene::new();
        let g = scene.create(Shape::Group);
        scene.create_in(
            g,
            Shape::Line {
                from: pos2(0.0, 0.0),
                to: pos2(5.0, 0.0),
            },
        );
        assert_eq!(scene.bbox(g), Err(RenderError::Detached));

        scene.append(scene.root(), g);
        assert!(scene.bbox(g).is_ok());

        let empty = scene.create_in(scene.root(), Shape::Group);
        assert_eq!(scene.bbox(empty), Err(RenderError::EmptyBounds));
    }

    #[test]
    fn semicircle_arc_bulges_to_the_right() {
        let commands = [
            PathCmd::MoveTo(pos2(0.0, 0.0)),
            PathCmd::LineTo(pos2(36.0, 0.0)),
            PathCmd::ArcTo {
                radius: 36.0,
                large_arc: false,
                sweep: true,
                to: pos2(36.0, 72.0),
            },
            PathCmd::LineTo(pos2(0.0, 72.0)),
            PathCmd::Close,
        ];
        let b = Shape::Path {
            commands: commands.to_vec(),
        }
        .bounds()
        .expect("path bounds");
        assert!(approx(b.max.x, 72.0), "{b:?}");
        assert!(approx(b.min.x, 0.0), "{b:?}");
        assert!(approx(b.max.y, 72.0), "{b:?}");
    }

    #[test]
    fn classes_and_text() {
        let mut scene = Scene::new();
        let t = scene.create_in(
            scene.root(),
            Shape::Text {
                anchor: pos2(0.0, 0.0),
                content: "0".to_owned(),
                font_size: 10.0,
            },
        );
        scene.toggle_class(t, "high", true);
        assert!(scene.has_class(t, "high"));
        scene.toggle_class(t, "high", false);
        assert!(!scene.has_class(t, "high"));

        scene.set_text(t, "1");
        assert_eq!(scene.text(t), Some("1"));
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut scene = Scene::new();
        let outer = scene.create_in(scene.root(), Shape::Group);
        scene.set_transform(outer, Transform::new(100.0, 0.0, 2.0));
        let inner = scene.create_in(outer, Shape::Group);
        scene.set_transform(inner, Transform::new(5.0, 5.0, 1.0));

        let t = scene.world_transform(inner);
        let p = t.apply(pos2(1.0, 1.0));
        assert!(approx(p.x, 112.0) && approx(p.y, 12.0), "{p:?}");
        let back = t.invert(p);
        assert!(approx(back.x, 1.0) && approx(back.y, 1.0), "{back:?}");
    }
    #[test]
    fn appending_an_ancestor_under_its_descendant_is_ignored() {
        let mut scene = Scene::new();
        let outer = scene.create_in(scene.root(), Shape::Group);
        let inner = scene.create_in(outer, Shape::Group);
        let leaf = scene.create_in(inner, Shape::Group);

        scene.append(leaf, outer);
        scene.append(inner, inner);

        assert_eq!(scene.get(outer).and_then(|e| e.parent), Some(scene.root()));
        assert!(scene.get(leaf).is_some_and(|e| e.children.is_empty()));
        assert!(scene.is_attached(leaf));

        // Moving a subtree elsewhere still works.
        let side = scene.create_in(scene.root(), Shape::Group);
        scene.append(side, inner);
        assert_eq!(scene.get(inner).and_then(|e| e.parent), Some(side));
        assert!(scene.get(outer).is_some_and(|e| e.children.is_empty()));
    }
}
