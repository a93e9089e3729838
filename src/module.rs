//! Named groups ("modules") that own a sub-tree of the diagram.
//!
//! A group qualifies every identifier created through it with its own name,
//! so `AND1` inside `demo1` becomes `demo1:AND1` and its output pin
//! `demo1:AND1.out`. References that already carry a `:` are left alone. The
//! group's transform only moves its drawing; pin positions stay group-local.

use egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::{
    assets::GateKind,
    db::{Circuit, ComponentId, GroupId, Pin, PinId, PinRef, Placement, WireId},
    error::{CircuitError, RenderError},
    scene::{ElementId, Shape, Transform},
    simulator::SimulationStatus,
};

/// `"<group>:<local>"`
pub fn scope_id(group: &str, local: &str) -> String {
    format!("{group}:{local}")
}

/// Qualifies `r` with `group` unless it is already qualified.
pub fn scope_ref(group: &str, r: &str) -> String {
    if r.contains(':') {
        r.to_owned()
    } else {
        scope_id(group, r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GroupOptions {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub show_frame: bool,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            show_frame: false,
        }
    }
}

/// Drawing layers, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layers {
    pub wires: ElementId,
    pub gates: ElementId,
    pub nodes: ElementId,
}

#[derive(Debug, Clone, Default)]
pub struct GroupItems {
    pub pins: Vec<PinId>,
    pub components: Vec<ComponentId>,
    pub wires: Vec<WireId>,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub offset: Vec2,
    pub scale: f32,
    pub element: ElementId,
    /// Everything but the frame; this is what the frame measures
    pub content: ElementId,
    pub layers: Layers,
    pub frame: Option<ElementId>,
    pub items: GroupItems,
}

impl Group {
    pub fn transform(&self) -> Transform {
        Transform {
            translate: self.offset,
            scale: self.scale,
        }
    }
}

impl Circuit {
    /// Creates a group under the scene root and returns a handle scoped to it.
    pub fn create_group(
        &mut self,
        name: &str,
        options: GroupOptions,
    ) -> Result<Module<'_>, CircuitError> {
        if self.group_keys.contains_key(name) {
            return Err(CircuitError::DuplicateId(name.to_owned()));
        }

        let root = self.scene.root();
        let element = self.scene.create_in(root, Shape::Group);
        self.scene.set_id(element, format!("mod-{name}"));
        let content = self.scene.create_in(element, Shape::Group);
        self.scene.add_class(content, "content");
        let mut layer = |class: &str| {
            let el = self.scene.create_in(content, Shape::Group);
            self.scene.add_class(el, class);
            el
        };
        let layers = Layers {
            wires: layer("wires"),
            gates: layer("gates"),
            nodes: layer("nodes"),
        };

        let frame = options.show_frame.then(|| {
            let pad = self.config.frame_padding;
            let frame = self.scene.create_in(
                element,
                Shape::Rect {
                    rect: Rect::from_min_size(pos2(-pad, -pad), vec2(10.0, 10.0)),
                    corner: self.config.frame_corner,
                },
            );
            self.scene.add_class(frame, "module-frame");
            self.scene.set_attr(frame, "pointer-events", "none");
            frame
        });

        let group = Group {
            name: name.to_owned(),
            offset: vec2(options.x, options.y),
            scale: options.scale,
            element,
            content,
            layers,
            frame,
            items: GroupItems::default(),
        };
        self.scene.set_transform(element, group.transform());
        let id = self.groups.insert(group);
        self.group_keys.insert(name.to_owned(), id);

        if let Some(frame) = frame {
            let pad = self.config.frame_padding;
            let corner = self.config.frame_corner;
            self.on_render(move |c| {
                let bbox = c.scene.bbox(content)?;
                c.scene.set_shape(
                    frame,
                    Shape::Rect {
                        rect: bbox.expand(pad),
                        corner,
                    },
                );
                Ok(())
            });
        }

        Ok(Module {
            circuit: self,
            group: id,
        })
    }

    /// Re-opens the handle of an existing group.
    pub fn module(&mut self, name: &str) -> Result<Module<'_>, CircuitError> {
        let group = self.group_id(name)?;
        Ok(Module {
            circuit: self,
            group,
        })
    }

    pub fn group_id(&self, name: &str) -> Result<GroupId, CircuitError> {
        self.group_keys
            .get(name)
            .copied()
            .ok_or_else(|| CircuitError::UnknownScope(name.to_owned()))
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &Group)> + '_ {
        self.groups.iter()
    }

    /// Moves and scales a group's drawing as a rigid unit.
    pub fn set_group_transform(
        &mut self,
        id: GroupId,
        x: f32,
        y: f32,
        scale: Option<f32>,
    ) -> Result<(), CircuitError> {
        let group = self.group_record_mut(id)?;
        group.offset = vec2(x, y);
        if let Some(scale) = scale {
            group.scale = scale;
        }
        let (element, transform) = (group.element, group.transform());
        self.scene.set_transform(element, transform);
        Ok(())
    }
}

/// Handle that forwards to the circuit with every name qualified by one group.
pub struct Module<'a> {
    circuit: &'a mut Circuit,
    group: GroupId,
}

impl<'a> Module<'a> {
    pub fn id(&self) -> GroupId {
        self.group
    }

    fn record(&self) -> Result<&Group, CircuitError> {
        self.circuit.group_record(self.group)
    }

    pub fn name(&self) -> &str {
        self.circuit
            .group(self.group)
            .map_or("", |g| g.name.as_str())
    }

    pub fn x(&self) -> f32 {
        self.record().map_or(0.0, |g| g.offset.x)
    }

    pub fn y(&self) -> f32 {
        self.record().map_or(0.0, |g| g.offset.y)
    }

    pub fn scale(&self) -> f32 {
        self.record().map_or(1.0, |g| g.scale)
    }

    pub fn items(&self) -> Option<&GroupItems> {
        self.circuit.group(self.group).map(|g| &g.items)
    }

    pub fn layers(&self) -> Result<Layers, CircuitError> {
        self.record().map(|g| g.layers)
    }

    pub fn element(&self) -> Result<ElementId, CircuitError> {
        self.record().map(|g| g.element)
    }

    pub fn circuit(&self) -> &Circuit {
        self.circuit
    }

    pub fn circuit_mut(&mut self) -> &mut Circuit {
        self.circuit
    }

    pub fn into_circuit(self) -> &'a mut Circuit {
        self.circuit
    }

    // Transform

    pub fn set_transform(
        &mut self,
        x: f32,
        y: f32,
        scale: Option<f32>,
    ) -> Result<(), CircuitError> {
        self.circuit.set_group_transform(self.group, x, y, scale)
    }

    pub fn set_position(&mut self, x: f32, y: f32) -> Result<(), CircuitError> {
        self.set_transform(x, y, None)
    }

    pub fn set_scale(&mut self, scale: f32) -> Result<(), CircuitError> {
        let (x, y) = (self.x(), self.y());
        self.set_transform(x, y, Some(scale))
    }

    // Construction

    pub fn add_source(&mut self, local: &str, x: f32, y: f32) -> Result<ComponentId, CircuitError> {
        self.circuit
            .create_component(self.group, local, Placement::Source { at: pos2(x, y) })
    }

    fn add_gate(
        &mut self,
        kind: GateKind,
        local: &str,
        x: f32,
        y: f32,
        scale: f32,
    ) -> Result<ComponentId, CircuitError> {
        self.circuit.create_component(
            self.group,
            local,
            Placement::Gate {
                kind,
                at: pos2(x, y),
                scale,
            },
        )
    }

    pub fn add_and(
        &mut self,
        local: &str,
        x: f32,
        y: f32,
        scale: f32,
    ) -> Result<ComponentId, CircuitError> {
        self.add_gate(GateKind::And, local, x, y, scale)
    }

    pub fn add_or(
        &mut self,
        local: &str,
        x: f32,
        y: f32,
        scale: f32,
    ) -> Result<ComponentId, CircuitError> {
        self.add_gate(GateKind::Or, local, x, y, scale)
    }

    pub fn add_not(
        &mut self,
        local: &str,
        x: f32,
        y: f32,
        scale: f32,
    ) -> Result<ComponentId, CircuitError> {
        self.add_gate(GateKind::Not, local, x, y, scale)
    }

    /// Readout box; `size` defaults to the configured display size.
    pub fn add_display(
        &mut self,
        local: &str,
        x: f32,
        y: f32,
        size: Option<Vec2>,
    ) -> Result<ComponentId, CircuitError> {
        let size = size.unwrap_or(self.circuit.config.display_size);
        self.circuit.create_component(
            self.group,
            local,
            Placement::Display {
                at: pos2(x, y),
                size,
            },
        )
    }

    /// Free-standing pin `<local>.<name>`.
    pub fn add_dangling(
        &mut self,
        local: &str,
        name: &str,
        x: f32,
        y: f32,
        radius: Option<f32>,
    ) -> Result<PinId, CircuitError> {
        let radius = radius.unwrap_or(self.circuit.config.node_radius);
        self.circuit
            .create_pin(self.group, local, name, pos2(x, y), radius)
    }

    /// Routing node `<local>.j`.
    pub fn add_junction(
        &mut self,
        local: &str,
        x: f32,
        y: f32,
        radius: Option<f32>,
    ) -> Result<PinId, CircuitError> {
        self.add_dangling(local, "j", x, y, radius)
    }

    /// Id of a pin, with bare names qualified by this group.
    pub fn pin_id<'r>(&self, r: impl Into<PinRef<'r>>) -> Result<PinId, CircuitError> {
        match r.into() {
            PinRef::Key(key) if !key.is_empty() => {
                let name = &self.record()?.name;
                self.circuit.pin_id(scope_ref(name, key).as_str())
            }
            other => self.circuit.pin_id(other),
        }
    }

    pub fn connect<'f, 't>(
        &mut self,
        from: impl Into<PinRef<'f>>,
        to: impl Into<PinRef<'t>>,
        via: &[Pos2],
    ) -> Result<WireId, CircuitError> {
        let from = self.pin_id(from)?;
        let to = self.pin_id(to)?;
        self.circuit.connect(self.group, from, to, via)
    }

    /// Resolved pin record, with bare names qualified by this group.
    pub fn pin<'r>(&self, r: impl Into<PinRef<'r>>) -> Result<&Pin, CircuitError> {
        let id = self.pin_id(r)?;
        self.circuit.lookup_pin(id)
    }

    /// Plain wire-styled segment on the wires layer, not part of propagation.
    pub fn add_trace(&mut self, from: Pos2, to: Pos2) -> Result<ElementId, CircuitError> {
        let layer = self.layers()?.wires;
        let el = self.circuit.scene.create_in(layer, Shape::Line { from, to });
        self.circuit.scene.add_class(el, "wire");
        Ok(el)
    }

    // Rendering

    pub fn on_render(
        &mut self,
        callback: impl FnMut(&mut Circuit) -> Result<(), RenderError> + 'static,
    ) {
        self.circuit.on_render(callback);
    }

    pub fn render(&mut self) -> SimulationStatus {
        self.circuit.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_references_are_qualified() {
        assert_eq!(scope_ref("demo1", "AND1.inA"), "demo1:AND1.inA");
        assert_eq!(scope_ref("demo1", "other:AND1.inA"), "other:AND1.inA");
        assert_eq!(scope_id("demo1", "A"), "demo1:A");
    }

    #[test]
    fn same_local_names_in_two_groups_do_not_collide() {
        let mut circuit = Circuit::default();
        let mut one = circuit
            .create_group("one", GroupOptions::default())
            .expect("one");
        one.add_source("A", 0.0, 0.0).expect("A in one");
        let circuit = one.into_circuit();
        let mut two = circuit
            .create_group("two", GroupOptions::default())
            .expect("two");
        let a = two.add_source("A", 0.0, 0.0).expect("A in two");
        two.add_not("N", 100.0, 0.0, 1.0).expect("N");
        two.connect("A.out", "N.in", &[]).expect("local wire");
        // Qualified refs reach across groups.
        two.connect("one:A.out", "N.in", &[]).expect("cross wire");

        let circuit = two.into_circuit();
        assert_eq!(circuit.component(a).expect("A").key, "two:A");
        assert!(circuit.lookup_pin("one:A.out").is_ok());
        assert!(circuit.lookup_pin("two:A.out").is_ok());
        assert_eq!(
            circuit.create_group("one", GroupOptions::default()).err(),
            Some(CircuitError::DuplicateId("one".to_owned()))
        );
    }

    #[test]
    fn transforms_only_touch_the_drawing() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group("g", GroupOptions::default())
            .expect("group");
        m.add_source("A", 10.0, 10.0).expect("A");
        m.set_position(50.0, 20.0).expect("move");
        m.set_scale(2.0).expect("scale");

        assert_eq!((m.x(), m.y(), m.scale()), (50.0, 20.0, 2.0));
        assert_eq!(m.pin("A.out").expect("pin").pos, pos2(78.0, 34.0));

        let element = m.element().expect("element");
        let t = m.circuit().scene.get(element).and_then(|e| e.transform);
        assert_eq!(t, Some(Transform::new(50.0, 20.0, 2.0)));
    }

    #[test]
    fn frame_tracks_the_content_bounds() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group(
                "g",
                GroupOptions {
                    show_frame: true,
                    ..GroupOptions::default()
                },
            )
            .expect("group");
        m.add_source("A", 10.0, 20.0).expect("A");
        m.render();

        let frame = m
            .circuit()
            .group(m.id())
            .and_then(|g| g.frame)
            .expect("frame");
        let Some(Shape::Rect { rect, .. }) = m.circuit().scene.get(frame).map(|e| e.shape.clone())
        else {
            panic!("frame is a rect");
        };
        // Box (10,20)-(74,68), pin circle reaches x = 78 + 4.
        assert_eq!(rect.min, pos2(2.0, 12.0));
        assert_eq!(rect.max, pos2(90.0, 76.0));
    }

    #[test]
    fn frame_on_a_detached_group_is_skipped() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group(
                "g",
                GroupOptions {
                    show_frame: true,
                    ..GroupOptions::default()
                },
            )
            .expect("group");
        m.add_source("A", 10.0, 20.0).expect("A");
        let element = m.element().expect("element");
        let circuit = m.into_circuit();
        circuit.scene.detach(element);

        let status = circuit.render();
        assert!(matches!(status, SimulationStatus::Stable { .. }));
        let frame = circuit
            .groups()
            .find_map(|(_, g)| g.frame)
            .expect("frame");
        let Some(Shape::Rect { rect, .. }) = circuit.scene.get(frame).map(|e| e.shape.clone())
        else {
            panic!("frame is a rect");
        };
        assert_eq!(rect.size(), vec2(10.0, 10.0));
    }

    #[test]
    fn unknown_scope_is_reported() {
        let mut circuit = Circuit::default();
        assert!(matches!(
            circuit.module("nope"),
            Err(CircuitError::UnknownScope(_))
        ));
    }
}
