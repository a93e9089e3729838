use std::collections::HashMap;
use std::fmt::Display;

use egui::{Pos2, Rect, Vec2, vec2};
use slotmap::SlotMap;

use crate::{
    assets::{self, GATE_SIZE, GateKind, NOT_WIDTH, PinKind, Role},
    config::CanvasConfig,
    error::CircuitError,
    module::{Group, scope_id},
    routing::{self, Endpoint},
    scene::{ElementId, Scene, Shape},
    simulator::{RenderCallback, Signal, SimulationStatus},
};

slotmap::new_key_type! {
    pub struct PinId;
}

impl Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self.0))
    }
}

slotmap::new_key_type! {
    pub struct ComponentId;
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self.0))
    }
}

slotmap::new_key_type! {
    pub struct WireId;
}

slotmap::new_key_type! {
    pub struct GroupId;
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self.0))
    }
}

/// Anything that names a pin: a qualified key such as `demo1:AND1.inA`, or an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRef<'a> {
    Key(&'a str),
    Id(PinId),
}

impl<'a> From<&'a str> for PinRef<'a> {
    fn from(value: &'a str) -> Self {
        Self::Key(value)
    }
}

impl<'a> From<&'a String> for PinRef<'a> {
    fn from(value: &'a String) -> Self {
        Self::Key(value)
    }
}

impl From<PinId> for PinRef<'_> {
    fn from(value: PinId) -> Self {
        Self::Id(value)
    }
}

// Pin

#[derive(Debug, Clone)]
pub struct Pin {
    /// `"<scope>:<local>.<name>"`
    pub key: String,
    /// Group-local position
    pub pos: Pos2,
    pub radius: f32,
    pub signal: Signal,
    pub group: GroupId,
    pub element: ElementId,
}

impl Pin {
    pub fn value(&self) -> bool {
        self.signal.value
    }

    pub fn driven(&self) -> bool {
        self.signal.driven
    }

    pub fn is_high(&self) -> bool {
        self.signal.is_high()
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.pos, self.radius)
    }
}

// Pin end

// Component

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Source { out: PinId, on: bool },
    And { in_a: PinId, in_b: PinId, out: PinId },
    Or { in_a: PinId, in_b: PinId, out: PinId },
    Not { input: PinId, out: PinId },
    Display { input: PinId },
}

impl ComponentKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source { .. } => "BIT",
            Self::And { .. } => "AND",
            Self::Or { .. } => "OR",
            Self::Not { .. } => "NOT",
            Self::Display { .. } => "DISPLAY",
        }
    }

    pub fn pins(&self) -> Vec<(Role, PinId)> {
        match *self {
            Self::Source { out, .. } => vec![(Role::Out, out)],
            Self::And { in_a, in_b, out } | Self::Or { in_a, in_b, out } => {
                vec![(Role::InA, in_a), (Role::InB, in_b), (Role::Out, out)]
            }
            Self::Not { input, out } => vec![(Role::In, input), (Role::Out, out)],
            Self::Display { input } => vec![(Role::In, input)],
        }
    }

    pub fn pin(&self, role: Role) -> Option<PinId> {
        self.pins()
            .into_iter()
            .find_map(|(r, id)| (r == role).then_some(id))
    }

    fn gate(kind: GateKind, pins: &[(Role, PinId)], key: &str) -> Result<Self, CircuitError> {
        let find = |role: Role| {
            pins.iter()
                .find_map(|&(r, id)| (r == role).then_some(id))
                .ok_or_else(|| CircuitError::PinNotFound(format!("{key}.{role}")))
        };
        Ok(match kind {
            GateKind::And => Self::And {
                in_a: find(Role::InA)?,
                in_b: find(Role::InB)?,
                out: find(Role::Out)?,
            },
            GateKind::Or => Self::Or {
                in_a: find(Role::InA)?,
                in_b: find(Role::InB)?,
                out: find(Role::Out)?,
            },
            GateKind::Not => Self::Not {
                input: find(Role::In)?,
                out: find(Role::Out)?,
            },
        })
    }
}

/// Scene elements a component updates during visual sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentVisual {
    /// Receives the `active` class on sources and displays
    pub root: ElementId,
    /// Receives the `high` class on gates
    pub outline: ElementId,
    pub label: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct Component {
    pub key: String,
    pub kind: ComponentKind,
    pub group: GroupId,
    /// Group-local layout box, used for hit testing
    pub bounds: Rect,
    pub visual: ComponentVisual,
}

/// Where and how a component is laid out inside its group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Source { at: Pos2 },
    Gate { kind: GateKind, at: Pos2, scale: f32 },
    Display { at: Pos2, size: Vec2 },
}

// Component end

#[derive(Debug, Clone)]
pub struct Wire {
    pub from: PinId,
    pub to: PinId,
    /// Routing hints as given at construction
    pub via: Vec<Pos2>,
    /// Routed polyline, group-local
    pub points: Vec<Pos2>,
    pub group: GroupId,
    pub element: ElementId,
}

/// Serializable view of every pin and component.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct CircuitSnapshot {
    pub status: SimulationStatus,
    pub pins: Vec<PinSnapshot>,
    pub components: Vec<ComponentSnapshot>,
    pub wires: usize,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct PinSnapshot {
    pub key: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub value: bool,
    pub driven: bool,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ComponentSnapshot {
    pub key: String,
    pub kind: String,
    /// Stored state of a source, or whether a display reads high
    pub on: Option<bool>,
}

/// The whole diagram: registries, scene and propagation state.
///
/// Iteration over pins, components and wires follows insertion order since
/// nothing is ever removed. Wire evaluation order relies on it.
pub struct Circuit {
    pub config: CanvasConfig,
    pub scene: Scene,
    pub(crate) pins: SlotMap<PinId, Pin>,
    pub(crate) pin_keys: HashMap<String, PinId>,
    pub(crate) components: SlotMap<ComponentId, Component>,
    pub(crate) component_keys: HashMap<String, ComponentId>,
    pub(crate) wires: SlotMap<WireId, Wire>,
    pub(crate) groups: SlotMap<GroupId, Group>,
    pub(crate) group_keys: HashMap<String, GroupId>,
    pub(crate) callbacks: Vec<RenderCallback>,
    pub(crate) rendering: bool,
    pub status: SimulationStatus,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Circuit {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            scene: Scene::new(),
            pins: SlotMap::with_key(),
            pin_keys: HashMap::new(),
            components: SlotMap::with_key(),
            component_keys: HashMap::new(),
            wires: SlotMap::with_key(),
            groups: SlotMap::with_key(),
            group_keys: HashMap::new(),
            callbacks: Vec::new(),
            rendering: false,
            status: SimulationStatus::default(),
        }
    }

    pub(crate) fn group_record(&self, id: GroupId) -> Result<&Group, CircuitError> {
        self.groups
            .get(id)
            .ok_or_else(|| CircuitError::UnknownScope(id.to_string()))
    }

    pub(crate) fn group_record_mut(&mut self, id: GroupId) -> Result<&mut Group, CircuitError> {
        self.groups
            .get_mut(id)
            .ok_or_else(|| CircuitError::UnknownScope(id.to_string()))
    }

    // Pins

    /// Registers a pin `<local>.<name>` in `scope` and draws its node.
    pub fn create_pin(
        &mut self,
        scope: GroupId,
        local: &str,
        name: &str,
        pos: Pos2,
        radius: f32,
    ) -> Result<PinId, CircuitError> {
        let (owner, layer) = {
            let group = self.group_record(scope)?;
            (scope_id(&group.name, local), group.layers.nodes)
        };
        let key = format!("{owner}.{name}");
        if self.pin_keys.contains_key(&key) {
            return Err(CircuitError::DuplicateId(key));
        }

        let element = self
            .scene
            .create_in(layer, Shape::Circle { center: pos, radius });
        self.scene.set_id(element, format!("pin-{owner}-{name}"));
        self.scene.add_class(element, "node");

        let id = self.pins.insert(Pin {
            key: key.clone(),
            pos,
            radius,
            signal: Signal::FLOATING,
            group: scope,
            element,
        });
        self.pin_keys.insert(key, id);
        self.group_record_mut(scope)?.items.pins.push(id);
        Ok(id)
    }

    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.get(id)
    }

    pub fn pins(&self) -> impl Iterator<Item = (PinId, &Pin)> + '_ {
        self.pins.iter()
    }

    pub fn pin_id<'a>(&self, r: impl Into<PinRef<'a>>) -> Result<PinId, CircuitError> {
        match r.into() {
            PinRef::Key("") => Err(CircuitError::MissingPinRef),
            PinRef::Key(key) => self
                .pin_keys
                .get(key)
                .copied()
                .ok_or_else(|| CircuitError::PinNotFound(key.to_owned())),
            PinRef::Id(id) if self.pins.contains_key(id) => Ok(id),
            PinRef::Id(id) => Err(CircuitError::PinNotFound(id.to_string())),
        }
    }

    /// Resolves a qualified pin reference. Missing pins are an error.
    pub fn lookup_pin<'a>(&self, r: impl Into<PinRef<'a>>) -> Result<&Pin, CircuitError> {
        let id = self.pin_id(r)?;
        self.pins
            .get(id)
            .ok_or_else(|| CircuitError::PinNotFound(id.to_string()))
    }

    // Components

    pub fn create_component(
        &mut self,
        scope: GroupId,
        local: &str,
        placement: Placement,
    ) -> Result<ComponentId, CircuitError> {
        let (key, gates_layer) = {
            let group = self.group_record(scope)?;
            (scope_id(&group.name, local), group.layers.gates)
        };
        if self.component_keys.contains_key(&key) {
            return Err(CircuitError::DuplicateId(key));
        }
        let roles: &[Role] = match placement {
            Placement::Source { .. } => &[Role::Out],
            Placement::Gate { kind, .. } => match kind {
                GateKind::And | GateKind::Or => &[Role::InA, Role::InB, Role::Out],
                GateKind::Not => &[Role::In, Role::Out],
            },
            Placement::Display { .. } => &[Role::In],
        };
        if let Some(taken) = roles
            .iter()
            .map(|role| format!("{key}.{role}"))
            .find(|k| self.pin_keys.contains_key(k))
        {
            return Err(CircuitError::DuplicateId(taken));
        }

        let (kind, bounds, visual) = match placement {
            Placement::Source { at } => {
                let size = self.config.source_size;
                let (root, outline, label) = self.draw_box(gates_layer, &key, at, size, "0");
                self.scene.add_class(root, "bit");
                self.scene.set_attr(root, "tabindex", "0");
                self.scene.set_attr(root, "aria-label", format!("Bit {key}"));
                let out_pos = assets::source_out_pin(at, &self.config);
                let out = self.create_pin(scope, local, "out", out_pos, self.config.node_radius)?;
                (
                    ComponentKind::Source { out, on: false },
                    Rect::from_min_size(at, size),
                    ComponentVisual {
                        root,
                        outline,
                        label: Some(label),
                    },
                )
            }
            Placement::Gate { kind, at, scale } => {
                let graphics = kind.graphics();
                let outline = self
                    .scene
                    .create_in(gates_layer, (graphics.outline)(at, scale));
                self.scene.add_class(outline, "gate-shape");
                if kind == GateKind::Not {
                    self.scene.set_attr(outline, "fill", "none");
                }
                let mut pins = Vec::with_capacity(graphics.pins.len());
                for g in graphics.pins {
                    let (pos, radius) = g.place(at, scale, &self.config);
                    let id = self.create_pin(scope, local, g.role.as_str(), pos, radius)?;
                    pins.push((g.role, id));
                }
                let width = match kind {
                    GateKind::Not => NOT_WIDTH,
                    GateKind::And | GateKind::Or => GATE_SIZE,
                };
                (
                    ComponentKind::gate(kind, &pins, &key)?,
                    Rect::from_min_size(at, vec2(width, GATE_SIZE) * scale),
                    ComponentVisual {
                        root: outline,
                        outline,
                        label: None,
                    },
                )
            }
            Placement::Display { at, size } => {
                let text = self.config.display_off_text.clone();
                let (root, outline, label) = self.draw_box(gates_layer, &key, at, size, &text);
                self.scene.add_class(root, "display");
                let in_pos = assets::display_in_pin(at, size);
                let input = self.create_pin(scope, local, "in", in_pos, self.config.node_radius)?;
                (
                    ComponentKind::Display { input },
                    Rect::from_min_size(at, size),
                    ComponentVisual {
                        root,
                        outline,
                        label: Some(label),
                    },
                )
            }
        };

        let id = self.components.insert(Component {
            key: key.clone(),
            kind,
            group: scope,
            bounds,
            visual,
        });
        self.component_keys.insert(key, id);
        self.group_record_mut(scope)?.items.components.push(id);
        Ok(id)
    }

    /// Rounded box with a centered label, wrapped in its own group element.
    fn draw_box(
        &mut self,
        layer: ElementId,
        key: &str,
        at: Pos2,
        size: Vec2,
        text: &str,
    ) -> (ElementId, ElementId, ElementId) {
        let root = self.scene.create_in(layer, Shape::Group);
        self.scene.set_id(root, key);
        let rect = self
            .scene
            .create_in(root, assets::box_outline(at, size, &self.config));
        self.scene.add_class(rect, "bit-rect");
        let label = self.scene.create_in(
            root,
            Shape::Text {
                anchor: at + size / 2.0,
                content: text.to_owned(),
                font_size: self.config.label_font_size,
            },
        );
        self.scene.add_class(label, "bit-label");
        (root, rect, label)
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> + '_ {
        self.components.iter()
    }

    pub fn component_id(&self, key: &str) -> Result<ComponentId, CircuitError> {
        self.component_keys
            .get(key)
            .copied()
            .ok_or_else(|| CircuitError::ComponentNotFound(key.to_owned()))
    }

    /// Pin playing `role` on `component`.
    pub fn port(&self, component: ComponentId, role: Role) -> Result<PinId, CircuitError> {
        let c = self
            .components
            .get(component)
            .ok_or_else(|| CircuitError::ComponentNotFound(component.to_string()))?;
        c.kind
            .pin(role)
            .ok_or_else(|| CircuitError::PinNotFound(format!("{}.{role}", c.key)))
    }

    /// Sources in creation order; this is also the keyboard focus order.
    pub fn sources(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, c)| matches!(c.kind, ComponentKind::Source { .. }))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn source_state(&self, id: ComponentId) -> Result<bool, CircuitError> {
        match self.components.get(id).map(|c| (&c.key, c.kind)) {
            Some((_, ComponentKind::Source { on, .. })) => Ok(on),
            Some((key, _)) => Err(CircuitError::NotASource(key.clone())),
            None => Err(CircuitError::ComponentNotFound(id.to_string())),
        }
    }

    /// Stores a source's boolean without propagating.
    pub fn set_source(&mut self, id: ComponentId, value: bool) -> Result<(), CircuitError> {
        let c = self
            .components
            .get_mut(id)
            .ok_or_else(|| CircuitError::ComponentNotFound(id.to_string()))?;
        let ComponentKind::Source { on, .. } = &mut c.kind else {
            return Err(CircuitError::NotASource(c.key.clone()));
        };
        *on = value;
        if let Some(label) = c.visual.label {
            self.scene.set_text(label, if value { "1" } else { "0" });
        }
        Ok(())
    }

    /// Source whose box contains `pos`, given in scene root coordinates.
    pub fn hit_test_source(&self, pos: Pos2) -> Option<ComponentId> {
        self.components
            .iter()
            .filter(|(_, c)| matches!(c.kind, ComponentKind::Source { .. }))
            .find(|(_, c)| {
                let local = self.scene.world_transform(c.visual.root).invert(pos);
                c.bounds.contains(local)
            })
            .map(|(id, _)| id)
    }

    // Wires

    /// Links two qualified pins inside `scope` and draws the routed wire.
    pub fn connect<'a, 'b>(
        &mut self,
        scope: GroupId,
        from: impl Into<PinRef<'a>>,
        to: impl Into<PinRef<'b>>,
        via: &[Pos2],
    ) -> Result<WireId, CircuitError> {
        let layer = self.group_record(scope)?.layers.wires;
        let from = self.pin_id(from)?;
        let to = self.pin_id(to)?;
        let a = self.lookup_pin(from)?.endpoint();
        let b = self.lookup_pin(to)?.endpoint();

        let points = routing::route(a, b, via, self.config.approach_margin);
        let element = self
            .scene
            .create_in(layer, routing::wire_shape(points.clone()));
        self.scene.add_class(element, "wire");

        let id = self.wires.insert(Wire {
            from,
            to,
            via: via.to_vec(),
            points,
            group: scope,
            element,
        });
        self.group_record_mut(scope)?.items.wires.push(id);
        Ok(id)
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id)
    }

    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> + '_ {
        self.wires.iter()
    }

    // Inspection

    pub fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot {
            status: self.status,
            pins: self
                .pins
                .values()
                .map(|p| PinSnapshot {
                    key: p.key.clone(),
                    x: p.pos.x,
                    y: p.pos.y,
                    radius: p.radius,
                    value: p.value(),
                    driven: p.driven(),
                })
                .collect(),
            components: self
                .components
                .values()
                .map(|c| ComponentSnapshot {
                    key: c.key.clone(),
                    kind: c.kind.name().to_owned(),
                    on: match c.kind {
                        ComponentKind::Source { on, .. } => Some(on),
                        ComponentKind::Display { input } => {
                            Some(self.pins.get(input).is_some_and(Pin::is_high))
                        }
                        _ => None,
                    },
                })
                .collect(),
            wires: self.wires.len(),
        }
    }

    pub fn display(&self) -> String {
        let mut out = String::new();
        use std::fmt::Write as _;

        writeln!(out, "======================================").ok();
        writeln!(
            out,
            "  COMPONENTS ({} total, {} pins)",
            self.components.len(),
            self.pins.len()
        )
        .ok();
        writeln!(out, "======================================").ok();

        let groups: Vec<&Group> = self.groups.values().collect();
        for (gidx, group) in groups.iter().enumerate() {
            let last_group = gidx + 1 == groups.len();
            let branch = if last_group { "`-" } else { "|-" };
            let cont = if last_group { "   " } else { "|  " };
            writeln!(
                out,
                "{branch} Group \"{}\" at ({}, {}) x{}",
                group.name, group.offset.x, group.offset.y, group.scale
            )
            .ok();

            let count = group.items.components.len();
            for (idx, &cid) in group.items.components.iter().enumerate() {
                let Some(c) = self.components.get(cid) else {
                    continue;
                };
                let last = idx + 1 == count;
                let c_branch = if last { "`-" } else { "|-" };
                let c_cont = if last { "   " } else { "|  " };
                let state = match c.kind {
                    ComponentKind::Source { on: true, .. } => " ON",
                    ComponentKind::Source { on: false, .. } => " OFF",
                    _ => "",
                };
                writeln!(out, "{cont}{c_branch} {} [{}]{state}", c.kind.name(), c.key).ok();

                let pins = c.kind.pins();
                for (pidx, (role, pid)) in pins.iter().enumerate() {
                    let Some(pin) = self.pins.get(*pid) else {
                        continue;
                    };
                    let p_branch = if pidx + 1 == pins.len() { "`-" } else { "|-" };
                    let arrow = match role.kind() {
                        PinKind::Input => "<-",
                        PinKind::Output => "->",
                    };
                    writeln!(
                        out,
                        "{cont}{c_cont}{p_branch} {role} ({})  {arrow} {}",
                        role.kind(),
                        pin.signal
                    )
                    .ok();
                }
            }
        }

        writeln!(out).ok();
        writeln!(out, "======================================").ok();
        writeln!(out, "  WIRES ({} total)", self.wires.len()).ok();
        writeln!(out, "======================================").ok();
        for w in self.wires.values() {
            let name = |id: PinId| self.pins.get(id).map_or("?", |p| p.key.as_str());
            writeln!(out, "{} -> {}", name(w.from), name(w.to)).ok();
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::GroupOptions;
    use egui::pos2;

    #[test]
    fn components_register_their_role_pins() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group("g", GroupOptions::default())
            .expect("group");
        let and = m.add_and("AND1", 300.0, 160.0, 0.75).expect("and");
        let not = m.add_not("N", 0.0, 0.0, 1.0).expect("not");

        let circuit = m.into_circuit();
        let in_a = circuit.port(and, Role::InA).expect("inA");
        assert_eq!(circuit.lookup_pin(in_a).expect("pin").key, "g:AND1.inA");
        assert_eq!(circuit.lookup_pin("g:AND1.out").expect("out").pos, pos2(354.0, 187.0));
        assert_eq!(circuit.lookup_pin("g:N.out").expect("out").radius, 5.0);
        assert!(matches!(circuit.port(not, Role::InA), Err(CircuitError::PinNotFound(_))));
        assert_eq!(circuit.pins().count(), 5);
    }

    #[test]
    fn missing_pins_are_hard_errors() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group("g", GroupOptions::default())
            .expect("group");
        m.add_source("A", 0.0, 0.0).expect("source");

        assert_eq!(
            m.connect("A.out", "nowhere.in", &[]),
            Err(CircuitError::PinNotFound("g:nowhere.in".to_owned()))
        );
        assert!(matches!(
            m.circuit().lookup_pin(""),
            Err(CircuitError::MissingPinRef)
        ));
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group("g", GroupOptions::default())
            .expect("group");
        m.add_source("A", 0.0, 0.0).expect("source");
        assert_eq!(
            m.add_source("A", 100.0, 0.0),
            Err(CircuitError::DuplicateId("g:A".to_owned()))
        );
        m.add_dangling("B", "in", 0.0, 0.0, None).expect("dangling");
        assert_eq!(
            m.add_display("B", 0.0, 0.0, None),
            Err(CircuitError::DuplicateId("g:B.in".to_owned()))
        );
        // Nothing half-built is left behind.
        assert!(m.circuit().component_id("g:B").is_err());
    }

    #[test]
    fn sources_are_the_only_toggleable_components() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group("g", GroupOptions::default())
            .expect("group");
        let a = m.add_source("A", 0.0, 0.0).expect("source");
        let d = m.add_display("OUT", 200.0, 0.0, None).expect("display");
        let circuit = m.into_circuit();

        circuit.set_source(a, true).expect("source");
        assert_eq!(circuit.source_state(a), Ok(true));
        assert_eq!(
            circuit.set_source(d, true),
            Err(CircuitError::NotASource("g:OUT".to_owned()))
        );
        assert_eq!(circuit.sources(), vec![a]);
    }

    #[test]
    fn hit_testing_honors_the_group_transform() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group(
                "g",
                GroupOptions {
                    x: 100.0,
                    y: 50.0,
                    scale: 2.0,
                    show_frame: false,
                },
            )
            .expect("group");
        let a = m.add_source("A", 10.0, 10.0).expect("source");
        let circuit = m.into_circuit();

        // Local (10,10)..(74,58) maps to (120,70)..(248,166).
        assert_eq!(circuit.hit_test_source(pos2(130.0, 80.0)), Some(a));
        assert_eq!(circuit.hit_test_source(pos2(115.0, 80.0)), None);
        assert_eq!(circuit.hit_test_source(pos2(240.0, 160.0)), Some(a));
    }

    #[test]
    fn snapshot_lists_every_pin() {
        let mut circuit = Circuit::default();
        let mut m = circuit
            .create_group("g", GroupOptions::default())
            .expect("group");
        m.add_source("A", 0.0, 0.0).expect("source");
        m.add_display("OUT", 200.0, 0.0, None).expect("display");
        m.connect("A.out", "OUT.in", &[]).expect("wire");
        let circuit = m.into_circuit();

        let snap = circuit.snapshot();
        assert_eq!(snap.pins.len(), 2);
        assert_eq!(snap.wires, 1);
        assert_eq!(snap.components[0].kind, "BIT");
        assert_eq!(snap.components[1].on, Some(false));

        let dump = circuit.display();
        assert!(dump.contains("BIT [g:A] OFF"));
        assert!(dump.contains("g:A.out -> g:OUT.in"));
    }
    #[test]
    fn unknown_scope_is_rejected_everywhere() {
        let mut circuit = Circuit::default();
        {
            let mut m = circuit
                .create_group("g", GroupOptions::default())
                .expect("group");
            m.add_source("A", 0.0, 0.0).expect("A");
            m.add_not("N", 120.0, 0.0, 1.0).expect("N");
        }
        let nowhere = GroupId::default();
        let elements = circuit.scene.len();

        assert!(matches!(
            circuit.create_pin(nowhere, "x", "p", pos2(0.0, 0.0), 4.0),
            Err(CircuitError::UnknownScope(_))
        ));
        assert!(matches!(
            circuit.create_component(
                nowhere,
                "S",
                Placement::Source {
                    at: pos2(0.0, 0.0)
                }
            ),
            Err(CircuitError::UnknownScope(_))
        ));
        assert!(matches!(
            circuit.connect(nowhere, "g:A.out", "g:N.in", &[]),
            Err(CircuitError::UnknownScope(_))
        ));

        assert_eq!(circuit.pins().count(), 3);
        assert_eq!(circuit.components().count(), 2);
        assert_eq!(circuit.wires().count(), 0);
        assert_eq!(circuit.scene.len(), elements);
    }
}
