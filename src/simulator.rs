use std::fmt::Display;

use crate::{
    db::{Circuit, ComponentId, ComponentKind},
    error::{CircuitError, RenderError},
};

/// Logic level of a pin plus whether anything actually drives it.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signal {
    pub value: bool,
    pub driven: bool,
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.driven, self.value) {
            (false, false) => f.write_str("~0"),
            (false, true) => f.write_str("~1"),
            (true, false) => f.write_str("0"),
            (true, true) => f.write_str("1"),
        }
    }
}

impl Signal {
    pub const FLOATING: Self = Self {
        value: false,
        driven: false,
    };

    pub fn driven(value: bool) -> Self {
        Self {
            value,
            driven: true,
        }
    }

    /// Only a driven true renders as high.
    pub fn is_high(self) -> bool {
        self.value && self.driven
    }

    pub fn and(self, other: Self) -> Self {
        Self {
            value: self.value && other.value,
            driven: self.driven || other.driven,
        }
    }

    pub fn or(self, other: Self) -> Self {
        Self {
            value: self.value || other.value,
            driven: self.driven || other.driven,
        }
    }

    pub fn not(self) -> Self {
        Self {
            value: !self.value,
            driven: self.driven,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationStatus {
    /// Nothing evaluated yet
    #[default]
    Idle,
    /// A round changed nothing after `iterations` rounds
    Stable { iterations: usize },
    /// The round budget ran out while values were still changing
    Unstable { iterations: usize },
    /// Triggered while a pass was already running
    Skipped,
}

/// Derived-visual hook run after every pass. Errors are dropped.
pub type RenderCallback = Box<dyn FnMut(&mut Circuit) -> Result<(), RenderError>>;

impl Circuit {
    /// Registers a callback run at the end of every render pass, in order.
    pub fn on_render(
        &mut self,
        callback: impl FnMut(&mut Self) -> Result<(), RenderError> + 'static,
    ) {
        self.callbacks.push(Box::new(callback));
    }

    /// Recomputes every pin from the sources, syncs the scene and runs the
    /// render callbacks. Calling it from inside a callback does nothing.
    pub fn render(&mut self) -> SimulationStatus {
        if self.rendering {
            log::trace!("Render requested during a pass, ignored");
            return SimulationStatus::Skipped;
        }
        self.rendering = true;
        log::debug!("=== Begin simulation ===");

        self.reset_pins();
        self.seed_sources();
        let status = self.settle();
        self.status = status;
        self.sync_visuals();
        self.run_callbacks();

        log::debug!("=== End simulation ({status:?}) ===");
        self.rendering = false;
        status
    }

    /// Flips a source and re-renders.
    pub fn toggle_source(&mut self, id: ComponentId) -> Result<SimulationStatus, CircuitError> {
        let on = !self.source_state(id)?;
        self.set_source(id, on)?;
        if let Some(c) = self.component(id) {
            log::info!("{} -> {}", c.key, u8::from(on));
        }
        Ok(self.render())
    }

    fn reset_pins(&mut self) {
        for pin in self.pins.values_mut() {
            pin.signal = Signal::FLOATING;
        }
    }

    fn seed_sources(&mut self) {
        for c in self.components.values() {
            if let ComponentKind::Source { out, on } = c.kind
                && let Some(pin) = self.pins.get_mut(out)
            {
                pin.signal = Signal::driven(on);
            }
        }
    }

    fn settle(&mut self) -> SimulationStatus {
        let max = self.config.settle_rounds;
        for round in 1..=max {
            let changed = self.propagate_wires() | self.evaluate_gates();
            if !changed {
                log::debug!("Simulation stabilized after {round} rounds");
                return SimulationStatus::Stable { iterations: round };
            }
        }
        log::warn!("Simulation reached {max} rounds without stabilizing");
        SimulationStatus::Unstable { iterations: max }
    }

    /// Each wire overwrites its destination with its source, in insertion order.
    fn propagate_wires(&mut self) -> bool {
        let mut changed = false;
        for w in self.wires.values() {
            let Some(signal) = self.pins.get(w.from).map(|p| p.signal) else {
                continue;
            };
            if let Some(dst) = self.pins.get_mut(w.to)
                && dst.signal != signal
            {
                dst.signal = signal;
                changed = true;
            }
        }
        changed
    }

    fn evaluate_gates(&mut self) -> bool {
        let mut changed = false;
        for c in self.components.values() {
            let signal = |id| self.pins.get(id).map_or(Signal::FLOATING, |p| p.signal);
            let (out, next) = match c.kind {
                ComponentKind::And { in_a, in_b, out } => (out, signal(in_a).and(signal(in_b))),
                ComponentKind::Or { in_a, in_b, out } => (out, signal(in_a).or(signal(in_b))),
                ComponentKind::Not { input, out } => (out, signal(input).not()),
                ComponentKind::Source { .. } | ComponentKind::Display { .. } => continue,
            };
            if let Some(pin) = self.pins.get_mut(out)
                && pin.signal != next
            {
                pin.signal = next;
                changed = true;
            }
        }
        changed
    }

    fn sync_visuals(&mut self) {
        for pin in self.pins.values() {
            self.scene.toggle_class(pin.element, "high", pin.is_high());
        }
        for w in self.wires.values() {
            let high = self.pins.get(w.from).is_some_and(|p| p.is_high());
            self.scene.toggle_class(w.element, "high", high);
        }

        for c in self.components.values() {
            let high = |id| self.pins.get(id).is_some_and(|p| p.is_high());
            match c.kind {
                ComponentKind::Source { on, .. } => {
                    self.scene.toggle_class(c.visual.root, "active", on);
                    if let Some(label) = c.visual.label {
                        self.scene.set_text(label, if on { "1" } else { "0" });
                    }
                }
                ComponentKind::Display { input } => {
                    let on = high(input);
                    if let Some(label) = c.visual.label {
                        let text = if on {
                            &self.config.display_on_text
                        } else {
                            &self.config.display_off_text
                        };
                        self.scene.set_text(label, text);
                    }
                    self.scene.toggle_class(c.visual.root, "active", on);
                }
                ComponentKind::And { out, .. }
                | ComponentKind::Or { out, .. }
                | ComponentKind::Not { out, .. } => {
                    self.scene.toggle_class(c.visual.outline, "high", high(out));
                }
            }
        }
    }

    fn run_callbacks(&mut self) {
        let mut callbacks = std::mem::take(&mut self.callbacks);
        for callback in &mut callbacks {
            if let Err(err) = callback(self) {
                log::trace!("Render callback failed: {err}");
            }
        }
        // Callbacks registered during the pass run from the next one on.
        let added = std::mem::replace(&mut self.callbacks, callbacks);
        self.callbacks.extend(added);
    }
}
