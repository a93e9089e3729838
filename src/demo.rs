//! The 4-input prime detector shown by the viewer.
//!
//! Inputs A..D are the bits of `n = 8D + 4C + 2B + A`. The product terms
//! AC, BC, BD, ABD and BCD are XORed with B through a chain of XOR stages,
//! each built from two NOTs, two ANDs and an OR. The display reads high iff
//! `n` is prime.

use egui::{Pos2, pos2, vec2};

use crate::{
    assets::GATE_SIZE,
    config::CanvasConfig,
    db::{Circuit, ComponentId},
    error::CircuitError,
    module::{GroupOptions, Module},
};

pub const DEMO_GROUP: &str = "demo1";
pub const DEMO_SCALE: f32 = 1.2;
pub const DISPLAY_ID: &str = "PRIME_DISPLAY";

/// Gate scale used throughout the demo
const S: f32 = 0.75;
const H: f32 = GATE_SIZE * S;

const RAIL_X: f32 = 200.0;
const RAIL_GAP: f32 = 20.0;
const AND1_X: f32 = 300.0;
const AND2_X: f32 = 406.0;
const NOT_X: f32 = AND2_X + 120.0;
/// Junction offsets behind an XOR stage's inverters
const NEAR: f32 = 30.0;
const FAR: f32 = 60.0;
/// Gap left in front of a pin before the last horizontal hop
const LEAD: f32 = 6.0;
const PAIR_SEP: f32 = 40.0;
const STAGE_GAP: f32 = 110.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bus {
    A,
    B,
    C,
    D,
}

impl Bus {
    const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    fn out(self) -> String {
        format!("{}.out", self.name())
    }

    fn rail_x(self) -> f32 {
        RAIL_X + RAIL_GAP * self.index() as f32
    }
}

/// Handles into a built demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimeDemo {
    /// A, B, C, D
    pub inputs: [ComponentId; 4],
    pub display: ComponentId,
}

/// Fresh circuit holding the demo in group `demo1` at scale 1.2, rendered once.
pub fn build_prime_circuit(config: CanvasConfig) -> Result<(Circuit, PrimeDemo), CircuitError> {
    let mut circuit = Circuit::new(config);
    let demo = {
        let mut m = circuit.create_group(
            DEMO_GROUP,
            GroupOptions {
                scale: DEMO_SCALE,
                ..GroupOptions::default()
            },
        )?;
        build_prime_demo(&mut m)?
    };
    Ok((circuit, demo))
}

fn pos(m: &Module<'_>, r: &str) -> Result<Pos2, CircuitError> {
    Ok(m.pin(r)?.pos)
}

/// Y of every tap on each input rail.
struct Rails {
    taps: [Vec<f32>; 4],
}

impl Rails {
    fn tap(&mut self, bus: Bus, y: f32) {
        self.taps[bus.index()].push(y);
    }
}

/// Wire from an input, down its rail, into `dest`.
fn feed_from(
    m: &mut Module<'_>,
    rails: &mut Rails,
    bus: Bus,
    dest: &str,
) -> Result<(), CircuitError> {
    let src = pos(m, &bus.out())?;
    let dst = m.pin(dest)?;
    let (dst, r) = (dst.pos, dst.radius);
    let rx = bus.rail_x();
    rails.tap(bus, dst.y);
    let approach_x = dst.x - r - LEAD;
    m.connect(
        &bus.out(),
        dest,
        &[pos2(rx, src.y), pos2(rx, dst.y), pos2(approach_x, dst.y)],
    )?;
    Ok(())
}

/// Dog-leg through `x_mid` from one pin to another.
fn run(m: &mut Module<'_>, from: &str, to: &str, x_mid: Option<f32>) -> Result<(), CircuitError> {
    let a = pos(m, from)?;
    let b = m.pin(to)?;
    let (b, r) = (b.pos, b.radius);
    let xm = x_mid.unwrap_or(a.x.min(b.x) + 40.0);
    let approach_x = b.x - r - LEAD;
    m.connect(
        from,
        to,
        &[pos2(xm, a.y), pos2(xm, b.y), pos2(approach_x, b.y)],
    )?;
    Ok(())
}

/// Input rails are drawn once every tap is known and follow their input's level.
fn draw_rails(m: &mut Module<'_>, rails: &Rails) -> Result<(), CircuitError> {
    let mut traces = Vec::new();
    for bus in Bus::ALL {
        let ys = &rails.taps[bus.index()];
        let y1 = ys.iter().copied().fold(f32::INFINITY, f32::min);
        let y2 = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let x = bus.rail_x();
        let el = m.add_trace(pos2(x, y1), pos2(x, y2))?;
        let src = m.pin_id(&bus.out())?;
        traces.push((el, src));
    }
    m.on_render(move |c| {
        for &(el, src) in &traces {
            let Some(pin) = c.pin(src) else {
                continue;
            };
            let high = pin.is_high();
            c.scene.toggle_class(el, "high", high);
        }
        Ok(())
    });
    Ok(())
}

/// AND pair fed by two inverters: `<name>_AND_TOP` takes the top inverter on
/// `inB`, `<name>_AND_BOT` the bottom one on `inA`.
fn and_pair(
    m: &mut Module<'_>,
    name: &str,
    top_not: &str,
    bot_not: &str,
) -> Result<(), CircuitError> {
    let top_out = format!("{top_not}.out");
    let bot_out = format!("{bot_not}.out");
    let o_top = pos(m, &top_out)?;
    let o_bot = pos(m, &bot_out)?;

    let and_top = format!("{name}_AND_TOP");
    m.add_and(&and_top, o_top.x + 30.0, o_top.y - 64.0 * S, S)?;
    m.connect(&top_out, &format!("{and_top}.inB"), &[])?;

    let and_bot = format!("{name}_AND_BOT");
    m.add_and(&and_bot, o_bot.x + 30.0, o_bot.y - 8.0 * S, S)?;
    m.connect(&bot_out, &format!("{and_bot}.inA"), &[])?;
    Ok(())
}

/// `<name>_XOR_OR` joining the AND pair.
fn or_join(m: &mut Module<'_>, name: &str) -> Result<(), CircuitError> {
    let top_out = format!("{name}_AND_TOP.out");
    let bot_out = format!("{name}_AND_BOT.out");
    let o_t = pos(m, &top_out)?;
    let o_b = pos(m, &bot_out)?;
    let mid = (o_t.y + o_b.y) / 2.0;

    let or = format!("{name}_XOR_OR");
    m.add_or(&or, o_t.x + 20.0, mid - 36.0 * S, S)?;
    let in_a = format!("{or}.inA");
    let in_b = format!("{or}.inB");
    let i_a = pos(m, &in_a)?;
    let i_b = pos(m, &in_b)?;
    m.connect(
        &top_out,
        &in_a,
        &[pos2(o_t.x, i_a.y), pos2(i_a.x - LEAD, i_a.y)],
    )?;
    m.connect(
        &bot_out,
        &in_b,
        &[pos2(o_b.x, i_b.y), pos2(i_b.x - LEAD, i_b.y)],
    )?;
    Ok(())
}

/// Layout of a regular XOR stage.
struct Stage<'a> {
    name: &'a str,
    x_not: f32,
    y_top: f32,
    y_bot: f32,
}

impl Stage<'_> {
    /// Inverter rows centered on the midpoint of two outputs, `PAIR_SEP` apart.
    fn centered(name: &str, x_not: f32, top: Pos2, bot: Pos2) -> Stage<'_> {
        let mid = (top.y + bot.y) / 2.0;
        Stage {
            name,
            x_not,
            y_top: mid - PAIR_SEP / 2.0,
            y_bot: mid + PAIR_SEP / 2.0,
        }
    }

    /// Inverter rows pulled in from two outputs by equal legs.
    fn converging(name: &str, top: Pos2, bot: Pos2) -> Stage<'_> {
        let leg = ((bot.y - top.y - PAIR_SEP) / 2.0).max(0.0);
        Stage {
            name,
            x_not: top.x.max(bot.x) + STAGE_GAP,
            y_top: top.y + leg,
            y_bot: bot.y - leg,
        }
    }

    fn part(&self, part: &str) -> String {
        format!("{}_{part}", self.name)
    }
}

/// XOR of `top_src` and `bot_src`. `top_via` overrides the route into the
/// top junction.
fn xor_stage(
    m: &mut Module<'_>,
    st: &Stage<'_>,
    top_src: &str,
    bot_src: &str,
    top_via: Option<Vec<Pos2>>,
) -> Result<(), CircuitError> {
    let not_top = st.part("NOT_TOP");
    let not_bot = st.part("NOT_BOT");
    m.add_not(&not_top, st.x_not, st.y_top - H / 2.0, S)?;
    let top_j = m.add_junction(&st.part("TOP_BEHIND"), st.x_not - NEAR, st.y_top, None)?;
    m.add_not(&not_bot, st.x_not, st.y_bot - H / 2.0, S)?;
    let bot_j = m.add_junction(&st.part("BOT_BEHIND"), st.x_not - FAR, st.y_bot, None)?;

    let top_x = pos(m, top_src)?.x;
    let top_via = top_via
        .unwrap_or_else(|| vec![pos2(top_x, st.y_top), pos2(st.x_not - NEAR, st.y_top)]);
    m.connect(top_src, top_j, &top_via)?;
    m.connect(
        top_j,
        &format!("{not_top}.in"),
        &[pos2(st.x_not - LEAD, st.y_top)],
    )?;

    let bot_x = pos(m, bot_src)?.x;
    m.connect(
        bot_src,
        bot_j,
        &[pos2(bot_x, st.y_bot), pos2(st.x_not - FAR, st.y_bot)],
    )?;
    m.connect(
        bot_j,
        &format!("{not_bot}.in"),
        &[pos2(st.x_not - LEAD, st.y_bot)],
    )?;

    and_pair(m, st.name, &not_top, &not_bot)?;

    // Cross-feeds: each AND sees one input straight and the other inverted.
    let and_top_a = st.part("AND_TOP.inA");
    let and_bot_b = st.part("AND_BOT.inB");
    let top_a_y = pos(m, &and_top_a)?.y;
    let bot_b_y = pos(m, &and_bot_b)?.y;
    m.connect(
        bot_j,
        &and_top_a,
        &[pos2(st.x_not - FAR, st.y_bot), pos2(st.x_not - FAR, top_a_y)],
    )?;
    m.connect(
        top_j,
        &and_bot_b,
        &[pos2(st.x_not - NEAR, st.y_top), pos2(st.x_not - NEAR, bot_b_y)],
    )?;

    or_join(m, st.name)
}

/// B xor AND1, with its junctions tucked behind the inverters.
fn xor_b_and1(m: &mut Module<'_>) -> Result<(), CircuitError> {
    let and1_out = pos(m, "AND1.out")?;
    let shift = 40.0;
    let y_in1 = and1_out.y - 40.0 - shift;
    let y_a1 = and1_out.y - shift;

    m.add_not("X1_NOT_IN1", NOT_X, y_in1 - H / 2.0, S)?;
    let top_j = m.add_junction("X1_TOP_BEHIND", NOT_X - NEAR, y_in1, None)?;
    let b = pos(m, "B.out")?;
    let top = m.pin(top_j)?.pos;
    let rail_b = Bus::B.rail_x();
    m.connect(
        "B.out",
        top_j,
        &[pos2(rail_b, b.y), pos2(rail_b, y_in1), pos2(top.x, y_in1)],
    )?;
    m.connect(top_j, "X1_NOT_IN1.in", &[pos2(NOT_X - LEAD, y_in1)])?;

    m.add_not("X1_NOT_A1", NOT_X, y_a1 - H / 2.0, S)?;
    let bot_j = m.add_junction("X1_BOT_BEHIND", NOT_X - FAR, y_a1, None)?;

    and_pair(m, "X1", "X1_NOT_IN1", "X1_NOT_A1")?;

    // Spines carry the straight inputs across to the opposite AND.
    let bot_in_b = pos(m, "X1_AND_BOT.inB")?.y;
    let spine_bot = m.add_junction("X1_SPINE_BOT", top.x, bot_in_b, None)?;
    m.connect(top_j, spine_bot, &[])?;
    m.connect(spine_bot, "X1_AND_BOT.inB", &[])?;

    let top_in_a = pos(m, "X1_AND_TOP.inA")?.y;
    let spine_top = m.add_junction("X1_SPINE_TOP", NOT_X - FAR, top_in_a, None)?;
    m.connect(bot_j, spine_top, &[])?;
    m.connect(spine_top, "X1_AND_TOP.inA", &[])?;

    or_join(m, "X1")?;

    let bot = m.pin(bot_j)?.pos;
    m.connect(
        "AND1.out",
        bot_j,
        &[
            pos2(and1_out.x, and1_out.y - 40.0),
            pos2(bot.x, and1_out.y - 40.0),
        ],
    )?;
    m.connect(bot_j, "X1_NOT_A1.in", &[])?;
    Ok(())
}

/// Builds the detector inside `m` and renders once.
pub fn build_prime_demo(m: &mut Module<'_>) -> Result<PrimeDemo, CircuitError> {
    let inputs = [
        m.add_source("A", 88.0, 164.0)?,
        m.add_source("B", 88.0, 234.0)?,
        m.add_source("C", 88.0, 310.0)?,
        m.add_source("D", 88.0, 385.0)?,
    ];

    let mut rails = Rails {
        taps: Default::default(),
    };
    for bus in Bus::ALL {
        let y = pos(m, &bus.out())?.y;
        rails.tap(bus, y);
    }

    // Product terms
    m.add_and("AND1", AND1_X, 160.0, S)?;
    feed_from(m, &mut rails, Bus::A, "AND1.inA")?;
    feed_from(m, &mut rails, Bus::C, "AND1.inB")?;

    m.add_and("AND2", AND1_X, 220.0, S)?;
    feed_from(m, &mut rails, Bus::B, "AND2.inA")?;
    feed_from(m, &mut rails, Bus::C, "AND2.inB")?;

    m.add_and("AND3", AND1_X, 280.0, S)?;
    feed_from(m, &mut rails, Bus::B, "AND3.inA")?;
    feed_from(m, &mut rails, Bus::D, "AND3.inB")?;

    m.add_and("AND4", AND1_X, 340.0, S)?;
    feed_from(m, &mut rails, Bus::A, "AND4.inA")?;
    feed_from(m, &mut rails, Bus::B, "AND4.inB")?;

    m.add_and("AND4B", AND2_X - 20.0, 361.0, S)?;
    run(m, "AND4.out", "AND4B.inA", Some(AND2_X - 40.0))?;
    m.connect("D.out", "AND4B.inB", &[])?;

    m.add_and("AND5", AND1_X, 424.0, S)?;
    feed_from(m, &mut rails, Bus::B, "AND5.inA")?;
    feed_from(m, &mut rails, Bus::C, "AND5.inB")?;

    m.add_and("AND5B", AND2_X - 20.0, 445.0, S)?;
    run(m, "AND5.out", "AND5B.inA", Some(AND2_X - 40.0))?;
    feed_from(m, &mut rails, Bus::D, "AND5B.inB")?;

    draw_rails(m, &rails)?;

    // XOR chain
    xor_b_and1(m)?;

    let x2 = Stage::centered("X2", NOT_X, pos(m, "AND2.out")?, pos(m, "AND3.out")?);
    xor_stage(m, &x2, "AND2.out", "AND3.out", None)?;

    let x12 = Stage::converging("X12", pos(m, "X1_XOR_OR.out")?, pos(m, "X2_XOR_OR.out")?);
    xor_stage(m, &x12, "X1_XOR_OR.out", "X2_XOR_OR.out", None)?;

    let x3 = Stage::centered("X3", NOT_X, pos(m, "AND4B.out")?, pos(m, "AND5B.out")?);
    xor_stage(m, &x3, "AND4B.out", "AND5B.out", None)?;

    // The last stage is laid out against X2/X3 but takes X12 on top.
    let x23 = Stage::converging("X23", pos(m, "X2_XOR_OR.out")?, pos(m, "X3_XOR_OR.out")?);
    let x12_out = pos(m, "X12_XOR_OR.out")?;
    let y_mid = (x12_out.y + (x23.y_top + x23.y_bot) / 2.0) / 2.0;
    let x_top = x23.x_not - NEAR;
    xor_stage(
        m,
        &x23,
        "X12_XOR_OR.out",
        "X3_XOR_OR.out",
        Some(vec![
            pos2(x12_out.x, y_mid),
            pos2(x_top, y_mid),
            pos2(x_top, x23.y_top),
        ]),
    )?;

    let out = pos(m, "X23_XOR_OR.out")?;
    let display = m.add_display(DISPLAY_ID, out.x + 20.0, out.y - 18.0, Some(vec2(132.0, 36.0)))?;
    m.connect("X23_XOR_OR.out", &format!("{DISPLAY_ID}.in"), &[])?;

    m.render();
    Ok(PrimeDemo { inputs, display })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulationStatus;

    #[test]
    fn demo_has_the_expected_shape() {
        let (circuit, demo) = build_prime_circuit(CanvasConfig::default()).expect("demo");
        assert_eq!(circuit.components().count(), 37);
        assert_eq!(circuit.wires().count(), 67);
        assert_eq!(circuit.sources(), demo.inputs.to_vec());
        assert!(matches!(circuit.status, SimulationStatus::Stable { .. }));
    }

    #[test]
    fn rails_span_every_tap() {
        let (circuit, _) = build_prime_circuit(CanvasConfig::default()).expect("demo");
        let a_out = circuit.lookup_pin("demo1:A.out").expect("A");
        assert_eq!(a_out.pos, pos2(156.0, 188.0));
        // AND4 inA is the lowest A tap.
        let and4 = circuit.lookup_pin("demo1:AND4.inA").expect("AND4");
        assert_eq!(and4.pos.y, 346.0);
    }
}
