use logic_canvas::{
    config::CanvasConfig,
    db::{Circuit, ComponentKind},
    demo::{PrimeDemo, build_prime_circuit},
    module::GroupOptions,
    simulator::SimulationStatus,
    svg::render_svg,
};

fn demo() -> (Circuit, PrimeDemo) {
    build_prime_circuit(CanvasConfig::default()).expect("demo builds")
}

fn is_prime(n: u32) -> bool {
    n >= 2 && (2..n).all(|d| n % d != 0)
}

fn apply(circuit: &mut Circuit, demo: &PrimeDemo, n: u32) -> SimulationStatus {
    for (bit, &source) in demo.inputs.iter().enumerate() {
        circuit
            .set_source(source, n >> bit & 1 == 1)
            .expect("inputs are sources");
    }
    circuit.render()
}

fn display_text(circuit: &Circuit, demo: &PrimeDemo) -> String {
    let label = circuit
        .component(demo.display)
        .and_then(|c| c.visual.label)
        .expect("display has a label");
    circuit.scene.text(label).unwrap_or_default().to_owned()
}

fn display_on(circuit: &Circuit, demo: &PrimeDemo) -> bool {
    let c = circuit.component(demo.display).expect("display exists");
    let ComponentKind::Display { input } = c.kind else {
        panic!("not a display");
    };
    circuit.pin(input).expect("display pin").is_high()
}

#[test]
fn detector_matches_primality_for_every_input() {
    let (mut circuit, demo) = demo();
    for n in 0..16 {
        let status = apply(&mut circuit, &demo, n);
        assert!(
            matches!(status, SimulationStatus::Stable { iterations } if iterations <= 16),
            "n = {n}: {status:?}"
        );
        assert_eq!(display_on(&circuit, &demo), is_prime(n), "n = {n}");

        let expected = if is_prime(n) { "1: Prime" } else { "0: Composite" };
        assert_eq!(display_text(&circuit, &demo), expected, "n = {n}");
        assert_eq!(
            circuit.scene.has_class(
                circuit.component(demo.display).unwrap().visual.root,
                "active"
            ),
            is_prime(n),
            "n = {n}"
        );
    }
}

#[test]
fn truth_table_rows() {
    // (A, B, C, D) -> display
    let rows = [
        ([0, 0, 0, 0], false),
        ([0, 1, 0, 0], true),
        ([1, 0, 1, 0], true),
        ([1, 1, 0, 0], true),
        ([1, 1, 1, 1], false),
        ([0, 0, 0, 1], false),
        ([1, 0, 1, 1], true),
    ];
    let (mut circuit, demo) = demo();
    for (bits, expected) in rows {
        for (source, bit) in demo.inputs.iter().zip(bits) {
            circuit.set_source(*source, bit == 1).unwrap();
        }
        circuit.render();
        assert_eq!(display_on(&circuit, &demo), expected, "{bits:?}");
    }
}

#[test]
fn toggling_a_and_c_lights_the_display() {
    let (mut circuit, demo) = demo();
    assert!(!display_on(&circuit, &demo));

    circuit.toggle_source(demo.inputs[0]).unwrap();
    circuit.toggle_source(demo.inputs[2]).unwrap();

    assert!(display_on(&circuit, &demo));
    assert_eq!(display_text(&circuit, &demo), "1: Prime");
    let snapshot = circuit.snapshot();
    let display = snapshot
        .components
        .iter()
        .find(|c| c.kind == "DISPLAY")
        .unwrap();
    assert_eq!(display.on, Some(true));
}

#[test]
fn exported_svg_carries_the_diagram() {
    let (mut circuit, demo) = demo();
    apply(&mut circuit, &demo, 13);
    let svg = render_svg(&circuit.scene);

    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert!(svg.contains("1: Prime"));
    assert!(svg.contains("id=\"mod-demo1\""));
    assert!(svg.contains("aria-label=\"Bit demo1:A\""));
    // The demo group is drawn without a frame.
    assert!(!svg.contains("class=\"module-frame\""));
}

#[test]
fn framed_group_exports_its_frame() {
    let (mut circuit, _) = demo();
    {
        let mut m = circuit
            .create_group(
                "panel",
                GroupOptions {
                    x: 600.0,
                    show_frame: true,
                    ..GroupOptions::default()
                },
            )
            .unwrap();
        m.add_source("X", 10.0, 20.0).unwrap();
    }
    circuit.render();
    let svg = render_svg(&circuit.scene);

    assert!(svg.contains("id=\"mod-panel\""));
    // Source box (10,20)-(74,68) plus its pin, padded by 8.
    assert!(svg.contains(
        "<rect class=\"module-frame\" x=\"2\" y=\"12\" width=\"88\" height=\"64\" rx=\"10\" \
         pointer-events=\"none\"/>"
    ));
}

#[test]
fn snapshot_serializes_to_json() {
    let (circuit, _) = demo();
    let json = serde_json::to_string(&circuit.snapshot()).unwrap();
    let back: logic_canvas::db::CircuitSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.wires, 67);
    assert_eq!(back.components.len(), 37);
    assert!(back.pins.iter().any(|p| p.key == "demo1:A.out"));
}
