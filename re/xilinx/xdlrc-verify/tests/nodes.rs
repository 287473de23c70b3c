use prjcombine_re_xilinx_interchange::build::{DeviceBuilder, SiteTypeBuilder, TileTypeBuilder};
use prjcombine_re_xilinx_interchange::db::{Device, PinDir};
use prjcombine_re_xilinx_xdlrc::{Options, WireIndex, XdlrcWriter};
use prjcombine_re_xilinx_xdlrc_verify::{
    OutputFormat, ReferenceDump, check_tile_order, find_node_mismatches, write_mismatches,
};
use std::io::Cursor;

fn reference(text: &str) -> ReferenceDump {
    ReferenceDump::parse(Cursor::new(text)).unwrap()
}

fn render(format: OutputFormat, mismatches: &[String]) -> String {
    let mut buf = Vec::<u8>::new();
    format.write(&mut buf, mismatches).unwrap();
    String::from_utf8(buf).unwrap()
}

const ALIGNMENT_REF: &str = "\
TILE TILE_A
WIRE TILE_A/W0 #N0
WIRE TILE_A/W1 #
TILE TILE_B
WIRE TILE_B/W0 #N1
END
";

fn alignment_index() -> WireIndex {
    let mut index = WireIndex::new();
    index.push("TILE_A", "W0", true);
    index.push("TILE_A", "W1", true);
    index.push("TILE_B", "W0", true);
    index
}

#[test]
fn alignment() {
    let dump = reference(ALIGNMENT_REF);
    let check = find_node_mismatches(&dump, alignment_index().entries());
    assert_eq!(check.mismatches, ["TILE_A/W0", "TILE_B/W0"]);
    assert_eq!(check.checked, 3);
    assert_eq!(check.unconsumed, 0);
}

#[test]
fn idempotent() {
    let dump = reference(ALIGNMENT_REF);
    let index = alignment_index();
    let a = find_node_mismatches(&dump, index.entries());
    let b = find_node_mismatches(&dump, index.entries());
    assert_eq!(a, b);
}

#[test]
fn no_nodes_is_empty_output() {
    let dump = reference(&ALIGNMENT_REF.replace("#N0", "#").replace("#N1", "#"));
    let check = find_node_mismatches(&dump, alignment_index().entries());
    assert!(check.mismatches.is_empty());

    let dir = tempfile::tempdir().unwrap();
    for format in [OutputFormat::Lines, OutputFormat::JsonFragment] {
        let path = dir.path().join("out");
        write_mismatches(&path, &check.mismatches, format).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}

#[test]
fn output_formats() {
    let mismatches = ["TILE_A/W0".to_string(), "TILE_B/W0".to_string()];
    let lines = render(OutputFormat::Lines, &mismatches);
    assert_eq!(lines, "\"TILE_A/W0\"\n\"TILE_B/W0\"\n");
    let frag = render(OutputFormat::JsonFragment, &mismatches);
    assert_eq!(frag, "\"TILE_A/W0\",\n\"TILE_B/W0\"\n");
    assert!(!frag.trim_end().ends_with(','));

    let parsed = jzon::parse(&format!("[{frag}]")).unwrap();
    let from_json: Vec<_> = parsed.members().map(|m| m.as_str().unwrap()).collect();
    let from_lines: Vec<_> = lines.lines().map(|l| l.trim_matches('"')).collect();
    assert_eq!(from_json, from_lines);
    assert_eq!(from_json, ["TILE_A/W0", "TILE_B/W0"]);
}

#[test]
fn unknown_entry_stalls_walk() {
    let dump = reference(ALIGNMENT_REF);
    let mut index = WireIndex::new();
    index.push("TILE_A", "W0", true);
    index.push("TILE_A", "EXTRA", true);
    index.push("TILE_B", "W0", true);
    let check = find_node_mismatches(&dump, index.entries());
    assert_eq!(check.mismatches, ["TILE_A/W0"]);
    assert_eq!(check.checked, 1);
    assert_eq!(check.unconsumed, 2);
}

#[test]
fn skipped_reference_wires() {
    let dump = reference(ALIGNMENT_REF);
    let mut index = WireIndex::new();
    index.push("TILE_B", "W0", true);
    let check = find_node_mismatches(&dump, index.entries());
    assert_eq!(check.mismatches, ["TILE_B/W0"]);
    assert_eq!(check.unconsumed, 0);
}

#[test]
fn tile_order() {
    let dump = reference(ALIGNMENT_REF);
    assert_eq!(check_tile_order(&dump, &alignment_index()), None);
    let mut index = WireIndex::new();
    index.push("TILE_B", "W0", true);
    index.push("TILE_C", "W0", true);
    index.push("TILE_A", "W0", true);
    assert_eq!(check_tile_order(&dump, &index).as_deref(), Some("TILE_A"));
}

fn device() -> Device {
    let mut b = DeviceBuilder::new("xc7a35t");
    let mut st = SiteTypeBuilder::new("SLICEL");
    st.site_pin("A1", PinDir::Input);
    st.site_pin("AMUX", PinDir::Output);
    let slicel = b.add_site_type(st);

    let mut tt = TileTypeBuilder::new("CLBLL_L");
    tt.site(slicel, &["CLBLL_L_A1", "CLBLL_L_AMUX"]);
    let clb = b.add_tile_type(tt);
    let mut tt = TileTypeBuilder::new("INT_L");
    tt.wire("IMUX_L1");
    let int = b.add_tile_type(tt);

    b.add_tile("CLBLL_L_X2Y0", clb, 0, 1, &["SLICE_X0Y0"]);
    b.add_tile("INT_L_X2Y0", int, 0, 0, &[]);
    b.add_node(&[("INT_L_X2Y0", "IMUX_L1"), ("CLBLL_L_X2Y0", "CLBLL_L_A1")]);
    b.finish()
}

fn report_index(device: &Device) -> WireIndex {
    let opts = Options {
        family: "artix7".to_string(),
        ..Default::default()
    };
    let writer = XdlrcWriter::new(device, &opts).unwrap();
    writer.write(&mut Vec::<u8>::new()).unwrap().wire_index
}

#[test]
fn report_against_reference() {
    let device = device();
    let index = report_index(&device);
    assert_eq!(
        index
            .nodeless()
            .map(|e| format!("{}/{}", e.tile, e.wire))
            .collect::<Vec<_>>(),
        ["CLBLL_L_X2Y0/CLBLL_L_AMUX"]
    );

    let dump = reference(
        "\
TILE CLBLL_L_X2Y0
SITE SLICE_X0Y0
WIRE CLBLL_L_X2Y0/CLBLL_L_A1 #INT_L_X2Y0/IMUX_L1
WIRE CLBLL_L_X2Y0/CLBLL_L_AMUX #CLBLL_L_X2Y0/CLBLL_L_AMUX
TILE INT_L_X2Y0
WIRE INT_L_X2Y0/IMUX_L1 #INT_L_X2Y0/IMUX_L1
END
",
    );
    assert_eq!(check_tile_order(&dump, &index), None);
    let check = find_node_mismatches(&dump, index.nodeless());
    assert_eq!(check.mismatches, ["CLBLL_L_X2Y0/CLBLL_L_AMUX"]);
    assert_eq!(check.unconsumed, 0);
}

#[test]
fn device_as_reference() {
    let device = device();
    let index = report_index(&device);
    let check = find_node_mismatches(&device, index.nodeless());
    assert!(check.mismatches.is_empty());
    assert_eq!(check.checked, 1);

    let check = find_node_mismatches(&device, index.entries());
    assert_eq!(
        check.mismatches,
        ["CLBLL_L_X2Y0/CLBLL_L_A1", "INT_L_X2Y0/IMUX_L1"]
    );
    assert_eq!(check.unconsumed, 0);
}

// Tile wire order B1, A1, AMUX differs from site pin order A1, B1, AMUX,
// and both nodeless pin wires precede a wire with a node.
fn device_pin_order() -> Device {
    let mut b = DeviceBuilder::new("xc7a35t");
    let mut st = SiteTypeBuilder::new("SLICEL");
    st.site_pin("A1", PinDir::Input);
    st.site_pin("B1", PinDir::Input);
    st.site_pin("AMUX", PinDir::Output);
    let slicel = b.add_site_type(st);

    let mut tt = TileTypeBuilder::new("CLBLL_L");
    tt.wire("CLBLL_L_B1");
    tt.site(slicel, &["CLBLL_L_A1", "CLBLL_L_B1", "CLBLL_L_AMUX"]);
    let clb = b.add_tile_type(tt);
    let mut tt = TileTypeBuilder::new("INT_L");
    tt.wire("IMUX_L1");
    tt.wire("LOGIC_OUTS_L0");
    let int = b.add_tile_type(tt);

    b.add_tile("CLBLL_L_X2Y0", clb, 0, 1, &["SLICE_X0Y0"]);
    b.add_tile("INT_L_X2Y0", int, 0, 0, &[]);
    b.add_node(&[("CLBLL_L_X2Y0", "CLBLL_L_AMUX"), ("INT_L_X2Y0", "LOGIC_OUTS_L0")]);
    b.add_node(&[("INT_L_X2Y0", "IMUX_L1")]);
    b.finish()
}

#[test]
fn index_follows_native_wire_order() {
    let device = device_pin_order();
    let index = report_index(&device);
    let entries: Vec<_> = index
        .entries()
        .iter()
        .map(|e| (format!("{}/{}", e.tile, e.wire), e.nodeless))
        .collect();
    assert_eq!(
        entries,
        [
            ("CLBLL_L_X2Y0/CLBLL_L_B1".to_string(), true),
            ("CLBLL_L_X2Y0/CLBLL_L_A1".to_string(), true),
            ("CLBLL_L_X2Y0/CLBLL_L_AMUX".to_string(), false),
            ("INT_L_X2Y0/IMUX_L1".to_string(), false),
            ("INT_L_X2Y0/LOGIC_OUTS_L0".to_string(), false),
        ]
    );

    let check = find_node_mismatches(&device, index.entries());
    assert_eq!(
        check.mismatches,
        [
            "CLBLL_L_X2Y0/CLBLL_L_AMUX",
            "INT_L_X2Y0/IMUX_L1",
            "INT_L_X2Y0/LOGIC_OUTS_L0"
        ]
    );
    assert_eq!(check.checked, 5);
    assert_eq!(check.unconsumed, 0);

    let dump = reference(
        "\
TILE CLBLL_L_X2Y0
WIRE CLBLL_L_X2Y0/CLBLL_L_B1 #CLBLL_L_X2Y0/CLBLL_L_B1
WIRE CLBLL_L_X2Y0/CLBLL_L_A1 #CLBLL_L_X2Y0/CLBLL_L_A1
WIRE CLBLL_L_X2Y0/CLBLL_L_AMUX #CLBLL_L_X2Y0/CLBLL_L_AMUX
TILE INT_L_X2Y0
WIRE INT_L_X2Y0/IMUX_L1 #INT_L_X2Y0/IMUX_L1
WIRE INT_L_X2Y0/LOGIC_OUTS_L0 #CLBLL_L_X2Y0/CLBLL_L_AMUX
END
",
    );
    let check = find_node_mismatches(&dump, index.nodeless());
    assert_eq!(
        check.mismatches,
        ["CLBLL_L_X2Y0/CLBLL_L_B1", "CLBLL_L_X2Y0/CLBLL_L_A1"]
    );
    assert_eq!(check.checked, 2);
    assert_eq!(check.unconsumed, 0);
}
