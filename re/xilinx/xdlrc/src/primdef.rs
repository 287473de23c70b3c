use itertools::Itertools;
use prjcombine_re_xilinx_interchange::db::{BelCategory, Device, PinDir, SiteType};
use std::io::{self, Write};

/// Arrows of the element conns from a pin towards another pin on its site wire.
fn conn_arrows(from: PinDir, to: PinDir) -> &'static [&'static str] {
    match (from, to) {
        (PinDir::Input, PinDir::Input) | (PinDir::Output, PinDir::Output) => &[],
        (PinDir::Input, _) => &["<=="],
        (PinDir::Output, _) => &["==>"],
        (PinDir::Inout, PinDir::Input) => &["==>"],
        (PinDir::Inout, PinDir::Output) => &["<=="],
        (PinDir::Inout, PinDir::Inout) => &["<==", "==>"],
    }
}

fn write_primitive_def(out: &mut dyn Write, st: &SiteType) -> io::Result<()> {
    writeln!(
        out,
        "\t(primitive_def {} {} {}",
        st.name,
        st.pins.len(),
        st.bels.len()
    )?;
    for pin in st.pins.values() {
        writeln!(out, "\t\t(pin {n} {n} {d})", n = pin.name, d = pin.dir.as_str())?;
    }
    for bel in st.bels.values() {
        writeln!(out, "\t\t(element {} {}", bel.name, bel.pins.len())?;
        let mut cfg = vec![];
        for &bpid in &bel.pins {
            let bp = &st.bel_pins[bpid];
            // Element pins are either inputs or outputs.
            let decl = if bp.dir == PinDir::Output {
                "output"
            } else {
                "input"
            };
            writeln!(out, "\t\t\t(pin {} {decl})", bp.name)?;
            if bp.dir != PinDir::Output {
                cfg.push(bp.name.as_str());
            }
            let Some(wire) = bp.wire else {
                continue;
            };
            for &opid in &st.wires[wire].pins {
                let op = &st.bel_pins[opid];
                if op.bel == bp.bel {
                    continue;
                }
                for arrow in conn_arrows(bp.dir, op.dir) {
                    writeln!(
                        out,
                        "\t\t\t(conn {} {} {arrow} {} {})",
                        bel.name, bp.name, st.bels[op.bel].name, op.name
                    )?;
                }
            }
        }
        if bel.category == BelCategory::Routing {
            writeln!(out, "\t\t\t(cfg {})", cfg.join(" "))?;
        }
        writeln!(out, "\t\t)")?;
    }
    writeln!(out, "\t)")
}

/// Writes every site type once, sorted by name.
pub fn write_primitive_defs(out: &mut dyn Write, device: &Device) -> io::Result<()> {
    writeln!(out, "(primitive_defs {}", device.site_types.len())?;
    for st in device
        .site_types
        .values()
        .sorted_by(|a, b| a.name.cmp(&b.name))
    {
        write_primitive_def(out, st)?;
    }
    writeln!(out, ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prjcombine_re_xilinx_interchange::build::{DeviceBuilder, SiteTypeBuilder};

    fn device() -> Device {
        let mut b = DeviceBuilder::new("xc7tiny");
        let mut st = SiteTypeBuilder::new("TIEOFF");
        st.site_pin("HARD0", PinDir::Output);
        b.add_site_type(st);

        let mut st = SiteTypeBuilder::new("BUFHCE");
        let i = st.site_pin("I", PinDir::Input);
        let o = st.site_pin("O", PinDir::Output);
        let io = st.site_pin("IO", PinDir::Inout);
        let mux = st.bel("CEINV", BelCategory::Routing);
        let mux_ce = st.bel_pin(mux, "CE", PinDir::Input);
        let mux_ceb = st.bel_pin(mux, "CE_B", PinDir::Input);
        let mux_out = st.bel_pin(mux, "OUT", PinDir::Output);
        let buf = st.bel("BUFHCE", BelCategory::Logic);
        let buf_i = st.bel_pin(buf, "I", PinDir::Input);
        let buf_ce = st.bel_pin(buf, "CE", PinDir::Input);
        let buf_o = st.bel_pin(buf, "O", PinDir::Output);
        let buf_pad = st.bel_pin(buf, "PAD", PinDir::Inout);
        st.site_wire("I", &[i, buf_i, mux_ce, mux_ceb]);
        st.site_wire("CE", &[mux_out, buf_ce]);
        st.site_wire("O", &[buf_o, o]);
        st.site_wire("PAD", &[buf_pad, io]);
        b.add_site_type(st);
        b.finish()
    }

    #[test]
    fn sorted_and_complete() {
        let mut out = Vec::<u8>::new();
        write_primitive_defs(&mut out, &device()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\
(primitive_defs 2
\t(primitive_def BUFHCE 3 5
\t\t(pin I I input)
\t\t(pin O O output)
\t\t(pin IO IO inout)
\t\t(element I 1
\t\t\t(pin I output)
\t\t\t(conn I I ==> BUFHCE I)
\t\t\t(conn I I ==> CEINV CE)
\t\t\t(conn I I ==> CEINV CE_B)
\t\t)
\t\t(element O 1
\t\t\t(pin O input)
\t\t\t(conn O O <== BUFHCE O)
\t\t)
\t\t(element IO 1
\t\t\t(pin IO input)
\t\t\t(conn IO IO <== BUFHCE PAD)
\t\t\t(conn IO IO ==> BUFHCE PAD)
\t\t)
\t\t(element CEINV 3
\t\t\t(pin CE input)
\t\t\t(conn CEINV CE <== I I)
\t\t\t(pin CE_B input)
\t\t\t(conn CEINV CE_B <== I I)
\t\t\t(pin OUT output)
\t\t\t(conn CEINV OUT ==> BUFHCE CE)
\t\t\t(cfg CE CE_B)
\t\t)
\t\t(element BUFHCE 4
\t\t\t(pin I input)
\t\t\t(conn BUFHCE I <== I I)
\t\t\t(pin CE input)
\t\t\t(conn BUFHCE CE <== CEINV OUT)
\t\t\t(pin O output)
\t\t\t(conn BUFHCE O ==> O O)
\t\t\t(pin PAD input)
\t\t\t(conn BUFHCE PAD <== IO IO)
\t\t\t(conn BUFHCE PAD ==> IO IO)
\t\t)
\t)
\t(primitive_def TIEOFF 1 1
\t\t(pin HARD0 HARD0 output)
\t\t(element HARD0 1
\t\t\t(pin HARD0 input)
\t\t)
\t)
)
";
        assert_eq!(text, expected);
    }
}
