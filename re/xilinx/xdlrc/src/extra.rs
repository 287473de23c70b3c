//! Blocks only present in extended (XDLRC+) reports.

use itertools::Itertools;
use prjcombine_re_xilinx_interchange::annotations::CheckedAnnotations;
use prjcombine_re_xilinx_interchange::db::{Device, TileId};
use std::io::{self, Write};

pub fn write_alternate_site_types(out: &mut dyn Write, device: &Device) -> io::Result<()> {
    for st in device
        .site_types
        .values()
        .filter(|st| !st.alt_site_types.is_empty())
        .sorted_by(|a, b| a.name.cmp(&b.name))
    {
        write!(out, "(alternate_site_types {}", st.name)?;
        for &alt in &st.alt_site_types {
            write!(out, " {}", device.site_types[alt].name)?;
        }
        writeln!(out, ")")?;
    }
    Ok(())
}

/// Alternate types of the sites of one tile, ahead of its site declarations.
pub fn write_site_alternates(out: &mut dyn Write, device: &Device, tile: TileId) -> io::Result<()> {
    let names = &device.tiles[tile].sites;
    for (sid, site) in device.tile_kind(tile).sites.iter() {
        let st = &device.site_types[site.site_type];
        if st.alt_site_types.is_empty() {
            continue;
        }
        write!(out, "\t\t(alternate_site_types {}", names[sid])?;
        for &alt in &st.alt_site_types {
            write!(out, " {}", device.site_types[alt].name)?;
        }
        writeln!(out, ")")?;
    }
    Ok(())
}

pub fn write_annotations(out: &mut dyn Write, ann: &CheckedAnnotations) -> io::Result<()> {
    writeln!(out, "(tags {}", ann.tags().len())?;
    for tag in ann.tags() {
        writeln!(out, "\t(tag {} {:?} {}", tag.name, tag.description, tag.default)?;
        writeln!(out, "\t\t(site_types {})", tag.site_types.join(" "))?;
        writeln!(out, "\t\t(states {})", tag.states.join(" "))?;
        writeln!(out, "\t)")?;
    }
    writeln!(out, ")")?;

    writeln!(out, "(routed_tags {}", ann.routed_tags().len())?;
    for rt in ann.routed_tags() {
        writeln!(
            out,
            "\t(routed_tag {} {} {}",
            rt.name,
            rt.routing_bel,
            rt.pins.len()
        )?;
        writeln!(out, "\t\t(site_types {})", rt.site_types.join(" "))?;
        for pin in &rt.pins {
            writeln!(out, "\t\t(pin {} {} {})", pin.bel, pin.pin, pin.tag)?;
        }
        writeln!(out, "\t)")?;
    }
    writeln!(out, ")")?;

    writeln!(out, "(cell_constraints {}", ann.cell_constraints().len())?;
    for cc in ann.cell_constraints() {
        writeln!(
            out,
            "\t(cell_constraint {} {} {} {} {} {})",
            cc.cell, cc.site_type, cc.bel, cc.port, cc.routed_tag, cc.state
        )?;
    }
    writeln!(out, ")")
}
