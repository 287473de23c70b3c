use crate::{Error, WireIndex, extra, primdef};
use prjcombine_re_xilinx_interchange::annotations::CheckedAnnotations;
use prjcombine_re_xilinx_interchange::db::{Device, NodeWire, TileId};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// Which part of the device goes into the report.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum Scope {
    #[default]
    Full,
    /// All definitions, but only this tile in the tiles section.
    Tile(String),
    /// Stop after the primitive definitions.
    PrimitiveDefs,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub family: String,
    pub scope: Scope,
    /// Write an XDLRC+ report: alternate site types, plus annotations if given.
    pub extra: bool,
    pub annotations: Option<CheckedAnnotations>,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Summary {
    pub tiles: usize,
    pub sites: usize,
    pub sitedefs: usize,
    pub numpins: usize,
    pub numpips: usize,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Report {
    pub wire_index: WireIndex,
    /// `None` for primitive-only reports.
    pub summary: Option<Summary>,
}

pub struct XdlrcWriter<'a> {
    device: &'a Device,
    opts: &'a Options,
    tile: Option<TileId>,
}

impl<'a> XdlrcWriter<'a> {
    /// Checks the options against the device; nothing is written yet.
    pub fn new(device: &'a Device, opts: &'a Options) -> Result<Self, Error> {
        let tile = match &opts.scope {
            Scope::Tile(name) => Some(
                device
                    .tile(name)
                    .ok_or_else(|| Error::UnknownTile(name.clone()))?,
            ),
            _ => None,
        };
        Ok(XdlrcWriter { device, opts, tile })
    }

    fn write_tile(
        &self,
        out: &mut dyn Write,
        tid: TileId,
        index: &mut WireIndex,
        summary: &mut Summary,
    ) -> io::Result<()> {
        let dev = self.device;
        let tile = &dev.tiles[tid];
        let tt = dev.tile_kind(tid);
        debug!("tile {name}", name = tile.name);
        writeln!(
            out,
            "\t(tile {} {} {} {} {}",
            tile.row,
            tile.col,
            tile.name,
            tt.name,
            tile.sites.len()
        )?;
        if self.opts.extra {
            extra::write_site_alternates(out, dev, tid)?;
        }

        let mut num_pinwires = 0;
        let mut pin_wires = HashSet::new();
        for (sid, site) in tt.sites.iter() {
            let st = &dev.site_types[site.site_type];
            let name = &tile.sites[sid];
            if st.pins.is_empty() {
                writeln!(out, "\t\t(primitive_site {name} {} unknown 0)", st.name)?;
                continue;
            }
            writeln!(
                out,
                "\t\t(primitive_site {name} {} unknown {}",
                st.name,
                st.pins.len()
            )?;
            for (pid, pin) in st.pins.iter() {
                let wire = site.pin_wires[pid];
                writeln!(
                    out,
                    "\t\t\t(pinwire {} {} {})",
                    pin.name,
                    pin.dir.as_str(),
                    tt.wires[wire]
                )?;
                num_pinwires += 1;
                pin_wires.insert(wire);
            }
            writeln!(out, "\t\t)")?;
        }

        let mut num_wires = 0;
        for (wid, wname) in tt.wires.iter() {
            let this = NodeWire {
                tile: tid,
                wire: wid,
            };
            let node = dev.wire_node(tid, wid);
            let conns: Vec<_> = match node {
                Some(node) => dev.nodes[node]
                    .wires
                    .iter()
                    .copied()
                    .filter(|&nw| nw != this)
                    .collect(),
                // Site pins still need their wire declared even without a node.
                None if pin_wires.contains(&wid) => vec![],
                None => continue,
            };
            if conns.is_empty() {
                writeln!(out, "\t\t(wire {wname} 0)")?;
            } else {
                writeln!(out, "\t\t(wire {wname} {}", conns.len())?;
                for nw in conns {
                    writeln!(
                        out,
                        "\t\t\t(conn {} {})",
                        dev.tiles[nw.tile].name,
                        dev.wire_name(nw)
                    )?;
                }
                writeln!(out, "\t\t)")?;
            }
            index.push(&tile.name, wname, node.is_none());
            num_wires += 1;
        }

        for pip in &tt.pips {
            let wf = &tt.wires[pip.wire_from];
            let wt = &tt.wires[pip.wire_to];
            if pip.directional {
                writeln!(out, "\t\t(pip {} {wf} -> {wt})", tile.name)?;
            } else {
                let kind = if pip.buffered { "=-" } else { "==" };
                writeln!(out, "\t\t(pip {} {wf} {kind} {wt})", tile.name)?;
                writeln!(out, "\t\t(pip {} {wt} {kind} {wf})", tile.name)?;
            }
        }

        writeln!(
            out,
            "\t\t(tile_summary {} {} {num_pinwires} {num_wires} {})",
            tile.name,
            tt.name,
            tt.pips.len()
        )?;
        writeln!(out, "\t)")?;

        summary.tiles += 1;
        summary.sites += tile.sites.len();
        summary.numpins += num_pinwires;
        summary.numpips += tt.pips.len();
        Ok(())
    }

    pub fn write(&self, out: &mut dyn Write) -> io::Result<Report> {
        let dev = self.device;
        let mut report = Report::default();
        writeln!(
            out,
            "(xdl_resource_report v0.2 {} {}",
            dev.name, self.opts.family
        )?;
        primdef::write_primitive_defs(out, dev)?;
        if self.opts.scope == Scope::PrimitiveDefs {
            writeln!(out, ")")?;
            return Ok(report);
        }

        if self.opts.extra {
            extra::write_alternate_site_types(out, dev)?;
            if let Some(ann) = &self.opts.annotations {
                extra::write_annotations(out, ann)?;
            }
        }

        let (rows, cols) = dev.dims();
        writeln!(out, "(tiles {rows} {cols}")?;
        let mut summary = Summary {
            sitedefs: dev.site_types.len(),
            ..Default::default()
        };
        match self.tile {
            Some(tid) => self.write_tile(out, tid, &mut report.wire_index, &mut summary)?,
            None => {
                for tid in dev.tiles.ids() {
                    self.write_tile(out, tid, &mut report.wire_index, &mut summary)?;
                }
            }
        }
        writeln!(out, ")")?;
        writeln!(
            out,
            "(summary tiles={} sites={} sitedefs={} numpins={} numpips={})",
            summary.tiles, summary.sites, summary.sitedefs, summary.numpins, summary.numpips
        )?;
        writeln!(out, ")")?;
        report.summary = Some(summary);
        Ok(report)
    }
}

/// Writes the report of `device` to `path`; the file only appears once the
/// whole report has been written.
pub fn generate(device: &Device, opts: &Options, path: &Path) -> Result<Report, Error> {
    let writer = XdlrcWriter::new(device, opts)?;
    info!(
        "writing {path} for {part} ({family})",
        path = path.display(),
        part = device.name,
        family = opts.family
    );
    let report = crate::write_atomic(path, |out| writer.write(out))?;
    info!(
        "wrote {n} wires, {m} without node",
        n = report.wire_index.len(),
        m = report.wire_index.nodeless().count()
    );
    Ok(report)
}

/// Writes the report of `device` to `path` and, unless the report has no
/// tiles section, its wire index to `index_path`.  Neither file appears
/// unless both were written.
pub fn generate_with_index(
    device: &Device,
    opts: &Options,
    path: &Path,
    index_path: &Path,
) -> Result<Report, Error> {
    let writer = XdlrcWriter::new(device, opts)?;
    info!(
        "writing {path} for {part} ({family})",
        path = path.display(),
        part = device.name,
        family = opts.family
    );
    let (report_tmp, report) = crate::write_temp(path, |out| writer.write(out))?;
    if report.summary.is_none() {
        crate::persist(report_tmp, path)?;
        return Ok(report);
    }
    let (index_tmp, ()) = crate::write_temp(index_path, |out| report.wire_index.write(out))?;
    crate::persist(index_tmp, index_path)?;
    if let Err(e) = crate::persist(report_tmp, path) {
        let _ = std::fs::remove_file(index_path);
        return Err(e);
    }
    info!(
        "wrote {n} wires, {m} without node; wire index in {index}",
        n = report.wire_index.len(),
        m = report.wire_index.nodeless().count(),
        index = index_path.display()
    );
    Ok(report)
}
