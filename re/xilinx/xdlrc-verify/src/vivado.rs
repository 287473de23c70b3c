//! Tile, site and wire/node listing of a device as seen by Vivado.

use crate::Error;
use indicatif::ProgressBar;
use prjcombine_re_toolchain::{Toolchain, ToolchainReader};
use prjcombine_re_xilinx_interchange::RoutingModel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

const DUMP_TCL: &str = r#"
set fd [open "dump.fifo" w]
if {[catch {open_project [lindex $argv 0]} err]} {
    puts $fd "FAIL cannot open project: $err"
    close $fd
    exit 1
}
set run [get_runs -quiet [lindex $argv 1]]
if {$run == "" || ![get_property IS_IMPLEMENTATION $run] || [get_property PROGRESS $run] != "100%"} {
    puts $fd "FAIL [lindex $argv 1] is not a completed implementation run"
    close $fd
    exit 1
}
open_run $run
foreach tile [get_tiles] {
    puts $fd "TILE $tile"
    foreach x [get_sites -quiet -of_objects $tile] {
        puts $fd "SITE $x"
    }
    foreach x [get_wires -quiet -of_objects $tile] {
        set node [get_nodes -quiet -of_objects $x]
        puts $fd "WIRE $x #$node"
    }
}
puts $fd "END"
close $fd
"#;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RefWire {
    pub name: String,
    pub node: Option<String>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RefTile {
    pub name: String,
    pub sites: Vec<String>,
    pub wires: Vec<RefWire>,
    #[serde(skip)]
    wire_index: HashMap<String, usize>,
}

impl RefTile {
    pub fn new(name: impl Into<String>) -> Self {
        RefTile {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_wire(&mut self, name: impl Into<String>, node: Option<String>) {
        let name = name.into();
        self.wire_index.insert(name.clone(), self.wires.len());
        self.wires.push(RefWire { name, node });
    }

    pub fn wire(&self, name: &str) -> Option<&RefWire> {
        self.wire_index.get(name).map(|&i| &self.wires[i])
    }
}

/// Reference device listing, in the tool's native tile and wire order.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDump {
    pub tiles: Vec<RefTile>,
    #[serde(skip)]
    tile_index: HashMap<String, usize>,
}

impl ReferenceDump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tile(&mut self, tile: RefTile) {
        self.tile_index.insert(tile.name.clone(), self.tiles.len());
        self.tiles.push(tile);
    }

    pub fn tile(&self, name: &str) -> Option<&RefTile> {
        self.tile_index.get(name).map(|&i| &self.tiles[i])
    }

    fn post_deserialize(&mut self) {
        self.tile_index = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        for tile in &mut self.tiles {
            tile.wire_index = tile
                .wires
                .iter()
                .enumerate()
                .map(|(i, w)| (w.name.clone(), i))
                .collect();
        }
    }

    /// Parses the line protocol written by the dump script.
    pub fn parse(r: impl BufRead) -> Result<Self, Error> {
        Self::parse_inner(r, None)
    }

    fn parse_inner(r: impl BufRead, bar: Option<&ProgressBar>) -> Result<Self, Error> {
        let mut res = ReferenceDump::new();
        let mut cur: Option<RefTile> = None;
        for (i, line) in r.lines().enumerate() {
            let line = line?;
            let lnum = i + 1;
            let malformed = |msg: &str| Error::MalformedDump {
                line: lnum,
                msg: msg.to_string(),
            };
            let sl: Vec<_> = line.split_whitespace().collect();
            match sl.first().copied() {
                None => (),
                Some("FAIL") => {
                    let reason = line.trim_start().trim_start_matches("FAIL").trim();
                    return Err(Error::ReferenceUnavailable(reason.to_string()));
                }
                Some("TILE") => {
                    let [_, name] = sl[..] else {
                        return Err(malformed("TILE needs one name"));
                    };
                    if let Some(tile) = cur.take() {
                        res.add_tile(tile);
                    }
                    if let Some(bar) = bar {
                        bar.inc(1);
                        bar.set_message(name.to_string());
                    }
                    cur = Some(RefTile::new(name));
                }
                Some("SITE") => {
                    let [_, name] = sl[..] else {
                        return Err(malformed("SITE needs one name"));
                    };
                    let Some(tile) = &mut cur else {
                        return Err(malformed("SITE outside of tile"));
                    };
                    tile.sites.push(name.to_string());
                }
                Some("WIRE") => {
                    let [_, full, node] = sl[..] else {
                        return Err(malformed("WIRE needs a name and a node"));
                    };
                    let Some(tile) = &mut cur else {
                        return Err(malformed("WIRE outside of tile"));
                    };
                    let Some(node) = node.strip_prefix('#') else {
                        return Err(malformed("node must start with #"));
                    };
                    let name = match full.split_once('/') {
                        Some((t, w)) if t == tile.name => w,
                        Some(_) => return Err(malformed("wire belongs to another tile")),
                        None => full,
                    };
                    let node = (!node.is_empty()).then(|| node.to_string());
                    tile.add_wire(name, node);
                }
                Some("END") => {
                    if let Some(tile) = cur.take() {
                        res.add_tile(tile);
                    }
                    return Ok(res);
                }
                Some(kw) => return Err(malformed(&format!("unknown record {kw}"))),
            }
        }
        Err(Error::ReferenceUnavailable(
            "dump ended without END marker".to_string(),
        ))
    }

    /// Runs Vivado on a completed implementation run of `project` and
    /// collects the device listing.
    pub fn from_vivado(tc: &Toolchain, project: &str, run: &str) -> Result<Self, Error> {
        info!("dumping reference device from {project} run {run}");
        let tr = ToolchainReader::new(
            tc,
            "vivado",
            &Toolchain::vivado_batch_args(&[project, run]),
            &[],
            "dump.fifo",
            &[("script.tcl", DUMP_TCL.as_bytes())],
        )
        .map_err(|e| Error::Toolchain(e.to_string()))?;
        let bar = ProgressBar::new_spinner();
        let res = Self::parse_inner(tr, Some(&bar));
        bar.finish_and_clear();
        let res = res?;
        info!("reference device has {n} tiles", n = res.tiles.len());
        Ok(res)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let f = File::open(path).map_err(io_err)?;
        let mut cf = zstd::stream::Decoder::new(f).map_err(io_err)?;
        let config = bincode::config::legacy();
        let mut res: ReferenceDump = bincode::serde::decode_from_std_read(&mut cf, config)
            .map_err(|source| Error::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        res.post_deserialize();
        debug!("loaded reference dump: {n} tiles", n = res.tiles.len());
        Ok(res)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let f = File::create(path).map_err(io_err)?;
        let mut cf = zstd::stream::Encoder::new(f, 9).map_err(io_err)?;
        let config = bincode::config::legacy();
        bincode::serde::encode_into_std_write(self, &mut cf, config).map_err(|source| {
            Error::Encode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        cf.finish().map_err(io_err)?;
        Ok(())
    }
}

impl RoutingModel for ReferenceDump {
    fn tiles(&self) -> impl Iterator<Item = &str> {
        self.tiles.iter().map(|t| t.name.as_str())
    }

    fn wires_of_tile(&self, tile: &str) -> impl Iterator<Item = &str> {
        self.tile(tile)
            .into_iter()
            .flat_map(|t| t.wires.iter().map(|w| w.name.as_str()))
    }

    fn sites_of_tile(&self, tile: &str) -> impl Iterator<Item = &str> {
        self.tile(tile)
            .into_iter()
            .flat_map(|t| t.sites.iter().map(|s| s.as_str()))
    }

    fn node_of_wire(&self, tile: &str, wire: &str) -> Option<String> {
        self.tile(tile)?.wire(wire)?.node.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    const DUMP: &str = "\
TILE CLBLL_L_X2Y0
SITE SLICE_X0Y0
WIRE CLBLL_L_X2Y0/CLBLL_L_A1 #INT_L_X2Y0/IMUX_L1
WIRE CLBLL_L_X2Y0/CLBLL_L_A2 #
TILE INT_L_X2Y0
WIRE INT_L_X2Y0/IMUX_L1 #INT_L_X2Y0/IMUX_L1
END
";

    #[test]
    fn parse() {
        let dump = ReferenceDump::parse(Cursor::new(DUMP)).unwrap();
        assert_eq!(
            dump.tiles().collect::<Vec<_>>(),
            ["CLBLL_L_X2Y0", "INT_L_X2Y0"]
        );
        assert_eq!(
            dump.wires_of_tile("CLBLL_L_X2Y0").collect::<Vec<_>>(),
            ["CLBLL_L_A1", "CLBLL_L_A2"]
        );
        assert_eq!(
            dump.sites_of_tile("CLBLL_L_X2Y0").collect::<Vec<_>>(),
            ["SLICE_X0Y0"]
        );
        assert_eq!(dump.sites_of_tile("INT_L_X2Y0").count(), 0);
        assert_eq!(
            dump.node_of_wire("CLBLL_L_X2Y0", "CLBLL_L_A1").as_deref(),
            Some("INT_L_X2Y0/IMUX_L1")
        );
        assert_eq!(dump.node_of_wire("CLBLL_L_X2Y0", "CLBLL_L_A2"), None);
        assert_eq!(dump.node_of_wire("CLBLL_L_X2Y0", "CLBLL_L_A9"), None);
        assert_eq!(dump.wires_of_tile("NOPE").count(), 0);
    }

    #[test]
    fn failure_reported() {
        let dump = "FAIL impl_1 is not a completed implementation run\n";
        let err = ReferenceDump::parse(Cursor::new(dump)).unwrap_err();
        assert_matches!(err, Error::ReferenceUnavailable(msg) if msg.starts_with("impl_1"));
    }

    #[test]
    fn missing_end() {
        let truncated = DUMP.trim_end_matches("END\n");
        let err = ReferenceDump::parse(Cursor::new(truncated)).unwrap_err();
        assert_matches!(err, Error::ReferenceUnavailable(_));
    }

    #[test]
    fn malformed() {
        let bad = "TILE A\nWIRE A/W0 NODE\nEND\n";
        let err = ReferenceDump::parse(Cursor::new(bad)).unwrap_err();
        assert_matches!(err, Error::MalformedDump { line: 2, .. });
        let bad = "WIRE A/W0 #\nEND\n";
        let err = ReferenceDump::parse(Cursor::new(bad)).unwrap_err();
        assert_matches!(err, Error::MalformedDump { line: 1, .. });
    }

    #[test]
    fn file_roundtrip() {
        let dump = ReferenceDump::parse(Cursor::new(DUMP)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.zstd");
        dump.to_file(&path).unwrap();
        let loaded = ReferenceDump::from_file(&path).unwrap();
        assert_eq!(
            loaded.node_of_wire("INT_L_X2Y0", "IMUX_L1").as_deref(),
            Some("INT_L_X2Y0/IMUX_L1")
        );
        assert_eq!(loaded, dump);
    }
}
