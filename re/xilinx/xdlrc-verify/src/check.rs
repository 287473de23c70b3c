use crate::Error;
use prjcombine_re_xilinx_interchange::RoutingModel;
use prjcombine_re_xilinx_xdlrc::{WireIndex, WireIndexEntry, write_atomic};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NodeCheck {
    /// `tile/wire` of every checked wire the reference assigns a node to.
    pub mismatches: Vec<String>,
    pub checked: usize,
    /// Entries never matched by the reference walk.
    pub unconsumed: usize,
}

/// Walks the reference model in its native order and pairs each wire with
/// the head of `entries`.
///
/// Entries must come in the same tile and wire order as the reference
/// enumerates them; an entry the reference does not produce at that point
/// stalls the walk and stays unchecked.
pub fn find_node_mismatches<'a>(
    model: &impl RoutingModel,
    entries: impl IntoIterator<Item = &'a WireIndexEntry>,
) -> NodeCheck {
    let mut entries = entries.into_iter().peekable();
    let mut res = NodeCheck::default();
    for tile in model.tiles() {
        if entries.peek().is_none() {
            break;
        }
        for wire in model.wires_of_tile(tile) {
            while entries
                .next_if(|e| e.tile == tile && e.wire == wire)
                .is_some()
            {
                res.checked += 1;
                if model.node_of_wire(tile, wire).is_some() {
                    res.mismatches.push(format!("{tile}/{wire}"));
                }
            }
        }
    }
    res.unconsumed = entries.count();
    if res.unconsumed != 0 {
        warn!(
            "{n} wire index entries not found in reference order",
            n = res.unconsumed
        );
    }
    res
}

/// Returns the first index tile that comes before an earlier index tile in
/// reference order.
pub fn check_tile_order(model: &impl RoutingModel, index: &WireIndex) -> Option<String> {
    let pos: HashMap<&str, usize> = model.tiles().enumerate().map(|(i, t)| (t, i)).collect();
    let mut last: Option<usize> = None;
    let mut prev_tile: Option<&str> = None;
    for e in index.entries() {
        if prev_tile == Some(e.tile.as_str()) {
            continue;
        }
        prev_tile = Some(e.tile.as_str());
        let Some(&p) = pos.get(e.tile.as_str()) else {
            continue;
        };
        if last.is_some_and(|l| p < l) {
            return Some(e.tile.clone());
        }
        last = Some(p);
    }
    None
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum OutputFormat {
    /// One quoted wire per line.
    #[default]
    Lines,
    /// Comma-separated quoted wires, without the enclosing brackets.
    JsonFragment,
}

impl OutputFormat {
    pub fn write(self, out: &mut dyn Write, mismatches: &[String]) -> io::Result<()> {
        let sep = match self {
            OutputFormat::Lines => "\n",
            OutputFormat::JsonFragment => ",\n",
        };
        for (i, wire) in mismatches.iter().enumerate() {
            if i != 0 {
                write!(out, "{sep}")?;
            }
            write!(out, "{}", jzon::stringify(wire.as_str()))?;
        }
        if !mismatches.is_empty() {
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Replaces `path` with the mismatch listing; no mismatches gives an empty
/// file.
pub fn write_mismatches(
    path: &Path,
    mismatches: &[String],
    format: OutputFormat,
) -> Result<(), Error> {
    write_atomic(path, |out| format.write(out, mismatches))?;
    info!(
        "wrote {n} mismatches to {path}",
        n = mismatches.len(),
        path = path.display()
    );
    Ok(())
}
