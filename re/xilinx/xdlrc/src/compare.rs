//! Tile-by-tile comparison of two XDLRC reports.

use crate::Error;
use crate::parser::{Parser, Tile};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use tracing::info;

/// One way in which a generated report differs from a reference report.
///
/// "Missing" items are in the reference only, "extra" items in the
/// generated report only.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Difference {
    MissingTile(String),
    ExtraTile(String),
    TileKind {
        tile: String,
        ours: String,
        theirs: String,
    },
    MissingSite {
        tile: String,
        site: String,
    },
    ExtraSite {
        tile: String,
        site: String,
    },
    SiteKind {
        tile: String,
        site: String,
        ours: String,
        theirs: String,
    },
    MissingWire {
        tile: String,
        wire: String,
    },
    ExtraWire {
        tile: String,
        wire: String,
    },
    Conns {
        tile: String,
        wire: String,
        missing: Vec<(String, String)>,
        extra: Vec<(String, String)>,
    },
    MissingPip {
        tile: String,
        wire_from: String,
        wire_to: String,
    },
    ExtraPip {
        tile: String,
        wire_from: String,
        wire_to: String,
    },
    MissingPrimitiveDef(String),
    ExtraPrimitiveDef(String),
}

impl Display for Difference {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Difference::MissingTile(t) => write!(f, "missing tile {t}"),
            Difference::ExtraTile(t) => write!(f, "extra tile {t}"),
            Difference::TileKind { tile, ours, theirs } => {
                write!(f, "tile {tile}: type {ours}, expected {theirs}")
            }
            Difference::MissingSite { tile, site } => write!(f, "tile {tile}: missing site {site}"),
            Difference::ExtraSite { tile, site } => write!(f, "tile {tile}: extra site {site}"),
            Difference::SiteKind {
                tile,
                site,
                ours,
                theirs,
            } => write!(f, "tile {tile}: site {site}: type {ours}, expected {theirs}"),
            Difference::MissingWire { tile, wire } => write!(f, "tile {tile}: missing wire {wire}"),
            Difference::ExtraWire { tile, wire } => write!(f, "tile {tile}: extra wire {wire}"),
            Difference::Conns {
                tile,
                wire,
                missing,
                extra,
            } => {
                write!(f, "tile {tile}: wire {wire}: conns differ")?;
                for (t, w) in missing {
                    write!(f, " -{t}/{w}")?;
                }
                for (t, w) in extra {
                    write!(f, " +{t}/{w}")?;
                }
                Ok(())
            }
            Difference::MissingPip {
                tile,
                wire_from,
                wire_to,
            } => write!(f, "tile {tile}: missing pip {wire_from} -> {wire_to}"),
            Difference::ExtraPip {
                tile,
                wire_from,
                wire_to,
            } => write!(f, "tile {tile}: extra pip {wire_from} -> {wire_to}"),
            Difference::MissingPrimitiveDef(n) => write!(f, "missing primitive_def {n}"),
            Difference::ExtraPrimitiveDef(n) => write!(f, "extra primitive_def {n}"),
        }
    }
}

fn compare_tile(ours: &Tile, theirs: &Tile, diffs: &mut Vec<Difference>) {
    let tile = &ours.name;
    if ours.kind != theirs.kind {
        diffs.push(Difference::TileKind {
            tile: tile.clone(),
            ours: ours.kind.clone(),
            theirs: theirs.kind.clone(),
        });
    }

    let their_sites: HashMap<_, _> = theirs.prims.iter().map(|p| (&p.name, &p.kind)).collect();
    for prim in &ours.prims {
        match their_sites.get(&prim.name) {
            None => diffs.push(Difference::ExtraSite {
                tile: tile.clone(),
                site: prim.name.clone(),
            }),
            Some(&kind) if *kind != prim.kind => diffs.push(Difference::SiteKind {
                tile: tile.clone(),
                site: prim.name.clone(),
                ours: prim.kind.clone(),
                theirs: kind.clone(),
            }),
            Some(_) => (),
        }
    }
    let our_sites: HashSet<_> = ours.prims.iter().map(|p| &p.name).collect();
    for prim in &theirs.prims {
        if !our_sites.contains(&prim.name) {
            diffs.push(Difference::MissingSite {
                tile: tile.clone(),
                site: prim.name.clone(),
            });
        }
    }

    let their_wires: HashMap<_, _> = theirs.wires.iter().map(|w| (&w.name, w)).collect();
    for wire in &ours.wires {
        let Some(their_wire) = their_wires.get(&wire.name) else {
            diffs.push(Difference::ExtraWire {
                tile: tile.clone(),
                wire: wire.name.clone(),
            });
            continue;
        };
        let our_conns: BTreeSet<_> = wire.conns.iter().cloned().collect();
        let their_conns: BTreeSet<_> = their_wire.conns.iter().cloned().collect();
        if our_conns != their_conns {
            diffs.push(Difference::Conns {
                tile: tile.clone(),
                wire: wire.name.clone(),
                missing: their_conns.difference(&our_conns).cloned().collect(),
                extra: our_conns.difference(&their_conns).cloned().collect(),
            });
        }
    }
    let our_wires: HashSet<_> = ours.wires.iter().map(|w| &w.name).collect();
    for wire in &theirs.wires {
        if !our_wires.contains(&wire.name) {
            diffs.push(Difference::MissingWire {
                tile: tile.clone(),
                wire: wire.name.clone(),
            });
        }
    }

    let our_pips: BTreeSet<_> = ours
        .pips
        .iter()
        .map(|p| (&p.wire_from, &p.wire_to))
        .collect();
    let their_pips: BTreeSet<_> = theirs
        .pips
        .iter()
        .map(|p| (&p.wire_from, &p.wire_to))
        .collect();
    for &(wf, wt) in their_pips.difference(&our_pips) {
        diffs.push(Difference::MissingPip {
            tile: tile.clone(),
            wire_from: wf.clone(),
            wire_to: wt.clone(),
        });
    }
    for &(wf, wt) in our_pips.difference(&their_pips) {
        diffs.push(Difference::ExtraPip {
            tile: tile.clone(),
            wire_from: wf.clone(),
            wire_to: wt.clone(),
        });
    }
}

/// Compares a generated report against a reference report.
///
/// The reference is read into memory first; the generated report is then
/// streamed.  Differences come in generated-report tile order, followed by
/// missing tiles and primitive definitions.
pub fn compare(ours: &mut Parser, theirs: &mut Parser) -> Result<Vec<Difference>, Error> {
    let mut their_tiles = vec![];
    while let Some(tile) = theirs.get_tile()? {
        their_tiles.push(Some(tile));
    }
    info!("reference report has {n} tiles", n = their_tiles.len());
    let their_index: HashMap<String, usize> = their_tiles
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.as_ref().map(|t| (t.name.clone(), i)))
        .collect();

    let mut diffs = vec![];
    while let Some(tile) = ours.get_tile()? {
        match their_index.get(&tile.name) {
            Some(&i) => match their_tiles[i].take() {
                Some(their_tile) => compare_tile(&tile, &their_tile, &mut diffs),
                // Duplicate tile in our report.
                None => diffs.push(Difference::ExtraTile(tile.name)),
            },
            None => diffs.push(Difference::ExtraTile(tile.name)),
        }
    }
    for tile in their_tiles.into_iter().flatten() {
        diffs.push(Difference::MissingTile(tile.name));
    }

    let our_defs: BTreeSet<_> = ours.primitive_defs().iter().map(|d| &d.name).collect();
    let their_defs: BTreeSet<_> = theirs.primitive_defs().iter().map(|d| &d.name).collect();
    for &name in their_defs.difference(&our_defs) {
        diffs.push(Difference::MissingPrimitiveDef(name.clone()));
    }
    for &name in our_defs.difference(&their_defs) {
        diffs.push(Difference::ExtraPrimitiveDef(name.clone()));
    }
    Ok(diffs)
}
