//! Streaming XDLRC reader.
//!
//! Handles both ISE-generated reports (tiles first) and the ones written by
//! this crate (definitions first): top-level sections may come in any order.
//! Tiles are returned one at a time; everything else is collected while
//! reading and available once [`Parser::get_tile`] has returned `None`.

use crate::Error;
use prjcombine_re_xilinx_interchange::db::PinDir;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::str::FromStr;

macro_rules! bail {
    ($line:expr, $($arg:tt)*) => {
        return Err(Error::Parse {
            line: $line,
            msg: format!($($arg)*),
        })
    };
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tile {
    pub row: u32,
    pub col: u32,
    pub name: String,
    pub kind: String,
    pub prims: Vec<Prim>,
    pub wires: Vec<Wire>,
    pub pips: Vec<Pip>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrimBonded {
    Bonded,
    Unbonded,
    Internal,
    Unknown,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Prim {
    pub name: String,
    pub kind: String,
    pub bonded: PrimBonded,
    pub pinwires: Vec<PinWire>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PinWire {
    pub name: String,
    pub dir: PinDir,
    pub wire: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Wire {
    pub name: String,
    pub speed: Option<String>,
    pub conns: Vec<(String, String)>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PipKind {
    Uni,
    BiPass,
    BiUniBuf,
    BiBuf,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PipRouteThrough {
    pub pin_from: String,
    pub pin_to: String,
    pub prim_kind: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Pip {
    pub wire_from: String,
    pub wire_to: String,
    pub kind: PipKind,
    pub speed: Option<String>,
    pub route_through: Option<PipRouteThrough>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ElementConn {
    pub pin: String,
    /// `true` for `==>`.
    pub outward: bool,
    pub other_element: String,
    pub other_pin: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Element {
    pub name: String,
    pub pins: Vec<(String, PinDir)>,
    pub conns: Vec<ElementConn>,
    pub cfg: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PrimitiveDef {
    pub name: String,
    pub pins: Vec<(String, PinDir)>,
    pub elements: Vec<Element>,
}

impl FromStr for PipKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "->" => Ok(PipKind::Uni),
            "==" => Ok(PipKind::BiPass),
            "=>" => Ok(PipKind::BiUniBuf),
            "=-" => Ok(PipKind::BiBuf),
            _ => Err(format!("invalid pip direction {s}")),
        }
    }
}

fn parse_dir(s: &str) -> Option<PinDir> {
    match s {
        "input" => Some(PinDir::Input),
        "output" => Some(PinDir::Output),
        "inout" | "bidir" => Some(PinDir::Inout),
        _ => None,
    }
}

fn parse_bonded(s: &str) -> Option<PrimBonded> {
    match s {
        "bonded" => Some(PrimBonded::Bonded),
        "unbonded" => Some(PrimBonded::Unbonded),
        "internal" => Some(PrimBonded::Internal),
        "unknown" => Some(PrimBonded::Unknown),
        _ => None,
    }
}

/// Splits an item that may be closed on its own line (`false`) or on the
/// same line (`true`).
fn split_closed(l: &str) -> (&str, bool) {
    match l.strip_suffix(')') {
        Some(l) => (l, true),
        None => (l, false),
    }
}

pub struct Parser {
    version: String,
    part: String,
    family: String,
    rows: u32,
    cols: u32,
    lines: Lines<Box<dyn BufRead>>,
    line: usize,
    in_tiles: bool,
    done: bool,
    primitive_defs: Vec<PrimitiveDef>,
    alternate_site_types: BTreeMap<String, Vec<String>>,
    summary: Option<String>,
}

#[cfg(test)]
impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("version", &self.version)
            .field("part", &self.part)
            .field("family", &self.family)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

impl Parser {
    pub fn new(file: Box<dyn BufRead>) -> Result<Self, Error> {
        let mut parser = Parser {
            version: String::new(),
            part: String::new(),
            family: String::new(),
            rows: 0,
            cols: 0,
            lines: file.lines(),
            line: 0,
            in_tiles: false,
            done: false,
            primitive_defs: vec![],
            alternate_site_types: BTreeMap::new(),
            summary: None,
        };
        let l = parser.next_top("xdl_resource_report")?;
        let Some(l) = l.strip_prefix("(xdl_resource_report ") else {
            bail!(parser.line, "expected xdl_resource_report");
        };
        let l: Vec<_> = l.split(' ').collect();
        match l[..] {
            [v, p, f] => {
                parser.version = v.to_string();
                parser.part = p.to_string();
                parser.family = f.to_string();
            }
            _ => bail!(parser.line, "xdl_resource_report wrong arg count"),
        }
        Ok(parser)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Parser::new(Box::new(BufReader::new(f)))
    }

    fn next_line(&mut self, what: &str) -> Result<String, Error> {
        self.line += 1;
        match self.lines.next() {
            Some(l) => Ok(l?),
            None => bail!(self.line, "eof in {what}"),
        }
    }

    /// Next top-level line, skipping comments.
    fn next_top(&mut self, what: &str) -> Result<String, Error> {
        loop {
            let l = self.next_line(what)?;
            if !l.starts_with('#') && !l.trim().is_empty() {
                return Ok(l.trim_start().to_string());
            }
        }
    }

    fn skip_block(&mut self, what: &str) -> Result<(), Error> {
        loop {
            if self.next_line(what)? == ")" {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self, l: &str) -> Result<Element, Error> {
        let (l, closed) = split_closed(l);
        let name = l.split(' ').next().unwrap_or_default();
        if name.is_empty() {
            bail!(self.line, "element without name");
        }
        let mut element = Element {
            name: name.to_string(),
            pins: vec![],
            conns: vec![],
            cfg: vec![],
        };
        if closed {
            return Ok(element);
        }
        loop {
            let l = self.next_line("element")?;
            if l == "\t\t)" {
                return Ok(element);
            } else if let Some(l) = l.strip_prefix("\t\t\t(pin ") {
                let l = l.strip_suffix(')').unwrap_or(l);
                let l: Vec<_> = l.split(' ').collect();
                match l[..] {
                    [n, d] => match parse_dir(d) {
                        Some(d) => element.pins.push((n.to_string(), d)),
                        None => bail!(self.line, "unknown element pin direction {d}"),
                    },
                    _ => bail!(self.line, "element pin wrong arg count"),
                }
            } else if let Some(l) = l.strip_prefix("\t\t\t(conn ") {
                let l = l.strip_suffix(')').unwrap_or(l);
                let l: Vec<_> = l.split(' ').collect();
                match l[..] {
                    [_, p, arrow, e2, p2] => element.conns.push(ElementConn {
                        pin: p.to_string(),
                        outward: match arrow {
                            "==>" => true,
                            "<==" => false,
                            _ => bail!(self.line, "unknown conn direction {arrow}"),
                        },
                        other_element: e2.to_string(),
                        other_pin: p2.to_string(),
                    }),
                    _ => bail!(self.line, "element conn wrong arg count"),
                }
            } else if let Some(l) = l.strip_prefix("\t\t\t(cfg") {
                let l = l.strip_suffix(')').unwrap_or(l);
                element
                    .cfg
                    .extend(l.split(' ').filter(|s| !s.is_empty()).map(String::from));
            } else if l.starts_with("\t\t\t(") {
                // Other per-element items (e.g. ISE's `(# BEL)` markers).
            } else {
                bail!(self.line, "expected element item: {l}");
            }
        }
    }

    fn parse_primitive_defs(&mut self) -> Result<(), Error> {
        loop {
            let l = self.next_line("primitive_defs")?;
            if l.trim() == ")" {
                return Ok(());
            }
            let Some(l) = l.strip_prefix("\t(primitive_def ") else {
                bail!(self.line, "expected primitive_def: {l}");
            };
            let name = match l.split(' ').next() {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => bail!(self.line, "primitive_def without name"),
            };
            let mut def = PrimitiveDef {
                name,
                pins: vec![],
                elements: vec![],
            };
            loop {
                let l = self.next_line("primitive_def")?;
                if l == "\t)" {
                    break;
                } else if let Some(l) = l.strip_prefix("\t\t(pin ") {
                    let l = l.strip_suffix(')').unwrap_or(l);
                    let l: Vec<_> = l.split(' ').collect();
                    match l[..] {
                        [n, _, d] => match parse_dir(d) {
                            Some(d) => def.pins.push((n.to_string(), d)),
                            None => bail!(self.line, "unknown pin direction {d}"),
                        },
                        _ => bail!(self.line, "pin wrong arg count"),
                    }
                } else if let Some(l) = l.strip_prefix("\t\t(element ") {
                    let element = self.parse_element(l)?;
                    def.elements.push(element);
                } else {
                    bail!(self.line, "expected primitive_def item: {l}");
                }
            }
            self.primitive_defs.push(def);
        }
    }

    fn parse_primitive_site(&mut self, l: &str) -> Result<Prim, Error> {
        let (l, closed) = split_closed(l);
        let mut pinwires = vec![];
        if !closed {
            loop {
                let l = self.next_line("primitive_site")?;
                if l == "\t\t)" {
                    break;
                }
                let Some(l) = l.strip_prefix("\t\t\t(pinwire ") else {
                    bail!(self.line, "expected primitive_site item: {l}");
                };
                let Some(l) = l.strip_suffix(')') else {
                    bail!(self.line, "missing ) on pinwire");
                };
                let l: Vec<_> = l.split(' ').collect();
                match l[..] {
                    [n, k, w] => match parse_dir(k) {
                        Some(dir) => pinwires.push(PinWire {
                            name: n.to_string(),
                            dir,
                            wire: w.to_string(),
                        }),
                        None => bail!(self.line, "unknown pinwire kind {k}"),
                    },
                    _ => bail!(self.line, "pinwire wrong arg count"),
                }
            }
        }
        let l: Vec<_> = l.split(' ').collect();
        match l[..] {
            [name, kind, bonded, _] | [name, kind, bonded, _, _] => match parse_bonded(bonded) {
                Some(bonded) => Ok(Prim {
                    name: name.to_string(),
                    kind: kind.to_string(),
                    bonded,
                    pinwires,
                }),
                None => bail!(self.line, "unknown bonding: {bonded}"),
            },
            _ => bail!(self.line, "primitive_site wrong arg count"),
        }
    }

    fn parse_wire(&mut self, l: &str) -> Result<Wire, Error> {
        let (l, closed) = split_closed(l);
        let mut conns = vec![];
        if !closed {
            loop {
                let l = self.next_line("wire")?;
                if l == "\t\t)" {
                    break;
                }
                let Some(l) = l.strip_prefix("\t\t\t(conn ") else {
                    bail!(self.line, "expected wire item: {l}");
                };
                let Some(l) = l.strip_suffix(')') else {
                    bail!(self.line, "missing ) on conn");
                };
                let l: Vec<_> = l.split(' ').collect();
                match l[..] {
                    [tile, wire] => conns.push((tile.to_string(), wire.to_string())),
                    _ => bail!(self.line, "conn wrong arg count"),
                }
            }
        }
        let l: Vec<_> = l.split(' ').collect();
        let (name, speed) = match l[..] {
            [name, _] => (name.to_string(), None),
            [name, _, speed] => (name.to_string(), Some(speed.to_string())),
            _ => bail!(self.line, "wire wrong arg count"),
        };
        Ok(Wire { name, speed, conns })
    }

    fn parse_pip(&self, l: &str) -> Result<Pip, Error> {
        let Some(l) = l.strip_suffix(')') else {
            bail!(self.line, "missing ) on pip");
        };
        let (l, route_through) = match l.strip_suffix(')') {
            Some(l) => {
                let sep = if l.contains("(_ROUTETHROUGH-") {
                    " (_ROUTETHROUGH-"
                } else {
                    " (ROUTETHROUGH-"
                };
                let Some((l, rt)) = l.split_once(sep) else {
                    bail!(self.line, "not routethru pip: {l:?}");
                };
                let Some((pins, prim_kind)) = rt.split_once(' ') else {
                    bail!(self.line, "not routethru pip: {l:?}");
                };
                let Some((pin_from, pin_to)) = pins.split_once('-') else {
                    bail!(self.line, "not routethru pip: {l:?}");
                };
                (
                    l,
                    Some(PipRouteThrough {
                        pin_from: pin_from.to_string(),
                        pin_to: pin_to.to_string(),
                        prim_kind: prim_kind.to_string(),
                    }),
                )
            }
            None => (l, None),
        };
        let l: Vec<_> = l.split(' ').collect();
        let (wf, kind, wt, speed) = match l[..] {
            [_, wf, kind, wt] => (wf, kind, wt, None),
            [_, wf, kind, wt, speed] => (wf, kind, wt, Some(speed.to_string())),
            _ => bail!(self.line, "pip wrong arg count: {l:?}"),
        };
        let kind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => bail!(self.line, "{e}"),
        };
        Ok(Pip {
            wire_from: wf.to_string(),
            wire_to: wt.to_string(),
            kind,
            speed,
            route_through,
        })
    }

    fn parse_tile(&mut self, l: &str) -> Result<Tile, Error> {
        let l: Vec<_> = l.split(' ').collect();
        let (row, col, name, kind) = match l[..] {
            [r, c, name, kind, _] => match (r.parse::<u32>(), c.parse::<u32>()) {
                (Ok(r), Ok(c)) => (r, c, name.to_string(), kind.to_string()),
                _ => bail!(self.line, "bad tile coordinates"),
            },
            _ => bail!(self.line, "tile wrong arg count"),
        };
        let mut tile = Tile {
            row,
            col,
            name,
            kind,
            prims: vec![],
            wires: vec![],
            pips: vec![],
        };
        loop {
            let l = self.next_line("tile")?;
            if l == "\t)" {
                return Ok(tile);
            } else if let Some(l) = l.strip_prefix("\t\t(primitive_site ") {
                let prim = self.parse_primitive_site(l)?;
                tile.prims.push(prim);
            } else if let Some(l) = l.strip_prefix("\t\t(wire ") {
                let wire = self.parse_wire(l)?;
                tile.wires.push(wire);
            } else if let Some(l) = l.strip_prefix("\t\t(pip ") {
                let pip = self.parse_pip(l)?;
                tile.pips.push(pip);
            } else if (l.starts_with("\t\t(tile_summary")
                || l.starts_with("\t\t(alternate_site_types"))
                && l.ends_with(')')
            {
                // Derived data.
            } else {
                bail!(self.line, "expected tile item: {l}");
            }
        }
    }

    /// Returns the next tile, or `None` once the whole report has been read.
    pub fn get_tile(&mut self) -> Result<Option<Tile>, Error> {
        while !self.done {
            if self.in_tiles {
                let l = self.next_line("tiles")?;
                if let Some(l) = l.strip_prefix("\t(tile ") {
                    return self.parse_tile(l).map(Some);
                } else if l == ")" {
                    self.in_tiles = false;
                } else if !l.starts_with('#') {
                    bail!(self.line, "expected tile: {l}");
                }
                continue;
            }
            let l = self.next_top("report")?;
            if l == ")" {
                self.done = true;
            } else if let Some(l) = l.strip_prefix("(tiles ") {
                let l: Vec<_> = l.split(' ').collect();
                match l[..] {
                    [r, c] => match (r.parse::<u32>(), c.parse::<u32>()) {
                        (Ok(r), Ok(c)) => {
                            self.rows = r;
                            self.cols = c;
                        }
                        _ => bail!(self.line, "bad tiles dimensions"),
                    },
                    _ => bail!(self.line, "tiles wrong arg count"),
                }
                self.in_tiles = true;
            } else if l.starts_with("(primitive_defs ") {
                self.parse_primitive_defs()?;
            } else if let Some(l) = l.strip_prefix("(alternate_site_types ") {
                let l = l.strip_suffix(')').unwrap_or(l);
                let mut l = l.split(' ');
                if let Some(st) = l.next() {
                    self.alternate_site_types
                        .insert(st.to_string(), l.map(String::from).collect());
                }
            } else if l.starts_with("(tags ")
                || l.starts_with("(routed_tags ")
                || l.starts_with("(cell_constraints ")
            {
                if !l.ends_with(')') {
                    self.skip_block("annotations")?;
                }
            } else if l.starts_with("(summary ") {
                self.summary = Some(l);
            } else {
                bail!(self.line, "unexpected top-level item: {l}");
            }
        }
        Ok(None)
    }

    pub fn version(&self) -> &str {
        &self.version
    }
    pub fn part(&self) -> &str {
        &self.part
    }
    pub fn family(&self) -> &str {
        &self.family
    }
    pub fn rows(&self) -> u32 {
        self.rows
    }
    pub fn cols(&self) -> u32 {
        self.cols
    }
    pub fn primitive_defs(&self) -> &[PrimitiveDef] {
        &self.primitive_defs
    }
    pub fn alternate_site_types(&self) -> &BTreeMap<String, Vec<String>> {
        &self.alternate_site_types
    }
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}
