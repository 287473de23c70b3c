use crate::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// One wire written into a report body.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct WireIndexEntry {
    pub tile: String,
    pub wire: String,
    /// Position in the report, counting from 0.
    pub order: usize,
    /// The wire was written by the pin-wire fallback, without a node.
    pub nodeless: bool,
}

/// The wires of a report, in exactly the order they were written.
///
/// This is the contract between report generation and node validation:
/// the validator walks the reference device and this index in lockstep.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct WireIndex {
    entries: Vec<WireIndexEntry>,
}

impl WireIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tile: &str, wire: &str, nodeless: bool) {
        let order = self.entries.len();
        self.entries.push(WireIndexEntry {
            tile: tile.to_string(),
            wire: wire.to_string(),
            order,
            nodeless,
        });
    }

    pub fn entries(&self) -> &[WireIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The order-preserving subsequence of wires written without a node.
    pub fn nodeless(&self) -> impl Iterator<Item = &WireIndexEntry> {
        self.entries.iter().filter(|e| e.nodeless)
    }

    /// Writes one `tile wire node|nodeless` line per entry.
    pub fn write(&self, w: &mut dyn Write) -> io::Result<()> {
        for e in &self.entries {
            let kind = if e.nodeless { "nodeless" } else { "node" };
            writeln!(w, "{} {} {kind}", e.tile, e.wire)?;
        }
        Ok(())
    }

    pub fn read(r: impl BufRead) -> Result<Self, Error> {
        let mut res = WireIndex::new();
        for (i, l) in r.lines().enumerate() {
            let l = l?;
            if l.is_empty() {
                continue;
            }
            let l: Vec<_> = l.split(' ').collect();
            let nodeless = match l[..] {
                [_, _, "node"] => false,
                [_, _, "nodeless"] => true,
                _ => {
                    return Err(Error::Parse {
                        line: i + 1,
                        msg: format!("malformed wire index entry {:?}", l.join(" ")),
                    });
                }
            };
            res.push(l[0], l[1], nodeless);
        }
        Ok(res)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        crate::write_atomic(path.as_ref(), |w| self.write(w))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read(BufReader::new(f))
    }

    /// Where the index of a report goes unless told otherwise.
    pub fn default_path(report: &Path) -> std::path::PathBuf {
        let mut name = report.as_os_str().to_owned();
        name.push(".wires");
        name.into()
    }
}
