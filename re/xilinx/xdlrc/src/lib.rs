//! XDLRC resource reports generated from an interchange device database.
//!
//! [`XdlrcWriter`] walks a [`Device`](prjcombine_re_xilinx_interchange::db::Device)
//! and writes the report, recording every wire it emits into a
//! [`WireIndex`].  [`parser::Parser`] reads reports back (ours or
//! ISE-generated ones) and [`compare`] diffs two of them.

use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub mod compare;
mod error;
mod extra;
pub mod parser;
mod primdef;
mod wire_index;
mod writer;

pub use error::Error;
pub use wire_index::{WireIndex, WireIndexEntry};
pub use writer::{Options, Report, Scope, Summary, XdlrcWriter, generate, generate_with_index};

/// Writes `f`'s output into a temporary sibling of `path`, leaving the
/// persisting to the caller.
pub(crate) fn write_temp<T>(
    path: &Path,
    f: impl FnOnce(&mut dyn Write) -> io::Result<T>,
) -> Result<(NamedTempFile, T), Error> {
    let io_err = |source: io::Error| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    let res = {
        let mut w = BufWriter::new(tmp.as_file_mut());
        let res = f(&mut w).map_err(io_err)?;
        w.flush().map_err(io_err)?;
        res
    };
    Ok((tmp, res))
}

pub(crate) fn persist(tmp: NamedTempFile, path: &Path) -> Result<(), Error> {
    tmp.persist(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Writes a file through a temporary sibling that replaces `path` only once
/// `f` has succeeded.
pub fn write_atomic<T>(
    path: &Path,
    f: impl FnOnce(&mut dyn Write) -> io::Result<T>,
) -> Result<T, Error> {
    let (tmp, res) = write_temp(path, f)?;
    persist(tmp, path)?;
    Ok(res)
}
