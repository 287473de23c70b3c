use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown tile {0}")]
    UnknownTile(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
    #[error("parse error in line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error(transparent)]
    Interchange(#[from] prjcombine_re_xilinx_interchange::Error),
}
