use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("reference tool unavailable: {0}")]
    ReferenceUnavailable(String),
    #[error("cannot run reference tool: {0}")]
    Toolchain(String),
    #[error("malformed reference dump in line {line}: {msg}")]
    MalformedDump { line: usize, msg: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
    #[error("cannot decode reference dump {path}: {source}")]
    Decode {
        path: PathBuf,
        source: bincode::error::DecodeError,
    },
    #[error("cannot encode reference dump {path}: {source}")]
    Encode {
        path: PathBuf,
        source: bincode::error::EncodeError,
    },
    #[error(transparent)]
    Xdlrc(#[from] prjcombine_re_xilinx_xdlrc::Error),
}
