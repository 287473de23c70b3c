use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot decode device database {path}: {source}")]
    Decode {
        path: PathBuf,
        source: bincode::error::DecodeError,
    },
    #[error("cannot encode device database {path}: {source}")]
    Encode {
        path: PathBuf,
        source: bincode::error::EncodeError,
    },
    #[error("cannot parse annotations {path}: {source}")]
    AnnotationSyntax {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{context}: unknown {what} {name}")]
    DanglingReference {
        context: String,
        what: &'static str,
        name: String,
    },
    #[error("{context}: {reason}")]
    InvalidAnnotation { context: String, reason: String },
}
