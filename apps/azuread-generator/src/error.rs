//! Error types for the generator.

use std::path::PathBuf;
use thiserror::Error;

pub type GeneratorResult<T> = Result<T, GeneratorError>;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("package {0:?} is not part of the service manifest")]
    UnknownPackage(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
