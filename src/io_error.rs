use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filesystem failure on one of the managed files.
#[derive(Debug, Error)]
#[error("{action} {path:?} failed: {source}")]
pub struct IoError {
    pub action: &'static str,
    pub path: PathBuf,
    pub source: io::Error,
}

/// `map_err` adapter: `.map_err(io_error::new("reading", path))?`.
pub fn new(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> IoError {
    let path = path.to_path_buf();
    move |source| IoError { action, path, source }
}
