use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"));

#[derive(Debug, Error, PartialEq)]
#[error("invalid device name {0:?}: only letters, digits, '_' and '-' are allowed")]
pub struct InvalidName(pub String);

/// Device names end up in file paths and config comments, so they are restricted to `[A-Za-z0-9_-]+`.
pub fn validate_name(name: &str) -> Result<&str, InvalidName> {
    if NAME.is_match(name) {
        Ok(name)
    } else {
        Err(InvalidName(name.to_string()))
    }
}
