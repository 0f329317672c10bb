use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

pub const SERVER_PUBKEY: &str = "SERVER_PUBKEY";
pub const SERVER_IP: &str = "SERVER_IP";

/// Address used when `SERVER_IP` is missing. Not a usable endpoint.
pub const UNCONFIGURED_SERVER_IP: &str = "0.0.0.0";

/// `KEY=VALUE` pairs written by the server installation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    pub fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
            .collect();
        Self { values }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(|content| Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn server_pubkey(&self) -> Option<&str> {
        self.get(SERVER_PUBKEY)
    }

    pub fn server_ip(&self) -> &str {
        self.get(SERVER_IP).unwrap_or(UNCONFIGURED_SERVER_IP)
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}
