use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

use crate::device::{self, InvalidName};
use crate::io_error::{self, IoError};
use crate::ops::Ops;
use crate::wg::conf::ServerConfig;

#[derive(Debug, Serialize)]
pub struct List {
    pub devices: Vec<String>,
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.devices.is_empty() {
            return write!(f, "no devices");
        }
        write!(f, "{}", self.devices.join("\n"))
    }
}

#[derive(Debug, Serialize)]
pub struct Show {
    pub device: String,
    pub ip: Option<Ipv4Addr>,
    pub public_key: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl fmt::Display for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = || "-".to_string();
        writeln!(f, "device: {}", self.device)?;
        writeln!(f, "ip: {}", self.ip.map(|ip| ip.to_string()).unwrap_or_else(unknown))?;
        writeln!(f, "public key: {}", self.public_key.clone().unwrap_or_else(unknown))?;
        write!(
            f,
            "config: {}",
            self.config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(unknown)
        )
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidName(#[from] InvalidName),
    #[error("server config {0:?} not found")]
    NoServerConfig(PathBuf),
    #[error("device {0:?} not found")]
    NotFound(String),
    #[error(transparent)]
    IO(#[from] IoError),
}

/// Device names in server config order. A missing server config has no devices.
pub fn devices(ops: &Ops) -> Result<Vec<String>, Error> {
    let path = &ops.server_config;
    if !path.exists() {
        tracing::debug!(?path, "no server config yet");
        return Ok(Vec::new());
    }
    let conf = ServerConfig::load(path).map_err(io_error::new("reading", path))?;
    Ok(conf.device_names())
}

pub fn run(ops: &Ops) -> Result<List, Error> {
    Ok(List { devices: devices(ops)? })
}

/// Details of a single device from its peer block.
pub fn show(ops: &Ops, name: &str) -> Result<Show, Error> {
    let name = device::validate_name(name)?;
    let path = &ops.server_config;
    if !path.exists() {
        return Err(Error::NoServerConfig(path.clone()));
    }
    let conf = ServerConfig::load(path).map_err(io_error::new("reading", path))?;
    let block = conf.device(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
    let config_path = ops.client_config(name);

    Ok(Show {
        device: name.to_string(),
        ip: block.ip(),
        public_key: block.public_key().map(str::to_string),
        config_path: config_path.exists().then_some(config_path),
    })
}
