use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_DIR: &str = "/etc/wireguard";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("invalid WG_NETWORK {0:?}: expected an IPv4 CIDR such as 10.0.0.0/24")]
    Network(String),
}

/// Raw settings as read from `WG_`-prefixed environment variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    // wireguard interface name, also names the server config file
    pub interface: String,
    // directory holding `<interface>.conf` and `.credentials`
    #[serde(rename = "dir")]
    pub config_dir: PathBuf,
    // generated client profiles, defaults to `<dir>/clients`
    pub clients_dir: Option<PathBuf>,
    // server listen port announced to clients
    pub port: u16,
    // informational, the allocator only knows 10.0.0.0/24
    pub network: String,
    pub dns: String,
    pub mtu: u16,
    // applied to every external command
    pub command_timeout_s: u64,
    // systemd unit restarted after changes, defaults to the interface name
    pub service: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: "wg0".into(),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            clients_dir: None,
            port: 51820,
            network: "10.0.0.0/24".into(),
            dns: "8.8.8.8, 1.1.1.1".into(),
            mtu: 1420,
            command_timeout_s: 30,
            service: None,
        }
    }
}

/// Load `.env` from the current directory and then from `<WG_DIR>/.env`.
///
/// Variables that are already set are never overridden, so the process environment wins over
/// the cwd file, which wins over the config directory file. Must run before the CLI is parsed
/// for `LOG_LEVEL` and `LOG_FILE` to take effect. Returns the files that were read.
pub fn load_env() -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    if let Ok(path) = dotenvy::dotenv() {
        loaded.push(path);
    }
    let dir = std::env::var_os("WG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));
    let dir_env = dir.join(".env");
    if !loaded.contains(&dir_env) && dotenvy::from_path(&dir_env).is_ok() {
        loaded.push(dir_env);
    }
    loaded
}

impl Config {
    /// Extract the configuration from `WG_`-prefixed environment variables.
    pub fn load() -> Result<Self, Error> {
        Self::from_figment(Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("WG_")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, Error> {
        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate_network()?;
        Ok(config)
    }

    fn validate_network(&self) -> Result<(), Error> {
        let err = || Error::Network(self.network.clone());
        let (addr, prefix) = self.network.split_once('/').ok_or_else(err)?;
        addr.trim().parse::<std::net::Ipv4Addr>().map_err(|_| err())?;
        let prefix = prefix.trim().parse::<u8>().map_err(|_| err())?;
        if prefix > 32 {
            return Err(err());
        }
        Ok(())
    }

    pub fn clients_dir(&self) -> PathBuf {
        self.clients_dir
            .clone()
            .unwrap_or_else(|| Path::new(&self.config_dir).join("clients"))
    }
}
