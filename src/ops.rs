use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Resolved runtime settings handed to every operation.
#[derive(Debug, Clone)]
pub struct Ops {
    pub interface: String,
    pub server_config: PathBuf,
    pub credentials: PathBuf,
    pub clients_dir: PathBuf,
    pub service: String,
    pub port: u16,
    pub dns: String,
    pub mtu: u16,
    pub command_timeout: Duration,
}

impl Ops {
    pub fn client_config(&self, device: &str) -> PathBuf {
        self.clients_dir.join(format!("{}.conf", device))
    }
}

impl From<Config> for Ops {
    fn from(config: Config) -> Self {
        let def_network = Config::default().network;
        if config.network != def_network {
            tracing::warn!(
                network = %config.network,
                "addresses are always allocated from {}, WG_NETWORK is ignored",
                def_network
            );
        }

        let clients_dir = config.clients_dir();
        Self {
            server_config: config.config_dir.join(format!("{}.conf", config.interface)),
            credentials: config.config_dir.join(".credentials"),
            clients_dir,
            service: config.service.clone().unwrap_or_else(|| config.interface.clone()),
            port: config.port,
            dns: config.dns,
            mtu: config.mtu,
            command_timeout: Duration::from_secs(config.command_timeout_s),
            interface: config.interface,
        }
    }
}

#[cfg(test)]
pub fn for_dir(dir: &std::path::Path) -> Ops {
    Ops::from(Config {
        config_dir: dir.to_path_buf(),
        ..Config::default()
    })
}
