use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

use crate::credentials::{self, Credentials};
use crate::device::{self, InvalidName};
use crate::exec::Runner;
use crate::io_error::{self, IoError};
use crate::ip_range::{self, POOL};
use crate::ops::Ops;
use crate::wg::client::ClientConfig;
use crate::wg::conf::ServerConfig;
use crate::wg::{keys, service};

#[derive(Debug, Serialize)]
pub struct Add {
    pub device: String,
    pub ip: Ipv4Addr,
    pub config_path: PathBuf,
}

impl fmt::Display for Add {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "device: {}", self.device)?;
        writeln!(f, "ip: {}", self.ip)?;
        write!(f, "config: {}", self.config_path.display())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidName(#[from] InvalidName),
    #[error("server is not initialized: {0:?} is missing")]
    NotInitialized(PathBuf),
    #[error("device {0:?} already exists")]
    DuplicateDevice(String),
    #[error("{} has no {}", .0.display(), credentials::SERVER_PUBKEY)]
    MissingServerKey(PathBuf),
    #[error("key generation failed: {0}")]
    Keys(#[from] keys::Error),
    #[error(transparent)]
    NoFreeIp(#[from] ip_range::Error),
    #[error("{0}")]
    Restart(#[from] service::Error),
    #[error(transparent)]
    IO(#[from] IoError),
}

/// Register a new device: append its peer block, restart the interface and write the client profile.
///
/// Steps are not transactional. A failure after the server config was written leaves the block in place.
pub async fn run<R: Runner>(ops: &Ops, runner: &R, name: &str) -> Result<Add, Error> {
    let name = device::validate_name(name)?;

    for required in [&ops.server_config, &ops.credentials] {
        if !required.exists() {
            return Err(Error::NotInitialized(required.clone()));
        }
    }

    let mut conf = ServerConfig::load(&ops.server_config).map_err(io_error::new("reading", &ops.server_config))?;
    if conf.device_names().iter().any(|n| n == name) {
        return Err(Error::DuplicateDevice(name.to_string()));
    }

    let creds = Credentials::load(&ops.credentials).map_err(io_error::new("reading", &ops.credentials))?;
    let server_public_key = creds
        .server_pubkey()
        .ok_or_else(|| Error::MissingServerKey(ops.credentials.clone()))?;

    let pair = keys::generate(runner).await?;
    let ip = POOL.next_ip(conf.lines())?;

    let server_ip = creds.server_ip();
    if server_ip == credentials::UNCONFIGURED_SERVER_IP {
        tracing::warn!(
            credentials = ?ops.credentials,
            "{} not set, client endpoint will be {}",
            credentials::SERVER_IP,
            server_ip
        );
    }

    conf.push_device(name, &pair.public_key, ip);
    conf.save(&ops.server_config)
        .map_err(io_error::new("writing", &ops.server_config))?;
    tracing::info!(device = name, %ip, "peer appended to server config");

    service::restart(ops, runner).await?;

    let config_path = ops.client_config(name);
    let client = ClientConfig {
        private_key: &pair.private_key,
        ip,
        server_public_key,
        server_ip,
    };
    client
        .write(ops, &config_path)
        .map_err(io_error::new("writing", &config_path))?;
    tracing::info!(device = name, path = ?config_path, "client config written");

    Ok(Add {
        device: name.to_string(),
        ip,
        config_path,
    })
}

#[cfg(test)]
pub mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::exec::fake::FakeRunner;
    use crate::ops;

    pub const SERVER_CONF: &str = "[Interface]\nAddress = 10.0.0.1/24\nListenPort = 51820\nPrivateKey = c2VydmVy\n";

    /// Initialized server layout inside a temporary directory.
    pub fn initialized() -> (tempfile::TempDir, Ops) {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops::for_dir(dir.path());
        fs::write(&ops.server_config, SERVER_CONF).unwrap();
        fs::write(&ops.credentials, "SERVER_PUBKEY=c2VydmVycHVi\nSERVER_IP=203.0.113.7\n").unwrap();
        (dir, ops)
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_add() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        let add = run(&ops, &runner, "phone").await.unwrap();
        assert_eq!(add.device, "phone");
        assert_eq!(add.ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(add.config_path, ops.client_config("phone"));

        let conf = fs::read_to_string(&ops.server_config).unwrap();
        assert_eq!(
            conf,
            format!(
                "{}\n# Device: phone\n[Peer]\nPublicKey = cHVibGlja2V5\nAllowedIPs = 10.0.0.2/32\n\n",
                SERVER_CONF
            )
        );

        let client = fs::read_to_string(&add.config_path).unwrap();
        assert!(client.contains("PrivateKey = cHJpdmF0ZWtleQ==\n"));
        assert!(client.contains("Address = 10.0.0.2/24\n"));
        assert!(client.contains("PublicKey = c2VydmVycHVi\n"));
        assert!(client.contains("Endpoint = 203.0.113.7:51820\n"));
        assert!(client.contains("PersistentKeepalive = 20\n"));

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], vec!["systemctl", "restart", "wg0"]);
    }

    #[tokio::test]
    async fn test_add_allocates_sequentially() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        let first = run(&ops, &runner, "a").await.unwrap();
        let second = run(&ops, &runner, "b").await.unwrap();
        assert_eq!(first.ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(second.ip, Ipv4Addr::new(10, 0, 0, 3));
    }

    #[tokio::test]
    async fn test_add_unconfigured_server_ip() {
        let (_dir, ops) = initialized();
        fs::write(&ops.credentials, "SERVER_PUBKEY=c2VydmVycHVi\n").unwrap();
        let add = run(&ops, &FakeRunner::wireguard(), "phone").await.unwrap();
        let client = fs::read_to_string(&add.config_path).unwrap();
        assert!(client.contains("Endpoint = 0.0.0.0:51820\n"));
    }

    #[tokio::test]
    async fn test_not_initialized_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops::for_dir(dir.path());
        let runner = FakeRunner::wireguard();
        let res = run(&ops, &runner, "phone").await;
        assert!(matches!(res, Err(Error::NotInitialized(_))));
        assert_eq!(runner.call_count(), 0);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let (_dir, ops) = initialized();
        fs::remove_file(&ops.credentials).unwrap();
        let runner = FakeRunner::wireguard();
        let res = run(&ops, &runner, "phone").await;
        assert!(matches!(res, Err(Error::NotInitialized(path)) if path == ops.credentials));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_server_key() {
        let (_dir, ops) = initialized();
        fs::write(&ops.credentials, "SERVER_IP=203.0.113.7\n").unwrap();
        let runner = FakeRunner::wireguard();
        let res = run(&ops, &runner, "phone").await;
        assert!(matches!(res, Err(Error::MissingServerKey(path)) if path == ops.credentials));
        assert_eq!(runner.call_count(), 0);
        assert_eq!(fs::read_to_string(&ops.server_config).unwrap(), SERVER_CONF);
    }

    #[tokio::test]
    async fn test_invalid_names_have_no_side_effects() {
        let (dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        for name in ["../phone", "my phone", "a;reboot", ""] {
            let res = run(&ops, &runner, name).await;
            assert!(matches!(res, Err(Error::InvalidName(_))));
        }
        assert_eq!(runner.call_count(), 0);
        assert_eq!(fs::read_to_string(&ops.server_config).unwrap(), SERVER_CONF);
        assert_eq!(entries(dir.path()), 2);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        run(&ops, &runner, "phone").await.unwrap();
        let before = fs::read_to_string(&ops.server_config).unwrap();
        let res = run(&ops, &runner, "phone").await;
        assert!(matches!(res, Err(Error::DuplicateDevice(_))));
        assert_eq!(fs::read_to_string(&ops.server_config).unwrap(), before);
    }

    #[tokio::test]
    async fn test_exhausted_pool_writes_nothing() {
        let (dir, ops) = initialized();
        let full = format!("{}\n# Device: last\n[Peer]\nPublicKey = x\nAllowedIPs = 10.0.0.254/32\n\n", SERVER_CONF);
        fs::write(&ops.server_config, &full).unwrap();
        let res = run(&ops, &FakeRunner::wireguard(), "phone").await;
        assert!(matches!(res, Err(Error::NoFreeIp(_))));
        assert_eq!(fs::read_to_string(&ops.server_config).unwrap(), full);
        assert!(!ops.clients_dir.exists());
        assert_eq!(entries(dir.path()), 2);
    }

    #[tokio::test]
    async fn test_keygen_failure() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard().respond("wg genkey", false, "wg: command failed");
        let res = run(&ops, &runner, "phone").await;
        assert!(matches!(res, Err(Error::Keys(_))));
        assert_eq!(fs::read_to_string(&ops.server_config).unwrap(), SERVER_CONF);
    }

    #[tokio::test]
    async fn test_restart_failure_keeps_peer_block() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard().respond("systemctl restart", false, "unit not found");
        let res = run(&ops, &runner, "phone").await;
        assert!(matches!(res, Err(Error::Restart(_))));
        let conf = ServerConfig::load(&ops.server_config).unwrap();
        assert_eq!(conf.device_names(), vec!["phone"]);
        assert!(!ops.client_config("phone").exists());
    }
}
