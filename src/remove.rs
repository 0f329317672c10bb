use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::device::{self, InvalidName};
use crate::exec::Runner;
use crate::io_error::{self, IoError};
use crate::ops::Ops;
use crate::wg::conf::ServerConfig;
use crate::wg::service;

#[derive(Debug, Serialize)]
pub struct Remove {
    pub removed: String,
}

impl fmt::Display for Remove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removed: {}", self.removed)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidName(#[from] InvalidName),
    #[error("server config {0:?} not found")]
    NotFound(PathBuf),
    #[error(transparent)]
    IO(#[from] IoError),
}

/// Drop a device's peer block, restart the interface and delete its client profile.
///
/// Unknown names leave the server config unchanged and still succeed.
pub async fn run<R: Runner>(ops: &Ops, runner: &R, name: &str) -> Result<Remove, Error> {
    let name = device::validate_name(name)?;

    let path = &ops.server_config;
    if !path.exists() {
        return Err(Error::NotFound(path.clone()));
    }

    let mut conf = ServerConfig::load(path).map_err(io_error::new("reading", path))?;
    let dropped = conf.remove_device(name);
    conf.save(path).map_err(io_error::new("writing", path))?;
    if dropped == 0 {
        tracing::info!(device = name, "no peer block for device");
    } else {
        tracing::info!(device = name, blocks = dropped, "peer removed from server config");
    }

    // best effort, the peer is already gone from the config
    if let Err(err) = service::restart(ops, runner).await {
        tracing::warn!(%err, "interface restart after removal failed");
    }

    let client_path = ops.client_config(name);
    match fs::remove_file(&client_path) {
        Ok(()) => tracing::info!(path = ?client_path, "client config deleted"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => (),
        Err(err) => return Err(io_error::new("deleting", &client_path)(err).into()),
    }

    Ok(Remove {
        removed: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::add;
    use crate::add::tests::{initialized, SERVER_CONF};
    use crate::exec::fake::FakeRunner;
    use crate::list;
    use crate::ops;

    #[tokio::test]
    async fn test_add_then_remove() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        let added = add::run(&ops, &runner, "phone").await.unwrap();
        assert!(added.config_path.exists());

        let res = run(&ops, &runner, "phone").await.unwrap();
        assert_eq!(res.removed, "phone");
        assert!(!list::devices(&ops).unwrap().contains(&"phone".to_string()));
        assert!(!added.config_path.exists());
        assert_eq!(fs::read_to_string(&ops.server_config).unwrap(), format!("{}\n", SERVER_CONF));
    }

    #[tokio::test]
    async fn test_remove_keeps_other_devices() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        for name in ["a", "b", "c"] {
            add::run(&ops, &runner, name).await.unwrap();
        }
        run(&ops, &runner, "b").await.unwrap();
        assert_eq!(list::devices(&ops).unwrap(), vec!["a", "c"]);
        assert!(ops.client_config("a").exists());
        assert!(!ops.client_config("b").exists());

        // removed addresses are not handed out again
        let d = add::run(&ops, &runner, "d").await.unwrap();
        assert_eq!(d.ip, std::net::Ipv4Addr::new(10, 0, 0, 5));
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        add::run(&ops, &runner, "phone").await.unwrap();
        let before = fs::read(&ops.server_config).unwrap();
        let res = run(&ops, &runner, "missing").await;
        assert!(res.is_ok());
        assert_eq!(fs::read(&ops.server_config).unwrap(), before);
    }

    #[tokio::test]
    async fn test_restart_failure_is_not_fatal() {
        let (_dir, ops) = initialized();
        add::run(&ops, &FakeRunner::wireguard(), "phone").await.unwrap();
        let runner = FakeRunner::wireguard().respond("systemctl restart", false, "unit failed");
        let res = run(&ops, &runner, "phone").await;
        assert!(res.is_ok());
        assert!(list::devices(&ops).unwrap().is_empty());
        assert!(!ops.client_config("phone").exists());

        let runner = FakeRunner::new().unavailable("systemctl");
        assert!(run(&ops, &runner, "phone").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_server_config() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops::for_dir(dir.path());
        let runner = FakeRunner::wireguard();
        let res = run(&ops, &runner, "phone").await;
        assert!(matches!(res, Err(Error::NotFound(_))));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_name_has_no_side_effects() {
        let (_dir, ops) = initialized();
        let runner = FakeRunner::wireguard();
        let res = run(&ops, &runner, "../wg0").await;
        assert!(matches!(res, Err(Error::InvalidName(_))));
        assert_eq!(runner.call_count(), 0);
        assert_eq!(fs::read_to_string(&ops.server_config).unwrap(), SERVER_CONF);
    }
}
