use std::fs;
use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use crate::ops::Ops;

pub const PERSISTENT_KEEPALIVE_S: u16 = 20;

/// Client side profile for a single device.
#[derive(Debug, Clone)]
pub struct ClientConfig<'a> {
    pub private_key: &'a str,
    pub ip: Ipv4Addr,
    pub server_public_key: &'a str,
    pub server_ip: &'a str,
}

impl ClientConfig<'_> {
    pub fn render(&self, ops: &Ops) -> String {
        format!(
            "[Interface]\n\
             PrivateKey = {private_key}\n\
             Address = {ip}/24\n\
             DNS = {dns}\n\
             MTU = {mtu}\n\
             \n\
             [Peer]\n\
             PublicKey = {server_public_key}\n\
             Endpoint = {server_ip}:{port}\n\
             AllowedIPs = 0.0.0.0/0\n\
             PersistentKeepalive = {keepalive}\n",
            private_key = self.private_key,
            ip = self.ip,
            dns = ops.dns,
            mtu = ops.mtu,
            server_public_key = self.server_public_key,
            server_ip = self.server_ip,
            port = ops.port,
            keepalive = PERSISTENT_KEEPALIVE_S,
        )
    }

    /// Write the profile readable by the owner only.
    pub fn write(&self, ops: &Ops, path: &Path) -> io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        // mode only applies on creation
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(self.render(ops).as_bytes())
    }
}
