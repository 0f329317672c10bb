use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use thiserror::Error;

/// Host addresses handed out to devices: 10.0.0.2 - 10.0.0.254.
/// 10.0.0.1 belongs to the server interface.
pub const POOL: IpRange = IpRange {
    start: Ipv4Addr::new(10, 0, 0, 2),
    end: Ipv4Addr::new(10, 0, 0, 254),
};

static ALLOWED_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"AllowedIPs\s*=\s*10\.0\.0\.(\d+)/32").expect("static regex")
});

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("address pool {0} is exhausted")]
    Exhausted(IpRange),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IpRange {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

impl IpRange {
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let ip = u32::from(ip);
        let start = u32::from(self.start);
        let end = u32::from(self.end);
        ip >= start && ip <= end
    }

    /// High-water-mark allocation: one past the highest host octet in use.
    ///
    /// Only `AllowedIPs = 10.0.0.<n>/32` lines count. Gaps left by removed devices are never reused.
    pub fn next_ip<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> Result<Ipv4Addr, Error> {
        let last = lines
            .into_iter()
            .filter_map(|line| ALLOWED_IP.captures(line))
            .filter_map(|caps| caps[1].parse::<u64>().ok())
            .max()
            .unwrap_or(1);

        u8::try_from(last.saturating_add(1))
            .ok()
            .filter(|octet| *octet <= 254)
            .map(|octet| Ipv4Addr::new(10, 0, 0, octet))
            .filter(|ip| self.contains(*ip))
            .ok_or(Error::Exhausted(*self))
    }
}

impl std::fmt::Display for IpRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
