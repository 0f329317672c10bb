use serde::Serialize;
use std::fmt;

use crate::exec::Runner;
use crate::ops::Ops;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Serialize, PartialEq)]
pub struct Status {
    pub success: bool,
    pub output: String,
    pub disk_free_gb: Option<f64>,
    pub memory: Option<String>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.success { "up" } else { "unavailable" };
        writeln!(f, "interface: {}", state)?;
        if !self.output.is_empty() {
            writeln!(f, "{}", self.output)?;
        }
        match self.disk_free_gb {
            Some(gb) => writeln!(f, "disk free: {:.1}G", gb)?,
            None => writeln!(f, "disk free: -")?,
        }
        write!(f, "memory: {}", self.memory.as_deref().unwrap_or("-"))
    }
}

/// Interface state and host metrics. Each query is independent of the others.
pub async fn run<R: Runner>(ops: &Ops, runner: &R) -> Status {
    let (success, output) = match runner.run("wg", &["show", ops.interface.as_str()], None).await {
        Ok(out) => (out.success, out.text().to_string()),
        Err(err) => (false, err.to_string()),
    };
    if !success {
        tracing::warn!(interface = %ops.interface, output, "wg show failed");
    }

    Status {
        success,
        output,
        disk_free_gb: disk_free_gb(runner).await,
        memory: memory(runner).await,
    }
}

async fn disk_free_gb<R: Runner>(runner: &R) -> Option<f64> {
    match runner.run("df", &["-B1", "--output=avail", "/"], None).await {
        Ok(out) if out.success => {
            let res = parse_df(&out.stdout);
            if res.is_none() {
                tracing::warn!(stdout = out.stdout, "unexpected df output");
            }
            res
        }
        Ok(out) => {
            tracing::warn!(stderr = out.stderr, "df failed");
            None
        }
        Err(err) => {
            tracing::warn!(%err, "df failed");
            None
        }
    }
}

async fn memory<R: Runner>(runner: &R) -> Option<String> {
    match runner.run("free", &["-h"], None).await {
        Ok(out) if out.success => {
            let res = parse_free(&out.stdout);
            if res.is_none() {
                tracing::warn!(stdout = out.stdout, "unexpected free output");
            }
            res
        }
        Ok(out) => {
            tracing::warn!(stderr = out.stderr, "free failed");
            None
        }
        Err(err) => {
            tracing::warn!(%err, "free failed");
            None
        }
    }
}

/// Available bytes from `df -B1 --output=avail` as GiB rounded to one decimal.
fn parse_df(stdout: &str) -> Option<f64> {
    let bytes = stdout.lines().nth(1)?.trim().parse::<u64>().ok()?;
    Some((bytes as f64 / GIB * 10.0).round() / 10.0)
}

/// `used/total` from the `Mem:` row of `free -h`.
fn parse_free(stdout: &str) -> Option<String> {
    let row = stdout.lines().find(|line| line.trim_start().starts_with("Mem:"))?;
    let fields: Vec<&str> = row.split_whitespace().collect();
    let total = fields.get(1)?;
    let used = fields.get(2)?;
    Some(format!("{}/{}", used, total))
}
