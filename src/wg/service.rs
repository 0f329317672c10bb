use thiserror::Error;

use crate::exec::{self, Runner};
use crate::ops::Ops;

#[derive(Debug, Error)]
pub enum Error {
    #[error("systemctl restart {unit} failed: {reason}")]
    Generic { unit: String, reason: String },
    #[error(transparent)]
    Exec(#[from] exec::Error),
}

/// Restart the unit managing the interface so it picks up the server config.
pub async fn restart<R: Runner>(ops: &Ops, runner: &R) -> Result<(), Error> {
    let unit = ops.service.as_str();
    let output = runner.run("systemctl", &["restart", unit], None).await?;

    if !output.success {
        return Err(Error::Generic {
            unit: unit.to_string(),
            reason: output.stderr,
        });
    }

    tracing::info!(unit, interface = %ops.interface, "interface restarted");
    Ok(())
}
