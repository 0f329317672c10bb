use thiserror::Error;

use crate::exec::{self, Runner};

#[derive(Debug, Error)]
pub enum Error {
    #[error("wg {step} failed: {reason}")]
    Generic { step: &'static str, reason: String },
    #[error(transparent)]
    Exec(#[from] exec::Error),
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

/// Generate a key pair with `wg genkey` and derive the public half with `wg pubkey`.
pub async fn generate<R: Runner>(runner: &R) -> Result<KeyPair, Error> {
    let private_key = wg_key(runner, "genkey", None).await?;
    let public_key = wg_key(runner, "pubkey", Some(&format!("{}\n", private_key))).await?;
    Ok(KeyPair {
        private_key,
        public_key,
    })
}

async fn wg_key<R: Runner>(runner: &R, step: &'static str, stdin: Option<&str>) -> Result<String, Error> {
    let output = runner.run("wg", &[step], stdin).await?;
    if !output.success {
        return Err(Error::Generic {
            step,
            reason: output.stderr,
        });
    }
    if output.stdout.is_empty() {
        return Err(Error::Generic {
            step,
            reason: "no key on stdout".to_string(),
        });
    }
    Ok(output.stdout)
}
