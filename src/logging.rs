use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Effective filter: `-q` wins, then `-v`/`-vv`, then `--log-level`.
fn directive(cli: &Cli) -> String {
    if cli.quiet {
        return "error".to_string();
    }
    match cli.verbose {
        0 => cli.log_level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Logs go to stderr or the log file. stdout is reserved for command output.
pub fn init(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directive(cli));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match cli.log_file.as_deref() {
        Some(path) => builder.with_writer(Mutex::new(open(path)?)).with_ansi(false).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn open(path: &Path) -> anyhow::Result<std::fs::File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}
