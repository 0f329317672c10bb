use anyhow::{bail, Context};
use serde::Serialize;
use std::fmt::Display;
use std::process::ExitCode;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::exec::SystemRunner;
use crate::ops::Ops;

mod add;
mod cli;
mod config;
mod credentials;
mod device;
mod exec;
mod io_error;
mod ip_range;
mod list;
mod logging;
mod ops;
mod remove;
mod status;
mod wg;

const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let env_files = config::load_env();
    let args = cli::parse();
    if let Err(err) = logging::init(&args) {
        eprintln!("unable to set up logging: {:#}", err);
        return ExitCode::FAILURE;
    }
    tracing::debug!(?env_files, "loaded .env");

    tokio::select! {
        res = run(&args) => match res {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!("{:#}", err);
                if args.debug {
                    eprintln!("{:?}", err);
                }
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(args: &Cli) -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    let ops = Ops::from(config);
    tracing::debug!(?ops, "configuration loaded");

    if !nix::unistd::geteuid().is_root() {
        bail!("{} must be run as root", env!("CARGO_PKG_NAME"));
    }

    let runner = SystemRunner::new(ops.command_timeout);
    match &args.command {
        Command::Status => render(args.json, &status::run(&ops, &runner).await),
        Command::List => render(args.json, &list::run(&ops)?),
        Command::Show { device } => render(args.json, &list::show(&ops, device)?),
        Command::Add { device } => render(args.json, &add::run(&ops, &runner, device).await?),
        Command::Remove { device } => render(args.json, &remove::run(&ops, &runner, device).await?),
    }
}

fn render<T: Serialize + Display>(json: bool, value: &T) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", value);
    }
    Ok(())
}
