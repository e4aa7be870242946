mod calc;
mod config;
mod gradebook;
mod ipc;

use std::io::{self, BufRead, Write};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Logs go to stderr; stdout carries only protocol lines.
fn init_logging(cfg: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&cfg.log_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("build log filter")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    let res = if cfg.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    res.map_err(|e| anyhow::anyhow!("init logging: {e}"))
}

fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env();
    init_logging(&cfg)?;
    for w in &cfg.warnings {
        tracing::warn!("{}", w);
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradecalcd ready");

    let mut state = ipc::AppState::default();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                tracing::warn!(error = %e, "bad request line");
                ipc::bad_json(e.to_string())
            }
        };

        writeln!(stdout, "{}", resp).context("write response")?;
        stdout.flush().context("flush response")?;
    }

    tracing::info!("stdin closed, exiting");
    Ok(())
}
