// ============================================================
// Layer 6 — Logging Setup
// ============================================================
// Installs the global tracing subscriber:
//   - console layer, always on
//   - plain-text file layer when --log_file is given; the file is
//     appended to, so runs sharing one log keep their history
//
// RUST_LOG takes precedence over --log_lvl; without it only this
// crate logs at the requested level and dependencies at `warn`.

use anyhow::{Context, Result};
use std::{
    fs::{self, File, OpenOptions},
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::application::config::LogLevel;

pub fn init(log_file: Option<&Path>, level: LogLevel) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("Logging was already initialised")?;

    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create log directory '{}'", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open log file '{}'", path.display()))
}

fn filter_directives(level: LogLevel) -> String {
    format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level.directive())
}
