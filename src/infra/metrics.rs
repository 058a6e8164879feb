// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch to
// new_model_dir/metrics.csv:
//
//   epoch,global_step,train_loss,learning_rate
//   1,125,1.386294,0.000010
//   2,250,0.912741,0.000008
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,global_step,train_loss,learning_rate";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Optimizer steps taken so far
    pub global_step: usize,

    /// Mean cross-entropy over the epoch's batches
    pub train_loss: f64,

    /// Learning rate used for the epoch's last update
    pub learning_rate: f64,
}

/// Logs epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh CSV in `dir`, replacing any earlier run's file.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{},{:.6},{:.6}",
            m.epoch, m.global_step, m.train_loss, m.learning_rate,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_appended_under_header() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(tmp.path()).unwrap();
        logger
            .log(&EpochMetrics { epoch: 1, global_step: 10, train_loss: 1.5, learning_rate: 1e-5 })
            .unwrap();
        logger
            .log(&EpochMetrics { epoch: 2, global_step: 20, train_loss: 0.75, learning_rate: 0.0 })
            .unwrap();

        let text = fs::read_to_string(tmp.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [HEADER, "1,10,1.500000,0.000010", "2,20,0.750000,0.000000"]);
    }

    #[test]
    fn create_truncates_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("metrics.csv"), "stale\n").unwrap();
        let logger = MetricsLogger::create(tmp.path()).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("metrics.csv")).unwrap(), format!("{HEADER}\n"));
    }
}
