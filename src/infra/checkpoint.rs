// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything needed to rebuild a trained
// relation classifier.
//
// Directory layout:
//   new_model_dir/
//     checkpoint_epoch_3.mpk   ← weights after epoch 3 (CompactRecorder)
//     checkpoint_epoch_4.mpk
//     latest_epoch.json        ← epoch of the newest checkpoint
//     checkpoints.json         ← epochs still on disk, oldest first
//     model_config.json        ← architecture (burn Config)
//     labels.json              ← label set, index order
//     training_args.json       ← the TaskConfig of the training run
//
// Only the newest `max_num_checkpoints` weight files are kept.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    config::Config,
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::config::TaskConfig;
use crate::domain::example::LabelMap;
use crate::ml::model::{RelationClassifier, RelationModelConfig};

const LATEST_FILE: &str = "latest_epoch.json";
const RETAINED_FILE: &str = "checkpoints.json";
const MODEL_CONFIG_FILE: &str = "model_config.json";
const LABELS_FILE: &str = "labels.json";
const TASK_CONFIG_FILE: &str = "training_args.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Does not touch the filesystem; directories are created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create model directory '{}'", self.dir.display()))
    }

    fn checkpoint_stem(epoch: usize) -> String {
        format!("checkpoint_epoch_{epoch}")
    }

    // ─── Weights ─────────────────────────────────────────────────────────────

    /// Save weights for `epoch`, then drop checkpoints beyond the newest `keep`.
    pub fn save_model<B: Backend>(
        &self,
        model: &RelationClassifier<B>,
        epoch: usize,
        keep:  usize,
    ) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(Self::checkpoint_stem(epoch));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        fs::write(self.dir.join(LATEST_FILE), serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_FILE}"))?;

        let mut retained = self.retained_epochs()?;
        retained.retain(|&e| e != epoch);
        retained.push(epoch);
        for stale in prune_oldest(&mut retained, keep.max(1)) {
            self.remove_checkpoint(stale)?;
        }
        fs::write(self.dir.join(RETAINED_FILE), serde_json::to_string(&retained)?)
            .with_context(|| format!("Failed to write {RETAINED_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {} (retained {:?})", epoch, retained);
        Ok(())
    }

    /// Restore the newest checkpoint into `model`.
    ///
    /// `model` must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend>(
        &self,
        model:  RelationClassifier<B>,
        device: &B::Device,
    ) -> Result<RelationClassifier<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(Self::checkpoint_stem(epoch));

        tracing::info!("Loading checkpoint from epoch {} in '{}'", epoch, self.dir.display());

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Has the model been trained?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{}'. Run with --do_train first.", path.display())
        })?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    fn retained_epochs(&self) -> Result<Vec<usize>> {
        let path = self.dir.join(RETAINED_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&path)?;
        serde_json::from_str(&s).with_context(|| format!("Corrupt '{}'", path.display()))
    }

    /// Remove every file of one checkpoint, whatever extension the recorder used.
    fn remove_checkpoint(&self, epoch: usize) -> Result<()> {
        let prefix = format!("{}.", Self::checkpoint_stem(epoch));
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix));
            if matches {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove old checkpoint '{}'", path.display()))?;
                tracing::debug!("Removed old checkpoint '{}'", path.display());
            }
        }
        Ok(())
    }

    // ─── Metadata ────────────────────────────────────────────────────────────

    pub fn save_model_config(&self, cfg: &RelationModelConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(MODEL_CONFIG_FILE);
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }

    pub fn load_model_config(&self) -> Result<RelationModelConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        RelationModelConfig::load(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read model config '{}': {e:?}", path.display()))
    }

    pub fn save_labels(&self, labels: &LabelMap) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(LABELS_FILE);
        fs::write(&path, serde_json::to_string_pretty(labels)?)
            .with_context(|| format!("Cannot write labels to '{}'", path.display()))
    }

    pub fn load_labels(&self) -> Result<LabelMap> {
        let path = self.dir.join(LABELS_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read labels from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_task_config(&self, cfg: &TaskConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(TASK_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

/// Drop the oldest entries until at most `keep` remain; returns the dropped ones.
fn prune_oldest(retained: &mut Vec<usize>, keep: usize) -> Vec<usize> {
    let excess = retained.len().saturating_sub(keep);
    retained.drain(..excess).collect()
}
