// ============================================================
// Layer 6 — Feature Cache
// ============================================================
// With --cache_data, featurized splits are stored as JSON next to
// the TSV files so later runs skip tokenisation:
//
//   data_dir/cached_train_bert_512_sep_s2_lc_t9f0c1e2d3b4a5968.json
//
// The file name encodes every setting that changes the features,
// ending in a fingerprint of the tokenizer. A new vocabulary or a
// different pretrained tokenizer therefore misses the old cache.

use anyhow::{Context, Result};
use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::application::config::{DataFormatMode, TaskConfig};
use crate::data::features::RelationFeature;

pub struct FeatureCache {
    dir: PathBuf,
}

impl FeatureCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache file for `split` under the settings of `cfg` and `tokenizer`.
    pub fn path_for(
        &self,
        split:       &str,
        cfg:         &TaskConfig,
        max_seq_len: usize,
        tokenizer:   &Tokenizer,
    ) -> PathBuf {
        let mode = match cfg.data_format_mode {
            DataFormatMode::Sep => "sep",
            DataFormatMode::Uni => "uni",
        };
        let case = if cfg.do_lower_case { "lc" } else { "cs" };
        self.dir.join(format!(
            "cached_{split}_{}_{max_seq_len}_{mode}_s{}_{case}_t{:016x}.json",
            cfg.model_type,
            cfg.classification_scheme.code(),
            tokenizer_fingerprint(tokenizer),
        ))
    }

    pub fn load(&self, path: &Path) -> Result<Option<Vec<RelationFeature>>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read feature cache '{}'", path.display()))?;
        let features = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt feature cache '{}'", path.display()))?;
        tracing::info!("Loaded cached features from '{}'", path.display());
        Ok(Some(features))
    }

    pub fn store(&self, path: &Path, features: &[RelationFeature]) -> Result<()> {
        fs::write(path, serde_json::to_string(features)?)
            .with_context(|| format!("Cannot write feature cache '{}'", path.display()))?;
        tracing::info!("Cached {} features to '{}'", features.len(), path.display());
        Ok(())
    }
}

/// Hash over the vocabulary (added tokens included) and the normalizer.
/// Only needs to stay stable for one build of the binary.
pub fn tokenizer_fingerprint(tokenizer: &Tokenizer) -> u64 {
    let mut vocab: Vec<(String, u32)> = tokenizer.get_vocab(true).into_iter().collect();
    vocab.sort_unstable();

    let mut hasher = DefaultHasher::new();
    vocab.hash(&mut hasher);
    serde_json::to_string(&tokenizer.get_normalizer())
        .unwrap_or_default()
        .hash(&mut hasher);
    hasher.finish()
}
