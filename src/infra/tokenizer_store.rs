// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves, and loads the word-level tokenizer.
//
// A fresh tokenizer is written directly in the HuggingFace JSON
// format and loaded back with Tokenizer::from_file, the same way
// for every model type:
//
//   ids 0..4  structural tokens ([PAD] [UNK] [CLS] [SEP] or the
//             RoBERTa spellings <pad> <unk> <s> </s>)
//   ids 4..8  entity markers [s1] [e1] [s2] [e2], registered as
//             added special tokens so they never get split
//   ids 8..   corpus words, most frequent first
//
// Reference: HuggingFace tokenizers JSON serialisation format

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::application::config::SpecialTokenNames;
use crate::domain::example::ENTITY_MARKERS;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load a previously saved tokenizer.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        load_file(&path)
    }

    /// Persist `tokenizer` into this store's directory.
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {e}", path.display()))
    }

    /// Build a vocabulary from `texts`, write it as tokenizer.json, load it back.
    pub fn build_and_save(
        &self,
        texts:      &[&str],
        vocab_size: usize,
        special:    SpecialTokenNames,
        lowercase:  bool,
    ) -> Result<Tokenizer> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let vocab = build_vocab(texts, vocab_size, special, lowercase);
        let json = tokenizer_json(&vocab, special, lowercase);

        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer built with {} tokens, saved to '{}'",
            vocab.len(),
            path.display()
        );

        load_file(&path)
    }
}

fn load_file(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

/// Ordered token list; a token's id is its index.
pub fn build_vocab(
    texts:      &[&str],
    vocab_size: usize,
    special:    SpecialTokenNames,
    lowercase:  bool,
) -> Vec<String> {
    let mut vocab: Vec<String> = [special.pad, special.unk, special.cls, special.sep]
        .into_iter()
        .chain(ENTITY_MARKERS)
        .map(str::to_string)
        .collect();

    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        let mut text = text.to_string();
        for marker in ENTITY_MARKERS {
            text = text.replace(marker, " ");
        }
        if lowercase {
            text = text.to_lowercase();
        }
        for piece in pre_tokenize(&text) {
            *freq.entry(piece).or_insert(0) += 1;
        }
    }

    // Most frequent first; ties alphabetically so the vocabulary is reproducible
    let mut words: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(w, _)| !vocab.contains(w))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size.saturating_sub(vocab.len()));

    vocab.extend(words.into_iter().map(|(w, _)| w));
    vocab
}

/// Same split as the `Whitespace` pre-tokenizer: `\w+|[^\w\s]+`.
pub fn pre_tokenize(text: &str) -> Vec<String> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() && is_word(c) != current_is_word {
            pieces.push(std::mem::take(&mut current));
        }
        current_is_word = is_word(c);
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn tokenizer_json(vocab: &[String], special: SpecialTokenNames, lowercase: bool) -> serde_json::Value {
    let vocab_map: serde_json::Map<String, serde_json::Value> = vocab
        .iter()
        .enumerate()
        .map(|(id, tok)| (tok.clone(), serde_json::json!(id)))
        .collect();

    let added_tokens: Vec<serde_json::Value> = vocab
        .iter()
        .take(4 + ENTITY_MARKERS.len())
        .enumerate()
        .map(|(id, tok)| {
            serde_json::json!({
                "id": id,
                "content": tok,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": false,
            "strip_accents": false,
            "lowercase": lowercase
        },
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab_map,
            "unk_token": special.unk
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::ModelType;

    #[test]
    fn pre_tokenize_splits_words_and_punctuation() {
        assert_eq!(pre_tokenize("a, b-c  d."), ["a", ",", "b", "-", "c", "d", "."]);
        assert!(pre_tokenize("   ").is_empty());
    }

    #[test]
    fn vocab_starts_with_specials_and_markers() {
        let special = ModelType::Bert.special_tokens();
        let vocab = build_vocab(&["[s1] b [e1] a b [s2] c [e2]"], 100, special, false);
        assert_eq!(&vocab[..8], ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[s1]", "[e1]", "[s2]", "[e2]"]);
        // b twice, then a and c alphabetically
        assert_eq!(&vocab[8..], ["b", "a", "c"]);
    }

    #[test]
    fn vocab_size_caps_words() {
        let special = ModelType::Roberta.special_tokens();
        let vocab = build_vocab(&["x y z"], 9, special, false);
        assert_eq!(vocab.len(), 9);
        assert_eq!(vocab[0], "<pad>");
    }

    #[test]
    fn lowercase_merges_case_variants() {
        let special = ModelType::Bert.special_tokens();
        let vocab = build_vocab(&["Pain pain PAIN"], 100, special, true);
        assert_eq!(&vocab[8..], ["pain"]);
    }

    #[test]
    fn built_tokenizer_keeps_markers_whole() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(tmp.path());
        let special = ModelType::Bert.special_tokens();
        let text = "[s1] Aspirin [e1] treats [s2] pain [e2] .";
        let tokenizer = store.build_and_save(&[text], 100, special, true).unwrap();

        let ids = tokenizer.encode(text, false).unwrap().get_ids().to_vec();
        let s1 = tokenizer.token_to_id("[s1]").unwrap();
        let e2 = tokenizer.token_to_id("[e2]").unwrap();
        let aspirin = tokenizer.token_to_id("aspirin").unwrap();
        assert_eq!(ids[0], s1);
        assert_eq!(ids[1], aspirin);
        assert!(ids.contains(&e2));

        // reload from disk gives the same vocabulary
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.get_vocab_size(true), tokenizer.get_vocab_size(true));
    }
}
