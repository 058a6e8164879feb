// ============================================================
// Layer 4 — Featurizer
// ============================================================
// Turns a RelationExample into fixed-length id sequences.
//
// Layouts (data_format_mode):
//   Sep (0):  [CLS] a [SEP] b [SEP]     token types 0…0 1…1
//             [CLS] a [SEP]             when b is empty
//   Uni (1):  [CLS] a b [SEP]           token types all 0
//
// Sequences longer than max_seq_length lose tokens from the end
// of whichever sentence is currently longer (longest-first), then
// every sequence is right-padded with the pad id:
//
//   input_ids:       [2, 4, 57, 5, 91, 6, 33, 7, 3, 0, 0]
//   attention_mask:  [1, 1,  1, 1,  1, 1,  1, 1, 1, 0, 0]
//
// marker_positions holds the index of every token the classifier
// pools: always [CLS] at 0, then the entity markers the scheme
// asks for. A marker lost to truncation points back at [CLS].
//
// Reference: Burn Book §4 (Datasets)

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::application::config::{ClassificationScheme, DataFormatMode, SpecialTokenNames};
use crate::domain::example::{
    LabelMap, RelationExample, ENTITY1_END, ENTITY1_START, ENTITY2_END, ENTITY2_START,
};

/// One tokenised, padded example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationFeature {
    pub input_ids:        Vec<u32>,
    pub token_type_ids:   Vec<u32>,
    pub attention_mask:   Vec<u32>,
    pub marker_positions: Vec<usize>,
    /// None when the label is not in the training label set
    pub label_id:         Option<usize>,
}

/// Vocabulary ids of the structural tokens and entity markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialIds {
    pub pad: u32,
    pub cls: u32,
    pub sep: u32,
    pub entity1_start: u32,
    pub entity1_end:   u32,
    pub entity2_start: u32,
    pub entity2_end:   u32,
}

impl SpecialIds {
    pub fn from_tokenizer(tokenizer: &Tokenizer, names: SpecialTokenNames) -> Result<Self> {
        let id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| anyhow!("Tokenizer has no '{token}' token"))
        };
        Ok(Self {
            pad: id(names.pad)?,
            cls: id(names.cls)?,
            sep: id(names.sep)?,
            entity1_start: id(ENTITY1_START)?,
            entity1_end:   id(ENTITY1_END)?,
            entity2_start: id(ENTITY2_START)?,
            entity2_end:   id(ENTITY2_END)?,
        })
    }

    /// Marker ids pooled after [CLS] under `scheme`.
    fn pooled_markers(&self, scheme: ClassificationScheme) -> Vec<u32> {
        match scheme {
            ClassificationScheme::Cls => vec![],
            ClassificationScheme::ClsEntityStarts => vec![self.entity1_start, self.entity2_start],
            ClassificationScheme::ClsEntityStartsEnds => vec![
                self.entity1_start,
                self.entity2_start,
                self.entity1_end,
                self.entity2_end,
            ],
        }
    }
}

pub struct Featurizer<'a> {
    tokenizer:   &'a Tokenizer,
    special:     SpecialIds,
    max_seq_len: usize,
    mode:        DataFormatMode,
    scheme:      ClassificationScheme,
}

impl<'a> Featurizer<'a> {
    pub fn new(
        tokenizer:   &'a Tokenizer,
        special:     SpecialIds,
        max_seq_len: usize,
        mode:        DataFormatMode,
        scheme:      ClassificationScheme,
    ) -> Self {
        Self { tokenizer, special, max_seq_len, mode, scheme }
    }

    pub fn featurize(&self, example: &RelationExample, labels: &LabelMap) -> Result<RelationFeature> {
        let a = self.encode(&example.text_a)?;
        let b = self.encode(&example.text_b)?;
        let mut feature = assemble(a, b, &self.special, self.max_seq_len, self.mode, self.scheme);
        feature.label_id = labels.index_of(&example.label);
        Ok(feature)
    }

    pub fn featurize_all(
        &self,
        examples: &[RelationExample],
        labels:   &LabelMap,
    ) -> Result<Vec<RelationFeature>> {
        let features = examples
            .iter()
            .map(|ex| self.featurize(ex, labels))
            .collect::<Result<Vec<_>>>()?;

        let mut truncated = 0;
        for (example, feature) in examples.iter().zip(&features) {
            if feature.marker_positions.iter().skip(1).any(|&p| p == 0) {
                tracing::debug!("{}: entity marker truncated away", example.guid);
                truncated += 1;
            }
        }
        if truncated > 0 {
            tracing::warn!(
                "{} of {} examples lost an entity marker to truncation at max_seq_length {}",
                truncated,
                features.len(),
                self.max_seq_len
            );
        }
        Ok(features)
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation failed for '{text}': {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// Fails when a feature holds a token id the embedding table has no row for.
pub fn check_vocab_range(features: &[RelationFeature], vocab_size: usize) -> Result<()> {
    for (index, feature) in features.iter().enumerate() {
        if let Some(&id) = feature.input_ids.iter().find(|&&id| id as usize >= vocab_size) {
            bail!(
                "Feature {index} holds token id {id}, but the model vocabulary has only {vocab_size} entries"
            );
        }
    }
    Ok(())
}

/// Build the padded sequences for one example from its two token lists.
pub fn assemble(
    mut a:       Vec<u32>,
    mut b:       Vec<u32>,
    special:     &SpecialIds,
    max_seq_len: usize,
    mode:        DataFormatMode,
    scheme:      ClassificationScheme,
) -> RelationFeature {
    let separated = mode == DataFormatMode::Sep && !b.is_empty();
    let reserved  = if separated { 3 } else { 2 };
    truncate_pair(&mut a, &mut b, max_seq_len.saturating_sub(reserved));

    let mut input_ids      = Vec::with_capacity(max_seq_len);
    let mut token_type_ids = Vec::with_capacity(max_seq_len);

    input_ids.push(special.cls);
    input_ids.extend_from_slice(&a);
    if separated {
        input_ids.push(special.sep);
        token_type_ids.resize(input_ids.len(), 0);
        input_ids.extend_from_slice(&b);
        input_ids.push(special.sep);
        token_type_ids.resize(input_ids.len(), 1);
    } else {
        input_ids.extend_from_slice(&b);
        input_ids.push(special.sep);
        token_type_ids.resize(input_ids.len(), 0);
    }

    let real = input_ids.len();
    let mut attention_mask = vec![1u32; real];
    input_ids.resize(max_seq_len, special.pad);
    token_type_ids.resize(max_seq_len, 0);
    attention_mask.resize(max_seq_len, 0);

    let marker_positions = std::iter::once(0)
        .chain(special.pooled_markers(scheme).into_iter().map(|marker| {
            input_ids[..real].iter().position(|&id| id == marker).unwrap_or(0)
        }))
        .collect();

    RelationFeature { input_ids, token_type_ids, attention_mask, marker_positions, label_id: None }
}

/// Pop from the end of the longer list until both fit in `budget`.
fn truncate_pair(a: &mut Vec<u32>, b: &mut Vec<u32>, budget: usize) {
    while a.len() + b.len() > budget {
        if a.len() > b.len() {
            a.pop();
        } else {
            b.pop();
        }
    }
}
