// ============================================================
// Layer 4 — Relation Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<RelationFeature>
// into tensors for one forward pass.
//
//   Input:  N features, each with sequences of length S and
//           K marker positions (K fixed by the scheme)
//   Output: RelationBatch with [N, S] sequences, [N, K] markers
//           and [N] labels
//
// Sequences are flattened and reshaped:
//   [f1_t1, f1_t2, ..., f1_tS, f2_t1, ..., fN_tS] → [N, S]
//
// Features are pre-padded, so no dynamic padding happens here.
// Features without a known label get class 0; only eval and
// predict see such features and neither reads the labels tensor.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::features::RelationFeature;

// ─── RelationBatch ────────────────────────────────────────────────────────────
/// A batch of features ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct RelationBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Sentence index of each token — shape: [batch_size, seq_len]
    pub token_type_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Pooled token indices — shape: [batch_size, num_pooled]
    pub marker_positions: Tensor<B, 2, Int>,

    /// Class index per feature — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── RelationBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct RelationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> RelationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn sequence_tensor(
        &self,
        items: &[RelationFeature],
        field: impl Fn(&RelationFeature) -> &[u32],
    ) -> Tensor<B, 2, Int> {
        let batch_size = items.len();
        let seq_len    = field(&items[0]).len();
        let flat: Vec<i32> = items
            .iter()
            .flat_map(|f| field(f).iter().map(|&x| x as i32))
            .collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len])
    }
}

impl<B: Backend> Batcher<RelationFeature, RelationBatch<B>> for RelationBatcher<B> {
    fn batch(&self, items: Vec<RelationFeature>) -> RelationBatch<B> {
        let batch_size = items.len();
        let num_pooled = items[0].marker_positions.len();

        let input_ids      = self.sequence_tensor(&items, |f| &f.input_ids);
        let token_type_ids = self.sequence_tensor(&items, |f| &f.token_type_ids);
        let attention_mask = self.sequence_tensor(&items, |f| &f.attention_mask);

        let markers: Vec<i32> = items
            .iter()
            .flat_map(|f| f.marker_positions.iter().map(|&p| p as i32))
            .collect();
        let marker_positions = Tensor::<B, 1, Int>::from_ints(markers.as_slice(), &self.device)
            .reshape([batch_size, num_pooled]);

        let labels: Vec<i32> = items
            .iter()
            .map(|f| f.label_id.unwrap_or(0) as i32)
            .collect();
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        RelationBatch {
            input_ids,
            token_type_ids,
            attention_mask,
            marker_positions,
            labels,
        }
    }
}
