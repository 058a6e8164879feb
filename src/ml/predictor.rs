// ============================================================
// Layer 5 — Predictor
// ============================================================
// Runs a trained classifier over a featurized split and returns
// the arg-max class index of every feature, in input order.
//
// Batches are cut from the feature list directly rather than
// through a DataLoader, so the output order always matches the
// rows of the TSV file.

use anyhow::{anyhow, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use indicatif::{ProgressBar, ProgressDrawTarget};

use crate::data::{batcher::RelationBatcher, features::RelationFeature};
use crate::ml::model::RelationClassifier;

pub struct Predictor<B: Backend> {
    model:      RelationClassifier<B>,
    batcher:    RelationBatcher<B>,
    batch_size: usize,
}

impl<B: Backend> Predictor<B> {
    /// `model` should already be in inference mode (no autodiff, dropout off).
    pub fn new(model: RelationClassifier<B>, device: B::Device, batch_size: usize) -> Self {
        Self { model, batcher: RelationBatcher::new(device), batch_size: batch_size.max(1) }
    }

    pub fn predict(&self, features: &[RelationFeature], show_progress: bool) -> Result<Vec<usize>> {
        let pb = ProgressBar::new(features.len().div_ceil(self.batch_size) as u64);
        if !show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }

        let mut predictions = Vec::with_capacity(features.len());
        for chunk in features.chunks(self.batch_size) {
            let batch  = self.batcher.batch(chunk.to_vec());
            let logits = self.model.forward(
                batch.input_ids,
                batch.token_type_ids,
                batch.attention_mask,
                batch.marker_positions,
            );

            // argmax(1) returns [batch, 1]; flatten to [batch]
            let classes = logits
                .argmax(1)
                .flatten::<1>(0, 1)
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;
            predictions.extend(classes.into_iter().map(|c| c as usize));
            pb.inc(1);
        }
        pb.finish_and_clear();

        tracing::debug!("Predicted {} examples", predictions.len());
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    use crate::application::config::ModelType;
    use crate::ml::model::RelationModelConfig;
    use crate::ml::test_support::backend_rng_guard;

    #[test]
    fn one_prediction_per_feature_in_range() {
        let _guard = backend_rng_guard();
        let device = NdArrayDevice::Cpu;
        let model = RelationModelConfig {
            model_type:        ModelType::Albert,
            vocab_size:        12,
            max_seq_len:       5,
            hidden_size:       4,
            num_heads:         1,
            num_layers:        2,
            intermediate_size: 8,
            type_vocab_size:   2,
            embedding_size:    4,
            num_labels:        3,
            num_pooled:        3,
            dropout:           0.0,
        }
        .init::<NdArray>(&device);

        let features: Vec<RelationFeature> = (0..5)
            .map(|i| RelationFeature {
                input_ids:        vec![2, 4, 8 + i % 3, 6, 3],
                token_type_ids:   vec![0; 5],
                attention_mask:   vec![1; 5],
                marker_positions: vec![0, 1, 3],
                label_id:         None,
            })
            .collect();

        let predictor = Predictor::new(model, device, 2);
        let predictions = predictor.predict(&features, false).unwrap();
        assert_eq!(predictions.len(), 5);
        assert!(predictions.iter().all(|&p| p < 3));
    }
}
