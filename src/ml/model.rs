// ============================================================
// Layer 5 — Relation Classifier
// ============================================================
// Transformer encoder with a marker-pooling classification head.
//
//   input_ids ─► token emb ─┐
//   positions ─► pos emb ───┼─► + ─► LayerNorm ─► dropout
//   token types ► type emb ─┘                        │
//                              (albert) projection ◄─┘
//                                       │
//                         N × EncoderBlock (padding masked)
//                                       │
//        gather hidden states at marker_positions [b, k, h]
//                                       │
//                   concat ─► dropout ─► Linear(k·h → labels)
//
// Model types:
//   bert     independent blocks, two token types
//   roberta  independent blocks, one token type
//   albert   factorized embeddings projected up to hidden_size,
//            one block shared across all N passes
//
// Reference: Devlin et al. (2019) BERT
//            Lan et al. (2020) ALBERT
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::application::config::ModelType;
use crate::data::batcher::RelationBatch;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally; adding them again gives conflicting impls.
#[derive(Config, Debug)]
pub struct RelationModelConfig {
    pub model_type:        ModelType,
    pub vocab_size:        usize,
    pub max_seq_len:       usize,
    pub hidden_size:       usize,
    pub num_heads:         usize,
    pub num_layers:        usize,
    pub intermediate_size: usize,
    pub type_vocab_size:   usize,
    pub embedding_size:    usize,
    pub num_labels:        usize,
    /// Token vectors concatenated by the head (1, 3 or 5)
    pub num_pooled:        usize,
    pub dropout:           f64,
}

impl RelationModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RelationClassifier<B> {
        let token_embedding      = EmbeddingConfig::new(self.vocab_size, self.embedding_size).init(device);
        let position_embedding   = EmbeddingConfig::new(self.max_seq_len, self.embedding_size).init(device);
        let token_type_embedding = EmbeddingConfig::new(self.type_vocab_size, self.embedding_size).init(device);
        let embedding_norm       = LayerNormConfig::new(self.embedding_size).init(device);

        let embedding_projection = (self.embedding_size != self.hidden_size)
            .then(|| LinearConfig::new(self.embedding_size, self.hidden_size).init(device));

        let num_blocks = if self.model_type.shares_layers() { 1 } else { self.num_layers };
        let layers: Vec<EncoderBlock<B>> = (0..num_blocks)
            .map(|_| self.build_encoder_block(device))
            .collect();

        RelationClassifier {
            token_embedding,
            position_embedding,
            token_type_embedding,
            embedding_norm,
            embedding_projection,
            layers,
            classifier: self.build_head(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            num_passes: self.num_layers,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.hidden_size, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.hidden_size, self.intermediate_size).init(device);
        let ffn_linear2 = LinearConfig::new(self.intermediate_size, self.hidden_size).init(device);
        let norm1   = LayerNormConfig::new(self.hidden_size).init(device);
        let norm2   = LayerNormConfig::new(self.hidden_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }

    fn build_head<B: Backend>(&self, device: &B::Device) -> Linear<B> {
        LinearConfig::new(self.hidden_size * self.num_pooled, self.num_labels).init(device)
    }

    /// Same encoder, new head shape.
    pub fn for_task(&self, num_labels: usize, num_pooled: usize) -> Self {
        Self { num_labels, num_pooled, ..self.clone() }
    }
}

// ─── Encoder block ───────────────────────────────────────────────────────────
// Post-norm: x = LN(x + Attn(x)); x = LN(x + FFN(x))
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true on padding positions: [batch, seq_len]
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── Classifier ──────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RelationClassifier<B: Backend> {
    pub token_embedding:      Embedding<B>,
    pub position_embedding:   Embedding<B>,
    pub token_type_embedding: Embedding<B>,
    pub embedding_norm:       LayerNorm<B>,
    pub embedding_projection: Option<Linear<B>>,
    pub layers:               Vec<EncoderBlock<B>>,
    pub classifier:           Linear<B>,
    pub dropout:              Dropout,
    /// Encoder passes; exceeds layers.len() when blocks are shared
    pub num_passes:           usize,
}

impl<B: Backend> RelationClassifier<B> {
    /// Returns logits: [batch, num_labels]
    pub fn forward(
        &self,
        input_ids:        Tensor<B, 2, Int>,
        token_type_ids:   Tensor<B, 2, Int>,
        attention_mask:   Tensor<B, 2, Int>,
        marker_positions: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();

        let tok_emb = self.token_embedding.forward(input_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb  = self.position_embedding.forward(positions);
        let type_emb = self.token_type_embedding.forward(token_type_ids);

        let mut x = self.dropout.forward(self.embedding_norm.forward(tok_emb + pos_emb + type_emb));
        if let Some(projection) = &self.embedding_projection {
            x = projection.forward(x);
        }

        let pad_mask = attention_mask.equal_elem(0);
        for pass in 0..self.num_passes {
            x = self.layers[pass % self.layers.len()].forward(x, pad_mask.clone());
        }

        let pooled = pool_markers(x, marker_positions);
        self.classifier.forward(self.dropout.forward(pooled))
    }

    /// Cross-entropy over a batch; also returns the logits.
    pub fn forward_loss(&self, batch: RelationBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(
            batch.input_ids,
            batch.token_type_ids,
            batch.attention_mask,
            batch.marker_positions,
        );
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), batch.labels);
        (loss, logits)
    }

    /// Replace the classification head, keeping the encoder weights.
    pub fn with_head(mut self, config: &RelationModelConfig, device: &B::Device) -> Self {
        self.classifier = config.build_head(device);
        self
    }
}

/// [b, s, h] hidden states, [b, k] positions → [b, k·h]
fn pool_markers<B: Backend>(hidden: Tensor<B, 3>, positions: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch_size, _, hidden_size] = hidden.dims();
    let [_, num_pooled] = positions.dims();
    let index = positions
        .reshape([batch_size, num_pooled, 1])
        .expand([batch_size, num_pooled, hidden_size]);
    hidden
        .gather(1, index)
        .reshape([batch_size, num_pooled * hidden_size])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    use crate::ml::test_support::backend_rng_guard;

    type TestBackend = NdArray;

    fn tiny_config(model_type: ModelType, embedding_size: usize) -> RelationModelConfig {
        RelationModelConfig {
            model_type,
            vocab_size:        20,
            max_seq_len:       6,
            hidden_size:       8,
            num_heads:         2,
            num_layers:        3,
            intermediate_size: 16,
            type_vocab_size:   model_type.type_vocab_size(),
            embedding_size,
            num_labels:        4,
            num_pooled:        3,
            dropout:           0.0,
        }
    }

    fn ints(values: &[i32], shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &NdArrayDevice::Cpu).reshape(shape)
    }

    fn run(model: &RelationClassifier<TestBackend>) -> Tensor<TestBackend, 2> {
        let ids  = ints(&[2, 4, 9, 6, 3, 0, 2, 11, 4, 6, 3, 0], [2, 6]);
        let tt   = ints(&[0; 12], [2, 6]);
        let mask = ints(&[1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 0], [2, 6]);
        let mk   = ints(&[0, 1, 3, 0, 2, 3], [2, 3]);
        model.forward(ids, tt, mask, mk)
    }

    #[test]
    fn bert_logits_shape() {
        let _guard = backend_rng_guard();
        let model = tiny_config(ModelType::Bert, 8).init::<TestBackend>(&NdArrayDevice::Cpu);
        assert_eq!(model.layers.len(), 3);
        assert!(model.embedding_projection.is_none());
        assert_eq!(run(&model).dims(), [2, 4]);
    }

    #[test]
    fn albert_shares_one_block() {
        let _guard = backend_rng_guard();
        let model = tiny_config(ModelType::Albert, 4).init::<TestBackend>(&NdArrayDevice::Cpu);
        assert_eq!(model.layers.len(), 1);
        assert_eq!(model.num_passes, 3);
        assert!(model.embedding_projection.is_some());
        assert_eq!(run(&model).dims(), [2, 4]);
    }

    #[test]
    fn pooling_picks_marker_rows() {
        let device = NdArrayDevice::Cpu;
        // one sequence of 3 tokens, hidden 2: rows [0,1], [10,11], [20,21]
        let hidden = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 10.0, 11.0, 20.0, 21.0], &device)
            .reshape([1, 3, 2]);
        let positions = Tensor::<TestBackend, 1, Int>::from_ints([0, 2], &device).reshape([1, 2]);
        let pooled = pool_markers(hidden, positions)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(pooled, [0.0, 1.0, 20.0, 21.0]);
    }

    #[test]
    fn new_head_keeps_encoder() {
        let _guard = backend_rng_guard();
        let device = NdArrayDevice::Cpu;
        let config = tiny_config(ModelType::Roberta, 8);
        let model  = config.init::<TestBackend>(&device);
        let task   = config.for_task(7, 1);
        let model  = model.with_head(&task, &device);

        let ids  = ints(&[2, 5, 3, 0, 0, 0], [1, 6]);
        let zero = ints(&[0; 6], [1, 6]);
        let mask = ints(&[1, 1, 1, 0, 0, 0], [1, 6]);
        let mk   = ints(&[0], [1, 1]);
        assert_eq!(model.forward(ids, zero, mask, mk).dims(), [1, 7]);
    }
}
