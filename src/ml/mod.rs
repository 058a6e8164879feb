// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model, training loop and inference for relation classification.
// The application layer only sees the TaskRunner implemented in
// runner.rs; every burn type stays behind it.
//
// What's in this layer:
//
//   model.rs     — Transformer encoder (bert / roberta / albert)
//                  with a head over [CLS] and entity-marker states
//
//   schedule.rs  — Constant or linear warmup/decay learning rate
//
//   trainer.rs   — AdamW loop with gradient accumulation and
//                  clipping, per-epoch checkpoints and metrics
//
//   predictor.rs — Batched arg-max prediction in input order
//
//   runner.rs    — BurnTaskRunner: train / eval / predict
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT
//            Soares et al. (2019) Matching the Blanks

/// Relation classifier architecture
pub mod model;

/// Learning-rate schedule
pub mod schedule;

/// Training loop with checkpointing
pub mod trainer;

/// Batched inference
pub mod predictor;

/// TaskRunner over the burn backends
pub mod runner;
