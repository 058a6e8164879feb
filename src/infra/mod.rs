// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs      — weights (burn CompactRecorder), latest /
//                        retained epoch pointers, model config,
//                        label set, training arguments
//   tokenizer_store.rs — builds, saves and loads tokenizer.json
//   feature_cache.rs   — JSON cache of featurized splits
//   metrics.rs         — per-epoch CSV of training progress
//   io_utils.rs        — plain-text output with parent creation
//   logging.rs         — tracing subscriber (console + file)
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Cached features keyed by featurization settings
pub mod feature_cache;

/// Training metrics CSV logger
pub mod metrics;

/// Text file output
pub mod io_utils;

/// Logger factory
pub mod logging;
