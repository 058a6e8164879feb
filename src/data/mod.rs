// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from TSV split files to
// tensor batches.
//
// The pipeline flows in this order:
//
//   {train,dev,test}.tsv
//       │
//       ▼
//   TsvLoader         → reads rows, yields RelationExamples
//       │
//       ▼
//   Preprocessor      → normalises whitespace in each sentence
//       │
//       ▼
//   Featurizer        → tokenises, truncates, pads, finds markers
//       │
//       ▼
//   RelationDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   RelationBatcher   → stacks features into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to training or prediction
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads tab-separated split files
pub mod loader;

/// Cleans one sentence before tokenisation
pub mod preprocessor;

/// Example → padded id sequences + marker positions
pub mod features;

/// Implements Burn's Dataset trait for relation features
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
