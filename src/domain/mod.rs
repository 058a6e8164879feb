// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing the relation-extraction
// task: what an example is, what a label set is, how predictions
// are scored, and the contract a task runner fulfils.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One labelled sentence pair with inline entity markers
pub mod example;

// Ordered metric reports and micro-averaged scoring
pub mod report;

// Core abstractions (traits) that other layers implement
pub mod traits;
