// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The orchestrator only ever talks to a `TaskRunner`; the burn
// implementation lives in the ml layer and tests plug in a stub.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::example::RelationExample;
use crate::domain::report::EvalReport;

// ─── ExampleSource ───────────────────────────────────────────────────────────
/// Any component that can load labelled relation examples.
///
/// Implementations:
///   - TsvLoader → one `{split}.tsv` file under the data directory
pub trait ExampleSource {
    fn load_all(&self) -> Result<Vec<RelationExample>>;
}

// ─── TaskRunner ──────────────────────────────────────────────────────────────
/// Model lifecycle for one run: fine-tune, score on dev, label test.
///
/// `eval` and `predict` read whatever `train` left in the model
/// directory, so they may be called on a fresh runner.
pub trait TaskRunner {
    /// Fine-tune on `train.tsv` and write checkpoints.
    fn train(&mut self) -> Result<()>;

    /// Score the trained model on `dev.tsv`.
    fn eval(&mut self) -> Result<EvalReport>;

    /// Predicted label for every row of `test.tsv`, in file order.
    fn predict(&mut self) -> Result<Vec<String>>;
}
