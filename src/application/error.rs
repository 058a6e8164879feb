// ============================================================
// Layer 2 — Run Errors
// ============================================================
// Failures the orchestrator can report, split by kind so callers
// can branch on the variant instead of parsing text:
//
//   usage         → EvalWithoutTrain, Usage
//   precondition  → ModelDirExists
//   delegated     → Stage (the runner's own error chain is kept)
//   output        → Output

use std::{fmt, path::PathBuf};
use thiserror::Error;

/// The runner step a delegated failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Training,
    Evaluation,
    Prediction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Setup => "Setup",
            Stage::Training => "Training",
            Stage::Evaluation => "Evaluation",
            Stage::Prediction => "Prediction",
        })
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(
        "evaluation mode (--do_eval) is only available when --do_train is used; \
         you may want to use --do_predict instead"
    )]
    EvalWithoutTrain,

    #[error("invalid arguments: {0}")]
    Usage(String),

    #[error(
        "{} already exists and overwriting it is not permitted (pass --overwrite_model_dir)",
        .0.display()
    )]
    ModelDirExists(PathBuf),

    #[error("{stage} error: {source:#}")]
    Stage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// True for errors raised before any runner method was invoked.
    pub fn is_rejected_up_front(&self) -> bool {
        matches!(
            self,
            AppError::EvalWithoutTrain | AppError::Usage(_) | AppError::ModelDirExists(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_keeps_the_source_chain() {
        let source = anyhow::anyhow!("out of memory").context("forward pass");
        let err = AppError::Stage { stage: Stage::Training, source };
        assert_eq!(err.to_string(), "Training error: forward pass: out of memory");
        assert!(!err.is_rejected_up_front());
    }

    #[test]
    fn model_dir_error_names_the_directory() {
        let err = AppError::ModelDirExists(PathBuf::from("runs/m1"));
        assert!(err.to_string().starts_with("runs/m1 already exists"));
        assert!(err.is_rejected_up_front());
    }
}
