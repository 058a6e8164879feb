// ============================================================
// Layer 2 — RunUseCase
// ============================================================
// Orchestrates one invocation of the tool, in order:
//
//   Step 1: Seed the random number generators
//   Step 2: Reject --do_eval without --do_train
//   Step 3: Validate the remaining argument values
//   Step 4: Refuse to train into an existing directory
//           (unless --overwrite_model_dir)
//   Step 5: Build the task runner
//   Step 6: Train, then optionally evaluate and write the report
//   Step 7: Predict and write one label per line
//
// No ML code here; every step is delegated. Any failing step
// aborts the run; whatever earlier steps wrote stays on disk.

use std::path::{Path, PathBuf};

use crate::application::{
    config::TaskConfig,
    error::{AppError, Stage},
    seed::SeededRngs,
};
use crate::domain::traits::TaskRunner;
use crate::infra::io_utils::save_text;

/// File name of the evaluation report inside the model directory.
pub const EVAL_RESULT_FILE: &str = "eval_result.txt";

pub struct RunUseCase<'a> {
    config: &'a TaskConfig,
}

impl<'a> RunUseCase<'a> {
    pub fn new(config: &'a TaskConfig) -> Self {
        Self { config }
    }

    /// Run every requested stage against the runner built by `make_runner`.
    ///
    /// `make_runner` is only called once all argument checks pass.
    pub fn execute<R, F>(&self, make_runner: F) -> Result<(), AppError>
    where
        R: TaskRunner,
        F: FnOnce(&'a TaskConfig, SeededRngs) -> anyhow::Result<R>,
    {
        let cfg = self.config;

        // ── Step 1: Seed ──────────────────────────────────────────────────────
        let rngs = SeededRngs::from_seed(cfg.seed);

        // ── Step 2/3: Argument checks ─────────────────────────────────────────
        // do_eval is paired with do_train (5-CV style runs)
        if cfg.do_eval && !cfg.do_train {
            return Err(AppError::EvalWithoutTrain);
        }
        cfg.validate()?;

        // ── Step 4: Target directory ──────────────────────────────────────────
        if cfg.do_train && cfg.new_model_dir.exists() && !cfg.overwrite_model_dir {
            return Err(AppError::ModelDirExists(cfg.new_model_dir.clone()));
        }

        if !cfg.do_train && !cfg.do_predict {
            tracing::warn!("Nothing to do: pass --do_train and/or --do_predict");
            return Ok(());
        }

        // ── Step 5: Runner ────────────────────────────────────────────────────
        let mut runner = run_stage(Stage::Setup, || make_runner(cfg, rngs))?;

        // ── Step 6: Train (+ eval) ────────────────────────────────────────────
        if cfg.do_train {
            run_stage(Stage::Training, || runner.train())?;

            if cfg.do_eval {
                let report = run_stage(Stage::Evaluation, || runner.eval())?;
                tracing::info!("eval performance:\n{}", report);
                write_output(&report.to_text(), &cfg.new_model_dir.join(EVAL_RESULT_FILE))?;
            }
        }

        // ── Step 7: Predict ───────────────────────────────────────────────────
        if cfg.do_predict {
            let preds = run_stage(Stage::Prediction, || runner.predict())?;
            let output = cfg
                .predict_output_file
                .as_deref()
                .ok_or_else(|| AppError::Usage("--do_predict requires --predict_output_file".into()))?;
            tracing::info!("Writing {} predictions to '{}'", preds.len(), output.display());
            write_output(&preds.join("\n"), output)?;
        }

        Ok(())
    }
}

/// Run one delegated step; failures are logged with their full chain.
fn run_stage<T>(stage: Stage, step: impl FnOnce() -> anyhow::Result<T>) -> Result<T, AppError> {
    step().map_err(|source| {
        tracing::error!("{} error:\n{:?}", stage, source);
        AppError::Stage { stage, source }
    })
}

fn write_output(text: &str, path: &Path) -> Result<(), AppError> {
    save_text(text, path).map_err(|source| AppError::Output {
        path: PathBuf::from(path),
        source,
    })
}
