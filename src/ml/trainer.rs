// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes a RelationClassifier on the training split.
//
// Per batch:
//   forward → cross-entropy → backward → accumulate gradients
// Every `gradient_accumulation_steps` batches, and at the last batch
// of an epoch, one AdamW update is applied with the current rate
// from the LrSchedule. Gradients are clipped by global norm.
//
// After every epoch the weights are checkpointed (oldest rotated
// out beyond max_num_checkpoints) and a row is added to metrics.csv.
//
// Burn notes:
//   - Training runs on an AutodiffBackend; the caller moves the
//     returned model to the inner backend with `.valid()`
//   - The DataLoader reshuffles every epoch from `shuffle_seed`
//
// Reference: Burn Book §5
//            Loshchilov & Hutter (2019) Decoupled Weight Decay

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    grad_clipping::GradientClippingConfig,
    optim::{AdamWConfig, GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::application::config::TaskConfig;
use crate::data::{batcher::RelationBatcher, dataset::RelationDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::RelationClassifier;
use crate::ml::schedule::{total_updates, LrSchedule};

pub fn run_training<B: AutodiffBackend>(
    cfg:          &TaskConfig,
    mut model:    RelationClassifier<B>,
    dataset:      RelationDataset,
    device:       &B::Device,
    shuffle_seed: u64,
    ckpt_manager: &CheckpointManager,
) -> Result<RelationClassifier<B>> {
    let num_examples      = dataset.len();
    let batch_size        = cfg.train_batch_size;
    let accumulation      = cfg.gradient_accumulation_steps;
    let batches_per_epoch = num_examples.div_ceil(batch_size);
    let total_steps = total_updates(num_examples, batch_size, accumulation, cfg.num_train_epochs);

    let schedule = if cfg.do_warmup {
        LrSchedule::linear_warmup(cfg.learning_rate, cfg.warmup_ratio, total_steps)
    } else {
        LrSchedule::constant(cfg.learning_rate)
    };

    tracing::info!("***** Running training *****");
    tracing::info!("  Num examples = {}", num_examples);
    tracing::info!("  Num epochs = {}", cfg.num_train_epochs);
    tracing::info!("  Batch size = {}", batch_size);
    tracing::info!("  Gradient accumulation steps = {}", accumulation);
    tracing::info!("  Total optimization steps = {}", total_steps);
    tracing::info!("  Warmup steps = {}", schedule.warmup_steps());
    tracing::info!("  Parameters = {}", model.num_params());

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay as f32)
        .with_epsilon(cfg.adam_epsilon as f32)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.max_grad_norm as f32)))
        .init();

    let train_loader = DataLoaderBuilder::new(RelationBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .shuffle(shuffle_seed)
        .num_workers(1)
        .build(dataset);

    let metrics = MetricsLogger::create(ckpt_manager.dir())?;

    let pb = ProgressBar::new(total_steps as u64).with_style(
        ProgressStyle::with_template("Training {bar:40} {pos}/{len} steps ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    if !cfg.progress_bar {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let mut global_step  = 0usize;
    let mut learning_rate = schedule.lr_at(0);
    let mut window_loss  = 0.0f64;
    let mut window_steps = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.num_train_epochs {
        let mut accumulator = GradientsAccumulator::new();
        let mut pending     = 0usize;
        let mut loss_sum    = 0.0f64;
        let mut batches     = 0usize;

        for (index, batch) in train_loader.iter().enumerate() {
            let (loss, _) = model.forward_loss(batch);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum    += loss_val;
            window_loss += loss_val;
            batches     += 1;

            let loss = if accumulation > 1 { loss / accumulation as f64 } else { loss };
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            accumulator.accumulate(&model, grads);
            pending += 1;

            if pending < accumulation && index + 1 < batches_per_epoch {
                continue;
            }

            learning_rate = schedule.lr_at(global_step);
            model = optim.step(learning_rate, model, accumulator.grads());
            pending = 0;
            global_step  += 1;
            window_steps += 1;
            pb.inc(1);

            if cfg.log_step > 0 && global_step % cfg.log_step as usize == 0 {
                let batches_in_window = (window_steps * accumulation).max(1) as f64;
                tracing::info!(
                    "step {}: loss {:.6}, lr {:.3e}",
                    global_step,
                    window_loss / batches_in_window,
                    learning_rate
                );
                window_loss  = 0.0;
                window_steps = 0;
            }
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        pb.set_message(format!("epoch {epoch} loss {train_loss:.4}"));
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | step={} | lr={:.3e}",
            epoch, cfg.num_train_epochs, train_loss, global_step, learning_rate,
        );

        ckpt_manager.save_model(&model, epoch, cfg.max_num_checkpoints)?;
        metrics.log(&EpochMetrics { epoch, global_step, train_loss, learning_rate })?;
    }

    pb.finish_and_clear();
    tracing::info!("Training complete after {} steps", global_step);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

    use crate::application::config::ModelType;
    use crate::data::features::RelationFeature;
    use crate::ml::model::RelationModelConfig;
    use crate::ml::test_support::backend_rng_guard;

    type TestBackend = Autodiff<NdArray>;

    fn feature(tokens: [u32; 3], label_id: usize) -> RelationFeature {
        RelationFeature {
            input_ids:        vec![2, tokens[0], tokens[1], tokens[2], 3, 0],
            token_type_ids:   vec![0; 6],
            attention_mask:   vec![1, 1, 1, 1, 1, 0],
            marker_positions: vec![0],
            label_id:         Some(label_id),
        }
    }

    #[test]
    fn writes_checkpoints_and_metrics() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::Cpu;
        let model_cfg = RelationModelConfig {
            model_type:        ModelType::Bert,
            vocab_size:        16,
            max_seq_len:       6,
            hidden_size:       8,
            num_heads:         2,
            num_layers:        1,
            intermediate_size: 16,
            type_vocab_size:   2,
            embedding_size:    8,
            num_labels:        2,
            num_pooled:        1,
            dropout:           0.0,
        };
        let model = model_cfg.init::<TestBackend>(&device);
        let dataset = RelationDataset::new(vec![
            feature([8, 9, 10], 0),
            feature([11, 12, 13], 1),
            feature([8, 12, 10], 0),
        ]);
        let cfg = TaskConfig {
            num_train_epochs:    3,
            train_batch_size:    2,
            gradient_accumulation_steps: 2,
            max_num_checkpoints: 2,
            learning_rate:       1e-3,
            do_warmup:           true,
            log_step:            1,
            ..TaskConfig::default()
        };
        let ckpt = CheckpointManager::new(tmp.path());

        run_training(&cfg, model, dataset, &device, 7, &ckpt).unwrap();

        assert!(tmp.path().join("latest_epoch.json").exists());
        let csv = std::fs::read_to_string(tmp.path().join("metrics.csv")).unwrap();
        // header + 3 epochs; 2 batches per epoch → 1 update per epoch
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[3].starts_with("3,3,"));

        let kept: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok()?.file_name().into_string().ok())
            .filter(|n| n.starts_with("checkpoint_epoch_"))
            .collect();
        assert_eq!(kept.len(), 2);
        assert!(!kept.iter().any(|n| n.starts_with("checkpoint_epoch_1.")));
    }
}
