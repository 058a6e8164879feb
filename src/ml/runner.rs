// ============================================================
// Layer 5 — Burn Task Runner
// ============================================================
// The TaskRunner the command line uses. Wires the data pipeline,
// tokenizer, model, trainer and predictor together:
//
//   train()   train.tsv → labels + tokenizer → features
//             → fresh or pretrained encoder → run_training
//             → checkpoints in new_model_dir
//   eval()    new_model_dir → dev.tsv → predictions → acc/pre/rec/f1
//   predict() new_model_dir → test.tsv → predicted label strings
//
// Training runs on the autodiff backend B; evaluation and
// prediction run on B::InnerBackend.

use anyhow::{bail, Context, Result};
use burn::{module::Module, tensor::backend::AutodiffBackend};
use std::marker::PhantomData;
use tokenizers::Tokenizer;

use crate::application::{config::TaskConfig, seed::SeededRngs};
use crate::data::{
    dataset::RelationDataset,
    features::{check_vocab_range, Featurizer, RelationFeature, SpecialIds},
    loader::TsvLoader,
};
use crate::domain::{
    example::{LabelMap, RelationExample},
    report::{score, EvalReport},
    traits::{ExampleSource, TaskRunner},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    feature_cache::FeatureCache,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    model::{RelationClassifier, RelationModelConfig},
    predictor::Predictor,
    trainer::run_training,
};

pub struct BurnTaskRunner<'a, B: AutodiffBackend> {
    cfg:     &'a TaskConfig,
    device:  B::Device,
    rngs:    SeededRngs,
    ckpt:    CheckpointManager,
    backend: PhantomData<B>,
}

/// A trained model restored for inference.
struct TrainedModel<B: AutodiffBackend> {
    model:     RelationClassifier<B::InnerBackend>,
    config:    RelationModelConfig,
    labels:    LabelMap,
    tokenizer: Tokenizer,
}

impl<'a, B: AutodiffBackend> BurnTaskRunner<'a, B> {
    pub fn new(cfg: &'a TaskConfig, device: B::Device, mut rngs: SeededRngs) -> Result<Self> {
        rngs.seed_backend::<B>();

        if cfg.fp16 {
            tracing::warn!(
                "--fp16 (opt level {}) requested, but mixed precision is unavailable; training runs in f32",
                cfg.fp16_opt_level
            );
        }

        if let Some(dir) = &cfg.pretrained_model {
            if !dir.is_dir() {
                bail!("Pretrained model directory '{}' does not exist", dir.display());
            }
        }

        tracing::info!("Using device: {:?}", device);
        Ok(Self {
            cfg,
            device,
            rngs,
            ckpt: CheckpointManager::new(&cfg.new_model_dir),
            backend: PhantomData,
        })
    }

    fn load_split(&self, split: &str) -> Result<Vec<RelationExample>> {
        TsvLoader::new(self.cfg.split_path(split), split).load_all()
    }

    /// Tokenizer for a training run: the pretrained one, or a new one
    /// built from the training sentences. Either way it is saved into
    /// new_model_dir.
    fn training_tokenizer(&self, examples: &[RelationExample]) -> Result<Tokenizer> {
        let special = self.cfg.model_type.special_tokens();
        let store   = TokenizerStore::new(&self.cfg.new_model_dir);

        match &self.cfg.pretrained_model {
            Some(dir) => {
                let tokenizer = TokenizerStore::new(dir).load()?;
                SpecialIds::from_tokenizer(&tokenizer, special).with_context(|| {
                    format!(
                        "Tokenizer in '{}' lacks a {} special token or entity marker",
                        dir.display(),
                        self.cfg.model_type
                    )
                })?;
                store.save(&tokenizer)?;
                Ok(tokenizer)
            }
            None => {
                let texts: Vec<&str> = examples
                    .iter()
                    .flat_map(|ex| [ex.text_a.as_str(), ex.text_b.as_str()])
                    .filter(|t| !t.is_empty())
                    .collect();
                store.build_and_save(&texts, self.cfg.vocab_size, special, self.cfg.do_lower_case)
            }
        }
    }

    /// Architecture of the encoder being trained, before the head is sized.
    fn encoder_config(&self, tokenizer: &Tokenizer) -> Result<RelationModelConfig> {
        let cfg = self.cfg;
        let Some(dir) = &cfg.pretrained_model else {
            return Ok(RelationModelConfig {
                model_type:        cfg.model_type,
                vocab_size:        tokenizer.get_vocab_size(true),
                max_seq_len:       cfg.max_seq_length,
                hidden_size:       cfg.hidden_size,
                num_heads:         cfg.num_attention_heads,
                num_layers:        cfg.num_hidden_layers,
                intermediate_size: cfg.intermediate_size,
                type_vocab_size:   cfg.model_type.type_vocab_size(),
                embedding_size:    cfg.resolved_embedding_size(),
                num_labels:        1,
                num_pooled:        1,
                dropout:           cfg.hidden_dropout_prob,
            });
        };

        let base = CheckpointManager::new(dir).load_model_config()?;
        if base.model_type != cfg.model_type {
            bail!(
                "Pretrained model in '{}' is a {} model, but --model_type is {}",
                dir.display(),
                base.model_type,
                cfg.model_type
            );
        }
        Ok(base)
    }

    /// Features for `split`, checked against the model's vocabulary.
    fn features(
        &self,
        split:       &str,
        examples:    &[RelationExample],
        tokenizer:   &Tokenizer,
        labels:      &LabelMap,
        max_seq_len: usize,
        vocab_size:  usize,
    ) -> Result<Vec<RelationFeature>> {
        let features = self.build_features(split, examples, tokenizer, labels, max_seq_len)?;
        check_vocab_range(&features, vocab_size)
            .with_context(|| format!("Features for the {split} split do not fit the model"))?;
        Ok(features)
    }

    fn build_features(
        &self,
        split:       &str,
        examples:    &[RelationExample],
        tokenizer:   &Tokenizer,
        labels:      &LabelMap,
        max_seq_len: usize,
    ) -> Result<Vec<RelationFeature>> {
        let cache = FeatureCache::new(&self.cfg.data_dir);
        let cache_path = cache.path_for(split, self.cfg, max_seq_len, tokenizer);
        if self.cfg.cache_data {
            if let Some(features) = cache.load(&cache_path)? {
                return Ok(features);
            }
        }

        let special = SpecialIds::from_tokenizer(tokenizer, self.cfg.model_type.special_tokens())?;
        let featurizer = Featurizer::new(
            tokenizer,
            special,
            max_seq_len,
            self.cfg.data_format_mode,
            self.cfg.classification_scheme,
        );
        let features = featurizer.featurize_all(examples, labels)?;

        if self.cfg.cache_data {
            cache.store(&cache_path, &features)?;
        }
        Ok(features)
    }

    fn load_trained(&self) -> Result<TrainedModel<B>> {
        let config    = self.ckpt.load_model_config()?;
        let labels    = self.ckpt.load_labels()?;
        let tokenizer = TokenizerStore::new(self.ckpt.dir()).load()?;
        let model     = config.init::<B::InnerBackend>(&self.device);
        let model     = self.ckpt.load_model(model, &self.device)?;
        Ok(TrainedModel { model, config, labels, tokenizer })
    }

    /// Predicted label strings for every example of `split`, plus the examples.
    fn predict_split(&self, split: &str) -> Result<(Vec<RelationExample>, Vec<String>)> {
        let trained  = self.load_trained()?;
        let examples = self.load_split(split)?;
        let features = self.features(
            split,
            &examples,
            &trained.tokenizer,
            &trained.labels,
            trained.config.max_seq_len,
            trained.config.vocab_size,
        )?;

        let unseen = RelationDataset::new(features.clone()).unlabelled_count();
        if unseen > 0 {
            tracing::warn!("{} {} examples carry labels not seen in training", unseen, split);
        }

        let predictor = Predictor::new(trained.model, self.device.clone(), self.cfg.eval_batch_size);
        let predicted = predictor
            .predict(&features, self.cfg.progress_bar)?
            .into_iter()
            .map(|class| {
                trained
                    .labels
                    .label_of(class)
                    .map(str::to_string)
                    .with_context(|| format!("Predicted class {class} is outside the label set"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((examples, predicted))
    }
}

impl<B: AutodiffBackend> TaskRunner for BurnTaskRunner<'_, B> {
    fn train(&mut self) -> Result<()> {
        let cfg = self.cfg;
        let examples = self.load_split("train")?;
        if examples.is_empty() {
            bail!("'{}' contains no examples", cfg.split_path("train").display());
        }

        let labels = LabelMap::from_examples(&examples);
        tracing::info!("{} labels: {:?}", labels.len(), labels.labels());

        let tokenizer = self.training_tokenizer(&examples)?;
        let encoder   = self.encoder_config(&tokenizer)?;

        let mut max_seq_len = cfg.max_seq_length;
        if max_seq_len > encoder.max_seq_len {
            tracing::warn!(
                "--max_seq_length {} exceeds the model's {} positions; using {}",
                max_seq_len, encoder.max_seq_len, encoder.max_seq_len
            );
            max_seq_len = encoder.max_seq_len;
        }

        let task = encoder.for_task(labels.len(), cfg.classification_scheme.num_pooled());
        let model = match &cfg.pretrained_model {
            Some(dir) => {
                let pretrained = CheckpointManager::new(dir)
                    .load_model(encoder.init::<B>(&self.device), &self.device)?;
                pretrained.with_head(&task, &self.device)
            }
            None => task.init::<B>(&self.device),
        };

        let features = self.features(
            "train",
            &examples,
            &tokenizer,
            &labels,
            max_seq_len,
            task.vocab_size,
        )?;

        self.ckpt.save_model_config(&task)?;
        self.ckpt.save_labels(&labels)?;
        self.ckpt.save_task_config(cfg)?;

        let dataset = RelationDataset::new(features);
        tracing::info!("Featurized {} training examples", dataset.feature_count());

        let shuffle_seed = self.rngs.next_shuffle_seed();
        let model = run_training(
            cfg,
            model,
            dataset,
            &self.device,
            shuffle_seed,
            &self.ckpt,
        )?;
        tracing::info!(
            "Fine-tuned {} parameters, saved to '{}'",
            model.num_params(),
            self.ckpt.dir().display()
        );
        Ok(())
    }

    fn eval(&mut self) -> Result<EvalReport> {
        let (examples, predicted) = self.predict_split("dev")?;
        let gold: Vec<&str> = examples.iter().map(|ex| ex.label.as_str()).collect();
        let predicted: Vec<&str> = predicted.iter().map(String::as_str).collect();
        Ok(score(&gold, &predicted, &self.cfg.non_relation_label))
    }

    fn predict(&mut self) -> Result<Vec<String>> {
        let (_, predicted) = self.predict_split("test")?;
        Ok(predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use std::{fs, path::Path};

    use crate::application::config::{ClassificationScheme, ModelType};
    use crate::infra::tokenizer_store::TOKENIZER_FILE;
    use crate::ml::test_support::backend_rng_guard;

    type TestBackend = Autodiff<NdArray>;

    const ROWS: &str = "\
CAUSE\t[s1] aspirin [e1] prevents [s2] stroke [e2] .
NonRel\t[s1] aspirin [e1] and [s2] rain [e2] .
CAUSE\t[s1] smoking [e1] causes [s2] cancer [e2] .
NonRel\t[s1] smoking [e1] near [s2] lake [e2] .
";

    fn tiny_config(root: &Path) -> TaskConfig {
        let data_dir = root.join("data");
        fs::create_dir_all(&data_dir).unwrap();
        for split in ["train", "dev", "test"] {
            fs::write(data_dir.join(format!("{split}.tsv")), ROWS).unwrap();
        }
        TaskConfig {
            model_type:            ModelType::Albert,
            classification_scheme: ClassificationScheme::ClsEntityStartsEnds,
            data_dir,
            new_model_dir:         root.join("model"),
            max_seq_length:        16,
            num_train_epochs:      2,
            train_batch_size:      2,
            eval_batch_size:       3,
            learning_rate:         1e-3,
            cache_data:            true,
            vocab_size:            64,
            hidden_size:           8,
            num_hidden_layers:     2,
            num_attention_heads:   2,
            intermediate_size:     16,
            embedding_size:        Some(4),
            hidden_dropout_prob:   0.0,
            ..TaskConfig::default()
        }
    }

    fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok()?.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix))
            .collect()
    }

    #[test]
    fn train_eval_predict_round() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_config(tmp.path());
        let mut runner =
            BurnTaskRunner::<TestBackend>::new(&cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(3))
                .unwrap();

        runner.train().unwrap();
        assert!(cfg.new_model_dir.join("latest_epoch.json").exists());
        assert!(cfg.new_model_dir.join(TOKENIZER_FILE).exists());
        assert!(cfg.new_model_dir.join("labels.json").exists());
        assert!(cfg.new_model_dir.join("training_args.json").exists());
        assert_eq!(files_with_prefix(&cfg.data_dir, "cached_train_albert_16_sep_s2_cs_t").len(), 1);

        let report = runner.eval().unwrap().to_text();
        let keys: Vec<&str> = report.lines().filter_map(|l| l.split(':').next()).collect();
        assert_eq!(keys, ["acc", "pre", "rec", "f1"]);
        for line in report.lines() {
            let value: f64 = line.split(':').nth(1).unwrap().parse().unwrap();
            assert!((0.0..=1.0).contains(&value), "{line}");
        }

        let predicted = runner.predict().unwrap();
        assert_eq!(predicted.len(), 4);
        assert!(predicted.iter().all(|l| l == "CAUSE" || l == "NonRel"));
    }

    #[test]
    fn fine_tunes_from_pretrained_dir() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let base_cfg = tiny_config(tmp.path());
        BurnTaskRunner::<TestBackend>::new(&base_cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(1))
            .unwrap()
            .train()
            .unwrap();

        let cfg = TaskConfig {
            pretrained_model:      Some(base_cfg.new_model_dir.clone()),
            new_model_dir:         tmp.path().join("finetuned"),
            classification_scheme: ClassificationScheme::Cls,
            max_seq_length:        64,
            num_train_epochs:      1,
            cache_data:            false,
            ..base_cfg.clone()
        };
        let mut runner =
            BurnTaskRunner::<TestBackend>::new(&cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(1))
                .unwrap();
        runner.train().unwrap();

        let saved = CheckpointManager::new(&cfg.new_model_dir).load_model_config().unwrap();
        assert_eq!(saved.num_pooled, 1);
        // clamped to the pretrained position table
        assert_eq!(saved.max_seq_len, 16);
        assert_eq!(runner.predict().unwrap().len(), 4);
    }

    #[test]
    fn rejects_mismatched_pretrained_type() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let base_cfg = tiny_config(tmp.path());
        BurnTaskRunner::<TestBackend>::new(&base_cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(1))
            .unwrap()
            .train()
            .unwrap();

        let cfg = TaskConfig {
            model_type:       ModelType::Bert,
            pretrained_model: Some(base_cfg.new_model_dir.clone()),
            new_model_dir:    tmp.path().join("other"),
            ..base_cfg.clone()
        };
        let mut runner =
            BurnTaskRunner::<TestBackend>::new(&cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(1))
                .unwrap();
        let err = runner.train().unwrap_err();
        assert!(format!("{err:#}").contains("albert"), "{err:#}");
    }

    #[test]
    fn eval_without_checkpoint_fails() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_config(tmp.path());
        let mut runner =
            BurnTaskRunner::<TestBackend>::new(&cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(3))
                .unwrap();
        assert!(runner.eval().is_err());
    }

    #[test]
    fn cache_from_another_vocabulary_is_not_reused() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let first = tiny_config(tmp.path());
        BurnTaskRunner::<TestBackend>::new(&first, NdArrayDevice::Cpu, SeededRngs::from_seed(3))
            .unwrap()
            .train()
            .unwrap();

        let second = TaskConfig {
            vocab_size:       9,
            new_model_dir:    tmp.path().join("small"),
            num_train_epochs: 1,
            ..first.clone()
        };
        let mut runner =
            BurnTaskRunner::<TestBackend>::new(&second, NdArrayDevice::Cpu, SeededRngs::from_seed(3))
                .unwrap();
        runner.train().unwrap();
        assert_eq!(runner.predict().unwrap().len(), 4);

        let saved = CheckpointManager::new(&second.new_model_dir).load_model_config().unwrap();
        assert_eq!(saved.vocab_size, 9);
        assert_eq!(files_with_prefix(&first.data_dir, "cached_train_").len(), 2);
    }

    #[test]
    fn out_of_vocabulary_ids_are_an_error() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let first = tiny_config(tmp.path());
        BurnTaskRunner::<TestBackend>::new(&first, NdArrayDevice::Cpu, SeededRngs::from_seed(3))
            .unwrap()
            .train()
            .unwrap();

        let bad = RelationFeature {
            input_ids:        vec![2, 999, 3, 0],
            token_type_ids:   vec![0; 4],
            attention_mask:   vec![1, 1, 1, 0],
            marker_positions: vec![0, 0, 0, 0, 0],
            label_id:         Some(0),
        };
        let cache = FeatureCache::new(&first.data_dir);
        for name in files_with_prefix(&first.data_dir, "cached_train_") {
            cache.store(&first.data_dir.join(name), std::slice::from_ref(&bad)).unwrap();
        }

        let cfg = TaskConfig { new_model_dir: tmp.path().join("again"), ..first.clone() };
        let mut runner =
            BurnTaskRunner::<TestBackend>::new(&cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(3))
                .unwrap();
        let err = runner.train().unwrap_err();
        assert!(format!("{err:#}").contains("token id 999"), "{err:#}");
    }

    #[test]
    fn same_seed_reproduces_weights() {
        let _guard = backend_rng_guard();
        let tmp = tempfile::tempdir().unwrap();
        let base = TaskConfig {
            hidden_dropout_prob: 0.1,
            cache_data:          false,
            ..tiny_config(tmp.path())
        };

        let train = |name: &str, seed: u64| -> Vec<Vec<f32>> {
            let cfg = TaskConfig { new_model_dir: tmp.path().join(name), ..base.clone() };
            let mut runner =
                BurnTaskRunner::<TestBackend>::new(&cfg, NdArrayDevice::Cpu, SeededRngs::from_seed(seed))
                    .unwrap();
            runner.train().unwrap();
            let model = runner.load_trained().unwrap().model;
            [
                model.token_embedding.weight.val(),
                model.classifier.weight.val(),
            ]
            .into_iter()
            .map(|w| w.into_data().to_vec::<f32>().unwrap())
            .collect()
        };

        let first  = train("first", 3);
        let second = train("second", 3);
        let other  = train("other", 4);
        assert_eq!(first, second);
        assert_ne!(first, other);
    }
}
