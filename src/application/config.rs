// ============================================================
// Layer 2 — Task Configuration
// ============================================================
// Everything one run needs, built once from the command line and
// then only ever borrowed. Serialisable so the exact settings of a
// training run can be written next to its checkpoints.

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

use crate::application::error::AppError;

// ─── ModelType ───────────────────────────────────────────────────────────────
/// Encoder family. Parsed case-insensitively, stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Bert,
    Roberta,
    Albert,
}

/// Surface forms of the four structural special tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokenNames {
    pub pad: &'static str,
    pub unk: &'static str,
    pub cls: &'static str,
    pub sep: &'static str,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Bert => "bert",
            ModelType::Roberta => "roberta",
            ModelType::Albert => "albert",
        }
    }

    pub fn special_tokens(&self) -> SpecialTokenNames {
        match self {
            ModelType::Bert | ModelType::Albert => SpecialTokenNames {
                pad: "[PAD]",
                unk: "[UNK]",
                cls: "[CLS]",
                sep: "[SEP]",
            },
            ModelType::Roberta => SpecialTokenNames {
                pad: "<pad>",
                unk: "<unk>",
                cls: "<s>",
                sep: "</s>",
            },
        }
    }

    /// ALBERT reuses one encoder block for every layer.
    pub fn shares_layers(&self) -> bool {
        matches!(self, ModelType::Albert)
    }

    /// RoBERTa has no segment embeddings worth learning.
    pub fn type_vocab_size(&self) -> usize {
        match self {
            ModelType::Roberta => 1,
            _ => 2,
        }
    }

    /// Embedding width when the user does not pick one.
    pub fn default_embedding_size(&self, hidden_size: usize) -> usize {
        match self {
            ModelType::Albert => 128.min(hidden_size),
            _ => hidden_size,
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bert" => Ok(ModelType::Bert),
            "roberta" => Ok(ModelType::Roberta),
            "albert" => Ok(ModelType::Albert),
            other => Err(format!(
                "unsupported model type '{other}' (valid values: bert, roberta, albert)"
            )),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── DataFormatMode ──────────────────────────────────────────────────────────
/// How the two sentences of an example are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataFormatMode {
    /// 0: `[CLS] S1 [SEP] S2 [SEP]`
    #[default]
    Sep,
    /// 1: `[CLS] S1 S2 [SEP]`
    Uni,
}

impl FromStr for DataFormatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(DataFormatMode::Sep),
            "1" => Ok(DataFormatMode::Uni),
            other => Err(format!("invalid data format mode '{other}' (valid values: 0, 1)")),
        }
    }
}

// ─── ClassificationScheme ────────────────────────────────────────────────────
/// Which token representations feed the classification head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassificationScheme {
    /// 0: `[CLS]`
    #[default]
    Cls,
    /// 1: `[CLS]`, `[S1]`, `[S2]`
    ClsEntityStarts,
    /// 2: `[CLS]`, `[S1]`, `[S2]`, `[E1]`, `[E2]`
    ClsEntityStartsEnds,
}

impl ClassificationScheme {
    /// Number of pooled token vectors concatenated for the head.
    pub fn num_pooled(&self) -> usize {
        match self {
            ClassificationScheme::Cls => 1,
            ClassificationScheme::ClsEntityStarts => 3,
            ClassificationScheme::ClsEntityStartsEnds => 5,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            ClassificationScheme::Cls => 0,
            ClassificationScheme::ClsEntityStarts => 1,
            ClassificationScheme::ClsEntityStartsEnds => 2,
        }
    }
}

impl FromStr for ClassificationScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(ClassificationScheme::Cls),
            "1" => Ok(ClassificationScheme::ClsEntityStarts),
            "2" => Ok(ClassificationScheme::ClsEntityStartsEnds),
            other => Err(format!(
                "invalid classification scheme '{other}' (valid values: 0, 1, 2)"
            )),
        }
    }
}

// ─── LogLevel ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "d" | "debug" => Ok(LogLevel::Debug),
            "i" | "info" => Ok(LogLevel::Info),
            "w" | "warn" | "warning" => Ok(LogLevel::Warn),
            "e" | "error" => Ok(LogLevel::Error),
            other => Err(format!("invalid log level '{other}' (valid values: d, i, w, e)")),
        }
    }
}

// ─── Device ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceChoice {
    /// Accelerator when available.
    #[default]
    Auto,
    Gpu,
    Cpu,
}

/// The device a run actually uses, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Gpu,
    Cpu,
}

impl DeviceChoice {
    /// `gpu_available` is only consulted for `auto` and `gpu`.
    /// `auto` falls back to the CPU when it reports false; an explicit
    /// `gpu` request is an error instead.
    pub fn resolve(&self, gpu_available: impl Fn() -> bool) -> Result<ComputeDevice, String> {
        match self {
            DeviceChoice::Cpu => Ok(ComputeDevice::Cpu),
            DeviceChoice::Auto if gpu_available() => Ok(ComputeDevice::Gpu),
            DeviceChoice::Auto => {
                tracing::warn!("No GPU adapter available; running on the CPU");
                Ok(ComputeDevice::Cpu)
            }
            DeviceChoice::Gpu if gpu_available() => Ok(ComputeDevice::Gpu),
            DeviceChoice::Gpu => Err("--device gpu requested, but no GPU adapter is available".into()),
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DeviceChoice::Auto),
            "gpu" | "cuda" | "wgpu" => Ok(DeviceChoice::Gpu),
            "cpu" => Ok(DeviceChoice::Cpu),
            other => Err(format!("invalid device '{other}' (valid values: auto, gpu, cpu)")),
        }
    }
}

// ─── TaskConfig ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub model_type:            ModelType,
    pub data_format_mode:      DataFormatMode,
    pub classification_scheme: ClassificationScheme,
    pub pretrained_model:      Option<PathBuf>,
    pub data_dir:              PathBuf,
    pub new_model_dir:         PathBuf,
    pub predict_output_file:   Option<PathBuf>,
    pub overwrite_model_dir:   bool,
    pub seed:                  u64,
    pub max_seq_length:        usize,
    pub cache_data:            bool,
    pub do_train:              bool,
    pub do_eval:               bool,
    pub do_predict:            bool,
    pub do_lower_case:         bool,
    pub train_batch_size:      usize,
    pub eval_batch_size:       usize,
    pub learning_rate:         f64,
    pub num_train_epochs:      usize,
    pub gradient_accumulation_steps: usize,
    pub do_warmup:             bool,
    pub warmup_ratio:          f64,
    pub weight_decay:          f64,
    pub adam_epsilon:          f64,
    pub max_grad_norm:         f64,
    pub max_num_checkpoints:   usize,
    pub log_file:              Option<PathBuf>,
    pub log_lvl:               LogLevel,
    pub log_step:              i64,
    pub progress_bar:          bool,
    pub fp16:                  bool,
    pub fp16_opt_level:        String,
    pub device:                DeviceChoice,
    pub non_relation_label:    String,

    // Architecture, used only when no pretrained model is given
    pub vocab_size:            usize,
    pub hidden_size:           usize,
    pub num_hidden_layers:     usize,
    pub num_attention_heads:   usize,
    pub intermediate_size:     usize,
    pub embedding_size:        Option<usize>,
    pub hidden_dropout_prob:   f64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            model_type:            ModelType::Bert,
            data_format_mode:      DataFormatMode::Sep,
            classification_scheme: ClassificationScheme::Cls,
            pretrained_model:      None,
            data_dir:              PathBuf::from("data"),
            new_model_dir:         PathBuf::from("model"),
            predict_output_file:   None,
            overwrite_model_dir:   false,
            seed:                  3,
            max_seq_length:        512,
            cache_data:            false,
            do_train:              false,
            do_eval:               false,
            do_predict:            false,
            do_lower_case:         false,
            train_batch_size:      8,
            eval_batch_size:       8,
            learning_rate:         1e-5,
            num_train_epochs:      10,
            gradient_accumulation_steps: 1,
            do_warmup:             false,
            warmup_ratio:          0.1,
            weight_decay:          0.0,
            adam_epsilon:          1e-8,
            max_grad_norm:         1.0,
            max_num_checkpoints:   3,
            log_file:              None,
            log_lvl:               LogLevel::Info,
            log_step:              1000,
            progress_bar:          false,
            fp16:                  false,
            fp16_opt_level:        "O1".to_string(),
            device:                DeviceChoice::Auto,
            non_relation_label:    "NonRel".to_string(),
            vocab_size:            30522,
            hidden_size:           256,
            num_hidden_layers:     6,
            num_attention_heads:   8,
            intermediate_size:     1024,
            embedding_size:        None,
            hidden_dropout_prob:   0.1,
        }
    }
}

const FP16_OPT_LEVELS: [&str; 4] = ["O0", "O1", "O2", "O3"];

impl TaskConfig {
    /// Value checks beyond what the argument parser enforces.
    ///
    /// The do_eval/do_train pairing is checked by the orchestrator
    /// itself, before this runs.
    pub fn validate(&self) -> Result<(), AppError> {
        let usage = |msg: String| Err(AppError::Usage(msg));

        if self.do_predict && self.predict_output_file.is_none() {
            return usage("--do_predict requires --predict_output_file".into());
        }
        if self.max_seq_length < 4 {
            return usage(format!("--max_seq_length must be at least 4, got {}", self.max_seq_length));
        }
        if self.train_batch_size == 0 || self.eval_batch_size == 0 {
            return usage("batch sizes must be greater than zero".into());
        }
        if self.gradient_accumulation_steps == 0 {
            return usage("--gradient_accumulation_steps must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.warmup_ratio) {
            return usage(format!("--warmup_ratio must be within [0, 1], got {}", self.warmup_ratio));
        }
        if self.learning_rate <= 0.0 {
            return usage(format!("--learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.max_num_checkpoints == 0 {
            return usage("--max_num_checkpoints must be at least 1".into());
        }
        if !FP16_OPT_LEVELS.contains(&self.fp16_opt_level.as_str()) {
            return usage(format!(
                "--fp16_opt_level must be one of {FP16_OPT_LEVELS:?}, got '{}'",
                self.fp16_opt_level
            ));
        }
        if self.pretrained_model.is_none() {
            if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
                return usage(format!(
                    "--hidden_size ({}) must be divisible by --num_attention_heads ({})",
                    self.hidden_size, self.num_attention_heads
                ));
            }
            if self.num_hidden_layers == 0 {
                return usage("--num_hidden_layers must be at least 1".into());
            }
            if !(0.0..1.0).contains(&self.hidden_dropout_prob) {
                return usage(format!(
                    "--hidden_dropout_prob must be within [0, 1), got {}",
                    self.hidden_dropout_prob
                ));
            }
        }
        Ok(())
    }

    /// Embedding width for a model built from scratch.
    pub fn resolved_embedding_size(&self) -> usize {
        self.embedding_size
            .unwrap_or_else(|| self.model_type.default_embedding_size(self.hidden_size))
    }

    pub fn split_path(&self, split: &str) -> PathBuf {
        self.data_dir.join(format!("{split}.tsv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_falls_back_to_cpu_without_adapter() {
        assert_eq!(DeviceChoice::Auto.resolve(|| true), Ok(ComputeDevice::Gpu));
        assert_eq!(DeviceChoice::Auto.resolve(|| false), Ok(ComputeDevice::Cpu));
    }

    #[test]
    fn explicit_gpu_without_adapter_is_an_error() {
        assert_eq!(DeviceChoice::Gpu.resolve(|| true), Ok(ComputeDevice::Gpu));
        assert!(DeviceChoice::Gpu.resolve(|| false).is_err());
    }

    #[test]
    fn cpu_never_probes_for_an_adapter() {
        let resolved = DeviceChoice::Cpu.resolve(|| panic!("adapter probe on --device cpu"));
        assert_eq!(resolved, Ok(ComputeDevice::Cpu));
    }

    #[test]
    fn model_type_is_case_insensitive() {
        assert_eq!("BERT".parse::<ModelType>(), Ok(ModelType::Bert));
        assert_eq!("RoBERTa".parse::<ModelType>(), Ok(ModelType::Roberta));
        assert_eq!(ModelType::Albert.to_string(), "albert");
        assert!("xlnet".parse::<ModelType>().is_err());
    }

    #[test]
    fn numeric_modes_parse() {
        assert_eq!("1".parse::<DataFormatMode>(), Ok(DataFormatMode::Uni));
        assert_eq!(
            "2".parse::<ClassificationScheme>(),
            Ok(ClassificationScheme::ClsEntityStartsEnds)
        );
        assert!("3".parse::<ClassificationScheme>().is_err());
        assert_eq!(ClassificationScheme::ClsEntityStarts.num_pooled(), 3);
    }

    #[test]
    fn log_levels_use_single_letters() {
        assert_eq!("d".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("w".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("x".parse::<LogLevel>().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(TaskConfig::default().validate().is_ok());
    }

    #[test]
    fn predict_without_output_file_is_a_usage_error() {
        let cfg = TaskConfig { do_predict: true, ..TaskConfig::default() };
        assert!(matches!(cfg.validate(), Err(AppError::Usage(_))));
    }

    #[test]
    fn heads_must_divide_hidden_size() {
        let cfg = TaskConfig { hidden_size: 100, num_attention_heads: 8, ..TaskConfig::default() };
        assert!(matches!(cfg.validate(), Err(AppError::Usage(_))));
    }

    #[test]
    fn bad_fp16_opt_level_is_rejected() {
        let cfg = TaskConfig { fp16_opt_level: "O4".into(), ..TaskConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn albert_embeddings_are_factorized() {
        let cfg = TaskConfig { model_type: ModelType::Albert, ..TaskConfig::default() };
        assert_eq!(cfg.resolved_embedding_size(), 128);
        let cfg = TaskConfig { embedding_size: Some(64), ..cfg };
        assert_eq!(cfg.resolved_embedding_size(), 64);
        assert_eq!(TaskConfig::default().resolved_embedding_size(), 256);
    }
}
