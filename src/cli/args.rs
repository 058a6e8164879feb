// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every flag of the tool. Long names are snake_case
// (--model_type, --do_train, ...) so existing run scripts keep
// working.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing or malformed values
//   - type conversion through each type's FromStr
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;
use std::path::PathBuf;

use crate::application::config::{
    ClassificationScheme, DataFormatMode, DeviceChoice, LogLevel, ModelType, TaskConfig,
};

#[derive(Args, Debug)]
pub struct RunArgs {
    // ── Model and data ────────────────────────────────────────────────────────
    /// Encoder family: bert, roberta or albert
    #[arg(long = "model_type")]
    pub model_type: ModelType,

    /// 0: [CLS] S1 [SEP] S2 [SEP]; 1: [CLS] S1 S2 [SEP]
    #[arg(long = "data_format_mode", default_value = "0")]
    pub data_format_mode: DataFormatMode,

    /// Pooled tokens: 0 [CLS]; 1 [CLS],[S1],[S2]; 2 [CLS],[S1],[S2],[E1],[E2]
    #[arg(long = "classification_scheme", default_value = "0")]
    pub classification_scheme: ClassificationScheme,

    /// Model directory written by an earlier --do_train run to fine-tune from
    #[arg(long = "pretrained_model")]
    pub pretrained_model: Option<PathBuf>,

    /// Directory holding train.tsv, dev.tsv and test.tsv
    #[arg(long = "data_dir")]
    pub data_dir: PathBuf,

    /// Output directory for checkpoints, tokenizer and eval_result.txt
    #[arg(long = "new_model_dir")]
    pub new_model_dir: PathBuf,

    /// Where --do_predict writes one label per line
    #[arg(long = "predict_output_file")]
    pub predict_output_file: Option<PathBuf>,

    /// Train into --new_model_dir even if it already exists
    #[arg(long = "overwrite_model_dir")]
    pub overwrite_model_dir: bool,

    #[arg(long, default_value_t = 3)]
    pub seed: u64,

    /// Tokens per sequence including [CLS] and [SEP]
    #[arg(long = "max_seq_length", default_value_t = 512)]
    pub max_seq_length: usize,

    /// Cache featurized splits as JSON under --data_dir
    #[arg(long = "cache_data")]
    pub cache_data: bool,

    // ── Stages ────────────────────────────────────────────────────────────────
    #[arg(long = "do_train")]
    pub do_train: bool,

    /// Score on dev.tsv after training (requires --do_train)
    #[arg(long = "do_eval")]
    pub do_eval: bool,

    /// Label test.tsv (requires --predict_output_file)
    #[arg(long = "do_predict")]
    pub do_predict: bool,

    /// Lowercase text in a newly built tokenizer
    #[arg(long = "do_lower_case")]
    pub do_lower_case: bool,

    // ── Optimisation ──────────────────────────────────────────────────────────
    #[arg(long = "train_batch_size", default_value_t = 8)]
    pub train_batch_size: usize,

    #[arg(long = "eval_batch_size", default_value_t = 8)]
    pub eval_batch_size: usize,

    #[arg(long = "learning_rate", default_value_t = 1e-5)]
    pub learning_rate: f64,

    #[arg(long = "num_train_epochs", default_value_t = 10)]
    pub num_train_epochs: usize,

    /// Batches whose gradients are summed into one update
    #[arg(long = "gradient_accumulation_steps", default_value_t = 1)]
    pub gradient_accumulation_steps: usize,

    /// Linear warmup over --warmup_ratio of all updates, then linear decay
    #[arg(long = "do_warmup")]
    pub do_warmup: bool,

    #[arg(long = "warmup_ratio", default_value_t = 0.1)]
    pub warmup_ratio: f64,

    #[arg(long = "weight_decay", default_value_t = 0.0)]
    pub weight_decay: f64,

    #[arg(long = "adam_epsilon", default_value_t = 1e-8)]
    pub adam_epsilon: f64,

    /// Gradients are clipped to this global L2 norm
    #[arg(long = "max_grad_norm", default_value_t = 1.0)]
    pub max_grad_norm: f64,

    /// Checkpoints kept in --new_model_dir; older ones are deleted
    #[arg(long = "max_num_checkpoints", default_value_t = 3)]
    pub max_num_checkpoints: usize,

    // ── Logging and runtime ───────────────────────────────────────────────────
    #[arg(long = "log_file")]
    pub log_file: Option<PathBuf>,

    /// d, i, w or e
    #[arg(long = "log_lvl", default_value = "i")]
    pub log_lvl: LogLevel,

    /// Log the training loss every n updates; negative disables
    #[arg(long = "log_step", default_value_t = 1000, allow_negative_numbers = true)]
    pub log_step: i64,

    #[arg(long = "progress_bar")]
    pub progress_bar: bool,

    /// Accepted for compatibility; training always runs in f32
    #[arg(long)]
    pub fp16: bool,

    #[arg(long = "fp16_opt_level", default_value = "O1")]
    pub fp16_opt_level: String,

    /// auto, gpu or cpu
    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,

    /// Label excluded from precision, recall and F1
    #[arg(long = "non_relation_label", default_value = "NonRel")]
    pub non_relation_label: String,

    // ── Architecture (ignored with --pretrained_model) ────────────────────────
    /// Upper bound on the vocabulary of a newly built tokenizer
    #[arg(long = "vocab_size", default_value_t = 30522)]
    pub vocab_size: usize,

    #[arg(long = "hidden_size", default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long = "num_hidden_layers", default_value_t = 6)]
    pub num_hidden_layers: usize,

    /// hidden_size must be divisible by this
    #[arg(long = "num_attention_heads", default_value_t = 8)]
    pub num_attention_heads: usize,

    #[arg(long = "intermediate_size", default_value_t = 1024)]
    pub intermediate_size: usize,

    /// Embedding width; defaults to hidden_size (albert: min(128, hidden_size))
    #[arg(long = "embedding_size")]
    pub embedding_size: Option<usize>,

    #[arg(long = "hidden_dropout_prob", default_value_t = 0.1)]
    pub hidden_dropout_prob: f64,
}

/// Convert CLI RunArgs into the application-layer TaskConfig.
/// The application layer never sees clap types.
impl From<RunArgs> for TaskConfig {
    fn from(a: RunArgs) -> Self {
        TaskConfig {
            model_type:            a.model_type,
            data_format_mode:      a.data_format_mode,
            classification_scheme: a.classification_scheme,
            pretrained_model:      a.pretrained_model,
            data_dir:              a.data_dir,
            new_model_dir:         a.new_model_dir,
            predict_output_file:   a.predict_output_file,
            overwrite_model_dir:   a.overwrite_model_dir,
            seed:                  a.seed,
            max_seq_length:        a.max_seq_length,
            cache_data:            a.cache_data,
            do_train:              a.do_train,
            do_eval:               a.do_eval,
            do_predict:            a.do_predict,
            do_lower_case:         a.do_lower_case,
            train_batch_size:      a.train_batch_size,
            eval_batch_size:       a.eval_batch_size,
            learning_rate:         a.learning_rate,
            num_train_epochs:      a.num_train_epochs,
            gradient_accumulation_steps: a.gradient_accumulation_steps,
            do_warmup:             a.do_warmup,
            warmup_ratio:          a.warmup_ratio,
            weight_decay:          a.weight_decay,
            adam_epsilon:          a.adam_epsilon,
            max_grad_norm:         a.max_grad_norm,
            max_num_checkpoints:   a.max_num_checkpoints,
            log_file:              a.log_file,
            log_lvl:               a.log_lvl,
            log_step:              a.log_step,
            progress_bar:          a.progress_bar,
            fp16:                  a.fp16,
            fp16_opt_level:        a.fp16_opt_level,
            device:                a.device,
            non_relation_label:    a.non_relation_label,
            vocab_size:            a.vocab_size,
            hidden_size:           a.hidden_size,
            num_hidden_layers:     a.num_hidden_layers,
            num_attention_heads:   a.num_attention_heads,
            intermediate_size:     a.intermediate_size,
            embedding_size:        a.embedding_size,
            hidden_dropout_prob:   a.hidden_dropout_prob,
        }
    }
}
