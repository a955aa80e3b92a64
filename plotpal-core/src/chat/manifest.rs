//! Description of the fine-tuning run handed to the external trainer.
//!
//! Nothing here trains anything. The manifest records the base model, adapter
//! and quantization settings, and trainer arguments the corpus was built for,
//! together with hashes of the split files so a run can be traced back to its data.

use crate::error::CorpusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "training_config.json";

/// 4-bit weight quantization applied when loading the base model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizationConfig {
    pub load_in_4bit: bool,
    pub double_quant: bool,
    pub quant_type: String,
    pub compute_dtype: String,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            load_in_4bit: true,
            double_quant: true,
            quant_type: "nf4".into(),
            compute_dtype: "bfloat16".into(),
        }
    }
}

/// Low-rank adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraConfig {
    pub rank: u32,
    pub alpha: f32,
    pub dropout: f32,
    pub bias: String,
    pub target_modules: Vec<String>,
    pub task_type: String,
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self {
            rank: 8,
            alpha: 16.0,
            dropout: 0.05,
            bias: "none".into(),
            target_modules: ["q_proj", "v_proj", "k_proj", "o_proj"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            task_type: "CAUSAL_LM".into(),
        }
    }
}

/// Supervised fine-tuning trainer arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SftArguments {
    pub num_train_epochs: u32,
    pub per_device_train_batch_size: u32,
    pub per_device_eval_batch_size: u32,
    pub gradient_accumulation_steps: u32,
    pub learning_rate: f64,
    pub logging_steps: u32,
    pub eval_steps: u32,
    pub save_steps: u32,
    pub max_grad_norm: f64,
    pub warmup_ratio: f64,
    pub bf16: bool,
    pub optim: String,
}

impl Default for SftArguments {
    fn default() -> Self {
        Self {
            num_train_epochs: 2,
            per_device_train_batch_size: 1,
            per_device_eval_batch_size: 1,
            gradient_accumulation_steps: 8,
            learning_rate: 5e-5,
            logging_steps: 5,
            eval_steps: 20,
            save_steps: 50,
            max_grad_norm: 0.3,
            warmup_ratio: 0.03,
            bf16: true,
            optim: "adamw_torch_fused".into(),
        }
    }
}

/// One exported split file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitFile {
    pub path: PathBuf,
    pub conversations: usize,
    pub sha256: String,
}

impl SplitFile {
    pub fn describe(path: &Path, conversations: usize) -> Result<Self, CorpusError> {
        Ok(Self {
            path: path.to_path_buf(),
            conversations,
            sha256: hash_file(path)?,
        })
    }
}

/// Everything the trainer needs to reproduce a run on this corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuneManifest {
    pub base_model: String,
    pub adapter_dir: PathBuf,
    pub quantization: QuantizationConfig,
    pub lora: LoraConfig,
    pub sft: SftArguments,
    pub train: SplitFile,
    pub eval: SplitFile,
    pub created_at: DateTime<Utc>,
}

impl FineTuneManifest {
    pub fn new(base_model: &str, adapter_dir: &Path, train: SplitFile, eval: SplitFile) -> Self {
        Self {
            base_model: base_model.to_string(),
            adapter_dir: adapter_dir.to_path_buf(),
            quantization: QuantizationConfig::default(),
            lora: LoraConfig::default(),
            sft: SftArguments::default(),
            train,
            eval,
            created_at: Utc::now(),
        }
    }

    /// Effective batch size per optimizer step on one device.
    pub fn effective_batch_size(&self) -> u32 {
        self.sft.per_device_train_batch_size * self.sft.gradient_accumulation_steps
    }

    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Compute SHA-256 hash of file contents.
pub fn hash_file(path: &Path) -> Result<String, CorpusError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}
