use crate::ml::classifier::DistilBertSequenceClassifier;
use crate::ml::error::{ArtifactError, ArtifactResult};
use crate::ml::labels::LabelSet;
use crate::ml::models::ModelInfo;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::distilbert::Config as DistilBertConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tokenizers::{PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const VOCAB_FILE: &str = "vocab.txt";
pub const SAFETENSORS_FILE: &str = "model.safetensors";
pub const PYTORCH_FILE: &str = "pytorch_model.bin";

/// Compute device requested by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DevicePreference {
    /// Best accelerator available, else CPU
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

/// Pick the compute device once for the lifetime of the process.
///
/// `Auto` never fails; an explicitly requested accelerator that cannot be
/// initialized is an error.
pub fn select_device(preference: DevicePreference) -> ArtifactResult<Device> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda => Device::new_cuda(0)
            .map_err(|e| ArtifactError::Device(format!("Failed to initialize CUDA: {}", e))),
        DevicePreference::Metal => Device::new_metal(0)
            .map_err(|e| ArtifactError::Device(format!("Failed to initialize Metal: {}", e))),
        DevicePreference::Auto => {
            if candle_core::utils::cuda_is_available() {
                match Device::new_cuda(0) {
                    Ok(device) => return Ok(device),
                    Err(e) => tracing::warn!("CUDA reported available but failed to initialize: {}", e),
                }
            }
            if candle_core::utils::metal_is_available() {
                match Device::new_metal(0) {
                    Ok(device) => return Ok(device),
                    Err(e) => tracing::warn!("Metal reported available but failed to initialize: {}", e),
                }
            }
            Ok(Device::Cpu)
        }
    }
}

/// Short device name for logs and health output
pub fn device_name(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}

/// Fields of `config.json` the loader needs beyond the encoder config
#[derive(Debug, Clone, Deserialize)]
struct ArtifactManifest {
    #[serde(default)]
    id2label: HashMap<String, String>,

    #[serde(default)]
    num_labels: Option<usize>,

    #[serde(default, rename = "_num_labels")]
    legacy_num_labels: Option<usize>,

    dim: usize,

    max_position_embeddings: usize,
}

/// Tokenizer, network, device and labels, built once and read-only afterwards
pub struct ModelSession {
    pub(crate) artifact_path: PathBuf,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) model: DistilBertSequenceClassifier,
    pub(crate) device: Device,
    pub(crate) labels: LabelSet,
    pub(crate) max_length: usize,
}

impl ModelSession {
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            artifact_path: self.artifact_path.clone(),
            device: device_name(&self.device).to_string(),
            labels: self.labels.iter().map(str::to_string).collect(),
            max_length: self.max_length,
        }
    }
}

/// Builds sessions from artifact directories using local files only
pub struct ModelLoader {
    device: Device,
    max_length: usize,
}

impl ModelLoader {
    /// Select the device up front so every candidate is loaded onto the same one
    pub fn new(preference: DevicePreference, max_length: usize) -> ArtifactResult<Self> {
        if max_length < 2 {
            return Err(ArtifactError::Tokenizer(format!(
                "max_length must leave room for special tokens, got {}",
                max_length
            )));
        }

        let device = select_device(preference)?;
        info!(device = device_name(&device), ?preference, "Selected compute device");

        Ok(Self { device, max_length })
    }

    /// Loader pinned to a specific device
    pub fn with_device(device: Device, max_length: usize) -> Self {
        Self { device, max_length }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Materialize a session from one artifact directory
    pub fn load(&self, dir: &Path) -> ArtifactResult<ModelSession> {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Err(ArtifactError::MissingFile(config_path));
        }
        let config_str = std::fs::read_to_string(&config_path)?;

        let manifest: ArtifactManifest = serde_json::from_str(&config_str).map_err(|e| {
            ArtifactError::InvalidConfig {
                path: config_path.clone(),
                message: e.to_string(),
            }
        })?;
        let encoder_config: DistilBertConfig = serde_json::from_str(&config_str).map_err(|e| {
            ArtifactError::InvalidConfig {
                path: config_path.clone(),
                message: e.to_string(),
            }
        })?;

        if self.max_length > manifest.max_position_embeddings {
            return Err(ArtifactError::InvalidConfig {
                path: config_path,
                message: format!(
                    "max_length {} exceeds max_position_embeddings {}",
                    self.max_length, manifest.max_position_embeddings
                ),
            });
        }

        let labels = LabelSet::from_id2label(&manifest.id2label)?;
        if let Some(declared) = manifest.num_labels.or(manifest.legacy_num_labels) {
            if declared != labels.len() {
                return Err(ArtifactError::Labels(format!(
                    "config declares {} labels but id2label has {}",
                    declared,
                    labels.len()
                )));
            }
        }

        let tokenizer = load_tokenizer(dir, self.max_length)?;
        let vb = load_weights(dir, &self.device)?;
        let model = DistilBertSequenceClassifier::load(vb, &encoder_config, manifest.dim, labels.len())?;

        info!(
            path = %dir.display(),
            labels = ?labels.iter().collect::<Vec<_>>(),
            "Loaded DistilBERT classifier"
        );

        Ok(ModelSession {
            artifact_path: dir.to_path_buf(),
            tokenizer,
            model,
            device: self.device.clone(),
            labels,
            max_length: self.max_length,
        })
    }
}

/// Load the tokenizer and pin it to fixed-length padding and truncation.
///
/// Tries `tokenizer.json` first, then builds a WordPiece tokenizer from
/// `vocab.txt`.
pub fn load_tokenizer(dir: &Path, max_length: usize) -> ArtifactResult<Tokenizer> {
    let mut tokenizer = read_tokenizer(dir)?;

    let mut padding = tokenizer.get_padding().cloned().unwrap_or_default();
    padding.strategy = PaddingStrategy::Fixed(max_length);
    if let Some(pad_id) = tokenizer.token_to_id(&padding.pad_token) {
        padding.pad_id = pad_id;
    }
    tokenizer.with_padding(Some(padding));

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| ArtifactError::Tokenizer(format!("Failed to configure truncation: {}", e)))?;

    Ok(tokenizer)
}

fn read_tokenizer(dir: &Path) -> ArtifactResult<Tokenizer> {
    let tokenizer_json_path = dir.join(TOKENIZER_FILE);
    if tokenizer_json_path.is_file() {
        debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| ArtifactError::Tokenizer(format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = dir.join(VOCAB_FILE);
    if vocab_path.is_file() {
        debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(&vocab_path.to_string_lossy())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| ArtifactError::Tokenizer(format!("Failed to build WordPiece model: {}", e)))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .map(|id| (token.to_string(), id))
                .ok_or_else(|| ArtifactError::Tokenizer(format!("vocab.txt has no {} token", token)))
        };
        let sep = special("[SEP]")?;
        let cls = special("[CLS]")?;
        tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

        return Ok(tokenizer);
    }

    Err(ArtifactError::MissingFile(tokenizer_json_path))
}

/// Map the weights file, preferring safetensors over a PyTorch pickle
fn load_weights(dir: &Path, device: &Device) -> ArtifactResult<VarBuilder<'static>> {
    let safetensors_path = dir.join(SAFETENSORS_FILE);
    if safetensors_path.is_file() {
        // SAFETY: the artifact is immutable for the lifetime of the process.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors_path], DType::F32, device)
                .map_err(|e| ArtifactError::Weights(format!("Failed to map model.safetensors: {}", e)))?
        };
        return Ok(vb);
    }

    let pytorch_path = dir.join(PYTORCH_FILE);
    if pytorch_path.is_file() {
        return VarBuilder::from_pth(&pytorch_path, DType::F32, device)
            .map_err(|e| ArtifactError::Weights(format!("Failed to read pytorch_model.bin: {}", e)));
    }

    Err(ArtifactError::MissingFile(safetensors_path))
}
