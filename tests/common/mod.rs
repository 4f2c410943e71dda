//! Common test utilities for classifier testing
//!
//! This module builds a tiny DistilBERT artifact on disk (random weights,
//! word-level tokenizer) so the real loader and inference path can run
//! without shipping a trained model, plus a counting stub classifier for
//! HTTP-layer tests.

#![allow(dead_code)]

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ticket_classifier::{
    api::{build_router, AppState},
    ml::{ClassificationService, ModelInfo, Prediction, TicketClassifier},
    AppError,
};

pub const LABELS: [&str; 4] = ["account", "billing", "other", "technical"];

/// Small enough to run fast on CPU, long enough to exercise padding
pub const TEST_MAX_LENGTH: usize = 32;

const DIM: usize = 16;

const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "payment", "failed", "at", "checkout", "i", "can't",
    "log", "into", "my", "account", "was", "double", "charged", "the", "app", "keeps",
    "crashing", "thank", "you", "for", "help", "password", "reset", "invoice", "refund", "error",
];

fn vocab_map() -> Value {
    let map: serde_json::Map<String, Value> = VOCAB
        .iter()
        .enumerate()
        .map(|(id, token)| (token.to_string(), json!(id)))
        .collect();
    Value::Object(map)
}

fn model_config(labels: &[&str]) -> Value {
    let id2label: serde_json::Map<String, Value> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (i.to_string(), json!(l)))
        .collect();
    let label2id: serde_json::Map<String, Value> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.to_string(), json!(i)))
        .collect();

    json!({
        "architectures": ["DistilBertForSequenceClassification"],
        "model_type": "distilbert",
        "vocab_size": VOCAB.len(),
        "dim": DIM,
        "n_layers": 1,
        "n_heads": 2,
        "hidden_dim": DIM * 2,
        "activation": "gelu",
        "max_position_embeddings": 64,
        "initializer_range": 0.02,
        "pad_token_id": 0,
        "dropout": 0.1,
        "attention_dropout": 0.1,
        "seq_classif_dropout": 0.2,
        "id2label": id2label,
        "label2id": label2id,
    })
}

fn tokenizer_json() -> Value {
    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab_map(),
            "unk_token": "[UNK]"
        }
    })
}

/// Write config, tokenizer and randomly initialised weights into `dir`
pub fn write_tiny_artifact(dir: &Path) -> PathBuf {
    write_artifact(dir, &LABELS, LABELS.len())
}

/// Write an artifact whose `id2label` has `labels` but whose head has `head_width` outputs
pub fn write_artifact(dir: &Path, labels: &[&str], head_width: usize) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();

    let config = model_config(labels);
    std::fs::write(
        dir.join("config.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.join("tokenizer.json"),
        serde_json::to_string_pretty(&tokenizer_json()).unwrap(),
    )
    .unwrap();

    let encoder_config: DistilBertConfig = serde_json::from_value(config).unwrap();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    DistilBertModel::load(vb.pp("distilbert"), &encoder_config).unwrap();
    candle_nn::linear(DIM, DIM, vb.pp("pre_classifier")).unwrap();
    candle_nn::linear(DIM, head_width, vb.pp("classifier")).unwrap();
    varmap.save(dir.join("model.safetensors")).unwrap();

    dir.to_path_buf()
}

/// Classifier that records how often it was called
pub struct CountingClassifier {
    pub calls: AtomicUsize,
    pub fail_with: Option<String>,
}

impl CountingClassifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(message.to_string()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TicketClassifier for CountingClassifier {
    fn classify(&self, _text: &str) -> ticket_classifier::Result<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(AppError::Inference(message.clone()));
        }

        let probabilities: BTreeMap<String, f64> = [
            ("account", 0.05),
            ("billing", 0.9123),
            ("other", 0.0377),
            ("technical", 0.05),
        ]
        .iter()
        .map(|(label, p)| (label.to_string(), *p))
        .collect();

        Ok(Prediction {
            label: "billing".to_string(),
            index: 1,
            confidence: 0.9123,
            probabilities,
        })
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            artifact_path: PathBuf::from("stub"),
            device: "cpu".to_string(),
            labels: LABELS.iter().map(|l| l.to_string()).collect(),
            max_length: TEST_MAX_LENGTH,
        }
    }
}

/// Router over an arbitrary classifier
pub fn router_with(classifier: Arc<dyn TicketClassifier>) -> axum::Router {
    let service = Arc::new(ClassificationService::new(classifier));
    build_router(AppState::new(service))
}
