/// Machine Learning module for support-ticket classification
///
/// This module provides the inference-serving path:
/// - Ordered discovery of the trained artifact on disk
/// - One-time loading of tokenizer and DistilBERT weights onto a device
/// - Fixed-length tokenization, forward pass and softmax
/// - A shared, read-only classification service for request handlers

pub mod artifact;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod labels;
pub mod loader;
pub mod models;
pub mod service;

pub use artifact::{resolve, ArtifactCandidates, CandidateFailure, FailureReason, ResolutionFailure, Resolved};
pub use classifier::{DistilBertSequenceClassifier, TicketClassifier};
pub use engine::{argmax, prediction_from_probabilities, EncodedInput};
pub use error::{ArtifactError, StartupError};
pub use labels::LabelSet;
pub use loader::{select_device, DevicePreference, ModelLoader, ModelSession};
pub use models::{ModelInfo, Prediction};
pub use service::{ClassificationService, ClassificationStats};
