use crate::error::Result;
use crate::ml::error::{ArtifactError, ArtifactResult};
use crate::ml::models::{ModelInfo, Prediction};
use candle_core::{IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};

/// Trait for ticket classifiers
pub trait TicketClassifier: Send + Sync {
    /// Classify a single ticket text
    fn classify(&self, text: &str) -> Result<Prediction>;

    /// Describe the loaded model
    fn info(&self) -> ModelInfo;
}

/// DistilBERT encoder with the HuggingFace sequence-classification head.
///
/// Mirrors `DistilBertForSequenceClassification`: the `[CLS]` hidden state
/// goes through `pre_classifier` and ReLU (when the artifact has one), then
/// through `classifier`. Dropout is a training-time layer and is not part
/// of the forward pass.
pub struct DistilBertSequenceClassifier {
    encoder: DistilBertModel,
    pre_classifier: Option<Linear>,
    classifier: Linear,
    num_labels: usize,
}

impl DistilBertSequenceClassifier {
    /// Build the network from a weights builder rooted at the artifact's top level
    pub fn load(
        vb: VarBuilder,
        config: &DistilBertConfig,
        hidden_size: usize,
        num_labels: usize,
    ) -> ArtifactResult<Self> {
        let encoder = DistilBertModel::load(vb.pp("distilbert"), config)
            .map_err(|e| ArtifactError::Weights(format!("Failed to load DistilBERT encoder: {}", e)))?;

        let pre_classifier = if vb.contains_tensor("pre_classifier.weight") {
            let layer = candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier"))
                .map_err(|e| ArtifactError::Weights(format!("Failed to load pre_classifier: {}", e)))?;
            tracing::debug!(hidden_size, "Loaded pre_classifier layer");
            Some(layer)
        } else {
            None
        };

        // A shape mismatch here means the label mapping and the trained head disagree.
        let classifier = candle_nn::linear(hidden_size, num_labels, vb.pp("classifier")).map_err(
            |e| ArtifactError::ClassifierHead {
                labels: num_labels,
                message: e.to_string(),
            },
        )?;

        Ok(Self {
            encoder,
            pre_classifier,
            classifier,
            num_labels,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Raw logits of shape `[batch, num_labels]`.
    ///
    /// `attention_mask` uses candle's inverted convention: 1 marks a padded
    /// position to be ignored, 0 a real token.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let hidden_states = self.encoder.forward(input_ids, attention_mask)?;
        let cls = hidden_states.i((.., 0))?;

        let pooled = match &self.pre_classifier {
            Some(pre_classifier) => pre_classifier.forward(&cls)?.relu()?,
            None => cls,
        };

        self.classifier.forward(&pooled)
    }
}
