//! Text → prediction path over a loaded session

use crate::error::{AppError, Result};
use crate::ml::classifier::TicketClassifier;
use crate::ml::labels::LabelSet;
use crate::ml::loader::ModelSession;
use crate::ml::models::{ModelInfo, Prediction};
use candle_core::{Tensor, D};
use std::collections::BTreeMap;
use tracing::debug;

/// Fixed-shape encoding of one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    pub ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of real (non-padding) tokens
    pub fn token_count(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

impl ModelSession {
    /// Tokenize with the session's fixed padding and truncation policy
    pub fn encode(&self, text: &str) -> Result<EncodedInput> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| AppError::Inference(format!("Tokenization failed: {}", e)))?;

        let encoded = EncodedInput {
            ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        };

        if encoded.len() != self.max_length {
            return Err(AppError::Inference(format!(
                "Tokenizer produced {} tokens, expected {}",
                encoded.len(),
                self.max_length
            )));
        }

        Ok(encoded)
    }

    /// Softmax probabilities for one text, ordered by class index
    pub fn probabilities(&self, text: &str) -> Result<Vec<f32>> {
        let encoded = self.encode(text)?;

        let input_ids = Tensor::new(encoded.ids.as_slice(), &self.device)?.unsqueeze(0)?;

        // candle's DistilBERT masks positions where the mask is non-zero.
        let inverted: Vec<u8> = encoded
            .attention_mask
            .iter()
            .map(|&m| u8::from(m == 0))
            .collect();
        let attention_mask = Tensor::new(inverted.as_slice(), &self.device)?.unsqueeze(0)?;

        let logits = self.model.forward(&input_ids, &attention_mask)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;

        Ok(probs.squeeze(0)?.to_vec1::<f32>()?)
    }
}

impl TicketClassifier for ModelSession {
    fn classify(&self, text: &str) -> Result<Prediction> {
        let probs = self.probabilities(text)?;
        let prediction = prediction_from_probabilities(&probs, &self.labels)?;

        debug!(
            label = %prediction.label,
            confidence = prediction.confidence,
            "Classified ticket"
        );

        Ok(prediction)
    }

    fn info(&self) -> ModelInfo {
        self.model_info()
    }
}

/// Index of the largest value; ties go to the lowest index
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ if value.is_nan() => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Derive the predicted label and confidence from a probability vector
pub fn prediction_from_probabilities(probs: &[f32], labels: &LabelSet) -> Result<Prediction> {
    let index = argmax(probs)
        .ok_or_else(|| AppError::Inference("Model produced no usable class scores".to_string()))?;

    let probabilities: BTreeMap<String, f64> = probs
        .iter()
        .enumerate()
        .map(|(i, &p)| (labels.resolve(i), f64::from(p)))
        .collect();

    Ok(Prediction {
        label: labels.resolve(index),
        index,
        confidence: f64::from(probs[index]),
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelSet {
        LabelSet::new(
            ["account", "billing", "other", "technical"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), Some(0));
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[0.1, 0.2, 0.3, 0.4]), Some(3));
    }

    #[test]
    fn test_argmax_skips_nan_and_empty() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.8]), Some(2));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_prediction_from_probabilities() {
        let prediction =
            prediction_from_probabilities(&[0.05, 0.80, 0.05, 0.10], &labels()).unwrap();

        assert_eq!(prediction.label, "billing");
        assert_eq!(prediction.index, 1);
        assert!((prediction.confidence - 0.80).abs() < 1e-6);
        assert_eq!(prediction.probabilities.len(), 4);
        assert!(prediction.is_normalized());
        assert_eq!(prediction.confidence_percent(), 80.0);
    }

    #[test]
    fn test_unknown_index_gets_placeholder() {
        let two = LabelSet::new(vec!["account".into(), "billing".into()]).unwrap();
        let prediction = prediction_from_probabilities(&[0.1, 0.2, 0.7], &two).unwrap();

        assert_eq!(prediction.label, "unknown(2)");
        assert!(prediction.probabilities.contains_key("unknown(2)"));
    }

    #[test]
    fn test_all_nan_is_inference_error() {
        let err = prediction_from_probabilities(&[f32::NAN, f32::NAN], &labels()).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }
}
