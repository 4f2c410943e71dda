use crate::config::ModelConfig;
use crate::error::{AppError, Result};
use crate::ml::artifact::{resolve, ArtifactCandidates};
use crate::ml::classifier::TicketClassifier;
use crate::ml::error::StartupError;
use crate::ml::loader::ModelLoader;
use crate::ml::models::{ModelInfo, Prediction};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Classification service shared by every request handler
pub struct ClassificationService {
    /// Loaded classifier, read-only after startup
    classifier: Arc<dyn TicketClassifier>,

    /// Static model description, captured once
    info: ModelInfo,

    /// Service start time
    started_at: Instant,

    /// Wall-clock time the model became available
    loaded_at: DateTime<Utc>,

    /// Successful classifications
    classified: AtomicU64,

    /// Failed classifications
    failed: AtomicU64,
}

/// Service counters for the health endpoint
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassificationStats {
    pub loaded_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub classified: u64,
    pub failed: u64,
}

impl ClassificationService {
    /// Wrap an already loaded classifier
    pub fn new(classifier: Arc<dyn TicketClassifier>) -> Self {
        let info = classifier.info();
        Self {
            classifier,
            info,
            started_at: Instant::now(),
            loaded_at: Utc::now(),
            classified: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Resolve the artifact from configuration and load it.
    ///
    /// Blocking: reads and maps the artifact from disk. Fails only after every
    /// candidate has been tried.
    pub fn from_config(config: &ModelConfig) -> std::result::Result<Self, StartupError> {
        let loader =
            ModelLoader::new(config.device, config.max_length).map_err(StartupError::Device)?;
        let candidates = ArtifactCandidates::from_config(config);

        info!("Searching {} candidate artifact locations", candidates.len());

        let resolved = resolve(candidates.as_slice(), |path| loader.load(path))?;
        for rejected in &resolved.rejected {
            warn!(
                path = %rejected.path.display(),
                reason = %rejected.reason,
                "Skipped artifact candidate"
            );
        }
        info!(path = %resolved.path.display(), "✅ Model session ready");

        Ok(Self::new(Arc::new(resolved.value)))
    }

    /// Classify a ticket on the blocking pool
    pub async fn classify(&self, text: String) -> Result<Prediction> {
        if text.is_empty() {
            return Err(AppError::Validation("text must not be empty".to_string()));
        }

        let classifier = Arc::clone(&self.classifier);
        let outcome = tokio::task::spawn_blocking(move || classifier.classify(&text))
            .await
            .map_err(|e| AppError::Internal(format!("Inference task failed: {}", e)))
            .and_then(|result| result);

        match &outcome {
            Ok(_) => self.classified.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };

        outcome
    }

    pub fn model_info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn stats(&self) -> ClassificationStats {
        ClassificationStats {
            loaded_at: self.loaded_at,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            classified: self.classified.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::loader::DevicePreference;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct FixedClassifier;

    impl TicketClassifier for FixedClassifier {
        fn classify(&self, text: &str) -> Result<Prediction> {
            if text == "boom" {
                return Err(AppError::Inference("device lost".to_string()));
            }
            Ok(Prediction {
                label: "billing".to_string(),
                index: 1,
                confidence: 1.0,
                probabilities: BTreeMap::from([("billing".to_string(), 1.0)]),
            })
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                artifact_path: PathBuf::from("fixed"),
                device: "cpu".to_string(),
                labels: vec!["billing".to_string()],
                max_length: 8,
            }
        }
    }

    #[tokio::test]
    async fn test_classify_counts_outcomes() {
        let service = ClassificationService::new(Arc::new(FixedClassifier));

        let prediction = service.classify("refund please".to_string()).await.unwrap();
        assert_eq!(prediction.label, "billing");

        let err = service.classify("boom".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));

        let stats = service.stats();
        assert_eq!(stats.classified, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_empty_text_rejected_whitespace_classified() {
        let service = ClassificationService::new(Arc::new(FixedClassifier));

        let err = service.classify(String::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let prediction = service.classify("   ".to_string()).await.unwrap();
        assert_eq!(prediction.label, "billing");
        assert_eq!(service.stats().classified, 1);
    }

    #[test]
    fn test_from_config_without_artifacts_fails_with_every_path() {
        let root = TempDir::new().unwrap();
        let config = ModelConfig {
            path: Some(root.path().join("explicit")),
            search_root: root.path().to_path_buf(),
            device: DevicePreference::Cpu,
            ..ModelConfig::default()
        };

        let err = ClassificationService::from_config(&config).err().unwrap();
        let StartupError::Resolution(failure) = err else {
            panic!("expected resolution failure");
        };

        let message = failure.to_string();
        for candidate in ArtifactCandidates::from_config(&config).as_slice() {
            assert!(message.contains(&candidate.display().to_string()));
        }
    }
}
