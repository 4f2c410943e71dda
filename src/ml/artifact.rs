//! Ordered discovery of a trained model artifact on disk
//!
//! Deployments lay the artifact out differently (a configured absolute path,
//! a notebook export next to the repo, a packaged `artifacts/` tree). The
//! resolver walks a fixed priority list and settles on the first directory
//! that actually loads, collecting every failure along the way.

use crate::config::ModelConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Conventional artifact locations, relative to the search root
pub const CONVENTIONAL_LAYOUTS: &[&str] = &[
    "distilbert_ticket_classifier_model",
    "artifacts/models/distilbert_ticket_classifier_model",
    "artifacts/models/distilbert/final",
    "artifacts/models/distilbert/distilbert_ticket_classifier_model",
    "models/distilbert-ticket-classifier",
];

/// Ordered, de-duplicated list of candidate artifact directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactCandidates {
    paths: Vec<PathBuf>,
}

impl ArtifactCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit path first, then configured extras, then the conventional layouts
    pub fn from_config(config: &ModelConfig) -> Self {
        let mut candidates = Self::new();

        if let Some(path) = &config.path {
            candidates.push(path.clone());
        }
        for path in &config.extra_candidates {
            candidates.push(path.clone());
        }
        for layout in CONVENTIONAL_LAYOUTS {
            candidates.push(config.search_root.join(layout));
        }

        candidates
    }

    /// Append a candidate unless it is already listed
    pub fn push(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ArtifactCandidates {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut candidates = Self::new();
        for path in iter {
            candidates.push(path);
        }
        candidates
    }
}

/// Why a single candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    NotFound,
    NotADirectory,
    LoadFailed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotFound => write!(f, "path does not exist"),
            FailureReason::NotADirectory => write!(f, "not a directory"),
            FailureReason::LoadFailed(message) => write!(f, "load failed: {}", message),
        }
    }
}

/// One rejected candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub path: PathBuf,
    pub reason: FailureReason,
}

/// The first candidate that loaded, plus the ones rejected before it
#[derive(Debug)]
pub struct Resolved<T> {
    pub path: PathBuf,
    pub value: T,
    pub rejected: Vec<CandidateFailure>,
}

/// Every candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub attempts: Vec<CandidateFailure>,
}

impl ResolutionFailure {
    /// The most recent load error, ignoring candidates that were never loaded
    pub fn last_error(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|attempt| match &attempt.reason {
            FailureReason::LoadFailed(message) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn tried_paths(&self) -> impl Iterator<Item = &Path> {
        self.attempts.iter().map(|attempt| attempt.path.as_path())
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "Could not load a trained model: no candidate paths were configured");
        }

        writeln!(f, "Could not find or load a trained model. Tried the following paths:")?;
        for attempt in &self.attempts {
            writeln!(f, "  - {} ({})", attempt.path.display(), attempt.reason)?;
        }
        write!(
            f,
            "The model directory must contain config.json, tokenizer.json (or vocab.txt) \
             and model.safetensors (or pytorch_model.bin)."
        )?;
        if let Some(last) = self.last_error() {
            write!(f, "\nLast loading error: {}", last)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionFailure {}

/// Try each candidate in order and return the first that loads.
///
/// Missing paths and plain files are recorded without calling `load`. A
/// failing `load` is recorded and the search moves on; candidates after the
/// first success are never touched.
pub fn resolve<T, E, F>(candidates: &[PathBuf], mut load: F) -> Result<Resolved<T>, ResolutionFailure>
where
    E: fmt::Display,
    F: FnMut(&Path) -> Result<T, E>,
{
    let mut attempts = Vec::new();

    for candidate in candidates {
        let reason = if !candidate.exists() {
            FailureReason::NotFound
        } else if !candidate.is_dir() {
            FailureReason::NotADirectory
        } else {
            info!(path = %candidate.display(), "Attempting to load model artifact");
            match load(candidate) {
                Ok(value) => {
                    info!(path = %candidate.display(), "✓ Loaded model artifact");
                    return Ok(Resolved {
                        path: candidate.clone(),
                        value,
                        rejected: attempts,
                    });
                }
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "Failed loading model artifact");
                    FailureReason::LoadFailed(e.to_string())
                }
            }
        };

        attempts.push(CandidateFailure {
            path: candidate.clone(),
            reason,
        });
    }

    Err(ResolutionFailure { attempts })
}
