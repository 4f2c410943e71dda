use crate::ml::error::{ArtifactError, ArtifactResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Ordered mapping from class index to category name.
///
/// The label set belongs to the artifact: it is read from the model config
/// and never hard-coded by the serving code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Build a label set from names ordered by class index
    pub fn new(names: Vec<String>) -> ArtifactResult<Self> {
        if names.is_empty() {
            return Err(ArtifactError::Labels("label set is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for name in &names {
            if name.trim().is_empty() {
                return Err(ArtifactError::Labels("label names must not be blank".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::Labels(format!("duplicate label '{}'", name)));
            }
        }

        Ok(Self { names })
    }

    /// Build a label set from a HuggingFace style `id2label` map.
    ///
    /// Keys are stringified indices and must cover `0..n` exactly.
    pub fn from_id2label(id2label: &HashMap<String, String>) -> ArtifactResult<Self> {
        let mut indexed = Vec::with_capacity(id2label.len());
        for (key, name) in id2label {
            let index: usize = key.trim().parse().map_err(|_| {
                ArtifactError::Labels(format!("id2label key '{}' is not a class index", key))
            })?;
            indexed.push((index, name.clone()));
        }
        indexed.sort_by_key(|(index, _)| *index);

        for (expected, (index, _)) in indexed.iter().enumerate() {
            if *index != expected {
                return Err(ArtifactError::Labels(format!(
                    "id2label is not dense: expected index {}, found {}",
                    expected, index
                )));
            }
        }

        Self::new(indexed.into_iter().map(|(_, name)| name).collect())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Name for a class index, or an `unknown(<index>)` placeholder
    pub fn resolve(&self, index: usize) -> String {
        self.get(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("unknown({})", index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
