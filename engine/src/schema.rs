use std::{collections::HashMap, fs, path::Path};

use crate::error::{artifact_error, AppError};

/// Ordered feature names the classifier was trained on.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Reads a JSON array of names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| artifact_error(format!("schema {}: {}", path.display(), e)))?;
        let names: Vec<String> = serde_json::from_str(&raw)
            .map_err(|e| artifact_error(format!("schema {}: {}", path.display(), e)))?;
        Self::from_names(names)
    }

    pub fn from_names(names: Vec<String>) -> Result<Self, AppError> {
        if names.is_empty() {
            return Err(artifact_error("schema has no feature names"));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(artifact_error(format!("duplicate feature name {:?} in schema", name)));
            }
        }

        Ok(Self { names, index })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}
