use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::error::{artifact_error, AppError};
use crate::schema::FeatureSchema;
use crate::types::{FeatureVector, Verdict};

const LEAF: i64 = -1;

/// On-disk model: optional standard scaler in front of a tree ensemble or a
/// linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub version: String,
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
    #[serde(default)]
    pub scaler: Option<Scaler>,
    pub estimator: Estimator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    RandomForest { trees: Vec<DecisionTree> },
    Logistic { intercept: f64, coef: Vec<f64> },
}

/// Flattened binary tree; node 0 is the root and a child of -1 marks a leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions).
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub verdict: Verdict,
    pub phishing_probability: f64,
}

/// Validated, immutable classifier bound to one feature schema.
#[derive(Debug)]
pub struct Classifier {
    version: String,
    n_features: usize,
    scaler: Option<Scaler>,
    estimator: Estimator,
}

impl Classifier {
    pub fn load(path: impl AsRef<Path>, schema: &FeatureSchema) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| artifact_error(format!("{}: {}", path.display(), e)))?;
        let artifact: ClassifierArtifact = serde_json::from_str(&raw)
            .map_err(|e| artifact_error(format!("{}: {}", path.display(), e)))?;

        let classifier = Self::from_artifact(artifact, schema)?;
        info!(
            path = %path.display(),
            version = %classifier.version,
            features = classifier.n_features,
            "Loaded classifier"
        );
        Ok(classifier)
    }

    pub fn from_artifact(artifact: ClassifierArtifact, schema: &FeatureSchema) -> Result<Self, AppError> {
        let n_features = schema.len();

        if let Some(columns) = &artifact.feature_columns {
            if columns.as_slice() != schema.names() {
                return Err(artifact_error(
                    "artifact feature_columns differ from the feature schema",
                ));
            }
        }

        if let Some(scaler) = &artifact.scaler {
            if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
                return Err(artifact_error(format!(
                    "scaler has {}/{} entries, schema has {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n_features
                )));
            }
        }

        match &artifact.estimator {
            Estimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(artifact_error("random forest has no trees"));
                }
                let n_classes = trees[0].value.first().map(Vec::len).unwrap_or(0);
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n_features, n_classes)
                        .map_err(|reason| artifact_error(format!("tree {}: {}", i, reason)))?;
                }
            }
            Estimator::Logistic { coef, .. } => {
                if coef.len() != n_features {
                    return Err(artifact_error(format!(
                        "logistic model has {} coefficients, schema has {} features",
                        coef.len(),
                        n_features
                    )));
                }
            }
        }

        Ok(Self {
            version: artifact.version,
            n_features,
            scaler: artifact.scaler,
            estimator: artifact.estimator,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Verdict, AppError> {
        self.evaluate(features).map(|p| p.verdict)
    }

    pub fn evaluate(&self, features: &FeatureVector) -> Result<Prediction, AppError> {
        if features.len() != self.n_features {
            return Err(AppError::SchemaMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let x = self.scale(features.as_slice());

        let prediction = match &self.estimator {
            Estimator::RandomForest { trees } => {
                let mut totals: Vec<f64> = Vec::new();
                for tree in trees {
                    let probs = tree.leaf_probabilities(&x);
                    if totals.is_empty() {
                        totals = vec![0.0; probs.len()];
                    }
                    for (total, p) in totals.iter_mut().zip(probs) {
                        *total += p;
                    }
                }
                let n_trees = trees.len() as f64;
                totals.iter_mut().for_each(|t| *t /= n_trees);

                Prediction {
                    verdict: Verdict::from_class(argmax(&totals)),
                    phishing_probability: totals.get(1).copied().unwrap_or(0.0),
                }
            }
            Estimator::Logistic { intercept, coef } => {
                let z = intercept + coef.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>();
                Prediction {
                    verdict: Verdict::from_class(usize::from(z > 0.0)),
                    phishing_probability: sigmoid(z),
                }
            }
        };

        Ok(prediction)
    }

    fn scale(&self, values: &[f64]) -> Vec<f64> {
        match &self.scaler {
            Some(scaler) => values
                .iter()
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|(v, (mean, scale))| {
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    (v - mean) / scale
                })
                .collect(),
            None => values.to_vec(),
        }
    }
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("node arrays differ in length".to_string());
        }
        if n_classes == 0 {
            return Err("nodes carry no class values".to_string());
        }

        for node in 0..n {
            if self.value[node].len() != n_classes {
                return Err(format!("node {} has {} class values", node, self.value[node].len()));
            }

            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF && right == LEAF {
                continue;
            }
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(format!("node {} has invalid children {}/{}", node, left, right));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on unknown feature {}", node, feature));
            }
        }
        Ok(())
    }

    /// Normalized class weights of the leaf `x` lands in. Inputs are compared
    /// at single precision, as the trees were grown.
    fn leaf_probabilities(&self, x: &[f64]) -> Vec<f64> {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let value = x[self.feature[node] as usize] as f32 as f64;
            node = if value <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![0.0; weights.len()]
        }
    }
}

// First index of the maximum, so ties go to the lower class.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
