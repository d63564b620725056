use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Partial feature set produced by one analyzer, keyed by schema name.
pub type FeatureMap = HashMap<String, f64>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    Benign,
    Phishing,
}

impl Verdict {
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            Verdict::Phishing
        } else {
            Verdict::Benign
        }
    }

    pub fn is_phishing(&self) -> bool {
        matches!(self, Verdict::Phishing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Benign => "Safe",
            Verdict::Phishing => "Phishing",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub url: String,
    pub is_phishing: bool,
    pub result: String,
}

impl PredictionResult {
    pub fn new(url: &str, verdict: Verdict) -> Self {
        Self {
            url: url.to_string(),
            is_phishing: verdict.is_phishing(),
            result: verdict.label().to_string(),
        }
    }
}

/// Classifier input laid out in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn is_all_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

pub fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Quotient that is 0 instead of NaN/inf for an empty denominator.
pub fn ratio(count: usize, total: usize) -> f64 {
    if total > 0 {
        count as f64 / total as f64
    } else {
        0.0
    }
}
