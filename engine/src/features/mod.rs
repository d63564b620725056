//! Per-source feature analyzers. Each one fills a [`FeatureMap`] with canonical
//! names only; aliases are copied in by the assembler.

pub mod content;
pub mod lexical;
pub mod registration;

use crate::types::FeatureMap;

pub(crate) fn set(features: &mut FeatureMap, name: &str, value: f64) {
    features.insert(name.to_string(), value);
}

pub(crate) fn set_count(features: &mut FeatureMap, name: &str, count: usize) {
    features.insert(name.to_string(), count as f64);
}
