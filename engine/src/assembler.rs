use tracing::warn;

use crate::schema::FeatureSchema;
use crate::types::{FeatureMap, FeatureVector};

/// Canonical name → the second name the trained schema also knows it by.
pub const ALIASES: &[(&str, &str)] = &[
    ("url_len", "URLLength"),
    ("domain_len", "DomainLength"),
    ("has_ip_in_domain", "IsDomainIP"),
    ("num_subdomains", "NoOfSubDomain"),
    ("is_https", "IsHTTPS"),
    ("num_digits", "NoOfDegitsInURL"),
    ("domain_title_match_score", "DomainTitleMatchScore"),
    ("num_iframes", "NoOfiFrame"),
    ("num_css_links", "NoOfCSS"),
    ("num_js_tags", "NoOfJS"),
    ("has_submit_button", "HasSubmitButton"),
    ("has_password_field", "HasPasswordField"),
];

/// Collects analyzer output for one URL and lays it out in schema order.
pub struct FeatureAssembler<'a> {
    schema: &'a FeatureSchema,
    merged: FeatureMap,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        Self {
            schema,
            merged: FeatureMap::new(),
        }
    }

    /// Adds one analyzer's map. A name already present keeps its first value.
    pub fn merge(&mut self, source: &str, partial: FeatureMap) -> &mut Self {
        for (name, value) in partial {
            match self.merged.get(&name) {
                Some(existing) => {
                    if *existing != value {
                        warn!(
                            feature = %name,
                            source = source,
                            kept = *existing,
                            dropped = value,
                            "Conflicting feature value"
                        );
                    }
                }
                None => {
                    self.merged.insert(name, value);
                }
            }
        }
        self
    }

    pub fn finish(mut self) -> FeatureVector {
        for (canonical, alias) in ALIASES {
            if let Some(value) = self.merged.get(*canonical).copied() {
                self.merged.entry(alias.to_string()).or_insert(value);
            }
        }

        let values = self
            .schema
            .names()
            .iter()
            .map(|name| self.merged.get(name).copied().unwrap_or(0.0))
            .collect();
        FeatureVector::new(values)
    }
}
