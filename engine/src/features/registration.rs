use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use publicsuffix::{List, Psl};
use std::fs;
use tracing::debug;

use super::{set, set_count};
use crate::config::WhoisConfig;
use crate::error::{artifact_error, AppError};
use crate::types::{flag, FeatureMap};
use crate::whois::{LookupError, WhoisClient};

const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "registered on",
    "registration time",
    "domain registration date",
    "registered",
    "domain name commencement date",
    "record created",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%d-%b-%Y", "%d.%m.%Y", "%d/%m/%Y", "%Y%m%d",
];

/// Domain age and privacy redaction from WHOIS.
pub struct RegistrationAnalyzer {
    client: WhoisClient,
    suffixes: Option<List>,
}

impl RegistrationAnalyzer {
    /// `suffix_list` is a path to a Public Suffix List file.
    pub fn new(config: &WhoisConfig, suffix_list: Option<&str>) -> Result<Self, AppError> {
        let suffixes = match suffix_list {
            Some(path) => {
                let raw = fs::read_to_string(path)?;
                let list: List = raw
                    .parse()
                    .map_err(|e| artifact_error(format!("public suffix list {}: {}", path, e)))?;
                Some(list)
            }
            None => None,
        };

        Ok(Self {
            client: WhoisClient::new(config),
            suffixes,
        })
    }

    /// Registrable, IDNA-encoded domain of `host` (already stripped of
    /// userinfo and port).
    pub fn lookup_target(&self, host: &str) -> Result<String, LookupError> {
        let invalid = || LookupError::InvalidDomain(host.to_string());

        let ascii = idna::domain_to_ascii(host.trim_end_matches('.')).map_err(|_| invalid())?;
        if ascii.is_empty() || !ascii.contains('.') {
            return Err(invalid());
        }

        let registrable = match &self.suffixes {
            Some(list) => list
                .domain(ascii.as_bytes())
                .map(|d| String::from_utf8_lossy(d.as_bytes()).into_owned())
                .ok_or_else(invalid)?,
            None => last_two_labels(&ascii),
        };
        Ok(registrable)
    }

    pub async fn lookup(&self, host: &str) -> Result<String, LookupError> {
        let target = self.lookup_target(host)?;
        debug!(host = %host, target = %target, "Looking up registration");
        self.client.lookup(&target).await
    }
}

fn last_two_labels(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}

/// `domain_age_days` and `whois_privacy` for a finished lookup. A failed
/// lookup reads as a brand-new, privacy-shielded registration.
pub fn features_from_lookup(lookup: &Result<String, LookupError>, now: DateTime<Utc>) -> FeatureMap {
    let mut features = FeatureMap::new();

    match lookup {
        Ok(text) => {
            let age_days = creation_date(text)
                .map(|created| (now - created).num_seconds().div_euclid(86_400))
                .unwrap_or(0);
            set(&mut features, "domain_age_days", age_days as f64);
            set(
                &mut features,
                "whois_privacy",
                flag(text.contains("REDACTED FOR PRIVACY") || text.contains("Privacy")),
            );
        }
        Err(_) => {
            set_count(&mut features, "domain_age_days", 0);
            set_count(&mut features, "whois_privacy", 1);
        }
    }

    features
}

/// Earliest creation date found under any known key.
pub fn creation_date(text: &str) -> Option<DateTime<Utc>> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim().to_ascii_lowercase();
            CREATION_KEYS.contains(&key.as_str()).then(|| value.trim())
        })
        .filter_map(parse_date)
        .min()
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    parse_exact(value).or_else(|| parse_exact(value.split_whitespace().next()?))
}

fn parse_exact(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}
