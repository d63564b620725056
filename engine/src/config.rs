use serde::Deserialize;
use std::{env, time::Duration};

use crate::error::AppError;

const DEFAULT_CONFIG_FILE: &str = "phish-engine.toml";

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub model_path: String,
    pub schema_path: String,
    /// Path to a `public_suffix_list.dat`; without it WHOIS targets fall back
    /// to the last two host labels.
    pub public_suffix_list: Option<String>,
    pub on_fetch_failure: FetchFailurePolicy,
    pub fetch: FetchConfig,
    pub whois: WhoisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhoisConfig {
    pub timeout_secs: u64,
    pub port: u16,
    pub root_server: String,
    /// Skips IANA referral and asks this server directly.
    pub server: Option<String>,
}

/// What the pipeline emits when the page itself cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Every slot 0, matching the extractor the model was trained with.
    #[default]
    Zero,
    /// URL-only features filled in, everything else 0.
    Lexical,
}

impl Config {
    /// Defaults, then `phish-engine.toml` (or `$PHISH_CONFIG`), then `PHISH_*`
    /// environment variables, e.g. `PHISH_FETCH__TIMEOUT_SECS=5`.
    pub fn load() -> Result<Self, AppError> {
        let file = env::var("PHISH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let settings = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:8000")?
            .set_default("model_path", "models/phish_detector.json")?
            .set_default("schema_path", "models/feature_columns.json")?
            .set_default("on_fetch_failure", "zero")?
            .set_default("fetch.timeout_secs", 10)?
            .set_default("fetch.max_redirects", 30)?
            .set_default("fetch.user_agent", BROWSER_USER_AGENT)?
            .set_default("whois.timeout_secs", 10)?
            .set_default("whois.port", 43)?
            .set_default("whois.root_server", "whois.iana.org")?
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("PHISH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 30,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl WhoisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            port: 43,
            root_server: "whois.iana.org".to_string(),
            server: None,
        }
    }
}
