use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    assembler::FeatureAssembler,
    config::{Config, FetchFailurePolicy},
    error::AppError,
    features::{content, lexical, registration::{self, RegistrationAnalyzer}},
    fetcher::{FetchError, FetchResult, Fetcher},
    schema::FeatureSchema,
    types::FeatureVector,
    url_parts::UrlParts,
    whois::LookupError,
};

/// URL in, schema-ordered feature vector out. Never fails: anything that goes
/// wrong on the network degrades to default values.
pub struct FeaturePipeline {
    fetcher: Fetcher,
    registration: RegistrationAnalyzer,
    schema: Arc<FeatureSchema>,
    on_fetch_failure: FetchFailurePolicy,
}

impl FeaturePipeline {
    pub fn new(config: &Config, schema: Arc<FeatureSchema>) -> Result<Self, AppError> {
        Ok(Self {
            fetcher: Fetcher::new(&config.fetch)?,
            registration: RegistrationAnalyzer::new(&config.whois, config.public_suffix_list.as_deref())?,
            schema,
            on_fetch_failure: config.on_fetch_failure,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub async fn extract(&self, url: &str) -> FeatureVector {
        let parts = match UrlParts::split(url) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(url = %url, error = %e, "Cannot split URL; using fallback vector");
                metrics::counter!("fetch_failures_total").increment(1);
                return self.fallback(url, None);
            }
        };

        let host = parts.hostname();
        // A failed fetch cancels the WHOIS lookup still in flight.
        let lookup = async { Ok::<_, FetchError>(self.registration.lookup(&host).await) };
        let (page, lookup) = match tokio::try_join!(self.fetcher.fetch(url), lookup) {
            Ok(both) => both,
            Err(e) => {
                warn!(url = %url, error = %e, "Fetch failed; using fallback vector");
                metrics::counter!("fetch_failures_total").increment(1);
                return self.fallback(url, Some(&parts));
            }
        };

        if let Err(e) = &lookup {
            warn!(host = %host, error = %e, "WHOIS lookup failed; assuming new private registration");
            metrics::counter!("whois_failures_total").increment(1);
        }

        self.assemble(url, &parts, &page, &lookup, Utc::now())
    }

    /// Runs every analyzer over an already fetched page. Deterministic for a
    /// fixed `now`.
    pub fn assemble(
        &self,
        url: &str,
        parts: &UrlParts,
        page: &FetchResult,
        lookup: &Result<String, LookupError>,
        now: DateTime<Utc>,
    ) -> FeatureVector {
        let document = page.document();

        let mut assembler = FeatureAssembler::new(&self.schema);
        assembler
            .merge("lexical", lexical::analyze(url, parts))
            .merge("content", content::analyze(&document, page, url, &parts.netloc))
            .merge("registration", registration::features_from_lookup(lookup, now));

        let vector = assembler.finish();
        debug!(url = %url, features = vector.len(), "Assembled feature vector");
        vector
    }

    fn fallback(&self, url: &str, parts: Option<&UrlParts>) -> FeatureVector {
        match (self.on_fetch_failure, parts) {
            (FetchFailurePolicy::Lexical, Some(parts)) => {
                let mut assembler = FeatureAssembler::new(&self.schema);
                assembler.merge("lexical", lexical::analyze(url, parts));
                assembler.finish()
            }
            _ => FeatureVector::zeros(self.schema.len()),
        }
    }
}
