use std::{sync::Arc, time::Instant};
use tracing::{info, info_span, Instrument};
use url::Url;
use uuid::Uuid;

use crate::{
    classifier::Classifier,
    config::Config,
    error::{validation_error, AppError},
    pipeline::FeaturePipeline,
    schema::FeatureSchema,
    types::{FeatureVector, PredictionResult},
};

/// Everything a prediction needs, built once at startup and shared read-only.
pub struct PhishEngine {
    pipeline: FeaturePipeline,
    classifier: Classifier,
    schema: Arc<FeatureSchema>,
}

impl PhishEngine {
    /// Loads the schema and classifier artifact. Any failure here is fatal for
    /// the service.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        info!("Initializing phish engine...");

        let schema = Arc::new(FeatureSchema::load(&config.schema_path)?);
        let classifier = Classifier::load(&config.model_path, &schema)?;
        let pipeline = FeaturePipeline::new(config, Arc::clone(&schema))?;

        info!(
            features = schema.len(),
            model_version = %classifier.version(),
            on_fetch_failure = ?config.on_fetch_failure,
            "Phish engine initialized"
        );

        Ok(Self {
            pipeline,
            classifier,
            schema,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    pub async fn predict_url(&self, url: &str) -> Result<PredictionResult, AppError> {
        validate_url(url)?;

        let request_id = Uuid::new_v4();
        let span = info_span!("predict", %request_id, url = %url);

        async {
            let start = Instant::now();

            let features = self.pipeline.extract(url).await;
            let result = self.classify(url, &features)?;

            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            metrics::counter!("predictions_total", "verdict" => result.result.clone()).increment(1);
            metrics::histogram!("prediction_duration_ms").record(elapsed_ms);

            info!(
                verdict = %result.result,
                elapsed_ms,
                "Prediction complete"
            );
            Ok::<_, AppError>(result)
        }
        .instrument(span)
        .await
    }

    pub fn classify(&self, url: &str, features: &FeatureVector) -> Result<PredictionResult, AppError> {
        let prediction = self.classifier.evaluate(features)?;
        tracing::debug!(
            phishing_probability = prediction.phishing_probability,
            all_zero = features.is_all_zero(),
            "Classifier output"
        );
        Ok(PredictionResult::new(url, prediction.verdict))
    }
}

/// Only absolute http(s) URLs can be fetched.
fn validate_url(url: &str) -> Result<(), AppError> {
    if url.trim().is_empty() {
        return Err(validation_error("url must not be empty"));
    }
    let parsed = Url::parse(url).map_err(|e| AppError::InvalidInput(format!("malformed url: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::InvalidInput(format!("unsupported url scheme: {}", other))),
    }
}
