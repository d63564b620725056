use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    engine::PhishEngine,
    error::AppError,
    types::{PredictRequest, PredictionResult},
};

pub type AppState = Arc<PhishEngine>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict/", post(predict))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn predict(
    State(engine): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictionResult>, AppError> {
    info!("Received prediction request for url: {}", request.url);
    let result = engine.predict_url(&request.url).await?;
    Ok(Json(result))
}

pub async fn health(State(engine): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "features": engine.schema().len(),
        "model_version": engine.model_version(),
    }))
}
