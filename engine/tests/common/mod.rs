#![allow(dead_code)]

use axum::{response::{Html, Redirect}, routing::get, Router};
use std::{fs, path::PathBuf};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use phish_engine::{config::Config, schema::FeatureSchema};

pub const LOGIN_PAGE: &str = include_str!("../fixtures/login.html");

pub const SCHEMA_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../models/feature_columns.json");

pub fn schema() -> FeatureSchema {
    FeatureSchema::load(SCHEMA_PATH).unwrap()
}

/// Serves `/start` → `/mid` → `/final` (the login fixture) and `/plain`.
pub async fn spawn_site() -> String {
    let app = Router::new()
        .route("/start", get(|| async { Redirect::temporary("/mid") }))
        .route("/mid", get(|| async { Redirect::permanent("/final") }))
        .route("/final", get(|| async { Html(LOGIN_PAGE) }))
        .route("/plain", get(|| async { Html("<html><body><p>nothing here</p></body></html>") }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Answers every WHOIS query with `response`.
pub async fn spawn_whois(response: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut query = [0u8; 512];
                let _ = socket.read(&mut query).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    port
}

/// Accepts WHOIS connections and never answers.
pub async fn spawn_silent_whois() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    port
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn config(whois_port: u16) -> Config {
    let mut config = Config::load().unwrap();
    config.schema_path = SCHEMA_PATH.to_string();
    config.fetch.timeout_secs = 5;
    config.whois.timeout_secs = 5;
    config.whois.server = Some("127.0.0.1".to_string());
    config.whois.port = whois_port;
    config
}

/// Writes a logistic artifact over the shipped schema that flags a page as
/// phishing exactly when it has a password field.
pub fn write_password_model() -> PathBuf {
    let names = schema().names().to_vec();
    let coef: Vec<f64> = names
        .iter()
        .map(|n| if n == "has_password_field" { 1.0 } else { 0.0 })
        .collect();
    let artifact = serde_json::json!({
        "version": "password-rule",
        "feature_columns": names,
        "estimator": {"type": "logistic", "intercept": -0.5, "coef": coef}
    });

    let path = std::env::temp_dir().join(format!("phish-model-{}.json", uuid::Uuid::new_v4()));
    fs::write(&path, artifact.to_string()).unwrap();
    path
}
