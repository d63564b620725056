//! Phishing URL classification: fetch a page, derive a fixed feature vector
//! from the URL, the HTML and WHOIS, and score it with a pretrained model.

pub mod assembler;
pub mod charset;
pub mod classifier;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod features;
pub mod fetcher;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod similarity;
pub mod types;
pub mod url_parts;
pub mod whois;

pub use engine::PhishEngine;
pub use error::AppError;
