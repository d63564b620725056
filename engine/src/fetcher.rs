use reqwest::{header, redirect::Policy, Client, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::charset;
use crate::config::FetchConfig;
use crate::document::Document;
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("redirect from {from} has an unusable Location: {location}")]
    BadRedirect { from: String, location: String },

    #[error("exceeded {0} redirects")]
    TooManyRedirects(usize),
}

/// One page retrieval. Lives for a single prediction request.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub final_url: String,
    /// URLs that answered with a redirect, in the order they were visited.
    pub redirect_chain: Vec<String>,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub text: String,
}

impl FetchResult {
    /// A `200 OK` page assembled from already known pieces.
    pub fn from_parts(final_url: &str, redirect_chain: Vec<String>, body: Vec<u8>, text: String) -> Self {
        Self {
            final_url: final_url.to_string(),
            redirect_chain,
            status: 200,
            content_type: None,
            body,
            text,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Parses the body. The tree is not `Send`, so build it where it is used.
    pub fn document(&self) -> Document {
        Document::parse(&charset::html_text(&self.body, self.content_type.as_deref()))
    }
}

pub struct Fetcher {
    client: Client,
    max_redirects: usize,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    /// GETs `url`, following redirects by hand so each hop is recorded. Any
    /// final status counts as a page; there are no retries.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let mut current = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let mut redirect_chain = Vec::new();

        loop {
            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if let Some(next) = redirect_target(&current, status, response.headers())? {
                if redirect_chain.len() >= self.max_redirects {
                    return Err(FetchError::TooManyRedirects(self.max_redirects));
                }
                debug!(from = %current, to = %next, status = status.as_u16(), "Following redirect");
                redirect_chain.push(current.to_string());
                current = next;
                continue;
            }

            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?.to_vec();
            let text = charset::http_text(&body, content_type.as_deref());

            debug!(
                url = %current,
                status = status.as_u16(),
                bytes = body.len(),
                redirects = redirect_chain.len(),
                "Fetched page"
            );

            return Ok(FetchResult {
                final_url: current.to_string(),
                redirect_chain,
                status: status.as_u16(),
                content_type,
                body,
                text,
            });
        }
    }
}

fn redirect_target(
    current: &Url,
    status: StatusCode,
    headers: &header::HeaderMap,
) -> Result<Option<Url>, FetchError> {
    if !matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
        return Ok(None);
    }
    let Some(location) = headers.get(header::LOCATION) else {
        return Ok(None);
    };

    let bad = || FetchError::BadRedirect {
        from: current.to_string(),
        location: String::from_utf8_lossy(location.as_bytes()).into_owned(),
    };
    let location = location.to_str().map_err(|_| bad())?;
    current.join(location).map(Some).map_err(|_| bad())
}
