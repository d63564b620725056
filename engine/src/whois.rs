//! Plain WHOIS (RFC 3912) client: ask IANA which server handles the TLD, ask
//! that server, then follow one registrar referral when the registry is thin.

use std::time::Duration;
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use crate::config::WhoisConfig;

const MAX_RESPONSE_BYTES: u64 = 1 << 20;

const NOT_FOUND_MARKERS: &[&str] = &[
    "No match for",
    "No whois server is known",
    "NOT FOUND",
];

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("WHOIS lookup for {0} timed out")]
    Timeout(String),

    #[error("WHOIS connection to {server} failed: {source}")]
    Io {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no WHOIS server known for {0}")]
    NoServer(String),

    #[error("no registration record for {0}")]
    NotFound(String),

    #[error("cannot derive a registrable domain from {0:?}")]
    InvalidDomain(String),
}

#[derive(Debug, Clone)]
pub struct WhoisClient {
    root_server: String,
    fixed_server: Option<String>,
    port: u16,
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(config: &WhoisConfig) -> Self {
        Self {
            root_server: config.root_server.clone(),
            fixed_server: config.server.clone(),
            port: config.port,
            timeout: config.timeout(),
        }
    }

    /// Raw record text for `domain`, bounded by the configured timeout as a
    /// whole (referral hops included).
    pub async fn lookup(&self, domain: &str) -> Result<String, LookupError> {
        timeout(self.timeout, self.lookup_inner(domain))
            .await
            .map_err(|_| LookupError::Timeout(domain.to_string()))?
    }

    async fn lookup_inner(&self, domain: &str) -> Result<String, LookupError> {
        if let Some(server) = &self.fixed_server {
            let text = self.query(server, domain).await?;
            return check_found(domain, text);
        }

        let tld = domain.rsplit('.').next().unwrap_or(domain);
        let iana = self.query(&self.root_server, tld).await?;
        let registry = referral(&iana, &["refer:", "whois:"])
            .ok_or_else(|| LookupError::NoServer(domain.to_string()))?;

        let mut text = self.query(&registry, domain).await?;
        if let Some(registrar) = referral(&text, &["Registrar WHOIS Server:", "ReferralServer:"]) {
            let registrar = registrar.trim_start_matches("whois://").to_string();
            if !registrar.eq_ignore_ascii_case(&registry) {
                match self.query(&registrar, domain).await {
                    Ok(detail) => {
                        text.push('\n');
                        text.push_str(&detail);
                    }
                    Err(e) => debug!(registrar = %registrar, error = %e, "Registrar referral failed"),
                }
            }
        }

        check_found(domain, text)
    }

    async fn query(&self, server: &str, query: &str) -> Result<String, LookupError> {
        let io_err = |source| LookupError::Io {
            server: server.to_string(),
            source,
        };

        debug!(server = %server, query = %query, "WHOIS query");
        let mut stream = TcpStream::connect((server, self.port)).await.map_err(io_err)?;
        stream
            .write_all(format!("{}\r\n", query).as_bytes())
            .await
            .map_err(io_err)?;

        let mut raw = Vec::new();
        stream
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut raw)
            .await
            .map_err(io_err)?;

        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

fn check_found(domain: &str, text: String) -> Result<String, LookupError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || NOT_FOUND_MARKERS.iter().any(|m| trimmed.contains(m)) {
        return Err(LookupError::NotFound(domain.to_string()));
    }
    Ok(text)
}

/// Value of the first line starting with one of `keys` (case-insensitive).
fn referral(text: &str, keys: &[&str]) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.trim();
        keys.iter().find_map(|key| {
            let head = line.get(..key.len())?;
            if !head.eq_ignore_ascii_case(key) {
                return None;
            }
            let value = line[key.len()..].trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    })
}
