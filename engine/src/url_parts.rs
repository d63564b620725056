//! Splits a URL into scheme, netloc, path, params, query and fragment without
//! any normalization. Feature values are computed over these raw pieces, so
//! the rules here follow the splitter the model's training data came from
//! rather than WHATWG parsing (`url::Url` lowercases hosts, drops default
//! ports and percent-encodes, which would shift lengths and counts).

use thiserror::Error;

const SCHEME_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+-.";

const USES_PARAMS: &[&str] = &[
    "", "ftp", "hdl", "prospero", "http", "imap", "https", "shttp", "rtsp", "rtsps", "rtspu",
    "sip", "sips", "mms", "sftp", "tel",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("Invalid IPv6 URL: unbalanced brackets in {0:?}")]
    InvalidIpv6(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub params: String,
    pub query: String,
    pub fragment: String,
}

impl UrlParts {
    pub fn split(url: &str) -> Result<Self, SplitError> {
        let cleaned: String = url
            .trim_start_matches(|c: char| c <= ' ')
            .chars()
            .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
            .collect();

        let mut parts = UrlParts::default();
        let mut rest: &str = &cleaned;

        if let Some(i) = rest.find(':') {
            let candidate = &rest[..i];
            let starts_alpha = candidate
                .chars()
                .next()
                .map(|c| c.is_ascii_alphabetic())
                .unwrap_or(false);
            if i > 0 && starts_alpha && candidate.chars().all(|c| SCHEME_CHARS.contains(c)) {
                parts.scheme = candidate.to_ascii_lowercase();
                rest = &rest[i + 1..];
            }
        }

        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            parts.netloc = after[..end].to_string();
            rest = &after[end..];
            let opens = parts.netloc.contains('[');
            let closes = parts.netloc.contains(']');
            if opens != closes {
                return Err(SplitError::InvalidIpv6(parts.netloc));
            }
        }

        if let Some((before, fragment)) = rest.split_once('#') {
            parts.fragment = fragment.to_string();
            rest = before;
        }
        if let Some((before, query)) = rest.split_once('?') {
            parts.query = query.to_string();
            rest = before;
        }

        if USES_PARAMS.contains(&parts.scheme.as_str()) && rest.contains(';') {
            let (path, params) = split_params(rest);
            parts.path = path.to_string();
            parts.params = params.to_string();
        } else {
            parts.path = rest.to_string();
        }

        Ok(parts)
    }

    /// Netloc without userinfo and port, lowercased.
    pub fn hostname(&self) -> String {
        let host = self
            .netloc
            .rsplit_once('@')
            .map(|(_, h)| h)
            .unwrap_or(&self.netloc);

        let host = if let Some(bracketed) = host.strip_prefix('[') {
            bracketed.split(']').next().unwrap_or_default()
        } else {
            host.split(':').next().unwrap_or_default()
        };

        host.to_lowercase()
    }
}

// Params belong to the last path segment only.
fn split_params(path: &str) -> (&str, &str) {
    let search_from = path.rfind('/').unwrap_or(0);
    match path[search_from..].find(';') {
        Some(offset) => {
            let i = search_from + offset;
            (&path[..i], &path[i + 1..])
        }
        None => (path, ""),
    }
}
