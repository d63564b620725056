use once_cell::sync::Lazy;
use regex::Regex;
use unicode_general_category::{get_general_category, GeneralCategory};

use super::{set, set_count};
use crate::types::{flag, ratio, FeatureMap};
use crate::url_parts::UrlParts;

static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[@_!#$%^&*()<>?/\\|}{~:]").expect("valid special-char class"));

static OTHER_SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9@._\-]").expect("valid other-char class"));

static DOTTED_QUAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("valid dotted-quad pattern")
});

/// Characters outside `Nd` whose numeric type is still "digit": superscripts,
/// subscripts, circled and parenthesized digits, and a few historic scripts.
const DIGIT_EXTRAS: &[(char, char)] = &[
    ('\u{b2}', '\u{b3}'),
    ('\u{b9}', '\u{b9}'),
    ('\u{1369}', '\u{1371}'),
    ('\u{19da}', '\u{19da}'),
    ('\u{2070}', '\u{2070}'),
    ('\u{2074}', '\u{2079}'),
    ('\u{2080}', '\u{2089}'),
    ('\u{2460}', '\u{2468}'),
    ('\u{2474}', '\u{247c}'),
    ('\u{2488}', '\u{2490}'),
    ('\u{24ea}', '\u{24ea}'),
    ('\u{24f5}', '\u{24fd}'),
    ('\u{24ff}', '\u{24ff}'),
    ('\u{2776}', '\u{277e}'),
    ('\u{2780}', '\u{2788}'),
    ('\u{278a}', '\u{2792}'),
    ('\u{10a40}', '\u{10a43}'),
    ('\u{10e60}', '\u{10e68}'),
    ('\u{11052}', '\u{1105a}'),
    ('\u{1f100}', '\u{1f10a}'),
];

/// Decimal digits plus the digit-typed extras. Fractions, Roman numerals and
/// other numeric symbols do not count.
fn is_digit(c: char) -> bool {
    matches!(get_general_category(c), GeneralCategory::DecimalNumber)
        || DIGIT_EXTRAS.iter().any(|&(lo, hi)| (lo..=hi).contains(&c))
}

/// Any letter category (`Lu`, `Ll`, `Lt`, `Lm`, `Lo`). Combining marks are not
/// letters.
fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

/// URL-only features. Needs no network and never fails.
pub fn analyze(url: &str, parts: &UrlParts) -> FeatureMap {
    let mut features = FeatureMap::new();
    let netloc = parts.netloc.as_str();

    let url_len = url.chars().count();
    let num_digits = url.chars().filter(|&c| is_digit(c)).count();
    let num_letters = url.chars().filter(|&c| is_letter(c)).count();
    let num_percent = url.matches('%').count();
    let num_other_special = OTHER_SPECIAL_CHARS.find_iter(url).count();

    set_count(&mut features, "url_len", url_len);
    set_count(&mut features, "domain_len", netloc.chars().count());
    set_count(&mut features, "path_len", parts.path.chars().count());
    set_count(&mut features, "num_subdomains", netloc.matches('.').count());
    set_count(&mut features, "num_digits", num_digits);
    set_count(&mut features, "num_special_chars", SPECIAL_CHARS.find_iter(url).count());
    set(&mut features, "has_ip_in_domain", flag(DOTTED_QUAD.is_match(netloc)));
    set(&mut features, "is_https", flag(parts.scheme == "https"));

    set_count(&mut features, "TLDLength", tld_len(netloc));
    set(&mut features, "HasObfuscation", flag(num_percent > 0));
    set_count(&mut features, "NoOfObfuscatedChar", num_percent);
    set(&mut features, "ObfuscationRatio", ratio(num_percent, url_len));
    set_count(&mut features, "NoOfLettersInURL", num_letters);
    set(&mut features, "LetterRatioInURL", ratio(num_letters, url_len));
    set(&mut features, "DegitRatioInURL", ratio(num_digits, url_len));
    set_count(&mut features, "NoOfEqualsInURL", url.matches('=').count());
    set_count(&mut features, "NoOfQMarkInURL", url.matches('?').count());
    set_count(&mut features, "NoOfAmpersandInURL", url.matches('&').count());
    set_count(&mut features, "NoOfOtherSpecialCharsInURL", num_other_special);
    set(&mut features, "SpacialCharRatioInURL", ratio(num_other_special, url_len));

    features
}

// Last dot-separated label of the raw netloc, port included.
fn tld_len(netloc: &str) -> usize {
    netloc.rsplit('.').next().unwrap_or_default().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(url: &str) -> FeatureMap {
        analyze(url, &UrlParts::split(url).unwrap())
    }

    #[test]
    fn test_plain_https_url() {
        let f = lex("https://example.com");
        assert_eq!(f["url_len"], 19.0);
        assert_eq!(f["domain_len"], 11.0);
        assert_eq!(f["path_len"], 0.0);
        assert_eq!(f["num_subdomains"], 1.0);
        assert_eq!(f["num_special_chars"], 3.0);
        assert_eq!(f["has_ip_in_domain"], 0.0);
        assert_eq!(f["is_https"], 1.0);
        assert_eq!(f["TLDLength"], 3.0);
        assert_eq!(f["NoOfLettersInURL"], 15.0);
        assert_eq!(f["LetterRatioInURL"], 15.0 / 19.0);
        assert_eq!(f["NoOfOtherSpecialCharsInURL"], 3.0);
        assert_eq!(f["SpacialCharRatioInURL"], 3.0 / 19.0);
    }

    #[test]
    fn test_ip_host_with_query() {
        let f = lex("https://192.168.0.1/login.php?id=5&x=1");
        assert_eq!(f["url_len"], 38.0);
        assert_eq!(f["path_len"], 10.0);
        assert_eq!(f["num_subdomains"], 3.0);
        assert_eq!(f["num_digits"], 10.0);
        assert_eq!(f["num_special_chars"], 6.0);
        assert_eq!(f["has_ip_in_domain"], 1.0);
        assert_eq!(f["TLDLength"], 1.0);
        assert_eq!(f["DegitRatioInURL"], 10.0 / 38.0);
        assert_eq!(f["NoOfEqualsInURL"], 2.0);
        assert_eq!(f["NoOfQMarkInURL"], 1.0);
        assert_eq!(f["NoOfAmpersandInURL"], 1.0);
        assert_eq!(f["NoOfOtherSpecialCharsInURL"], 8.0);
    }

    #[test]
    fn test_obfuscated_url_with_port() {
        let url = "http://pay-pal.secure%20login.example.co.uk:8080/~acct/verify?user=a&b=c";
        let f = lex(url);
        assert_eq!(f["url_len"], 72.0);
        assert_eq!(f["domain_len"], 41.0);
        assert_eq!(f["path_len"], 13.0);
        assert_eq!(f["num_subdomains"], 4.0);
        assert_eq!(f["num_special_chars"], 10.0);
        assert_eq!(f["is_https"], 0.0);
        assert_eq!(f["TLDLength"], 7.0);
        assert_eq!(f["HasObfuscation"], 1.0);
        assert_eq!(f["NoOfObfuscatedChar"], 1.0);
        assert_eq!(f["ObfuscationRatio"], 1.0 / 72.0);
        assert_eq!(f["NoOfLettersInURL"], 49.0);
        assert_eq!(f["NoOfOtherSpecialCharsInURL"], 12.0);
    }

    #[test]
    fn test_vowel_signs_and_fractions_are_not_counted() {
        let f = lex("https://xn.test/का½");
        assert_eq!(f["url_len"], 19.0);
        assert_eq!(f["NoOfLettersInURL"], 12.0);
        assert_eq!(f["num_digits"], 0.0);
        assert_eq!(f["DegitRatioInURL"], 0.0);
    }

    #[test]
    fn test_superscript_and_non_latin_digits_count() {
        let f = lex("https://a.test/x²٣Ⅻ");
        assert_eq!(f["num_digits"], 2.0);
        assert_eq!(f["NoOfLettersInURL"], 11.0);
    }

    #[test]
    fn test_character_classes() {
        for c in ['7', '٣', '²', '₉', '①', '⑴', '⒈', '❶'] {
            assert!(is_digit(c), "{c}");
        }
        for c in ['½', 'Ⅻ', '〇', 'a', '%'] {
            assert!(!is_digit(c), "{c}");
        }
        for c in ['a', 'Z', 'ǅ', 'ʰ', 'क', '中'] {
            assert!(is_letter(c), "{c}");
        }
        for c in ['ा', '\u{301}', 'Ⅻ', '7', '_'] {
            assert!(!is_letter(c), "{c}");
        }
    }

    #[test]
    fn test_empty_url_has_zero_ratios() {
        let f = lex("");
        for name in [
            "ObfuscationRatio",
            "LetterRatioInURL",
            "DegitRatioInURL",
            "SpacialCharRatioInURL",
        ] {
            assert_eq!(f[name], 0.0, "{name}");
            assert!(f[name].is_finite());
        }
        assert_eq!(f["url_len"], 0.0);
        assert_eq!(f["TLDLength"], 0.0);
    }

    #[test]
    fn test_only_canonical_names_are_emitted() {
        let f = lex("https://example.com");
        assert!(!f.contains_key("URLLength"));
        assert!(!f.contains_key("IsHTTPS"));
        assert_eq!(f.len(), 20);
    }
}
