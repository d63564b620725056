//! Ratcliff/Obershelp similarity over Unicode scalar values.
//!
//! Title match scores were produced at training time with the classic
//! "longest matching blocks" algorithm, including its automatic junk rule:
//! when the second sequence has 200 or more elements, any element occurring
//! more than `len / 100 + 1` times is left out of the match index (matches can
//! still grow across such elements when extending a block).

use difflib::sequencematcher::SequenceMatcher;

/// `2 * matched / (len(a) + len(b))`, counted in characters; `1.0` for two
/// empty strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // The crate's own ratio is single precision.
    let mut matcher = SequenceMatcher::new(a.as_slice(), b.as_slice());
    let matched: usize = matcher.get_matching_blocks().iter().map(|m| m.size).sum();
    2.0 * matched as f64 / total as f64
}
