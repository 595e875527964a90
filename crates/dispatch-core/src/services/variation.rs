//! Inline content variation (`{%Hi|Hello|Hey%}`)
//!
//! Each macro is replaced by one of its options. Options are trimmed and
//! empty ones discarded; a macro left with no options stays in the text
//! verbatim so authors can spot it in previews.

use dispatch_types::{VariationAnalysis, VariationSlot};
use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use rand::Rng;
use regex::{Captures, Regex};

use crate::constants::VARIATION_PATTERN;

static VARIATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(VARIATION_PATTERN).expect("variation pattern is a valid regex"));

fn options(inner: &str) -> Vec<&str> {
    inner
        .split('|')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .collect()
}

/// Replace every macro with a uniformly random option
pub fn apply_variations(text: &str) -> String {
    apply_variations_with(text, &mut rand::rng())
}

/// Same as [`apply_variations`] with a caller-supplied RNG
pub fn apply_variations_with<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    VARIATION_RE
        .replace_all(text, |caps: &Captures| match options(&caps[1]).choose(rng) {
            Some(option) => option.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Replace every macro with its first option
pub fn first_variation(text: &str) -> String {
    VARIATION_RE
        .replace_all(text, |caps: &Captures| match options(&caps[1]).first() {
            Some(option) => option.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Number of distinct renderings the text can produce
pub fn count_variations(text: &str) -> u64 {
    VARIATION_RE
        .captures_iter(text)
        .map(|caps| options(&caps[1]).len().max(1) as u64)
        .fold(1u64, |acc, n| acc.saturating_mul(n))
}

pub fn extract_variation_slots(text: &str) -> Vec<VariationSlot> {
    VARIATION_RE
        .captures_iter(text)
        .map(|caps| {
            let opts: Vec<String> = options(&caps[1]).into_iter().map(String::from).collect();
            VariationSlot {
                raw: caps[0].to_string(),
                count: opts.len(),
                options: opts,
            }
        })
        .collect()
}

pub fn analyze(text: &str) -> VariationAnalysis {
    VariationAnalysis {
        count: count_variations(text),
        slots: extract_variation_slots(text),
    }
}
