//! Similarity Engine
//!
//! Relatedness score in [0, 1] between two (name, symbol) pairs.
//!
//! Two scoring paths:
//! - Literal: symbol and name bigram similarity, keyword overlap and
//!   substring containment.
//! - Phonetic: taken when either name contains CJK ideographs. Names are
//!   romanized and compared by sound, then blended with the raw literal
//!   similarity and containment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::keywords::extract_keywords;
use super::romanize::{contains_cjk, is_cjk, romanize};

/// Literal path weights
const SYMBOL_WEIGHT: f64 = 0.5;
const NAME_WEIGHT: f64 = 0.3;
const KEYWORD_WEIGHT: f64 = 0.15;
const LITERAL_CONTAINMENT_WEIGHT: f64 = 0.05;

/// Phonetic path weights
const PINYIN_WEIGHT: f64 = 0.7;
const RAW_WEIGHT: f64 = 0.2;
const PHONETIC_CONTAINMENT_WEIGHT: f64 = 0.1;
const SYLLABLE_WEIGHT: f64 = 0.8;
const INITIALS_WEIGHT: f64 = 0.2;

/// Which scoring path produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringPath {
    Literal,
    Phonetic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScore {
    pub value: f64,
    pub path: ScoringPath,
}

/// Lowercase and keep only alphanumerics and CJK ideographs
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || is_cjk(*c))
        .collect()
}

/// Dice coefficient over character bigrams, whitespace ignored
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for pair in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2 * intersection) as f64 / (a.len() + b.len() - 2) as f64
}

/// Shorter-to-longer length ratio when one string contains the other
pub fn containment_bonus(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    let (shorter, longer, short_len, long_len) = if a_len <= b_len {
        (a, b, a_len, b_len)
    } else {
        (b, a, b_len, a_len)
    };
    if longer.contains(shorter) {
        short_len as f64 / long_len as f64
    } else {
        0.0
    }
}

/// |A ∩ B| / min(|A|, |B|)
pub fn keyword_overlap(a: &[String], b: &[String]) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.iter().filter(|k| b.contains(k)).count();
    shared as f64 / smaller as f64
}

/// Stateless scorer for (name, symbol) pairs
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityEngine;

impl SimilarityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score two tokens in [0, 1]
    pub fn score(&self, name_a: &str, symbol_a: &str, name_b: &str, symbol_b: &str) -> f64 {
        self.score_detailed(name_a, symbol_a, name_b, symbol_b).value
    }

    /// Score plus the path used, so callers can pick a matching threshold
    pub fn score_detailed(
        &self,
        name_a: &str,
        symbol_a: &str,
        name_b: &str,
        symbol_b: &str,
    ) -> SimilarityScore {
        let norm_name_a = normalize(name_a);
        let norm_name_b = normalize(name_b);

        if contains_cjk(&norm_name_a) || contains_cjk(&norm_name_b) {
            return SimilarityScore {
                value: self.phonetic_score(&norm_name_a, &norm_name_b),
                path: ScoringPath::Phonetic,
            };
        }

        let value = if !norm_name_a.is_empty() && norm_name_a == norm_name_b {
            1.0
        } else {
            self.literal_score(name_a, symbol_a, name_b, symbol_b, &norm_name_a, &norm_name_b)
        };

        SimilarityScore {
            value: value.clamp(0.0, 1.0),
            path: ScoringPath::Literal,
        }
    }

    fn literal_score(
        &self,
        name_a: &str,
        symbol_a: &str,
        name_b: &str,
        symbol_b: &str,
        norm_name_a: &str,
        norm_name_b: &str,
    ) -> f64 {
        let symbol_sim = dice_coefficient(&normalize(symbol_a), &normalize(symbol_b));
        let name_sim = dice_coefficient(norm_name_a, norm_name_b);
        let keywords = keyword_overlap(
            &extract_keywords(name_a, symbol_a),
            &extract_keywords(name_b, symbol_b),
        );
        let containment = containment_bonus(norm_name_a, norm_name_b);

        SYMBOL_WEIGHT * symbol_sim
            + NAME_WEIGHT * name_sim
            + KEYWORD_WEIGHT * keywords
            + LITERAL_CONTAINMENT_WEIGHT * containment
    }

    fn phonetic_score(&self, norm_name_a: &str, norm_name_b: &str) -> f64 {
        if norm_name_a.is_empty() || norm_name_b.is_empty() {
            return 0.0;
        }
        if norm_name_a == norm_name_b {
            return 1.0;
        }

        let roman_a = romanize(norm_name_a);
        let roman_b = romanize(norm_name_b);
        let pinyin = SYLLABLE_WEIGHT * dice_coefficient(&roman_a.syllables, &roman_b.syllables)
            + INITIALS_WEIGHT * dice_coefficient(&roman_a.initials, &roman_b.initials);
        let raw = dice_coefficient(norm_name_a, norm_name_b);
        let containment = containment_bonus(norm_name_a, norm_name_b);

        let score =
            PINYIN_WEIGHT * pinyin + RAW_WEIGHT * raw + PHONETIC_CONTAINMENT_WEIGHT * containment;
        score.clamp(0.0, 1.0)
    }
}
