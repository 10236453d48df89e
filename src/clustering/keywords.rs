//! Keyword Extraction
//!
//! Turns a (name, symbol) pair into a small keyword set used for overlap
//! scoring and topic naming.

use super::romanize::is_cjk;

/// Recurring meme stems matched anywhere in a name or symbol
pub const MEME_LEXICON: &[&str] = &[
    "pepe", "doge", "shib", "inu", "cat", "frog", "moon", "rocket", "bonk", "wojak", "chad",
    "giga", "based",
];

const MIN_KEYWORD_CHARS: usize = 2;
const MAX_CJK_RUN: usize = 4;

/// Extract keywords in first-seen order, without duplicates.
///
/// The symbol always comes first. Then name words split on separators
/// and case transitions, lexicon stems, and CJK runs of two to four
/// ideographs.
pub fn extract_keywords(name: &str, symbol: &str) -> Vec<String> {
    let mut keywords = Vec::new();

    let symbol_key: String = symbol
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    push_unique(&mut keywords, symbol_key.clone());

    for word in split_words(name) {
        if word.chars().count() >= MIN_KEYWORD_CHARS && !word.chars().any(is_cjk) {
            push_unique(&mut keywords, word);
        }
    }

    let lowered = name.to_lowercase();
    for stem in MEME_LEXICON {
        if lowered.contains(stem) || symbol_key.contains(stem) {
            push_unique(&mut keywords, stem.to_string());
        }
    }

    for run in cjk_runs(name) {
        push_unique(&mut keywords, run);
    }

    keywords
}

fn push_unique(keywords: &mut Vec<String>, word: String) {
    if !word.is_empty() && !keywords.contains(&word) {
        keywords.push(word);
    }
}

/// Split on non-alphanumerics, then on lower→upper and acronym→word boundaries
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();

    for chunk in text.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = chunk.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && c.is_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_numeric()
                    || (prev.is_uppercase() && next_is_lower)
                {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.extend(c.to_lowercase());
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words.retain(|w| !w.is_empty());
    words
}

/// CJK runs cut into chunks of at most four, dropping single leftovers
fn cjk_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Vec<char> = Vec::new();

    for c in text.chars().chain(std::iter::once(' ')) {
        if is_cjk(c) {
            current.push(c);
            continue;
        }
        for chunk in current.chunks(MAX_CJK_RUN) {
            if chunk.len() >= MIN_KEYWORD_CHARS {
                runs.push(chunk.iter().collect());
            }
        }
        current.clear();
    }

    runs
}
