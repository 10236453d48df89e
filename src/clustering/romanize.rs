//! Romanization for CJK names
//!
//! Hanzi are mapped to tone-free pinyin syllables. Any other character is
//! passed through unchanged so mixed names stay comparable.

use pinyin::ToPinyin;

/// First and last code points treated as CJK ideographs
pub const CJK_START: char = '\u{4e00}';
pub const CJK_END: char = '\u{9fff}';

pub fn is_cjk(c: char) -> bool {
    (CJK_START..=CJK_END).contains(&c)
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Romanized forms of a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Romanized {
    /// Concatenated tone-free syllables, e.g. "suolala"
    pub syllables: String,
    /// First letter of each syllable, e.g. "sll"
    pub initials: String,
}

pub fn romanize(text: &str) -> Romanized {
    let mut syllables = String::with_capacity(text.len() * 3);
    let mut initials = String::with_capacity(text.len());

    for c in text.chars() {
        match c.to_pinyin() {
            Some(pinyin) => {
                syllables.push_str(pinyin.plain());
                initials.push_str(pinyin.first_letter());
            }
            None => {
                syllables.push(c);
                initials.push(c);
            }
        }
    }

    Romanized { syllables, initials }
}
