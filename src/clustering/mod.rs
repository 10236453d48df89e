//! Clustering - name similarity and greedy token grouping
//!
//! - `similarity`: literal and phonetic (name, symbol) scoring
//! - `romanize`: pinyin romanization of CJK names
//! - `keywords`: keyword extraction shared by scoring and topic naming
//! - `builder`: seed-based grouping with a minimum cluster size

pub mod similarity;
pub mod romanize;
pub mod keywords;
pub mod builder;

pub use similarity::{normalize, ScoringPath, SimilarityEngine, SimilarityScore};
pub use romanize::{contains_cjk, romanize, Romanized};
pub use keywords::{extract_keywords, MEME_LEXICON};
pub use builder::{rank_keywords, Cluster, ClusterBuilder, ClusterConfig};
