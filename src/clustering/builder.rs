//! Cluster Builder
//!
//! Greedy seed-based grouping of a token batch. Each unclustered token in
//! arrival order seeds a cluster and absorbs every later unclustered token
//! scoring at or above the threshold against the seed. Groups below the
//! minimum size are dropped.

use serde::{Deserialize, Serialize};

use crate::domain::TokenRecord;

use super::keywords::extract_keywords;
use super::similarity::{ScoringPath, SimilarityEngine};

/// Clustering parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Threshold for pairs scored on the literal path
    pub literal_threshold: f64,
    /// Threshold for pairs scored on the phonetic path
    pub phonetic_threshold: f64,
    /// Smallest cluster that is kept
    pub min_cluster_size: usize,
    /// Largest batch clustered in one pass
    pub max_batch_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            literal_threshold: 0.55,
            phonetic_threshold: 0.60,
            min_cluster_size: 3,
            max_batch_size: 50,
        }
    }
}

impl ClusterConfig {
    pub fn threshold_for(&self, path: ScoringPath) -> f64 {
        match path {
            ScoringPath::Literal => self.literal_threshold,
            ScoringPath::Phonetic => self.phonetic_threshold,
        }
    }
}

/// Transient group of related tokens from one pass
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Members in arrival order; the first is the seed
    pub members: Vec<TokenRecord>,
    /// Member keywords ranked by frequency, ties by first appearance
    pub keywords: Vec<String>,
    /// Mean score of the non-seed members against the seed
    pub confidence: f64,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn seed(&self) -> Option<&TokenRecord> {
        self.members.first()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterBuilder {
    engine: SimilarityEngine,
    config: ClusterConfig,
}

impl ClusterBuilder {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            engine: SimilarityEngine::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Partition `tokens` into clusters of at least `min_cluster_size`
    pub fn build(&self, tokens: &[TokenRecord]) -> Vec<Cluster> {
        let mut consumed = vec![false; tokens.len()];
        let mut clusters = Vec::new();

        for seed_idx in 0..tokens.len() {
            if consumed[seed_idx] {
                continue;
            }
            consumed[seed_idx] = true;
            let seed = &tokens[seed_idx];

            let mut members = vec![seed.clone()];
            let mut scores = Vec::new();

            for idx in (seed_idx + 1)..tokens.len() {
                if consumed[idx] {
                    continue;
                }
                let candidate = &tokens[idx];
                let score = self
                    .engine
                    .score_detailed(&seed.name, &seed.symbol, &candidate.name, &candidate.symbol);

                if score.value >= self.config.threshold_for(score.path) {
                    consumed[idx] = true;
                    members.push(candidate.clone());
                    scores.push(score.value);
                }
            }

            if members.len() < self.config.min_cluster_size {
                tracing::debug!(
                    seed = %seed.symbol,
                    size = members.len(),
                    "cluster below minimum size, discarded"
                );
                continue;
            }

            let confidence = if scores.is_empty() {
                1.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };

            clusters.push(Cluster {
                keywords: rank_keywords(&members),
                members,
                confidence,
            });
        }

        clusters
    }
}

/// Keyword frequency across members, ties broken by first appearance
pub fn rank_keywords(members: &[TokenRecord]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for member in members {
        for keyword in extract_keywords(&member.name, &member.symbol) {
            match counts.iter_mut().find(|(k, _)| *k == keyword) {
                Some((_, count)) => *count += 1,
                None => counts.push((keyword, 1)),
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(k, _)| k).collect()
}
