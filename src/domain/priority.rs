//! Refresh Priority
//!
//! Derived scheduling tier for a tracked token. Computed from the latest
//! snapshot on every refresh tick and never stored.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::token::MarketFigures;

/// Score at or above which a token is high priority
pub const HIGH_PRIORITY_SCORE: f64 = 0.8;
/// Score at or above which a token is medium priority
pub const MEDIUM_PRIORITY_SCORE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPriority {
    Low,
    Medium,
    High,
}

impl RefreshPriority {
    /// Map a 0-1 priority score to a tier. Zero scores fall back to low.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_PRIORITY_SCORE {
            RefreshPriority::High
        } else if score >= MEDIUM_PRIORITY_SCORE {
            RefreshPriority::Medium
        } else {
            RefreshPriority::Low
        }
    }

    pub fn cadence_ticks(&self, cadence: &TierCadence) -> u32 {
        match self {
            RefreshPriority::High => cadence.high_ticks,
            RefreshPriority::Medium => cadence.medium_ticks,
            RefreshPriority::Low => cadence.low_ticks,
        }
    }

    /// Minimum age of the latest snapshot before the token is due again.
    ///
    /// Half a tick is subtracted so a snapshot written slightly after the
    /// tick boundary does not push the token back a whole tick.
    pub fn min_interval(&self, tick: Duration, cadence: &TierCadence) -> Duration {
        let ticks = self.cadence_ticks(cadence).max(1);
        (tick * ticks).saturating_sub(tick / 2)
    }
}

impl fmt::Display for RefreshPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPriority::High => write!(f, "high"),
            RefreshPriority::Medium => write!(f, "medium"),
            RefreshPriority::Low => write!(f, "low"),
        }
    }
}

/// Re-fetch cadence per tier, in refresh ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierCadence {
    pub high_ticks: u32,
    pub medium_ticks: u32,
    pub low_ticks: u32,
}

impl Default for TierCadence {
    fn default() -> Self {
        Self {
            high_ticks: 1,
            medium_ticks: 5,
            low_ticks: 30,
        }
    }
}

/// Importance score in [0, 1] from liquidity, market cap and volume
pub fn priority_score(figures: &MarketFigures) -> f64 {
    // accumulated in tenths so tier boundaries compare exactly
    let mut tenths: u32 = 0;

    if figures.liquidity > 0.0 {
        tenths += 4;
    }

    if figures.market_cap > 1_000_000.0 {
        tenths += 3;
    } else if figures.market_cap > 100_000.0 {
        tenths += 2;
    } else if figures.market_cap > 10_000.0 {
        tenths += 1;
    }

    if figures.volume_24h > 50_000.0 {
        tenths += 3;
    } else if figures.volume_24h > 10_000.0 {
        tenths += 2;
    } else if figures.volume_24h > 1_000.0 {
        tenths += 1;
    }

    f64::from(tenths.min(10)) / 10.0
}
