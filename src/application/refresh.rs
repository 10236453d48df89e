//! Refresh Scheduler
//!
//! Each tick picks the tracked tokens that are due for a re-fetch, highest
//! priority first and capped per tick, and appends new snapshots from a
//! batched aggregator lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::aggregator::SourceAggregator;
use super::scheduler::PeriodicJob;
use crate::domain::{
    priority_score, MarketFigures, MarketSnapshot, RefreshPriority, TierCadence, TokenId,
    TokenRecord,
};
use crate::ports::{StoreError, TokenStore};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Refresh configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Tick interval in seconds
    pub tick_secs: u64,
    /// Most tokens dispatched per tick
    pub per_tick_cap: usize,
    pub cadence: TierCadence,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            tick_secs: 10,
            per_tick_cap: 4,
            cadence: TierCadence::default(),
        }
    }
}

impl RefreshConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

/// A tracked token due for refresh
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshCandidate {
    pub token: TokenRecord,
    pub latest: MarketSnapshot,
    pub score: f64,
    pub priority: RefreshPriority,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshReport {
    pub tracked: usize,
    pub eligible: usize,
    pub dispatched: Vec<TokenId>,
    pub appended: usize,
    pub skipped_zero: usize,
    pub not_found: usize,
    pub identity_updates: usize,
    pub failed: usize,
}

/// Select the tokens due at `now`, best score first, older snapshot first on ties.
///
/// Returns the eligible count alongside the capped selection.
pub fn plan(
    tracked: Vec<(TokenRecord, MarketSnapshot)>,
    now: DateTime<Utc>,
    config: &RefreshConfig,
) -> (usize, Vec<RefreshCandidate>) {
    let mut due: Vec<RefreshCandidate> = tracked
        .into_iter()
        .filter_map(|(token, latest)| {
            let score = priority_score(&latest.figures);
            let priority = RefreshPriority::from_score(score);
            let since = (now - latest.observed_at).to_std().unwrap_or_default();
            if since < priority.min_interval(config.tick(), &config.cadence) {
                return None;
            }
            Some(RefreshCandidate {
                token,
                latest,
                score,
                priority,
            })
        })
        .collect();

    let eligible = due.len();
    due.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.latest.observed_at.cmp(&b.latest.observed_at))
    });
    due.truncate(config.per_tick_cap);
    (eligible, due)
}

/// Figures to append for a fresh reading, or `None` if it must be dropped.
///
/// All-zero readings are dropped. Otherwise a zero price or market cap is
/// filled from the previous snapshot.
pub fn next_figures(previous: &MarketFigures, reading: &MarketFigures) -> Option<MarketFigures> {
    if reading.is_all_zero() {
        return None;
    }
    Some(reading.carry_forward(previous))
}

pub struct RefreshScheduler {
    aggregator: Arc<SourceAggregator>,
    store: Arc<dyn TokenStore>,
    config: RefreshConfig,
}

impl RefreshScheduler {
    pub fn new(
        aggregator: Arc<SourceAggregator>,
        store: Arc<dyn TokenStore>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            aggregator,
            store,
            config,
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// One refresh tick; per-token failures are counted, not returned
    pub async fn run_tick(&self) -> Result<RefreshReport, RefreshError> {
        let tracked = self.store.tracked_tokens().await?;
        let mut report = RefreshReport {
            tracked: tracked.len(),
            ..Default::default()
        };

        let (eligible, selected) = plan(tracked, Utc::now(), &self.config);
        report.eligible = eligible;
        if selected.is_empty() {
            tracing::debug!("Refresh tick: nothing due ({} tracked)", report.tracked);
            return Ok(report);
        }

        let addresses: Vec<String> = selected.iter().map(|c| c.token.address.clone()).collect();
        report.dispatched = selected.iter().map(|c| c.token.id).collect();
        let mut results: HashMap<String, _> = self
            .aggregator
            .get_batch(&addresses)
            .await
            .into_iter()
            .map(|info| (info.address.clone(), info))
            .collect();

        for candidate in selected {
            let token = &candidate.token;
            let Some(info) = results.remove(&token.address) else {
                tracing::debug!(address = %token.address, "no provider data this tick");
                report.not_found += 1;
                continue;
            };

            let Some(figures) = next_figures(&candidate.latest.figures, &info.figures) else {
                tracing::info!(address = %token.address, "skipping all-zero reading");
                report.skipped_zero += 1;
                continue;
            };

            let snapshot = MarketSnapshot::new(token.id, figures, info.source);
            if let Err(e) = self.store.append_market_snapshot(snapshot).await {
                tracing::warn!(address = %token.address, "Failed to append snapshot: {}", e);
                report.failed += 1;
                continue;
            }
            report.appended += 1;

            if let Some(update) =
                token.identity_update(&info.name, &info.symbol, info.icon.as_deref())
            {
                match self.store.update_token_identity(token.id, update).await {
                    Ok(updated) => {
                        tracing::debug!(
                            address = %token.address,
                            "identity updated to {} ({})",
                            updated.name,
                            updated.symbol
                        );
                        report.identity_updates += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            address = %token.address,
                            "Failed to update identity: {}",
                            e
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Refresh tick: {} tracked, {} due, {} dispatched, {} appended, {} zero skipped",
            report.tracked,
            report.eligible,
            report.dispatched.len(),
            report.appended,
            report.skipped_zero
        );
        Ok(report)
    }
}

#[async_trait]
impl PeriodicJob for RefreshScheduler {
    fn name(&self) -> &str {
        "refresh"
    }

    fn period(&self) -> Duration {
        self.config.tick()
    }

    async fn run_once(&self) -> anyhow::Result<()> {
        self.run_tick().await?;
        Ok(())
    }
}
