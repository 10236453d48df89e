//! Ingestion Pipeline
//!
//! One pass: recent listings → tracked tokens (+ initial snapshots) →
//! clusters → topics. The same persist/cluster/assemble path serves ad-hoc
//! address lists.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::aggregator::SourceAggregator;
use super::scheduler::PeriodicJob;
use super::topic_assembler::TopicAssembler;
use crate::clustering::ClusterBuilder;
use crate::domain::{
    is_valid_address, MarketFigures, MarketSnapshot, NewToken, ProviderKind, TokenRecord,
    TopicEvent, DEFAULT_DECIMALS,
};
use crate::ports::{StoreError, TokenStore};

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No valid addresses given")]
    NoValidAddresses,
}

/// Ingestion configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Poll interval in seconds
    pub poll_interval_secs: u64,
    /// Listing window in hours
    pub window_hours: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            window_hours: 6,
        }
    }
}

impl IngestionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// What one pass did
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub listed: usize,
    pub new_tokens: usize,
    pub snapshots: usize,
    pub clustered: usize,
    pub clusters: usize,
    pub topics: Vec<TopicEvent>,
    pub unresolved: Vec<String>,
}

pub struct IngestionPipeline {
    aggregator: Arc<SourceAggregator>,
    store: Arc<dyn TokenStore>,
    builder: ClusterBuilder,
    assembler: TopicAssembler,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        aggregator: Arc<SourceAggregator>,
        store: Arc<dyn TokenStore>,
        builder: ClusterBuilder,
        assembler: TopicAssembler,
        config: IngestionConfig,
    ) -> Self {
        Self {
            aggregator,
            store,
            builder,
            assembler,
            config,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Poll listings inside the configured window
    pub async fn run_pass(&self) -> Result<IngestionReport, IngestionError> {
        self.run_pass_with_window(self.config.window_hours).await
    }

    pub async fn run_pass_with_window(
        &self,
        window_hours: u32,
    ) -> Result<IngestionReport, IngestionError> {
        let listings = self.aggregator.get_recent_listings(window_hours).await;
        let mut report = IngestionReport {
            listed: listings.len(),
            ..Default::default()
        };

        let mut batch = Vec::with_capacity(listings.len());
        for listed in &listings {
            let figures = Some((listed.figures, listed.source));
            match self.track(NewToken::from(listed), figures, true, &mut report).await {
                Ok(record) => batch.push(record),
                Err(e) => {
                    tracing::warn!(address = %listed.address, "Failed to track listing: {}", e)
                }
            }
        }

        self.cluster_and_assemble(batch, &mut report).await;
        tracing::info!(
            "Ingestion pass: {} listed, {} new, {} clusters, {} topics",
            report.listed,
            report.new_tokens,
            report.clusters,
            report.topics.len()
        );
        Ok(report)
    }

    /// Resolve, persist and cluster an explicit address list
    pub async fn ingest_addresses(
        &self,
        addresses: &[String],
    ) -> Result<IngestionReport, IngestionError> {
        let mut report = IngestionReport::default();
        let mut batch = Vec::new();

        let (valid, invalid): (Vec<&String>, Vec<&String>) =
            addresses.iter().partition(|a| is_valid_address(a));
        for address in invalid {
            tracing::warn!(address = %address, "Not a valid token address");
            report.unresolved.push(address.clone());
        }
        if valid.is_empty() {
            return Err(IngestionError::NoValidAddresses);
        }
        report.listed = valid.len();

        for address in valid {
            // full info first so a named hit seeds the basic-info cache
            let full = self.aggregator.get_full_info(address).await;
            let basic = self.aggregator.get_basic_info(address).await;

            let new_token = match (&basic, &full) {
                (Some(basic), _) => NewToken {
                    address: address.clone(),
                    name: basic.name.clone(),
                    symbol: basic.symbol.clone(),
                    decimals: basic
                        .decimals
                        .or(full.as_ref().map(|f| f.decimals))
                        .unwrap_or(DEFAULT_DECIMALS),
                    icon: basic.icon.clone(),
                    created_at: Utc::now(),
                },
                (None, Some(full)) if !full.name.is_empty() || !full.symbol.is_empty() => NewToken {
                    address: address.clone(),
                    name: full.name.clone(),
                    symbol: full.symbol.clone(),
                    decimals: full.decimals,
                    icon: full.icon.clone(),
                    created_at: Utc::now(),
                },
                _ => {
                    tracing::warn!(address = %address, "No provider knows this token");
                    report.unresolved.push(address.clone());
                    continue;
                }
            };

            let figures = full.as_ref().map(|f| (f.figures, f.source));
            match self.track(new_token, figures, false, &mut report).await {
                Ok(record) => batch.push(record),
                Err(e) => tracing::warn!(address = %address, "Failed to track token: {}", e),
            }
        }

        self.cluster_and_assemble(batch, &mut report).await;
        Ok(report)
    }

    /// Create the token if unseen and record a snapshot when the figures are usable.
    ///
    /// With `seed_only`, a token that already has history gets no new snapshot.
    async fn track(
        &self,
        token: NewToken,
        figures: Option<(MarketFigures, ProviderKind)>,
        seed_only: bool,
        report: &mut IngestionReport,
    ) -> Result<TokenRecord, StoreError> {
        let mut record = match self.store.find_token(&token.address).await? {
            Some(existing) => existing,
            None => {
                let created = self.store.create_token(token.clone()).await?;
                tracing::debug!(
                    address = %created.address,
                    "Tracking {} ({})",
                    created.name,
                    created.symbol
                );
                report.new_tokens += 1;
                created
            }
        };

        if let Some(update) =
            record.identity_update(&token.name, &token.symbol, token.icon.as_deref())
        {
            record = self.store.update_token_identity(record.id, update).await?;
        }

        if let Some((figures, source)) = figures.filter(|(f, _)| f.has_valid_data()) {
            let skip = seed_only && self.store.latest_snapshot(record.id).await?.is_some();
            if !skip {
                self.store
                    .append_market_snapshot(MarketSnapshot::new(record.id, figures, source))
                    .await?;
                report.snapshots += 1;
            }
        }

        Ok(record)
    }

    async fn cluster_and_assemble(&self, batch: Vec<TokenRecord>, report: &mut IngestionReport) {
        let max = self.builder.config().max_batch_size.max(1);
        let start = batch.len().saturating_sub(max);
        let batch = &batch[start..];
        report.clustered = batch.len();

        let clusters = self.builder.build(batch);
        report.clusters = clusters.len();
        if clusters.is_empty() {
            return;
        }
        report.topics = self.assembler.assemble_all(&clusters).await;
    }
}

#[async_trait]
impl PeriodicJob for IngestionPipeline {
    fn name(&self) -> &str {
        "ingestion"
    }

    fn period(&self) -> Duration {
        self.config.poll_interval()
    }

    async fn run_once(&self) -> anyhow::Result<()> {
        self.run_pass().await?;
        Ok(())
    }
}
