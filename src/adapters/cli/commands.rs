//! CLI Command Handlers
//!
//! Argument definitions and handlers for every trend-hunter command.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::notifier::{BroadcastNotifier, FanoutNotifier, LogNotifier};
use crate::adapters::providers::build_providers;
use crate::adapters::store::InMemoryStore;
use crate::application::{
    IngestionPipeline, IngestionReport, RefreshScheduler, SourceAggregator, TaskScheduler,
    TopicAssembler,
};
use crate::clustering::{ClusterBuilder, SimilarityEngine};
use crate::config::{load_with_env, Config, LoggingSection};
use crate::domain::{priority_score, RefreshPriority, TopicEventKind};
use crate::ports::{ProviderClient, TokenStore, TopicNotifier};

/// Default path of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/trend-hunter.toml";

/// Trend Hunter - token ingestion, name clustering and adaptive refresh for Solana
#[derive(Parser, Debug)]
#[command(
    name = "trend-hunter",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Token ingestion, name clustering and adaptive market refresh for Solana",
    long_about = "Trend Hunter polls market-data providers for newly listed tokens, groups \
                  look-alike names into topics and keeps market snapshots fresh at a cadence \
                  matched to each token's importance."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run ingestion polling and market refresh until Ctrl-C
    Run(RunCmd),

    /// Run one ingestion pass over recent listings
    Ingest(IngestCmd),

    /// Ingest and cluster specific token addresses
    Analyze(AnalyzeCmd),

    /// Run one market refresh tick
    Refresh(RefreshCmd),

    /// Score the similarity of two tokens
    Score(ScoreCmd),

    /// Show what providers report for one token
    Inspect(InspectCmd),
}

/// Start the background jobs
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Print every topic event to stdout as a JSON line
    #[arg(long)]
    pub events: bool,
}

/// One ingestion pass
#[derive(Parser, Debug)]
pub struct IngestCmd {
    /// Listing window in hours (defaults to the configured window)
    #[arg(short, long, value_name = "HOURS")]
    pub window_hours: Option<u32>,
}

/// Ad-hoc analysis
#[derive(Parser, Debug)]
pub struct AnalyzeCmd {
    /// Token addresses
    #[arg(value_name = "ADDRESS", required = true)]
    pub addresses: Vec<String>,
}

/// One refresh tick
#[derive(Parser, Debug)]
pub struct RefreshCmd {
    /// Show every dispatched token id
    #[arg(short, long)]
    pub detailed: bool,
}

/// Similarity between two name/symbol pairs
#[derive(Parser, Debug)]
pub struct ScoreCmd {
    #[arg(value_name = "NAME_A")]
    pub name_a: String,

    #[arg(value_name = "SYMBOL_A")]
    pub symbol_a: String,

    #[arg(value_name = "NAME_B")]
    pub name_b: String,

    #[arg(value_name = "SYMBOL_B")]
    pub symbol_b: String,
}

/// Provider lookups for one token
#[derive(Parser, Debug)]
pub struct InspectCmd {
    /// Token address
    #[arg(value_name = "ADDRESS")]
    pub address: String,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config_found = app.config.exists();
    let config = load_with_env(&app.config).context("Failed to load configuration")?;

    init_logging(app.verbose, app.debug, &config.logging)?;
    if !config_found {
        tracing::warn!("Config {} not found, running with defaults", app.config.display());
    }

    match app.command {
        Command::Run(cmd) => run_command(cmd, config).await,
        Command::Ingest(cmd) => ingest_command(cmd, config).await,
        Command::Analyze(cmd) => analyze_command(cmd, config).await,
        Command::Refresh(cmd) => refresh_command(cmd, config).await,
        Command::Score(cmd) => score_command(cmd, config),
        Command::Inspect(cmd) => inspect_command(cmd, config).await,
    }
}

/// Initialize logging system
///
/// `RUST_LOG` wins when set; otherwise the flags, then the configured level.
fn init_logging(verbose: bool, debug: bool, logging: &LoggingSection) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if logging.json {
        fmt().json().with_env_filter(filter).with_target(false).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    Ok(())
}

/// Everything a command needs, wired from one config
struct Services {
    config: Config,
    store: Arc<InMemoryStore>,
    aggregator: Arc<SourceAggregator>,
    events: Arc<BroadcastNotifier>,
}

impl Services {
    fn build(config: Config) -> Result<Self> {
        let store = if config.storage.persist {
            InMemoryStore::load_from(&config.storage.state_file).with_context(|| {
                format!("Failed to load state from {}", config.storage.state_file.display())
            })?
        } else {
            InMemoryStore::new()
        };

        let providers = build_providers(&config.providers).context("Failed to build providers")?;
        let kinds: Vec<&str> = providers.iter().map(|p| p.kind().as_str()).collect();
        tracing::info!("Providers enabled: {}", kinds.join(", "));

        let aggregator = SourceAggregator::new(providers, config.aggregator.clone());

        Ok(Self {
            config,
            store: Arc::new(store),
            aggregator: Arc::new(aggregator),
            events: Arc::new(BroadcastNotifier::new(256)),
        })
    }

    fn store(&self) -> Arc<dyn TokenStore> {
        self.store.clone()
    }

    fn pipeline(&self) -> IngestionPipeline {
        let log: Arc<dyn TopicNotifier> = Arc::new(LogNotifier);
        let events: Arc<dyn TopicNotifier> = self.events.clone();
        let notifier: Arc<dyn TopicNotifier> = Arc::new(FanoutNotifier::new(vec![log, events]));
        IngestionPipeline::new(
            self.aggregator.clone(),
            self.store(),
            ClusterBuilder::new(self.config.clustering),
            TopicAssembler::new(self.store(), notifier),
            self.config.ingestion,
        )
    }

    fn refresher(&self) -> RefreshScheduler {
        RefreshScheduler::new(self.aggregator.clone(), self.store(), self.config.refresh)
    }

    async fn persist(&self) -> Result<()> {
        if !self.config.storage.persist {
            return Ok(());
        }
        let path = &self.config.storage.state_file;
        self.store
            .save_to(path)
            .await
            .with_context(|| format!("Failed to save state to {}", path.display()))?;
        tracing::info!("State saved to {}", path.display());
        Ok(())
    }
}

/// Handle run command
async fn run_command(cmd: RunCmd, config: Config) -> Result<()> {
    tracing::info!("Starting trend hunter...");
    let services = Services::build(config)?;

    if cmd.events {
        let mut rx = services.events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => tracing::error!("Failed to encode topic event: {}", e),
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Event printer lagged, {} events dropped", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    let mut scheduler = TaskScheduler::new();
    scheduler.add(Arc::new(services.pipeline()));
    scheduler.add(Arc::new(services.refresher()));

    // Setup Ctrl+C handler
    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        stop.stop();
    });

    scheduler.wait().await;
    services.persist().await?;
    tracing::info!("Trend hunter stopped");
    Ok(())
}

/// Handle ingest command
async fn ingest_command(cmd: IngestCmd, config: Config) -> Result<()> {
    let window = cmd.window_hours.unwrap_or(config.ingestion.window_hours);
    let services = Services::build(config)?;

    let report = services
        .pipeline()
        .run_pass_with_window(window)
        .await
        .context("Ingestion pass failed")?;

    println!("Ingestion pass ({}h window)", window);
    print_ingestion(&report);
    services.persist().await
}

/// Handle analyze command
async fn analyze_command(cmd: AnalyzeCmd, config: Config) -> Result<()> {
    let services = Services::build(config)?;

    let report = services
        .pipeline()
        .ingest_addresses(&cmd.addresses)
        .await
        .context("Analysis failed")?;

    println!("Analysis of {} addresses", cmd.addresses.len());
    print_ingestion(&report);
    services.persist().await
}

fn print_ingestion(report: &IngestionReport) {
    println!("  Listed:     {}", report.listed);
    println!("  New tokens: {}", report.new_tokens);
    println!("  Snapshots:  {}", report.snapshots);
    println!("  Clustered:  {} tokens into {} clusters", report.clustered, report.clusters);

    for event in &report.topics {
        let kind = match event.kind {
            TopicEventKind::Created => "new",
            TopicEventKind::Updated => "updated",
        };
        println!(
            "  [{}] {} ({} members, hotness {:.1}) keywords: {}",
            kind,
            event.topic.name,
            event.aggregates.member_count,
            event.topic.hotness,
            event.topic.keywords.join(", ")
        );
    }

    if !report.unresolved.is_empty() {
        println!("  Unresolved: {}", report.unresolved.join(", "));
    }
}

/// Handle refresh command
async fn refresh_command(cmd: RefreshCmd, config: Config) -> Result<()> {
    let services = Services::build(config)?;

    let report = services
        .refresher()
        .run_tick()
        .await
        .context("Refresh tick failed")?;

    println!("Refresh tick");
    println!("  Tracked:          {}", report.tracked);
    println!("  Eligible:         {}", report.eligible);
    println!("  Dispatched:       {}", report.dispatched.len());
    println!("  Snapshots added:  {}", report.appended);
    println!("  Zero readings:    {}", report.skipped_zero);
    println!("  Not found:        {}", report.not_found);
    println!("  Identity updates: {}", report.identity_updates);
    println!("  Failed:           {}", report.failed);

    if cmd.detailed && !report.dispatched.is_empty() {
        let ids: Vec<String> = report.dispatched.iter().map(|id| id.to_string()).collect();
        println!("  Tokens: {}", ids.join(", "));
    }

    services.persist().await
}

/// Handle score command
fn score_command(cmd: ScoreCmd, config: Config) -> Result<()> {
    let engine = SimilarityEngine::new();
    let score = engine.score_detailed(&cmd.name_a, &cmd.symbol_a, &cmd.name_b, &cmd.symbol_b);
    let threshold = config.clustering.threshold_for(score.path);

    println!(
        "{} ({}) vs {} ({})",
        cmd.name_a, cmd.symbol_a, cmd.name_b, cmd.symbol_b
    );
    println!("  Score:     {:.3}", score.value);
    println!("  Path:      {:?}", score.path);
    println!("  Threshold: {:.2}", threshold);
    println!(
        "  Clusters:  {}",
        if score.value >= threshold { "yes" } else { "no" }
    );
    Ok(())
}

/// Handle inspect command
async fn inspect_command(cmd: InspectCmd, config: Config) -> Result<()> {
    let services = Services::build(config)?;
    let aggregator = &services.aggregator;

    println!("Token {}", cmd.address);

    match aggregator.get_basic_info(&cmd.address).await {
        Some(basic) => println!(
            "  Identity: {} ({}) decimals {}",
            basic.name,
            basic.symbol,
            basic
                .decimals
                .map_or_else(|| "unknown".to_string(), |d| d.to_string())
        ),
        None => println!("  Identity: not found"),
    }

    match aggregator.get_full_info(&cmd.address).await {
        Some(info) => {
            let f = &info.figures;
            let score = priority_score(f);
            println!("  Source:     {}", info.source.as_str());
            println!("  Price:      ${:.8} ({:+.2}% 24h)", f.price, f.price_change_24h);
            println!("  Market cap: ${:.0}", f.market_cap);
            println!("  Liquidity:  ${:.0}", f.liquidity);
            println!("  Volume 24h: ${:.0}", f.volume_24h);
            println!(
                "  Priority:   {:.1} ({:?})",
                score,
                RefreshPriority::from_score(score)
            );
        }
        None => println!("  Market data: not found"),
    }

    match aggregator.get_holder_count(&cmd.address).await {
        Some(count) => println!("  Holders:    {}", count),
        None => println!("  Holders:    unknown"),
    }

    Ok(())
}
