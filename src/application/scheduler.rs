//! Task Scheduler
//!
//! Owns every periodic job of the process. Each job ticks on its own
//! interval; a tick that lands while the previous run is still going is
//! skipped. Stopping cancels pending ticks and waits for in-flight runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// A unit of periodic work
#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn period(&self) -> Duration;

    async fn run_once(&self) -> anyhow::Result<()>;
}

/// Cloneable trigger for stopping a scheduler from elsewhere (e.g. Ctrl-C)
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }
}

pub struct TaskScheduler {
    stop: StopHandle,
    drivers: JoinSet<()>,
    jobs: Vec<String>,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            stop: StopHandle {
                sender: Arc::new(sender),
            },
            drivers: JoinSet::new(),
            jobs: Vec::new(),
        }
    }

    /// Start ticking `job`; the first run starts immediately
    pub fn add(&mut self, job: Arc<dyn PeriodicJob>) {
        tracing::info!(job = job.name(), "Scheduling every {:?}", job.period());
        self.jobs.push(job.name().to_string());
        let stop = self.stop.sender.subscribe();
        self.drivers.spawn(drive(job, stop));
    }

    pub fn jobs(&self) -> &[String] {
        &self.jobs
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait until every job has stopped (after a `StopHandle::stop`)
    pub async fn wait(&mut self) {
        while let Some(result) = self.drivers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Job driver ended abnormally: {}", e);
            }
        }
    }

    /// Stop all jobs and wait for in-flight runs to finish
    pub async fn shutdown(mut self) {
        tracing::info!("Shutting down {} scheduled jobs", self.jobs.len());
        self.stop.stop();
        self.wait().await;
        tracing::info!("Scheduler stopped");
    }
}

async fn drive(job: Arc<dyn PeriodicJob>, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(job.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let in_flight = Arc::new(AtomicBool::new(false));
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if in_flight.swap(true, Ordering::AcqRel) {
                    tracing::warn!(job = job.name(), "Previous run still in flight, skipping tick");
                    continue;
                }
                let job = job.clone();
                let flag = in_flight.clone();
                runs.spawn(async move {
                    if let Err(e) = job.run_once().await {
                        tracing::error!(job = job.name(), "Run failed: {:#}", e);
                    }
                    flag.store(false, Ordering::Release);
                });
            }
            Some(finished) = runs.join_next(), if !runs.is_empty() => {
                if let Err(e) = finished {
                    tracing::error!(job = job.name(), "Run aborted: {}", e);
                    in_flight.store(false, Ordering::Release);
                }
            }
        }
    }

    if !runs.is_empty() {
        tracing::info!(job = job.name(), "Waiting for in-flight run");
    }
    while runs.join_next().await.is_some() {}
    tracing::debug!(job = job.name(), "Job stopped");
}
