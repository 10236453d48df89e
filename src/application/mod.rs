pub mod cache;
pub mod aggregator;
pub mod topic_assembler;
pub mod refresh;
pub mod ingestion;
pub mod scheduler;

pub use cache::{CacheEntry, ResponseCache};
pub use aggregator::{AggregatorConfig, SourceAggregator};
pub use topic_assembler::{representative_name, AssemblyError, TopicAssembler, TOPIC_STOP_WORDS};
pub use refresh::{
    plan, RefreshCandidate, RefreshConfig, RefreshError, RefreshReport, RefreshScheduler,
};
pub use ingestion::{IngestionConfig, IngestionError, IngestionPipeline, IngestionReport};
pub use scheduler::{PeriodicJob, StopHandle, TaskScheduler};
