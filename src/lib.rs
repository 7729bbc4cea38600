pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod provider;

pub use config::SystemStatsConfig;
pub use error::{Result, SampleError, StatsError};
pub use logging::{LogFacadeLogger, StatsLogger};
pub use metrics::{
    CpuUsageSample, DiskUsageSample, SampleSource, Sampler, StatsSampler, SystemStats,
    TimedSampler, WeightedAverage,
};
pub use provider::{StatsProvider, SystemStatsProvider};
