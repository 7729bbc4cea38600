mod average;
mod cpu;
mod disk;
mod sampler;
mod types;

pub use average::{Average, TimedSampler, WeightedAverage};
pub use cpu::{
    cpu_usage_sampler, CpuReader, CpuUsageSampler, CpuUsageSource, SysinfoCpuReader,
    CPU_SAMPLER_SOURCE, CPU_SAMPLE_ERROR_MESSAGE,
};
pub use disk::{
    disk_usage_sampler, DiskUsageSampler, DiskUsageSource, DriveReader, DriveSpace,
    SysinfoDriveReader, DISK_SAMPLER_SOURCE, DISK_SAMPLE_ERROR_MESSAGE,
};
pub use sampler::{
    SampleSource, Sampler, StatsSampler, Subscriber, SubscriptionId, SAMPLE_INTERVAL,
    TICK_PERIOD,
};
pub use types::{
    CpuSamples, CpuUsageSample, DiskSamples, DiskUsageSample, Stamped, SystemStats,
};
