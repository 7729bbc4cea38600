use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::Level;
use sysinfo::System;

use super::average::{Average, TimedSampler};
use super::sampler::{SampleSource, Sampler};
use super::types::{CpuSamples, CpuUsageSample};
use crate::config::SystemStatsConfig;
use crate::error::{Result, SampleError};
use crate::logging::StatsLogger;

pub const CPU_SAMPLER_SOURCE: &str = "CpuUsageSampler";
pub const CPU_SAMPLE_ERROR_MESSAGE: &str = "Error whilst attempting CPU sampling";

const CPU_WARMUP: Duration = Duration::from_millis(200);

/// Source of instantaneous whole-machine CPU utilization, in percent.
pub trait CpuReader: Send + 'static {
    /// Acquires the underlying counter. Called once per sampler start.
    fn open(&mut self) -> std::result::Result<(), SampleError> {
        Ok(())
    }

    fn read_total_cpu_utilization(&mut self) -> std::result::Result<f32, SampleError>;
}

/// Reads CPU usage through `sysinfo`, averaged across cores.
#[derive(Default)]
pub struct SysinfoCpuReader {
    system: Option<System>,
}

impl SysinfoCpuReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CpuReader for SysinfoCpuReader {
    fn open(&mut self) -> std::result::Result<(), SampleError> {
        // usage is a delta between refreshes, so prime it once
        let mut system = System::new();
        system.refresh_cpu();
        thread::sleep(CPU_WARMUP);
        system.refresh_cpu();
        self.system = Some(system);
        Ok(())
    }

    fn read_total_cpu_utilization(&mut self) -> std::result::Result<f32, SampleError> {
        let system = self
            .system
            .as_mut()
            .ok_or_else(|| SampleError::Unavailable("CPU usage counter".to_string()))?;
        system.refresh_cpu();

        let cpus = system.cpus();
        if cpus.is_empty() {
            return Err(SampleError::Unavailable("CPU list".to_string()));
        }
        Ok(cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32)
    }
}

/// Feeds each raw reading into short, medium and long window averages.
pub struct CpuUsageSource<R: CpuReader = SysinfoCpuReader> {
    reader: R,
    windows: [TimedSampler; 3],
    logger: Arc<dyn StatsLogger>,
}

impl<R: CpuReader> CpuUsageSource<R> {
    pub fn new(config: &SystemStatsConfig, reader: R, logger: Arc<dyn StatsLogger>) -> Result<Self> {
        let [short, medium, long] = config.cpu_windows();
        Ok(CpuUsageSource {
            reader,
            windows: [
                TimedSampler::new(short)?,
                TimedSampler::new(medium)?,
                TimedSampler::new(long)?,
            ],
            logger,
        })
    }
}

impl<R: CpuReader> SampleSource for CpuUsageSource<R> {
    type Output = CpuSamples;

    fn name(&self) -> &'static str {
        CPU_SAMPLER_SOURCE
    }

    fn initialize(&mut self) -> std::result::Result<(), SampleError> {
        self.reader.open()
    }

    fn sample(&mut self) -> std::result::Result<CpuSamples, SampleError> {
        let current = self.reader.read_total_cpu_utilization()?;
        for window in &mut self.windows {
            window.add_sample(f64::from(current));
        }

        let [short, medium, long] = &self.windows;
        Ok([
            CpuUsageSample::new(short.seconds(), short.average() as f32),
            CpuUsageSample::new(medium.seconds(), medium.average() as f32),
            CpuUsageSample::new(long.seconds(), long.average() as f32),
        ])
    }

    fn on_sample_error(&self, error: &SampleError) {
        self.logger.log(
            CPU_SAMPLER_SOURCE,
            Level::Error,
            CPU_SAMPLE_ERROR_MESSAGE,
            Some(error),
        );
    }
}

pub type CpuUsageSampler<R = SysinfoCpuReader> = Sampler<CpuUsageSource<R>>;

/// CPU sampler backed by `sysinfo`.
pub fn cpu_usage_sampler(
    config: &SystemStatsConfig,
    logger: Arc<dyn StatsLogger>,
) -> Result<CpuUsageSampler> {
    Ok(Sampler::new(CpuUsageSource::new(
        config,
        SysinfoCpuReader::new(),
        logger,
    )?))
}
