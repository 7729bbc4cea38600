use std::path::Path;
use std::sync::Arc;

use log::Level;
use sysinfo::Disks;

use super::sampler::{SampleSource, Sampler};
use super::types::{DiskSamples, DiskUsageSample};
use crate::config::{windows_drive_letter, SystemStatsConfig};
use crate::error::SampleError;
use crate::logging::StatsLogger;

pub const DISK_SAMPLER_SOURCE: &str = "LocalFixedDiskUsageSampler";
pub const DISK_SAMPLE_ERROR_MESSAGE: &str = "Error whilst attempting disk usage sampling";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriveSpace {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

impl DriveSpace {
    /// Free space as a real-valued percentage; `0.0` for a zero-capacity drive.
    pub fn free_percentage(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.free_bytes as f64 / self.total_bytes as f64 * 100.0) as f32
    }
}

pub trait DriveReader: Send + 'static {
    /// Called once per tick before the drives are queried.
    fn refresh(&mut self) -> Result<(), SampleError> {
        Ok(())
    }

    fn read_drive_free_space(&mut self, drive: &str) -> Result<DriveSpace, SampleError>;
}

/// Resolves drives against the mounted filesystems reported by `sysinfo`.
pub struct SysinfoDriveReader {
    disks: Disks,
}

impl SysinfoDriveReader {
    pub fn new() -> Self {
        SysinfoDriveReader {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoDriveReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveReader for SysinfoDriveReader {
    fn refresh(&mut self) -> Result<(), SampleError> {
        self.disks.refresh_list();
        Ok(())
    }

    fn read_drive_free_space(&mut self, drive: &str) -> Result<DriveSpace, SampleError> {
        let disk = self
            .disks
            .list()
            .iter()
            .find(|disk| drive_matches(disk.mount_point(), drive))
            .ok_or_else(|| SampleError::DriveNotFound(drive.to_string()))?;

        Ok(DriveSpace {
            free_bytes: disk.available_space(),
            total_bytes: disk.total_space(),
        })
    }
}

/// A drive letter matches `X:\`-style mount points; anything else must equal the mount path.
pub(crate) fn drive_matches(mount_point: &Path, drive: &str) -> bool {
    match windows_drive_letter(drive) {
        Some(letter) => {
            let mount = mount_point.to_string_lossy();
            let mut chars = mount.chars();
            matches!(
                (chars.next(), chars.next()),
                (Some(first), Some(':')) if first.eq_ignore_ascii_case(&letter)
            )
        }
        None => mount_point == Path::new(drive),
    }
}

/// Reports free space for the configured OS and data drives.
pub struct DiskUsageSource<R: DriveReader = SysinfoDriveReader> {
    reader: R,
    os_drive: String,
    data_drive: String,
    logger: Arc<dyn StatsLogger>,
}

impl<R: DriveReader> DiskUsageSource<R> {
    pub fn new(config: &SystemStatsConfig, reader: R, logger: Arc<dyn StatsLogger>) -> Self {
        DiskUsageSource {
            reader,
            os_drive: config.os_drive(),
            data_drive: config.data_drive(),
            logger,
        }
    }

    fn read(&mut self, drive: &str) -> Result<DiskUsageSample, SampleError> {
        let space = self.reader.read_drive_free_space(drive)?;
        Ok(DiskUsageSample::new(
            drive,
            space.free_bytes,
            space.free_percentage(),
        ))
    }
}

impl<R: DriveReader> SampleSource for DiskUsageSource<R> {
    type Output = DiskSamples;

    fn name(&self) -> &'static str {
        DISK_SAMPLER_SOURCE
    }

    fn initialize(&mut self) -> Result<(), SampleError> {
        Ok(())
    }

    fn sample(&mut self) -> Result<DiskSamples, SampleError> {
        self.reader.refresh()?;
        let os_drive = self.os_drive.clone();
        let data_drive = self.data_drive.clone();
        Ok([self.read(&os_drive)?, self.read(&data_drive)?])
    }

    fn on_sample_error(&self, error: &SampleError) {
        self.logger.log(
            DISK_SAMPLER_SOURCE,
            Level::Error,
            DISK_SAMPLE_ERROR_MESSAGE,
            Some(error),
        );
    }
}

pub type DiskUsageSampler<R = SysinfoDriveReader> = Sampler<DiskUsageSource<R>>;

/// Disk sampler backed by `sysinfo`.
pub fn disk_usage_sampler(
    config: &SystemStatsConfig,
    logger: Arc<dyn StatsLogger>,
) -> DiskUsageSampler {
    Sampler::new(DiskUsageSource::new(
        config,
        SysinfoDriveReader::new(),
        logger,
    ))
}
