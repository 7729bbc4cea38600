use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CpuUsageSample {
    pub sample_seconds: u32,
    pub average_value: f32,
}

impl CpuUsageSample {
    pub fn new(sample_seconds: u32, average_value: f32) -> Self {
        CpuUsageSample {
            sample_seconds,
            average_value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiskUsageSample {
    pub device: String,
    pub free_bytes: u64,
    pub free_percentage: f32,
}

impl DiskUsageSample {
    pub fn new(device: impl Into<String>, free_bytes: u64, free_percentage: f32) -> Self {
        DiskUsageSample {
            device: device.into(),
            free_bytes,
            free_percentage,
        }
    }
}

/// Per-tick CPU payload, ordered short, medium, long.
pub type CpuSamples = [CpuUsageSample; 3];
/// Per-tick disk payload, ordered OS drive, data drive.
pub type DiskSamples = [DiskUsageSample; 2];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub value: T,
    pub updated_at: DateTime<Utc>,
}

impl<T> Stamped<T> {
    pub fn now(value: T) -> Self {
        Stamped {
            value,
            updated_at: Utc::now(),
        }
    }
}

/// Fields stay zeroed until the corresponding sampler has emitted once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu_last_updated: Option<DateTime<Utc>>,
    pub disk_last_updated: Option<DateTime<Utc>>,

    pub short_term_cpu_usage: f32,
    pub medium_term_cpu_usage: f32,
    pub long_term_cpu_usage: f32,

    pub os_drive_free_bytes: u64,
    pub os_drive_free_percentage: f32,
    pub data_drive_free_bytes: u64,
    pub data_drive_free_percentage: f32,
}

impl SystemStats {
    pub fn from_latest(
        cpu: Option<&Stamped<CpuSamples>>,
        disk: Option<&Stamped<DiskSamples>>,
    ) -> Self {
        let mut stats = SystemStats::default();

        if let Some(cpu) = cpu {
            let [short, medium, long] = &cpu.value;
            stats.cpu_last_updated = Some(cpu.updated_at);
            stats.short_term_cpu_usage = short.average_value;
            stats.medium_term_cpu_usage = medium.average_value;
            stats.long_term_cpu_usage = long.average_value;
        }

        if let Some(disk) = disk {
            let [os, data] = &disk.value;
            stats.disk_last_updated = Some(disk.updated_at);
            stats.os_drive_free_bytes = os.free_bytes;
            stats.os_drive_free_percentage = os.free_percentage;
            stats.data_drive_free_bytes = data.free_bytes;
            stats.data_drive_free_percentage = data.free_percentage;
        }

        stats
    }
}
