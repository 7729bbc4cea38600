use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;

use log::Level;

use crate::config::SystemStatsConfig;
use crate::error::{panic_message, Result, StatsError};
use crate::logging::StatsLogger;
use crate::metrics::{
    cpu_usage_sampler, disk_usage_sampler, CpuSamples, DiskSamples, Stamped, StatsSampler,
    SubscriptionId, SystemStats,
};

pub const PROVIDER_SOURCE: &str = "SystemStatsProvider";
pub const CPU_SAMPLER_LABEL: &str = "CPU sampler";
pub const DISK_SAMPLER_LABEL: &str = "Disk usage sampler";

pub trait StatsProvider: Send + Sync {
    fn fetch_snapshot(&self) -> SystemStats;
}

#[derive(Default)]
struct LatestValues {
    cpu: RwLock<Option<Stamped<CpuSamples>>>,
    disk: RwLock<Option<Stamped<DiskSamples>>>,
    detached: AtomicBool,
}

impl LatestValues {
    fn store<T>(&self, slot: &RwLock<Option<Stamped<T>>>, value: T) {
        if self.detached.load(Ordering::SeqCst) {
            return;
        }
        let stamped = Stamped::now(value);
        *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(stamped);
    }

    fn snapshot(&self) -> SystemStats {
        let cpu = self.cpu.read().unwrap_or_else(PoisonError::into_inner);
        let disk = self.disk.read().unwrap_or_else(PoisonError::into_inner);
        SystemStats::from_latest(cpu.as_ref(), disk.as_ref())
    }
}

struct Attached {
    cpu: Arc<dyn StatsSampler<CpuSamples>>,
    cpu_subscription: SubscriptionId,
    disk: Arc<dyn StatsSampler<DiskSamples>>,
    disk_subscription: SubscriptionId,
}

/// A failed stop is logged and does not prevent the other sampler from stopping.
pub struct SystemStatsProvider {
    samplers: Mutex<Option<Attached>>,
    latest: Arc<LatestValues>,
    logger: Arc<dyn StatsLogger>,
}

impl SystemStatsProvider {
    pub fn new(
        cpu: Arc<dyn StatsSampler<CpuSamples>>,
        disk: Arc<dyn StatsSampler<DiskSamples>>,
        logger: Arc<dyn StatsLogger>,
    ) -> Result<Self> {
        let latest = Arc::new(LatestValues::default());

        let cpu_latest = Arc::clone(&latest);
        let cpu_subscription = cpu.subscribe(Arc::new(move |samples: &CpuSamples| {
            cpu_latest.store(&cpu_latest.cpu, *samples)
        }));
        let disk_latest = Arc::clone(&latest);
        let disk_subscription = disk.subscribe(Arc::new(move |samples: &DiskSamples| {
            disk_latest.store(&disk_latest.disk, samples.clone())
        }));

        let provider = SystemStatsProvider {
            samplers: Mutex::new(Some(Attached {
                cpu: Arc::clone(&cpu),
                cpu_subscription,
                disk: Arc::clone(&disk),
                disk_subscription,
            })),
            latest,
            logger,
        };

        // on failure `provider` is dropped, which tears down whatever did start
        cpu.start()?;
        disk.start()?;
        Ok(provider)
    }

    pub fn from_config(config: &SystemStatsConfig, logger: Arc<dyn StatsLogger>) -> Result<Self> {
        config.validate()?;
        let cpu = cpu_usage_sampler(config, Arc::clone(&logger))?;
        let disk = disk_usage_sampler(config, Arc::clone(&logger));
        Self::new(Arc::new(cpu), Arc::new(disk), logger)
    }

    pub fn is_attached(&self) -> bool {
        self.samplers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Detaches and stops both samplers. Later calls are no-ops.
    pub fn shutdown(&self) {
        let attached = self
            .samplers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(attached) = attached else {
            return;
        };

        self.latest.detached.store(true, Ordering::SeqCst);
        attached.cpu.unsubscribe(attached.cpu_subscription);
        attached.disk.unsubscribe(attached.disk_subscription);

        thread::scope(|scope| {
            let cpu = scope.spawn(|| self.try_stop(&*attached.cpu, CPU_SAMPLER_LABEL));
            let disk = scope.spawn(|| self.try_stop(&*attached.disk, DISK_SAMPLER_LABEL));
            // a panicking logger is the only way these can fail
            let _ = cpu.join();
            let _ = disk.join();
        });
    }

    fn try_stop<T>(&self, sampler: &dyn StatsSampler<T>, label: &str) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sampler.stop()))
            .unwrap_or_else(|payload| Err(StatsError::Panicked(panic_message(&*payload))));
        if let Err(err) = outcome {
            self.logger.log(
                PROVIDER_SOURCE,
                Level::Error,
                &format!("Unable to dispose {}", label),
                Some(&err),
            );
        }
    }
}

impl StatsProvider for SystemStatsProvider {
    fn fetch_snapshot(&self) -> SystemStats {
        self.latest.snapshot()
    }
}

impl Drop for SystemStatsProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}
