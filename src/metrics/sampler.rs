use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{panic_message, Result, SampleError, StatsError};

pub const TICK_PERIOD: Duration = Duration::from_millis(100);
/// Minimum spacing between two sample attempts, successful or not.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(1000);

const LOG_TARGET: &str = "system_stats::sampler";

/// Owned by the worker thread while running, parked in the [`Sampler`] between runs.
pub trait SampleSource: Send + 'static {
    type Output: Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Acquires per-run resources. Called on the thread invoking `start`.
    fn initialize(&mut self) -> std::result::Result<(), SampleError>;

    fn sample(&mut self) -> std::result::Result<Self::Output, SampleError>;

    fn on_sample_error(&self, error: &SampleError);
}

pub type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        SubscriptionId(raw)
    }
}

pub trait StatsSampler<T>: Send + Sync {
    fn start(&self) -> Result<()>;

    /// Blocks until the worker has exited; nothing is emitted after this returns.
    fn stop(&self) -> Result<()>;

    fn is_running(&self) -> bool;

    fn subscribe(&self, subscriber: Subscriber<T>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Subscribers<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Subscriber<T>)>>,
}

impl<T> Subscribers<T> {
    fn new() -> Self {
        Subscribers {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, subscriber: Subscriber<T>) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.entries).push((id, subscriber));
        id
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    // copied first so a subscriber may (un)subscribe without deadlocking
    fn emit(&self, sampler: &str, value: &T) {
        let current: Vec<Subscriber<T>> = lock(&self.entries)
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in current {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| subscriber(value))) {
                warn!(
                    target: LOG_TARGET,
                    "{} subscriber panicked: {}",
                    sampler,
                    panic_message(&*payload)
                );
            }
        }
    }
}

struct Control<S> {
    source: Option<S>,
    worker: Option<JoinHandle<S>>,
}

pub struct Sampler<S: SampleSource> {
    name: &'static str,
    running: Arc<AtomicBool>,
    control: Mutex<Control<S>>,
    // published by the worker itself before its first sample
    worker_thread: Arc<Mutex<Option<ThreadId>>>,
    subscribers: Arc<Subscribers<S::Output>>,
}

impl<S: SampleSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Sampler {
            name: source.name(),
            running: Arc::new(AtomicBool::new(false)),
            control: Mutex::new(Control {
                source: Some(source),
                worker: None,
            }),
            worker_thread: Arc::new(Mutex::new(None)),
            subscribers: Arc::new(Subscribers::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn on_worker_thread(&self) -> bool {
        *lock(&self.worker_thread) == Some(thread::current().id())
    }
}

impl<S: SampleSource> StatsSampler<S::Output> for Sampler<S> {
    fn start(&self) -> Result<()> {
        let mut control = lock(&self.control);
        if control.worker.is_some() {
            return Ok(());
        }

        let mut source = control.source.take().ok_or(StatsError::SourceLost(self.name))?;
        let initialized = panic::catch_unwind(AssertUnwindSafe(|| source.initialize()))
            .unwrap_or_else(|payload| Err(SampleError::Panicked(panic_message(&*payload))));
        if let Err(source_err) = initialized {
            control.source = Some(source);
            return Err(StatsError::Initialize {
                sampler: self.name,
                source: source_err,
            });
        }

        self.running.store(true, Ordering::SeqCst);
        let worker = SamplingLoop {
            name: self.name,
            source,
            running: Arc::clone(&self.running),
            worker_thread: Arc::clone(&self.worker_thread),
            subscribers: Arc::clone(&self.subscribers),
            last_sampled: None,
        };
        let spawned = thread::Builder::new()
            .name(format!("{}-sampler", self.name))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                control.worker = Some(handle);
                debug!(target: LOG_TARGET, "{} started", self.name);
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                warn!(target: LOG_TARGET, "{} could not spawn its worker: {}", self.name, err);
                Err(StatsError::Spawn {
                    sampler: self.name,
                    source: err,
                })
            }
        }
    }

    fn stop(&self) -> Result<()> {
        if self.on_worker_thread() {
            return Err(StatsError::StopFromSamplingThread(self.name));
        }

        let mut control = lock(&self.control);
        let Some(worker) = control.worker.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Ok(());
        };
        if worker.thread().id() == thread::current().id() {
            control.worker = Some(worker);
            return Err(StatsError::StopFromSamplingThread(self.name));
        }
        self.running.store(false, Ordering::SeqCst);

        let joined = worker.join();
        *lock(&self.worker_thread) = None;
        match joined {
            Ok(source) => {
                control.source = Some(source);
                debug!(target: LOG_TARGET, "{} stopped", self.name);
                Ok(())
            }
            Err(_) => Err(StatsError::WorkerPanicked(self.name)),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn subscribe(&self, subscriber: Subscriber<S::Output>) -> SubscriptionId {
        self.subscribers.add(subscriber)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}

impl<S: SampleSource> Drop for Sampler<S> {
    fn drop(&mut self) {
        // a worker that cannot be joined from here still sees the flag and exits
        self.running.store(false, Ordering::SeqCst);
        if let Err(err) = self.stop() {
            debug!(target: LOG_TARGET, "{} did not stop cleanly: {}", self.name, err);
        }
    }
}

// confined to the worker thread while the loop runs
struct SamplingLoop<S: SampleSource> {
    name: &'static str,
    source: S,
    running: Arc<AtomicBool>,
    worker_thread: Arc<Mutex<Option<ThreadId>>>,
    subscribers: Arc<Subscribers<S::Output>>,
    last_sampled: Option<Instant>,
}

impl<S: SampleSource> SamplingLoop<S> {
    fn run(mut self) -> S {
        *lock(&self.worker_thread) = Some(thread::current().id());
        while self.running.load(Ordering::SeqCst) {
            let tick_started = Instant::now();
            let due = self
                .last_sampled
                .map_or(true, |at| at.elapsed() >= SAMPLE_INTERVAL);
            if due {
                self.attempt();
                self.last_sampled = Some(Instant::now());
            }

            if let Some(remaining) = TICK_PERIOD.checked_sub(tick_started.elapsed()) {
                thread::sleep(remaining);
            }
        }
        self.source
    }

    fn attempt(&mut self) {
        let source = &mut self.source;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.sample()))
            .unwrap_or_else(|payload| Err(SampleError::Panicked(panic_message(&*payload))));

        match outcome {
            Ok(value) => self.subscribers.emit(self.name, &value),
            Err(err) => self.report(&err),
        }
    }

    fn report(&self, err: &SampleError) {
        let source = &self.source;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| source.on_sample_error(err)))
        {
            // must not go back through the failing handler
            debug!(
                target: LOG_TARGET,
                "{} sampler does not handle error {}: {}",
                self.name,
                err,
                panic_message(&*payload)
            );
        }
    }
}
