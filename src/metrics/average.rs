use std::fmt;

use crate::error::{Result, StatsError};

/// A running estimate over a scalar stream.
pub trait Average {
    /// Current estimate, or `0.0` before the first sample.
    fn average(&self) -> f64;
    fn add_sample(&mut self, value: f64);
}

/// Exponentially weighted moving average: O(1) time and memory per sample.
///
/// The first sample seeds the average exactly; every later sample is folded in
/// as `alpha * value + (1 - alpha) * average`. `alpha` is fixed at construction.
#[derive(Debug, Clone)]
pub struct WeightedAverage {
    average: Option<f64>,
    alpha: f64,
    samples: u64,
}

impl WeightedAverage {
    pub fn new(alpha: f64) -> Result<Self> {
        // NaN fails both comparisons
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(StatsError::InvalidSmoothing(alpha));
        }
        Ok(WeightedAverage {
            average: None,
            alpha,
            samples: 0,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl Average for WeightedAverage {
    fn average(&self) -> f64 {
        self.average.unwrap_or_default()
    }

    fn add_sample(&mut self, value: f64) {
        self.samples = self.samples.saturating_add(1);
        self.average = Some(match self.average {
            Some(current) => self.alpha * value + (1.0 - self.alpha) * current,
            None => value,
        });
    }
}

impl fmt::Display for WeightedAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M: {:.1}    A:{:.4}     S: {}",
            self.average(),
            self.alpha,
            self.samples
        )
    }
}

/// A [`WeightedAverage`] whose smoothing constant tracks a window length in seconds.
#[derive(Debug, Clone)]
pub struct TimedSampler {
    inner: WeightedAverage,
    seconds: u32,
}

impl TimedSampler {
    /// Window of `seconds`, assuming one sample per second.
    pub fn new(seconds: u32) -> Result<Self> {
        Self::with_seconds_per_sample(seconds, 1)
    }

    pub fn with_seconds_per_sample(seconds: u32, seconds_per_sample: u32) -> Result<Self> {
        if seconds == 0 {
            return Err(StatsError::InvalidWindow(seconds));
        }
        let alpha = 1.0 / (f64::from(seconds) * f64::from(seconds_per_sample));
        Ok(TimedSampler {
            inner: WeightedAverage::new(alpha)?,
            seconds,
        })
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn alpha(&self) -> f64 {
        self.inner.alpha()
    }
}

impl Average for TimedSampler {
    fn average(&self) -> f64 {
        self.inner.average()
    }

    fn add_sample(&mut self, value: f64) {
        self.inner.add_sample(value);
    }
}

impl fmt::Display for TimedSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s {}", self.seconds, self.inner)
    }
}
