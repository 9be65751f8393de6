use crate::error::{FuelError, Result};
use crate::model::Reading;

/// Summary of the prices in one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

impl Statistics {
    /// `timestamp,count,min,max,mean,stddev`
    pub fn to_line(&self, timestamp: &str) -> String {
        format!(
            "{},{},{},{},{},{}",
            timestamp, self.count, self.min, self.max, self.mean, self.stddev
        )
    }
}

// Welford's Online algorithm
#[derive(Default)]
pub struct OnlineStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl OnlineStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn update(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Population variance (ddof = 0).
    pub fn variance(&self) -> f64 {
        if self.count > 0 {
            (self.m2 / self.count as f64).max(0.0)
        } else {
            0.0
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn finish(&self) -> Option<Statistics> {
        if self.count == 0 {
            return None;
        }
        Some(Statistics {
            count: self.count,
            min: self.min,
            max: self.max,
            // rounding can push the running mean a hair outside [min, max] for constant input
            mean: self.mean.clamp(self.min, self.max),
            stddev: self.stddev(),
        })
    }
}

pub fn compute_statistics(reading: &Reading) -> Result<Statistics> {
    if reading.prices.is_empty() {
        return Err(FuelError::EmptyData);
    }

    let mut stats = OnlineStats::new();
    for &price in &reading.prices {
        stats.update(price);
    }
    stats.finish().ok_or(FuelError::EmptyData)
}
