//! Running summaries of per-step quantities.

use serde::{Deserialize, Serialize};

/// Streaming summary of a series of values.
///
/// Mean and variance are updated with Welford's method, so the series
/// itself is never stored.
#[derive(Debug, Default)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    sq_dev_sum: f64,
    max: Option<f64>,
}

/// Snapshot of a [`RunningStats`]. Undefined entries are `NaN`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
}

impl RunningStats {
    pub fn push(&mut self, val: f64) {
        self.count += 1;

        let delta = val - self.mean;
        self.mean += delta / self.count as f64;
        self.sq_dev_sum += delta * (val - self.mean);

        self.max = Some(self.max.map_or(val, |max| max.max(val)));
    }

    /// Sample variance, defined from two values on.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.sq_dev_sum / (self.count - 1) as f64)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            count: self.count,
            mean: if self.count > 0 { self.mean } else { f64::NAN },
            std_dev: self.variance().map_or(f64::NAN, f64::sqrt),
            max: self.max.unwrap_or(f64::NAN),
        }
    }
}
