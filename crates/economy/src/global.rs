//! Economy-wide reward accounting

use curators_core::{Error, Result};

/// Negative values above this are floating drift and snap to zero
const DRIFT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalProps {
    /// Undistributed reward
    pub reward_pool: f64,
    /// Sum of the reward function over every live article
    pub reward_func_sum: f64,
}

impl GlobalProps {
    /// Both sums must be non-negative
    pub fn check(&mut self) -> Result<()> {
        self.reward_pool = snap("reward pool", self.reward_pool)?;
        self.reward_func_sum = snap("reward function sum", self.reward_func_sum)?;
        Ok(())
    }
}

fn snap(name: &str, value: f64) -> Result<f64> {
    if value >= 0.0 {
        Ok(value)
    } else if value > -DRIFT_TOLERANCE {
        Ok(0.0)
    } else {
        Err(Error::invariant(format!("{name} went negative: {value}")))
    }
}
