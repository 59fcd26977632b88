//! Configured random variables
//!
//! A variable is described in the settings tree by a node carrying a
//! `distribution` tag plus its parameters, e.g.
//! `{"distribution": "normal", "mean": 0.5, "stddev": 0.1, "scaled": true}`.
//! `scaled` clamps every draw into [0,1].

use crate::{Error, Result};
use rand::Rng;
use rand_distr::{Beta, Distribution as _, Normal, Pareto};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "camelCase")]
pub enum Distribution {
    Constant {
        val: f64,
    },
    Uniform {
        min: f64,
        max: f64,
    },
    Normal {
        mean: f64,
        stddev: f64,
    },
    HalfNormal {
        stddev: f64,
    },
    Beta {
        alpha: f64,
        beta: f64,
    },
    Pareto {
        alpha: f64,
        #[serde(rename = "Xm")]
        xm: f64,
    },
}

/// Settings node describing one random variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomVariableSpec {
    #[serde(flatten)]
    pub distribution: Distribution,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub scaled: bool,
}

impl RandomVariableSpec {
    /// A degenerate variable that always yields `val`
    pub fn constant(val: f64) -> Self {
        Self {
            distribution: Distribution::Constant { val },
            scaled: false,
        }
    }

    pub fn uniform(min: f64, max: f64) -> Self {
        Self {
            distribution: Distribution::Uniform { min, max },
            scaled: false,
        }
    }

    /// Draw one value
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let raw = match self.distribution {
            Distribution::Constant { val } => val,
            Distribution::Uniform { min, max } => min + (max - min) * rng.r#gen::<f64>(),
            Distribution::Normal { mean, stddev } => Normal::new(mean, stddev)
                .map_err(|e| Error::config("distribution.normal", e.to_string()))?
                .sample(rng),
            Distribution::HalfNormal { stddev } => Normal::new(0.0, stddev)
                .map_err(|e| Error::config("distribution.halfNormal", e.to_string()))?
                .sample(rng)
                .abs(),
            Distribution::Beta { alpha, beta } => Beta::new(alpha, beta)
                .map_err(|e| Error::config("distribution.beta", e.to_string()))?
                .sample(rng),
            Distribution::Pareto { alpha, xm } => Pareto::new(xm, alpha)
                .map_err(|e| Error::config("distribution.pareto", e.to_string()))?
                .sample(rng),
        };

        Ok(if self.scaled {
            raw.min(1.0).max(0.0)
        } else {
            raw
        })
    }
}

/// A random variable together with its current draw
#[derive(Debug, Clone)]
pub struct RandomValue {
    spec: RandomVariableSpec,
    value: f64,
}

impl RandomValue {
    /// Create and take the first draw
    pub fn new<R: Rng + ?Sized>(spec: RandomVariableSpec, rng: &mut R) -> Result<Self> {
        let value = spec.sample(rng)?;
        Ok(Self { spec, value })
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.value = self.spec.sample(rng)?;
        Ok(())
    }

    /// Override the current draw (e.g. snapping a stake to its bucket boundary)
    pub fn set_external(&mut self, value: f64) {
        self.value = value;
    }

    pub fn spec(&self) -> &RandomVariableSpec {
        &self.spec
    }
}
