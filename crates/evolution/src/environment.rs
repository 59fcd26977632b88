//! Stake-bucketed strategy environment
//!
//! Users of different economic weight face different incentives, so each
//! stake bucket evolves its own population. Buckets are delimited by
//! ascending borders (`user.stackGroupBorders`); a stake equal to a border
//! belongs to the lower bucket and the last bucket catches everything above.

use crate::population::{PopulationConfig, StratPopulation};
use crate::snapshot::{EnvironmentSnapshot, StratSpec};
use crate::strat::Strat;
use curators_core::{Error, Result, Settings};
use rand::Rng;
use serde::Deserialize;
use std::path::Path;

/// Settings section `user.stackGroupBorders`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StakeBuckets {
    /// Canonical stake of the lowest bucket
    pub min: f64,
    #[serde(default)]
    pub borders: Vec<f64>,
}

impl Default for StakeBuckets {
    fn default() -> Self {
        Self {
            min: 1.0,
            borders: Vec::new(),
        }
    }
}

impl StakeBuckets {
    pub fn validate(&self) -> Result<()> {
        if !(self.min > 0.0) {
            return Err(Error::config("user.stackGroupBorders.min", "must be positive"));
        }
        if self.borders.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(Error::config(
                "user.stackGroupBorders.borders",
                "borders must be strictly ascending",
            ));
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.borders.len() + 1
    }

    pub fn bucket(&self, stake: f64) -> usize {
        self.borders.iter().take_while(|&&border| border < stake).count()
    }

    /// Canonical stake of `bucket`
    pub fn lower_boundary(&self, bucket: usize) -> f64 {
        match bucket {
            0 => self.min,
            _ => self.borders[bucket - 1],
        }
    }
}

/// Address of one strat: its bucket and its arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StratHandle {
    pub bucket: usize,
    pub slot: usize,
}

#[derive(Debug, Clone)]
pub struct StratEnvironment {
    buckets: StakeBuckets,
    populations: Vec<StratPopulation>,
}

impl StratEnvironment {
    pub fn new<R: Rng + ?Sized>(
        buckets: StakeBuckets,
        config: PopulationConfig,
        spec: &StratSpec,
        rng: &mut R,
    ) -> Result<Self> {
        buckets.validate()?;
        let populations = (0..buckets.count())
            .map(|_| StratPopulation::new(config.clone(), spec, rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            buckets,
            populations,
        })
    }

    /// Fresh environment sampled from `strat.init`
    pub fn from_settings<R: Rng + ?Sized>(settings: &Settings, rng: &mut R) -> Result<Self> {
        let spec: StratSpec = settings.section("strat.init")?;
        Self::new(
            settings.section("user.stackGroupBorders")?,
            PopulationConfig::from_settings(settings)?,
            &spec,
            rng,
        )
    }

    pub fn from_snapshot<R: Rng + ?Sized>(
        buckets: StakeBuckets,
        config: PopulationConfig,
        snapshot: &EnvironmentSnapshot,
        rng: &mut R,
    ) -> Result<Self> {
        buckets.validate()?;
        if snapshot.populations.len() != buckets.count() {
            return Err(Error::config(
                "user.stackGroupBorders",
                format!(
                    "snapshot holds {} populations, settings define {} stake buckets",
                    snapshot.populations.len(),
                    buckets.count()
                ),
            ));
        }
        let populations = snapshot
            .populations
            .iter()
            .map(|population| StratPopulation::from_snapshot(config.clone(), population, rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            buckets,
            populations,
        })
    }

    /// Resume from a snapshot file, everything else from settings
    pub fn load<R: Rng + ?Sized>(
        settings: &Settings,
        path: impl AsRef<Path>,
        rng: &mut R,
    ) -> Result<Self> {
        let snapshot = EnvironmentSnapshot::load(path)?;
        Self::from_snapshot(
            settings.section("user.stackGroupBorders")?,
            PopulationConfig::from_settings(settings)?,
            &snapshot,
            rng,
        )
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            populations: self.populations.iter().map(StratPopulation::snapshot).collect(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.snapshot().save(path)
    }

    pub fn buckets(&self) -> &StakeBuckets {
        &self.buckets
    }

    pub fn populations(&self) -> &[StratPopulation] {
        &self.populations
    }

    /// Next strat for a user holding `stake`
    pub fn pick<R: Rng + ?Sized>(&mut self, stake: f64, rng: &mut R) -> Result<StratHandle> {
        let bucket = self.buckets.bucket(stake);
        let slot = self.populations[bucket].pick(rng)?;
        Ok(StratHandle { bucket, slot })
    }

    /// Snap `stake` to the canonical stake of its bucket
    pub fn fix_stack_size(&self, stake: f64) -> f64 {
        self.buckets.lower_boundary(self.buckets.bucket(stake))
    }

    pub fn strat(&self, handle: StratHandle) -> Option<&Strat> {
        self.populations.get(handle.bucket)?.strat(handle.slot)
    }

    pub fn observe(&mut self, handle: StratHandle, value: f64) -> Result<()> {
        self.populations
            .get_mut(handle.bucket)
            .ok_or_else(|| Error::invariant(format!("no stake bucket {}", handle.bucket)))?
            .observe(handle.slot, value)
    }
}
