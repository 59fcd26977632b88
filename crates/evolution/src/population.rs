//! Clan-structured strat population
//!
//! All strats of a population live in one arena; clans are ordered lists of
//! arena slots. A slot keeps its identity for the whole run: selection
//! overwrites losing slots in place and migration only moves slot ids between
//! clans, so handles held by users stay valid.

use crate::feature::Feature;
use crate::snapshot::{PopulationSnapshot, StratSpec};
use crate::squelch::{Squelch, SquelchConfig, SquelchParams};
use crate::strat::{ActType, BreedParams, Strat};
use curators_core::{Error, Result, Settings};
use curators_rules::RuleFunction;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;

/// Argument of `population.migrationProb`: the gap between two clan spheres
pub const MIGRATION_DISTANCE_ARG: &str = "d";

/// Settings section `population.init`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationInit {
    pub clans_num: usize,
    /// Strats per clan
    pub strats_num: usize,
}

impl Default for PopulationInit {
    fn default() -> Self {
        Self {
            clans_num: 2,
            strats_num: 4,
        }
    }
}

/// Settings section `population.run`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationRun {
    /// Full sweeps between evolution steps
    pub iter_size: usize,
    /// Surviving share of each clan
    pub elit: f64,
    /// Share of the smaller clan exchanged on migration
    pub migration_rate: f64,
}

impl Default for PopulationRun {
    fn default() -> Self {
        Self {
            iter_size: 1,
            elit: 0.5,
            migration_rate: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PopulationConfig {
    pub init: PopulationInit,
    pub run: PopulationRun,
    pub migration_prob: RuleFunction,
    pub squelch: SquelchConfig,
    pub breed: BreedParams,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            init: PopulationInit::default(),
            run: PopulationRun::default(),
            migration_prob: RuleFunction::constant(0.5),
            squelch: SquelchConfig::default(),
            breed: BreedParams::default(),
        }
    }
}

impl PopulationConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let config = Self {
            init: settings.section("population.init")?,
            run: settings.section("population.run")?,
            migration_prob: RuleFunction::from_settings(settings, "population.migrationProb")?,
            squelch: settings.section("squelch")?,
            breed: settings.section("strat.breed")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.run.elit) {
            return Err(Error::config("population.run.elit", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.run.migration_rate) {
            return Err(Error::config(
                "population.run.migrationRate",
                "must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.squelch.exp_moving) {
            return Err(Error::config("squelch.expMoving", "must be within [0, 1]"));
        }
        self.breed.validate()
    }
}

#[derive(Debug, Clone)]
pub struct StratPopulation {
    config: PopulationConfig,
    strats: Vec<Strat>,
    clans: Vec<Vec<usize>>,
    squelch: Squelch,
    /// (clan, position) of the next pick; `None` before the first sweep
    cursor: Option<(usize, usize)>,
    sweeps: usize,
    generation: usize,
}

impl StratPopulation {
    /// `population.init.clansNum` clans of `strats_num` strats sampled from `spec`
    pub fn new<R: Rng + ?Sized>(
        config: PopulationConfig,
        spec: &StratSpec,
        rng: &mut R,
    ) -> Result<Self> {
        let PopulationInit {
            clans_num,
            strats_num,
        } = config.init;

        let mut strats = Vec::with_capacity(clans_num * strats_num);
        let mut clans = Vec::with_capacity(clans_num);
        for _ in 0..clans_num {
            let mut clan = Vec::with_capacity(strats_num);
            for _ in 0..strats_num {
                clan.push(strats.len());
                strats.push(Strat::from_spec(spec, rng)?);
            }
            clans.push(clan);
        }
        Ok(Self::assemble(config, strats, clans))
    }

    pub fn from_snapshot<R: Rng + ?Sized>(
        config: PopulationConfig,
        snapshot: &PopulationSnapshot,
        rng: &mut R,
    ) -> Result<Self> {
        let mut strats = Vec::new();
        let mut clans = Vec::with_capacity(snapshot.clans.len());
        for members in &snapshot.clans {
            let mut clan = Vec::with_capacity(members.len());
            for spec in members {
                clan.push(strats.len());
                strats.push(Strat::from_spec(spec, rng)?);
            }
            clans.push(clan);
        }
        Ok(Self::assemble(config, strats, clans))
    }

    fn assemble(config: PopulationConfig, strats: Vec<Strat>, clans: Vec<Vec<usize>>) -> Self {
        let squelch = Squelch::new(&config.squelch);
        Self {
            config,
            strats,
            clans,
            squelch,
            cursor: None,
            sweeps: 0,
            generation: 0,
        }
    }

    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            clans: self
                .clans
                .iter()
                .map(|clan| clan.iter().map(|&slot| self.strats[slot].spec()).collect())
                .collect(),
        }
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn strats(&self) -> &[Strat] {
        &self.strats
    }

    pub fn strat(&self, slot: usize) -> Option<&Strat> {
        self.strats.get(slot)
    }

    pub fn clans(&self) -> &[Vec<usize>] {
        &self.clans
    }

    pub fn squelch_params(&self) -> &[SquelchParams] {
        self.squelch.params()
    }

    /// Completed sweeps since the last evolution step
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Evolution steps run so far
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.strats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strats.is_empty()
    }

    /// Next strat slot in shuffled round-robin order. Completing a sweep may
    /// run an evolution step before the next slot is handed out.
    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        if self.strats.is_empty() {
            return Err(Error::shape("cannot pick from an empty population"));
        }

        let (mut clan, mut pos) = match self.cursor {
            Some(cursor) => cursor,
            None => {
                self.shuffle(rng);
                (0, 0)
            }
        };
        if !self.seek(&mut clan, &mut pos) {
            self.complete_sweep(rng)?;
            (clan, pos) = (0, 0);
            if !self.seek(&mut clan, &mut pos) {
                return Err(Error::invariant("population lost all its strats"));
            }
        }

        self.cursor = Some((clan, pos + 1));
        Ok(self.clans[clan][pos])
    }

    /// Move the cursor onto an existing slot; false past the last clan
    fn seek(&self, clan: &mut usize, pos: &mut usize) -> bool {
        while *clan < self.clans.len() && *pos >= self.clans[*clan].len() {
            *clan += 1;
            *pos = 0;
        }
        *clan < self.clans.len()
    }

    fn complete_sweep<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.sweeps += 1;
        if self.sweeps >= self.config.run.iter_size {
            self.evolution_step(rng)?;
            self.sweeps = 0;
        }
        self.shuffle(rng);
        Ok(())
    }

    fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for clan in &mut self.clans {
            clan.shuffle(rng);
        }
    }

    /// Smooth, select, breed and migrate
    pub fn evolution_step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let Self {
            config,
            strats,
            clans,
            squelch,
            ..
        } = self;

        squelch.smooth(strats.as_mut_slice(), clans.as_slice())?;

        for clan in clans.iter_mut() {
            clan.sort_by(|&a, &b| strats[a].smoothed().total_cmp(&strats[b].smoothed()));

            let n = clan.len();
            let first_survivor = (n as f64 * (1.0 - config.run.elit)).floor() as usize;
            if first_survivor == 0 || first_survivor >= n {
                continue;
            }

            for i in 0..first_survivor {
                let a = clan[rng.gen_range(first_survivor..n)];
                let b = clan[rng.gen_range(first_survivor..n)];
                let (parent_a, parent_b) = (strats[a].clone(), strats[b].clone());
                strats[clan[i]].breed(&parent_a, &parent_b, &config.breed, rng)?;
            }
        }

        self.migrate(rng)?;
        self.generation += 1;

        if log::log_enabled!(log::Level::Debug) {
            let best = self
                .strats
                .iter()
                .map(Strat::smoothed)
                .fold(f64::NEG_INFINITY, f64::max);
            log::debug!(
                "evolution step {}: best smoothed utility {best:.6}",
                self.generation
            );
        }
        Ok(())
    }

    /// Exchange members between neighbouring clans in ring order
    fn migrate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let count = self.clans.len();
        if count < 2 {
            return Ok(());
        }

        let spheres: Vec<(Strat, f64)> = self
            .clans
            .iter()
            .map(|clan| sphere(&self.strats, clan))
            .collect();

        for a in 0..count {
            let b = (a + 1) % count;
            let (len_a, len_b) = (self.clans[a].len(), self.clans[b].len());
            if len_a == 0 || len_b == 0 {
                continue;
            }

            let (center_a, radius_a) = &spheres[a];
            let (center_b, radius_b) = &spheres[b];
            let gap = (center_a.distance(center_b) - (radius_a + radius_b)).max(0.0);
            let probability = self
                .config
                .migration_prob
                .evaluate(&[(MIGRATION_DISTANCE_ARG, gap)])?;
            let size = (len_a.min(len_b) as f64 * self.config.run.migration_rate).ceil() as usize;

            if rng.r#gen::<f64>() < probability {
                for _ in 0..size {
                    let i = rng.gen_range(0..len_a);
                    let j = rng.gen_range(0..len_b);
                    let moving = self.clans[a][i];
                    self.clans[a][i] = self.clans[b][j];
                    self.clans[b][j] = moving;
                }
            }
        }
        Ok(())
    }

    /// Push a realized utility into the strat at `slot`
    pub fn observe(&mut self, slot: usize, value: f64) -> Result<()> {
        let decay = self.config.squelch.exp_moving;
        let strat = self
            .strats
            .get_mut(slot)
            .ok_or_else(|| Error::invariant(format!("no strat at slot {slot}")))?;
        strat.observe_utility(value, decay);
        Ok(())
    }

    /// Mean score over every strat, feature types unchecked
    pub fn average_score(&self, features: &[Feature], act: ActType) -> Result<f64> {
        if self.strats.is_empty() {
            return Ok(0.0);
        }
        let mut sum = 0.0;
        for strat in &self.strats {
            sum += strat.score(features, act, false)?;
        }
        Ok(sum / self.strats.len() as f64)
    }
}

/// Centroid of a clan and the largest member distance from it
fn sphere(strats: &[Strat], clan: &[usize]) -> (Strat, f64) {
    let members: Vec<&Strat> = clan.iter().map(|&slot| &strats[slot]).collect();
    let center = Strat::centroid(&members);
    let radius = members
        .iter()
        .map(|s| center.distance(s))
        .fold(0.0, f64::max);
    (center, radius)
}
