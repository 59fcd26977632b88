//! Articles and the votes they own
//!
//! Articles form a fixed pool. Cashing an article out resets it for reuse and
//! bumps its generation, which expires every [`VoteRef`] users still hold.

use crate::global::GlobalProps;
use curators_core::{Error, RandomValue, RandomVariableSpec, Result};
use curators_rules::Rules;
use rand::Rng;

pub const PROPERTIES_COUNT: usize = 1;

/// Amounts below this count as zero
pub const NEGLIGIBLE: f64 = 1e-20;

/// Point in the text-property space shared by articles and user tastes
#[derive(Debug, Clone)]
pub struct TextProperties {
    values: Vec<RandomValue>,
}

impl TextProperties {
    pub fn new<R: Rng + ?Sized>(specs: &[RandomVariableSpec], rng: &mut R) -> Result<Self> {
        if specs.len() != PROPERTIES_COUNT {
            return Err(Error::shape(format!(
                "{} text properties configured, expected {PROPERTIES_COUNT}",
                specs.len()
            )));
        }
        let values = specs
            .iter()
            .map(|spec| RandomValue::new(spec.clone(), rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        for value in &mut self.values {
            value.resample(rng)?;
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).map(RandomValue::get)
    }

    /// Root mean square difference
    pub fn distance(&self, other: &TextProperties) -> f64 {
        let sum: f64 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a.get() - b.get()).powi(2))
            .sum();
        (sum / PROPERTIES_COUNT as f64).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub voter: usize,
    /// Curator impact added by this vote
    pub impact: f64,
}

/// User-side reference to a vote; stale once its article is reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoteRef {
    pub article: usize,
    pub generation: u64,
    pub index: usize,
}

/// Reward distributed by one cashout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payout {
    pub total: f64,
    /// (voter, amount) per vote
    pub shares: Vec<(usize, f64)>,
}

#[derive(Debug, Clone)]
pub struct Article {
    slot: usize,
    properties: TextProperties,
    rating: f64,
    impact_sum: f64,
    reward_sum: f64,
    votes: Vec<Vote>,
    passes: usize,
    generation: u64,
}

impl Article {
    pub fn new(slot: usize, properties: TextProperties) -> Self {
        Self {
            slot,
            properties,
            rating: 0.0,
            impact_sum: 0.0,
            reward_sum: 0.0,
            votes: Vec::new(),
            passes: 0,
            generation: 0,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn properties(&self) -> &TextProperties {
        &self.properties
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn impact_sum(&self) -> f64 {
        self.impact_sum
    }

    pub fn reward_sum(&self) -> f64 {
        self.reward_sum
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pass(&mut self) {
        self.passes += 1;
    }

    /// Record a vote of `weight` backed by `stake`
    pub fn add_vote(&mut self, voter: usize, stake: f64, weight: f64, rules: &Rules) -> Result<VoteRef> {
        let previous = self.rating;
        self.rating += stake * weight;

        let impact = rules.curators_impact(self.rating)? - rules.curators_impact(previous)?;
        let reward = rules.article_reward(self.rating)?;
        if reward < self.reward_sum {
            return Err(Error::invariant(format!(
                "reward of article {} decreased from {} to {reward}",
                self.slot, self.reward_sum
            )));
        }

        self.reward_sum = reward;
        self.impact_sum += impact;
        self.votes.push(Vote { voter, impact });
        Ok(VoteRef {
            article: self.slot,
            generation: self.generation,
            index: self.votes.len() - 1,
        })
    }

    /// The vote `vote` refers to, unless it expired
    pub fn vote(&self, vote: VoteRef) -> Option<&Vote> {
        if vote.article != self.slot || vote.generation != self.generation {
            return None;
        }
        self.votes.get(vote.index)
    }

    /// This article's share of the reward pool if cashed out now
    pub fn current_reward(&self, global: &GlobalProps) -> f64 {
        if global.reward_func_sum < NEGLIGIBLE {
            return 0.0;
        }
        global.reward_pool * self.reward_sum / global.reward_func_sum
    }

    /// Split the current reward between voters by impact
    pub fn cashout(&self, global: &GlobalProps) -> Payout {
        let total = self.current_reward(global);
        if total < NEGLIGIBLE || self.impact_sum < NEGLIGIBLE {
            return Payout::default();
        }
        Payout {
            total,
            shares: self
                .votes
                .iter()
                .map(|vote| (vote.voter, total * vote.impact / self.impact_sum))
                .collect(),
        }
    }

    /// Empty the article for reuse with fresh text properties
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.properties.resample(rng)?;
        self.rating = 0.0;
        self.impact_sum = 0.0;
        self.reward_sum = 0.0;
        self.votes.clear();
        self.passes = 0;
        self.generation += 1;
        Ok(())
    }
}
