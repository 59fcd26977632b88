//! Economy rule set

use crate::RuleFunction;
use curators_core::{Error, Result, Settings};

/// Name of the rating argument bound when evaluating the economy rules
pub const RATING_ARG: &str = "r";

/// One configured economy: how votes turn into curator impact and article reward
#[derive(Debug, Clone)]
pub struct Rules {
    curators_impact: RuleFunction,
    article_reward: RuleFunction,
    straightforward_prob: f64,
}

impl Rules {
    pub fn new(
        curators_impact: RuleFunction,
        article_reward: RuleFunction,
        straightforward_prob: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&straightforward_prob) {
            return Err(Error::config(
                "straightforwardProb",
                format!("{straightforward_prob} is not a probability"),
            ));
        }
        Ok(Self {
            curators_impact,
            article_reward,
            straightforward_prob,
        })
    }

    /// Load the rule set stored at `path` (e.g. `rules.0`)
    pub fn from_settings(settings: &Settings, path: &str) -> Result<Self> {
        Self::new(
            RuleFunction::from_settings(settings, &format!("{path}.curatorsImpact"))?,
            RuleFunction::from_settings(settings, &format!("{path}.articleReward"))?,
            settings.get(path, "straightforwardProb")?,
        )
    }

    pub fn curators_impact(&self, rating: f64) -> Result<f64> {
        self.curators_impact.evaluate(&[(RATING_ARG, rating)])
    }

    pub fn article_reward(&self, rating: f64) -> Result<f64> {
        self.article_reward.evaluate(&[(RATING_ARG, rating)])
    }

    pub fn straightforward_prob(&self) -> f64 {
        self.straightforward_prob
    }
}
