//! Simulation settings sections

use curators_core::{Error, RandomVariableSpec, Result, Settings};
use serde::Deserialize;

/// Settings section `environment`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub articles_num: usize,
    pub users_num: usize,
    /// Passes of one run
    pub passes_num: usize,
    /// An article is cashed out every this many passes
    pub articles_period: usize,
    /// Reward pool growth per pass
    #[serde(default = "default_emission")]
    pub emission: f64,
}

fn default_emission() -> f64 {
    1.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            articles_num: 20,
            users_num: 50,
            passes_num: 2000,
            articles_period: 5,
            emission: default_emission(),
        }
    }
}

/// Settings section `user`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// Voting budget at the start of a session
    pub charge: f64,
    /// Passes of one session
    pub max_passes: usize,
    /// Exponent of the taste match when voting without a strat
    pub straightforward_factor_power: f64,
    #[serde(rename = "stack")]
    pub stake: RandomVariableSpec,
    pub taste: Vec<RandomVariableSpec>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            charge: 1.0,
            max_passes: 10,
            straightforward_factor_power: 2.0,
            stake: RandomVariableSpec::constant(1.0),
            taste: vec![RandomVariableSpec::uniform(0.0, 1.0)],
        }
    }
}

/// Settings section `article`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleConfig {
    pub rating_ln_factor: f64,
    pub passes_ln_factor: f64,
    pub properties: Vec<RandomVariableSpec>,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            rating_ln_factor: 0.1,
            passes_ln_factor: 0.1,
            properties: vec![RandomVariableSpec::uniform(0.0, 1.0)],
        }
    }
}

impl ArticleConfig {
    /// Unclamped rating feature of an article
    pub fn rating_feature(&self, rating: f64) -> f64 {
        self.rating_ln_factor * rating.ln_1p()
    }

    /// Unclamped age feature of an article
    pub fn passes_feature(&self, passes: usize) -> f64 {
        self.passes_ln_factor * (passes as f64).ln_1p()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct SinkConfig {
    /// Log a summary instead of writing plot tables
    #[serde(default)]
    pub console: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbsConfig {
    #[serde(default)]
    pub console: bool,
    #[serde(default)]
    pub heatmap: bool,
    pub points_num: usize,
}

impl Default for ProbsConfig {
    fn default() -> Self {
        Self {
            console: true,
            heatmap: false,
            points_num: 11,
        }
    }
}

/// Settings section `display`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Send projections to the sinks, not just log progress
    #[serde(default)]
    pub enable: bool,
    pub period: usize,
    #[serde(default)]
    pub strat: SinkConfig,
    #[serde(default)]
    pub probs: ProbsConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enable: false,
            period: 1000,
            strat: SinkConfig { console: true },
            probs: ProbsConfig::default(),
        }
    }
}

/// Settings section `report`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReportConfig {
    /// Snapshot every this many passes
    pub period: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { period: 10000 }
    }
}

/// Everything the economy reads from the settings tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EconomyConfig {
    pub simulation: SimulationConfig,
    pub user: UserConfig,
    pub article: ArticleConfig,
    pub display: DisplayConfig,
    pub report: ReportConfig,
}

impl EconomyConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let config = Self {
            simulation: settings.section("environment")?,
            user: settings.section("user")?,
            article: settings.section("article")?,
            display: settings.section("display")?,
            report: settings.section("report")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("environment.articlesNum", self.simulation.articles_num),
            ("environment.usersNum", self.simulation.users_num),
            ("environment.articlesPeriod", self.simulation.articles_period),
            ("display.period", self.display.period),
            ("report.period", self.report.period),
        ];
        for (path, value) in positive {
            if value == 0 {
                return Err(Error::config(path, "must be at least 1"));
            }
        }
        if !(self.simulation.emission >= 0.0) {
            return Err(Error::config("environment.emission", "must be non-negative"));
        }
        if !(self.user.charge > 0.0) {
            return Err(Error::config("user.charge", "must be positive"));
        }
        Ok(())
    }
}
