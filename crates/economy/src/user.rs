//! Curators
//!
//! A user acts in sessions. A session lasts `user.maxPasses` passes or until
//! the voting charge runs out; when it ends, the utility it earned is reported
//! to the strat the user followed and the user comes back as a fresh curator.

use crate::article::{Article, NEGLIGIBLE, TextProperties, VoteRef};
use crate::config::{ArticleConfig, UserConfig};
use crate::global::GlobalProps;
use curators_core::{Error, RandomValue, Result};
use curators_evolution::{ActType, Feature, FeatureType, Strat, StratEnvironment, StratHandle};
use rand::Rng;

/// A session ends once the charge drops below this
pub const MIN_CHARGE: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct User {
    id: usize,
    stake: RandomValue,
    taste: TextProperties,
    charge: f64,
    fixed_utility: f64,
    /// Absent for straightforward users
    strat: Option<StratHandle>,
    votes: Vec<VoteRef>,
    passes: usize,
}

impl User {
    /// New user whose first pass starts a session
    pub fn new<R: Rng + ?Sized>(id: usize, config: &UserConfig, rng: &mut R) -> Result<Self> {
        Ok(Self {
            id,
            stake: RandomValue::new(config.stake.clone(), rng)?,
            taste: TextProperties::new(&config.taste, rng)?,
            charge: config.charge,
            fixed_utility: 0.0,
            strat: None,
            votes: Vec::new(),
            passes: config.max_passes,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stake(&self) -> f64 {
        self.stake.get()
    }

    pub fn taste(&self) -> &TextProperties {
        &self.taste
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn fixed_utility(&self) -> f64 {
        self.fixed_utility
    }

    pub fn strat(&self) -> Option<StratHandle> {
        self.strat
    }

    pub fn votes(&self) -> &[VoteRef] {
        &self.votes
    }

    /// Count a pass; true when the current session is over
    pub fn advance_pass(&mut self, config: &UserConfig) -> bool {
        let exhausted = self.passes >= config.max_passes;
        self.passes += 1;
        exhausted || self.charge < MIN_CHARGE
    }

    /// Cashed-out rewards plus the current value of every live vote
    pub fn total_utility(&self, articles: &[Article], global: &GlobalProps) -> Result<f64> {
        let mut total = self.fixed_utility;
        for &vote_ref in &self.votes {
            let article = articles.get(vote_ref.article).ok_or_else(|| {
                Error::invariant(format!("user {} refers to missing article {}", self.id, vote_ref.article))
            })?;
            let Some(vote) = article.vote(vote_ref) else {
                continue;
            };
            if vote.impact > NEGLIGIBLE {
                total += article.current_reward(global) * vote.impact
                    / article.impact_sum().max(vote.impact);
            }
        }
        Ok(total)
    }

    /// Come back as a fresh curator without a strat
    pub fn restart<R: Rng + ?Sized>(&mut self, config: &UserConfig, rng: &mut R) -> Result<()> {
        self.stake.resample(rng)?;
        self.taste.resample(rng)?;
        self.charge = config.charge;
        self.fixed_utility = 0.0;
        self.strat = None;
        self.votes.clear();
        self.passes = 0;
        Ok(())
    }

    /// Follow `strat` for this session with the stake snapped to `stake`
    pub fn assign(&mut self, strat: Option<StratHandle>, stake: f64) {
        self.strat = strat;
        self.stake.set_external(stake);
    }

    fn followed<'a>(&self, strats: &'a StratEnvironment) -> Result<Option<&'a Strat>> {
        match self.strat {
            Some(handle) => strats
                .strat(handle)
                .map(Some)
                .ok_or_else(|| Error::invariant(format!("user {} follows a missing strat", self.id))),
            None => Ok(None),
        }
    }

    /// Choose an article to read. A strat weighs every article; weights are
    /// normalised only when they sum above one, so the draw may pick nothing.
    pub fn pick_article<R: Rng + ?Sized>(
        &self,
        articles: &[Article],
        scales: &ArticleConfig,
        strats: &StratEnvironment,
        weights: &mut Vec<f64>,
        rng: &mut R,
    ) -> Result<Option<usize>> {
        if articles.is_empty() {
            return Ok(None);
        }
        let Some(strat) = self.followed(strats)? else {
            return Ok(Some(rng.gen_range(0..articles.len())));
        };

        weights.clear();
        let mut sum = 0.0;
        for article in articles {
            let features = [
                Feature::with_value(FeatureType::PassesLn, scales.passes_feature(article.passes())),
                Feature::with_value(FeatureType::RatingLn, scales.rating_feature(article.rating())),
            ];
            let weight = strat.score(&features, ActType::PickWeight, true)?;
            weights.push(weight);
            sum += weight;
        }
        if sum > 1.0 {
            for weight in weights.iter_mut() {
                *weight /= sum;
            }
        }

        Ok(select(weights, rng.r#gen::<f64>()))
    }

    /// Weight of a vote on `article`, spent from the charge
    pub fn vote_weight(
        &mut self,
        article: &Article,
        scales: &ArticleConfig,
        strats: &StratEnvironment,
        config: &UserConfig,
    ) -> Result<f64> {
        let distance = self.taste.distance(article.properties());
        let weight = match self.followed(strats)? {
            Some(strat) => {
                let features = [
                    Feature::with_value(FeatureType::TasteDist, distance),
                    Feature::with_value(FeatureType::RatingLn, scales.rating_feature(article.rating())),
                ];
                strat.score(&features, ActType::BetWeight, true)?
            }
            None => (1.0 - distance)
                .max(0.0)
                .powf(config.straightforward_factor_power),
        };

        let weight = weight.min(self.charge);
        self.charge -= weight;
        Ok(weight)
    }

    pub fn register_vote(&mut self, vote: VoteRef) {
        self.votes.push(vote);
    }

    /// Add a cashed-out reward
    pub fn credit(&mut self, amount: f64) {
        self.fixed_utility += amount;
    }
}

/// First index whose cumulative weight reaches `draw`; none when the weights fall short
fn select(weights: &[f64], draw: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if draw <= cumulative {
            return Some(index);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use curators_core::{RandomVariableSpec, Settings};
    use curators_evolution::{
        FeatureSpec, PhenotypeSpec, PopulationConfig, StakeBuckets, StratSpec,
    };
    use curators_rules::Rules;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn constant_spec(displacement: f64) -> StratSpec {
        let c = RandomVariableSpec::constant;
        StratSpec {
            phenotypes: ActType::ALL
                .iter()
                .map(|act| PhenotypeSpec {
                    displacement: c(displacement),
                    features: act
                        .feature_types()
                        .iter()
                        .map(|&kind| FeatureSpec {
                            kind,
                            factor: c(0.0),
                            bend: c(0.0),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn strats(displacement: f64, rng: &mut StdRng) -> StratEnvironment {
        StratEnvironment::new(
            StakeBuckets::default(),
            PopulationConfig::default(),
            &constant_spec(displacement),
            rng,
        )
        .unwrap()
    }

    fn articles(count: usize, rng: &mut StdRng) -> Vec<Article> {
        (0..count)
            .map(|slot| {
                let properties =
                    TextProperties::new(&[RandomVariableSpec::constant(0.5)], rng).unwrap();
                Article::new(slot, properties)
            })
            .collect()
    }

    fn linear_rules() -> Rules {
        let settings = Settings::from_json(
            r#"{"rules": [{"straightforwardProb": 0.0,
                "curatorsImpact": [{"operation": "push", "arg": "r"}],
                "articleReward": [{"operation": "push", "arg": "r"}]}]}"#,
        )
        .unwrap();
        Rules::from_settings(&settings, "rules.0").unwrap()
    }

    fn config() -> UserConfig {
        UserConfig {
            taste: vec![RandomVariableSpec::constant(0.25)],
            ..Default::default()
        }
    }

    #[test]
    fn test_first_pass_starts_a_session() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = config();
        let mut user = User::new(0, &config, &mut rng).unwrap();
        assert!(user.advance_pass(&config));

        user.restart(&config, &mut rng).unwrap();
        for _ in 0..config.max_passes {
            assert!(!user.advance_pass(&config));
        }
        assert!(user.advance_pass(&config));
    }

    #[test]
    fn test_spent_charge_ends_the_session() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = config();
        let mut user = User::new(0, &config, &mut rng).unwrap();
        user.restart(&config, &mut rng).unwrap();
        user.charge = 0.0005;
        assert!(user.advance_pass(&config));
    }

    #[test]
    fn test_straightforward_vote_weight() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = config();
        let strats = strats(0.0, &mut rng);
        let articles = articles(1, &mut rng);
        let mut user = User::new(0, &config, &mut rng).unwrap();

        // taste 0.25, article 0.5: (1 - 0.25)^2
        let weight = user
            .vote_weight(&articles[0], &ArticleConfig::default(), &strats, &config)
            .unwrap();
        assert_relative_eq!(weight, 0.5625);
        assert_relative_eq!(user.charge(), 1.0 - 0.5625);

        // capped by what is left
        let weight = user
            .vote_weight(&articles[0], &ArticleConfig::default(), &strats, &config)
            .unwrap();
        assert_relative_eq!(weight, 0.4375);
        assert_eq!(user.charge(), 0.0);
    }

    #[test]
    fn test_strat_vote_weight_is_the_bet_score() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = config();
        let mut strats = strats(0.0, &mut rng);
        let articles = articles(1, &mut rng);
        let mut user = User::new(0, &config, &mut rng).unwrap();
        let handle = strats.pick(1.0, &mut rng).unwrap();
        user.assign(Some(handle), 1.0);

        let weight = user
            .vote_weight(&articles[0], &ArticleConfig::default(), &strats, &config)
            .unwrap();
        assert_eq!(weight, 0.5);
    }

    #[test]
    fn test_sub_normalised_weights_may_pick_nothing() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = config();
        // every pick weight is sigmoid(-8), far below 1 in total
        let mut strats = strats(-8.0, &mut rng);
        let articles = articles(3, &mut rng);
        let mut user = User::new(0, &config, &mut rng).unwrap();
        let handle = strats.pick(1.0, &mut rng).unwrap();
        user.assign(Some(handle), 1.0);

        let mut weights = Vec::new();
        let picks: Vec<Option<usize>> = (0..200)
            .map(|_| {
                user.pick_article(&articles, &ArticleConfig::default(), &strats, &mut weights, &mut rng)
                    .unwrap()
            })
            .collect();
        assert!(picks.iter().filter(|p| p.is_none()).count() > 150);
        assert_relative_eq!(weights.iter().sum::<f64>(), 3.0 / (1.0 + 8f64.exp()), epsilon = 1e-12);
    }

    #[test]
    fn test_heavy_weights_are_normalised() {
        let mut rng = StdRng::seed_from_u64(6);
        let config = config();
        let mut strats = strats(4.0, &mut rng);
        let articles = articles(4, &mut rng);
        let mut user = User::new(0, &config, &mut rng).unwrap();
        let handle = strats.pick(1.0, &mut rng).unwrap();
        user.assign(Some(handle), 1.0);

        let mut weights = Vec::new();
        for _ in 0..50 {
            let pick = user
                .pick_article(&articles, &ArticleConfig::default(), &strats, &mut weights, &mut rng)
                .unwrap();
            assert!(pick.is_some());
        }
        assert_relative_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_utility_counts_live_votes_only() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = config();
        let rules = linear_rules();
        let mut articles = articles(2, &mut rng);
        let mut user = User::new(0, &config, &mut rng).unwrap();

        user.register_vote(articles[0].add_vote(0, 1.0, 0.5, &rules).unwrap());
        user.register_vote(articles[1].add_vote(0, 1.0, 0.5, &rules).unwrap());
        user.credit(0.25);
        let global = GlobalProps {
            reward_pool: 4.0,
            reward_func_sum: 1.0,
        };
        // each article holds half the reward sum: 2.0 each
        assert_relative_eq!(user.total_utility(&articles, &global).unwrap(), 4.25);

        articles[1].reset(&mut rng).unwrap();
        assert_relative_eq!(user.total_utility(&articles, &global).unwrap(), 2.25);
    }

    #[test]
    fn test_missing_article_is_a_violation() {
        let mut rng = StdRng::seed_from_u64(8);
        let config = config();
        let mut user = User::new(0, &config, &mut rng).unwrap();
        user.register_vote(VoteRef {
            article: 5,
            generation: 0,
            index: 0,
        });
        assert!(matches!(
            user.total_utility(&[], &GlobalProps::default()),
            Err(Error::Invariant(_))
        ));
    }

    #[test]
    fn test_select_by_cumulative_weight() {
        let weights = [0.25, 0.5];
        assert_eq!(select(&weights, 0.1), Some(0));
        assert_eq!(select(&weights, 0.25), Some(0));
        assert_eq!(select(&weights, 0.75), Some(1));
        assert_eq!(select(&weights, 0.9), None);
        assert_eq!(select(&[], 0.0), None);
    }
}
