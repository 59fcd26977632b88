//! Strategy genotype

use crate::feature::{Feature, FeatureParams, FeatureType, sigmoid};
use crate::snapshot::{FeatureSpec, PhenotypeSpec, StratSpec};
use crate::squelch::Tracked;
use curators_core::{Error, RandomVariableSpec, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

pub const ACTS_COUNT: usize = 2;

/// Number of features each act consumes
pub const PHENOTYPE_ARITY: [usize; ACTS_COUNT] = [2, 2];

/// Decision a strat is consulted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActType {
    /// Relative weight of an article when choosing what to read
    PickWeight,
    /// Share of the remaining charge spent on a vote
    BetWeight,
}

impl ActType {
    pub const ALL: [ActType; ACTS_COUNT] = [ActType::PickWeight, ActType::BetWeight];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn arity(self) -> usize {
        PHENOTYPE_ARITY[self.index()]
    }

    /// Features the simulation feeds into this act, in order
    pub fn feature_types(self) -> [FeatureType; 2] {
        match self {
            ActType::PickWeight => [FeatureType::PassesLn, FeatureType::RatingLn],
            ActType::BetWeight => [FeatureType::TasteDist, FeatureType::RatingLn],
        }
    }
}

/// Parameters of one act: a displacement plus one entry per feature
#[derive(Debug, Clone, PartialEq)]
pub struct Phenotype {
    pub displacement: f64,
    pub features: Vec<FeatureParams>,
}

impl Phenotype {
    fn zero(arity: usize) -> Self {
        Self {
            displacement: 0.0,
            features: vec![FeatureParams::new(FeatureType::Undef, 0.0, 0.0); arity],
        }
    }
}

/// Realized-utility accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Utility {
    /// EWMA weight, zero until the first observation
    pub weight: f64,
    /// EWMA value
    pub value: f64,
    /// Denoised estimate written by the squelch
    pub smoothed: f64,
}

impl Utility {
    pub fn observe(&mut self, value: f64, decay: f64) {
        let kept = (1.0 - decay) * self.weight;
        let weight = kept + 1.0;
        self.value = (kept * self.value + value) / weight;
        self.weight = weight;
    }
}

/// Variation operator settings (`strat.breed`)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedParams {
    /// Probability that an offspring is drawn from normals rather than uniforms
    pub pnx_prob: f64,
    /// Normal spread as a multiple of the parents' difference
    pub normal_d: f64,
    /// Uniform half-width as a multiple of the parents' difference
    pub uniform_d: f64,
    /// Every bred parameter stays within [-limit, limit]
    pub limit: f64,
}

impl Default for BreedParams {
    fn default() -> Self {
        Self {
            pnx_prob: 0.5,
            normal_d: 0.5,
            uniform_d: 0.5,
            limit: 10.0,
        }
    }
}

impl BreedParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pnx_prob) {
            return Err(Error::config("strat.breed.pnxProb", "not a probability"));
        }
        if !(self.normal_d >= 0.0 && self.uniform_d >= 0.0) {
            return Err(Error::config("strat.breed", "spreads must be non-negative"));
        }
        if !(self.limit >= 0.0) {
            return Err(Error::config("strat.breed.limit", "must be non-negative"));
        }
        Ok(())
    }

    /// One offspring value around parent `a`
    fn mix<R: Rng + ?Sized>(&self, a: f64, b: f64, normal: bool, rng: &mut R) -> Result<f64> {
        let d = (a - b).abs();
        if normal {
            let value = Normal::new(a, self.normal_d * d)
                .map_err(|e| Error::config("strat.breed.normalD", e.to_string()))?
                .sample(rng);
            Ok(value.max(-self.limit).min(self.limit))
        } else {
            let low = (a - self.uniform_d * d).max(-self.limit);
            let high = (a + self.uniform_d * d).min(self.limit);
            let value = low + (high - low) * rng.r#gen::<f64>();
            Ok(value.max(-self.limit).min(self.limit))
        }
    }
}

/// One evolvable strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Strat {
    phenotypes: [Phenotype; ACTS_COUNT],
    utility: Utility,
}

impl Strat {
    /// All parameters zero, untyped features
    pub fn zero() -> Self {
        Self {
            phenotypes: std::array::from_fn(|i| Phenotype::zero(PHENOTYPE_ARITY[i])),
            utility: Utility::default(),
        }
    }

    /// Sample every leaf of `spec`
    pub fn from_spec<R: Rng + ?Sized>(spec: &StratSpec, rng: &mut R) -> Result<Self> {
        if spec.phenotypes.len() != ACTS_COUNT {
            return Err(Error::shape(format!(
                "strat has {} phenotypes, expected {ACTS_COUNT}",
                spec.phenotypes.len()
            )));
        }

        let mut phenotypes = Vec::with_capacity(ACTS_COUNT);
        for (act, phenotype) in ActType::ALL.iter().zip(&spec.phenotypes) {
            if phenotype.features.len() != act.arity() {
                return Err(Error::shape(format!(
                    "{act:?} phenotype has {} features, expected {}",
                    phenotype.features.len(),
                    act.arity()
                )));
            }
            let displacement = phenotype.displacement.sample(rng)?;
            let mut features = Vec::with_capacity(act.arity());
            for feature in &phenotype.features {
                if feature.kind == FeatureType::Undef {
                    return Err(Error::config("strat.phenotypes.features.type", "untyped feature"));
                }
                features.push(FeatureParams::new(
                    feature.kind,
                    feature.factor.sample(rng)?,
                    feature.bend.sample(rng)?,
                ));
            }
            phenotypes.push(Phenotype {
                displacement,
                features,
            });
        }

        let phenotypes = phenotypes
            .try_into()
            .map_err(|_| Error::shape("phenotype count changed while sampling"))?;
        Ok(Self {
            phenotypes,
            utility: Utility::default(),
        })
    }

    /// Constant-leaf description of this strat
    pub fn spec(&self) -> StratSpec {
        StratSpec {
            phenotypes: self
                .phenotypes
                .iter()
                .map(|phenotype| PhenotypeSpec {
                    displacement: RandomVariableSpec::constant(phenotype.displacement),
                    features: phenotype
                        .features
                        .iter()
                        .map(|f| FeatureSpec {
                            kind: f.kind(),
                            factor: RandomVariableSpec::constant(f.factor()),
                            bend: RandomVariableSpec::constant(f.bend()),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn phenotype(&self, act: ActType) -> &Phenotype {
        &self.phenotypes[act.index()]
    }

    pub fn phenotypes(&self) -> &[Phenotype] {
        &self.phenotypes
    }

    pub fn utility(&self) -> &Utility {
        &self.utility
    }

    pub fn smoothed(&self) -> f64 {
        self.utility.smoothed
    }

    /// Score in (0,1) for `act` given its features
    pub fn score(&self, features: &[Feature], act: ActType, check_types: bool) -> Result<f64> {
        let phenotype = &self.phenotypes[act.index()];
        if features.len() != phenotype.features.len() {
            return Err(Error::shape(format!(
                "{act:?} takes {} features, got {}",
                phenotype.features.len(),
                features.len()
            )));
        }

        let mut sum = phenotype.displacement;
        for (params, feature) in phenotype.features.iter().zip(features) {
            if check_types && params.kind() != feature.kind() {
                return Err(Error::shape(format!(
                    "{act:?} expects {:?}, got {:?}",
                    params.kind(),
                    feature.kind()
                )));
            }
            sum += params.apply(feature);
        }

        Ok(sigmoid(sum).max(f64::MIN_POSITIVE).min(1.0 - f64::EPSILON))
    }

    /// Euclidean distance over every displacement, factor and bend
    pub fn distance(&self, other: &Strat) -> f64 {
        let mut sum = 0.0;
        for (a, b) in self.phenotypes.iter().zip(&other.phenotypes) {
            sum += (a.displacement - b.displacement).powi(2);
            for (fa, fb) in a.features.iter().zip(&b.features) {
                sum += (fa.factor() - fb.factor()).powi(2);
                sum += (fa.bend() - fb.bend()).powi(2);
            }
        }
        sum.sqrt()
    }

    /// Component-wise mean; zero strat for an empty input
    pub fn centroid(strats: &[&Strat]) -> Strat {
        let mut center = Strat::zero();
        let Some(first) = strats.first() else {
            return center;
        };

        let n = strats.len() as f64;
        for (p, phenotype) in center.phenotypes.iter_mut().enumerate() {
            phenotype.displacement =
                strats.iter().map(|s| s.phenotypes[p].displacement).sum::<f64>() / n;
            for (f, params) in phenotype.features.iter_mut().enumerate() {
                let factor = strats
                    .iter()
                    .map(|s| s.phenotypes[p].features[f].factor())
                    .sum::<f64>();
                let bend = strats
                    .iter()
                    .map(|s| s.phenotypes[p].features[f].bend())
                    .sum::<f64>();
                *params = FeatureParams::new(
                    first.phenotypes[p].features[f].kind(),
                    factor / n,
                    bend / n,
                );
            }
        }
        center
    }

    /// Overwrite this strat with an offspring of `a` and `b`
    pub fn breed<R: Rng + ?Sized>(
        &mut self,
        a: &Strat,
        b: &Strat,
        params: &BreedParams,
        rng: &mut R,
    ) -> Result<()> {
        let normal = rng.r#gen::<f64>() < params.pnx_prob;

        for (p, phenotype) in self.phenotypes.iter_mut().enumerate() {
            let (pa, pb) = (&a.phenotypes[p], &b.phenotypes[p]);
            phenotype.displacement = params.mix(pa.displacement, pb.displacement, normal, rng)?;
            for (f, child) in phenotype.features.iter_mut().enumerate() {
                let (fa, fb) = (&pa.features[f], &pb.features[f]);
                child.set_factor(params.mix(fa.factor(), fb.factor(), normal, rng)?);
                child.set_bend(params.mix(fa.bend(), fb.bend(), normal, rng)?);
            }
        }

        self.utility = Utility::default();
        Ok(())
    }

    pub fn observe_utility(&mut self, value: f64, decay: f64) {
        self.utility.observe(value, decay);
    }
}

impl Tracked for Strat {
    fn distance(&self, other: &Self) -> f64 {
        Strat::distance(self, other)
    }

    fn observation(&self) -> f64 {
        self.utility.value
    }

    fn weight(&self) -> f64 {
        self.utility.weight
    }

    fn set_smoothed(&mut self, value: f64) {
        self.utility.smoothed = value;
    }
}
