//! Strategy inputs and their per-strat parameters

use serde::{Deserialize, Serialize};

/// Semantic tag of a feature value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    PassesLn,
    RatingLn,
    TasteDist,
    /// Untyped slot (zero strats, centroids). Never appears in settings.
    #[serde(skip)]
    Undef,
}

/// Scalar strategy input, always within [0,1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    kind: FeatureType,
    value: f64,
}

impl Feature {
    pub fn new(kind: FeatureType) -> Self {
        Self { kind, value: 0.0 }
    }

    pub fn with_value(kind: FeatureType, value: f64) -> Self {
        let mut feature = Self::new(kind);
        feature.set(value);
        feature
    }

    /// Store `value` clamped into [0,1]; NaN lands on 1
    pub fn set(&mut self, value: f64) {
        self.value = value.min(1.0).max(0.0);
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn kind(&self) -> FeatureType {
        self.kind
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Exponent that maps 0.5 to `sigmoid(-bend)`
pub fn bend_power(bend: f64) -> f64 {
    if bend == 0.0 {
        return 1.0;
    }
    0.5_f64.ln() / sigmoid(-bend).ln()
}

/// Weight and curvature a strat applies to one feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureParams {
    kind: FeatureType,
    factor: f64,
    bend: f64,
    power: f64,
}

impl FeatureParams {
    pub fn new(kind: FeatureType, factor: f64, bend: f64) -> Self {
        Self {
            kind,
            factor,
            bend,
            power: bend_power(bend),
        }
    }

    pub fn kind(&self) -> FeatureType {
        self.kind
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn bend(&self) -> f64 {
        self.bend
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn set_factor(&mut self, factor: f64) {
        self.factor = factor;
    }

    pub fn set_bend(&mut self, bend: f64) {
        self.bend = bend;
        self.power = bend_power(bend);
    }

    /// Contribution of `feature` to the score
    pub fn apply(&self, feature: &Feature) -> f64 {
        self.factor * feature.get().powf(self.power)
    }
}
