//! Noisy-fitness smoothing
//!
//! Every tracked element carries a noisy observation of its fitness. The
//! squelch fits, per group, how fast observation noise grows with genotype
//! distance and replaces each member's fitness by a distance-weighted average
//! over the whole history:
//!
//! 1. take the group member `x` with the highest observation
//! 2. estimate its true fitness `fx` from its `centralPointsNum` nearest group members
//! 3. fit `dispersion` and `distFactor` minimising
//!    `Σ a_i + (obs_i - fx)² / a_i` with `a_i = dispersion · (1 + distFactor · d(x, i))`
//! 4. smoothed(m) = weighted mean of all observations with
//!    weights `1 / (1 + distFactor · extDistFactor · d(m, j))`

use crate::optimizer::NelderMead;
use curators_core::{Error, Result};
use serde::Deserialize;

/// Element whose noisy fitness the squelch smooths
pub trait Tracked {
    fn distance(&self, other: &Self) -> f64;

    /// Raw fitness observation, zero when never observed
    fn observation(&self) -> f64;

    /// Confidence in the observation, zero when never observed
    fn weight(&self) -> f64;

    fn set_smoothed(&mut self, value: f64);
}

/// Settings section `squelch`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquelchConfig {
    /// Group members averaged to estimate the best member's true fitness
    pub central_points_num: usize,
    /// EWMA decay applied to every utility observation
    pub exp_moving: f64,
    /// Per-group multiplier of the fitted distance factor, cycled over groups
    #[serde(default)]
    pub ext_dist_factors: Vec<f64>,
}

impl Default for SquelchConfig {
    fn default() -> Self {
        Self {
            central_points_num: 2,
            exp_moving: 0.1,
            ext_dist_factors: Vec::new(),
        }
    }
}

/// Fitted noise model of one group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquelchParams {
    pub dispersion: f64,
    pub dist_factor: f64,
}

impl Default for SquelchParams {
    fn default() -> Self {
        Self {
            dispersion: 1.0,
            dist_factor: 1.0,
        }
    }
}

const MIN_WEIGHT_SUM: f64 = 1e-20;
const MAX_FOREIGN_WEIGHT: f64 = 0.999;

#[derive(Debug, Clone)]
pub struct Squelch {
    central_points_num: usize,
    ext_dist_factors: Vec<f64>,
    params: Vec<SquelchParams>,
    optimizer: NelderMead,
}

impl Squelch {
    pub fn new(config: &SquelchConfig) -> Self {
        Self {
            central_points_num: config.central_points_num,
            ext_dist_factors: config.ext_dist_factors.clone(),
            params: Vec::new(),
            optimizer: NelderMead::default(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: NelderMead) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Last fitted parameters per group
    pub fn params(&self) -> &[SquelchParams] {
        &self.params
    }

    fn ext_dist_factor(&self, group: usize) -> f64 {
        if self.ext_dist_factors.is_empty() {
            1.0
        } else {
            self.ext_dist_factors[group % self.ext_dist_factors.len()]
        }
    }

    /// Refit every group and write the smoothed fitness of its members.
    /// `groups` hold indices into `history`.
    pub fn smooth<T: Tracked>(&mut self, history: &mut [T], groups: &[Vec<usize>]) -> Result<()> {
        self.params.resize(groups.len(), SquelchParams::default());

        for (g, group) in groups.iter().enumerate() {
            let params = self.fit(history, group, self.params[g])?;
            log::debug!(
                "squelch group {g}: dispersion={:.4e} dist_factor={:.4e}",
                params.dispersion,
                params.dist_factor
            );
            self.params[g] = params;
            update(history, group, params.dist_factor * self.ext_dist_factor(g))?;
        }
        Ok(())
    }

    /// Fit the noise model of `group`, warm-started from `start`
    pub fn fit<T: Tracked>(
        &self,
        history: &[T],
        group: &[usize],
        start: SquelchParams,
    ) -> Result<SquelchParams> {
        let central = self.central_points_num;
        if central == 0 || central > group.len() {
            return Err(Error::invariant(format!(
                "squelch needs 1..={} central points, configured {central}",
                group.len()
            )));
        }

        let best = group
            .iter()
            .copied()
            .max_by(|&a, &b| history[a].observation().total_cmp(&history[b].observation()))
            .ok_or_else(|| Error::invariant("squelch group is empty"))?;

        let distances: Vec<f64> = history.iter().map(|h| history[best].distance(h)).collect();

        let mut nearest = group.to_vec();
        nearest.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
        let fx = nearest[..central]
            .iter()
            .map(|&i| history[i].observation())
            .sum::<f64>()
            / central as f64;

        let bias: Vec<f64> = history
            .iter()
            .map(|h| (h.observation() - fx).powi(2))
            .collect();

        let minimum = self.optimizer.minimize(&[start.dispersion, start.dist_factor], |p| {
            distances
                .iter()
                .zip(&bias)
                .map(|(d, b)| {
                    let a = p[0] * (1.0 + p[1] * d);
                    a + b / a
                })
                .sum()
        })?;

        if !minimum.converged {
            return Err(Error::Optimizer(format!(
                "squelch fit did not converge within {} evaluations",
                minimum.evaluations
            )));
        }

        Ok(SquelchParams {
            dispersion: minimum.point[0],
            dist_factor: minimum.point[1],
        })
    }
}

fn update<T: Tracked>(history: &mut [T], group: &[usize], dist_factor: f64) -> Result<()> {
    let mut smoothed = Vec::with_capacity(group.len());

    for &i in group {
        let (mut sum, mut weights) = (0.0, 0.0);
        for (j, other) in history.iter().enumerate() {
            let mut w = 1.0 / (1.0 + dist_factor * history[i].distance(other));
            if j != i {
                w = w.min(MAX_FOREIGN_WEIGHT);
            }
            w *= other.weight();
            sum += w * other.observation();
            weights += w;
        }
        if weights < MIN_WEIGHT_SUM {
            return Err(Error::invariant(format!(
                "smoothing weights of element {i} vanish ({weights:e})"
            )));
        }
        smoothed.push(sum / weights);
    }

    for (&i, value) in group.iter().zip(smoothed) {
        history[i].set_smoothed(value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Point on a line with a fixed observation
    #[derive(Debug, Clone)]
    struct Point {
        x: f64,
        obs: f64,
        weight: f64,
        smoothed: f64,
    }

    impl Point {
        fn new(x: f64, obs: f64) -> Self {
            Self {
                x,
                obs,
                weight: 1.0,
                smoothed: f64::NAN,
            }
        }
    }

    impl Tracked for Point {
        fn distance(&self, other: &Self) -> f64 {
            (self.x - other.x).abs()
        }
        fn observation(&self) -> f64 {
            self.obs
        }
        fn weight(&self) -> f64 {
            self.weight
        }
        fn set_smoothed(&mut self, value: f64) {
            self.smoothed = value;
        }
    }

    fn squelch(central: usize) -> Squelch {
        Squelch::new(&SquelchConfig {
            central_points_num: central,
            ..Default::default()
        })
    }

    fn noisy_line() -> Vec<Point> {
        // fitness 1 - |x| plus alternating noise
        (0..20)
            .map(|i| {
                let x = i as f64 / 10.0 - 1.0;
                let noise = if i % 2 == 0 { 0.1 } else { -0.1 };
                Point::new(x, 1.0 - x.abs() + noise)
            })
            .collect()
    }

    #[test]
    fn test_central_points_must_fit_the_group() {
        let mut points = noisy_line();
        let groups = vec![(0..4).collect::<Vec<_>>()];
        assert!(matches!(
            squelch(0).smooth(&mut points, &groups),
            Err(Error::Invariant(_))
        ));
        assert!(matches!(
            squelch(5).smooth(&mut points, &groups),
            Err(Error::Invariant(_))
        ));
        assert!(squelch(4).smooth(&mut points, &groups).is_ok());
    }

    #[test]
    fn test_smoothing_is_a_weighted_mean() {
        let mut points = noisy_line();
        let groups = vec![(0..10).collect::<Vec<_>>(), (10..20).collect::<Vec<_>>()];
        let mut s = squelch(3);
        s.smooth(&mut points, &groups).unwrap();

        let (low, high) = points
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.obs), hi.max(p.obs)));
        for p in &points {
            assert!(p.smoothed >= low - 1e-12 && p.smoothed <= high + 1e-12);
        }
        assert_eq!(s.params().len(), 2);
        for params in s.params() {
            assert!(params.dispersion >= 1e-20 && params.dist_factor >= 1e-20);
        }
    }

    #[test]
    fn test_identical_observations_stay_put() {
        let mut points: Vec<Point> = (0..6).map(|i| Point::new(i as f64, 0.4)).collect();
        let groups = vec![(0..6).collect::<Vec<_>>()];
        squelch(2).smooth(&mut points, &groups).unwrap();
        for p in &points {
            assert_relative_eq!(p.smoothed, 0.4, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unobserved_history_is_an_invariant_violation() {
        let mut points: Vec<Point> = (0..3)
            .map(|i| Point {
                weight: 0.0,
                ..Point::new(i as f64, 0.0)
            })
            .collect();
        let groups = vec![vec![0, 1, 2]];
        assert!(matches!(
            squelch(1).smooth(&mut points, &groups),
            Err(Error::Invariant(_))
        ));
    }

    #[test]
    fn test_unobserved_members_borrow_from_neighbours() {
        let mut points = vec![Point::new(0.0, 1.0), Point::new(0.1, 3.0)];
        points[1].weight = 0.0;
        let groups = vec![vec![0, 1]];
        squelch(2).smooth(&mut points, &groups).unwrap();
        assert_relative_eq!(points[1].smoothed, 1.0);
    }

    #[test]
    fn test_unconverged_fit_is_an_optimizer_failure() {
        let points = noisy_line();
        let group: Vec<usize> = (0..6).collect();
        let s = squelch(2).with_optimizer(NelderMead {
            max_evaluations: 3,
            ..Default::default()
        });
        assert!(matches!(
            s.fit(&points, &group, SquelchParams::default()),
            Err(Error::Optimizer(_))
        ));
    }

    #[test]
    fn test_ext_dist_factors_cycle() {
        let s = Squelch::new(&SquelchConfig {
            ext_dist_factors: vec![1.0, 2.0],
            ..Default::default()
        });
        assert_eq!(s.ext_dist_factor(0), 1.0);
        assert_eq!(s.ext_dist_factor(1), 2.0);
        assert_eq!(s.ext_dist_factor(2), 1.0);
    }
}
