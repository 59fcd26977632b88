//! Bounded Nelder–Mead simplex minimizer
//!
//! Derivative-free, for small dimension objectives. Every coordinate is kept
//! at or above a common lower bound by projecting trial points onto it.
//! Non-finite objective values rank as +inf.

use curators_core::{Error, Result};
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    pub lower_bound: f64,
    pub max_evaluations: usize,
    /// Relative spread of the simplex vertices that counts as converged
    pub x_tolerance: f64,
    /// Relative spread of the simplex values that counts as converged
    pub f_tolerance: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            lower_bound: 1e-20,
            max_evaluations: 4000,
            x_tolerance: 1e-10,
            f_tolerance: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
    /// False when the evaluation cap stopped the search
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    pub fn minimize<F>(&self, start: &[f64], mut objective: F) -> Result<Minimum>
    where
        F: FnMut(&[f64]) -> f64,
    {
        if start.is_empty() {
            return Err(Error::Optimizer("empty starting point".to_string()));
        }

        let n = start.len();
        let evaluations = Cell::new(0usize);
        let mut eval = |x: &[f64]| {
            evaluations.set(evaluations.get() + 1);
            let v = objective(x);
            if v.is_finite() { v } else { f64::INFINITY }
        };

        let origin = self.project(start.to_vec());
        let origin_value = eval(&origin);
        if !origin_value.is_finite() {
            return Err(Error::Optimizer(format!(
                "objective is not finite at the starting point {origin:?}"
            )));
        }

        let mut simplex = vec![(origin.clone(), origin_value)];
        for i in 0..n {
            let mut vertex = origin.clone();
            let step = if vertex[i] != 0.0 {
                0.05 * vertex[i].abs()
            } else {
                0.00025
            };
            vertex[i] += step;
            let vertex = self.project(vertex);
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }

        let mut converged = false;
        loop {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            if self.is_converged(&simplex) {
                converged = true;
                break;
            }
            if evaluations.get() >= self.max_evaluations {
                break;
            }

            let centroid: Vec<f64> = (0..n)
                .map(|i| simplex[..n].iter().map(|(x, _)| x[i]).sum::<f64>() / n as f64)
                .collect();
            let worst = simplex[n].clone();
            let toward = |coef: f64, from: &[f64]| -> Vec<f64> {
                self.project(
                    centroid
                        .iter()
                        .zip(from)
                        .map(|(c, x)| c + coef * (x - c))
                        .collect(),
                )
            };

            let reflected = toward(-REFLECT, &worst.0);
            let reflected_value = eval(&reflected);

            if reflected_value < simplex[0].1 {
                let expanded = toward(-EXPAND, &worst.0);
                let expanded_value = eval(&expanded);
                simplex[n] = if expanded_value < reflected_value {
                    (expanded, expanded_value)
                } else {
                    (reflected, reflected_value)
                };
                continue;
            }

            if reflected_value < simplex[n - 1].1 {
                simplex[n] = (reflected, reflected_value);
                continue;
            }

            let (contracted, limit) = if reflected_value < worst.1 {
                (toward(-CONTRACT, &worst.0), reflected_value)
            } else {
                (toward(CONTRACT, &worst.0), worst.1)
            };
            let contracted_value = eval(&contracted);
            if contracted_value < limit {
                simplex[n] = (contracted, contracted_value);
                continue;
            }

            let best = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk: Vec<f64> = best
                    .iter()
                    .zip(&vertex.0)
                    .map(|(b, x)| b + SHRINK * (x - b))
                    .collect();
                let shrunk = self.project(shrunk);
                let value = eval(&shrunk);
                *vertex = (shrunk, value);
            }
        }

        let (point, value) = simplex.swap_remove(0);
        if !value.is_finite() {
            return Err(Error::Optimizer(format!(
                "objective is not finite at the minimum {point:?}"
            )));
        }
        Ok(Minimum {
            point,
            value,
            evaluations: evaluations.get(),
            converged,
        })
    }

    fn project(&self, mut x: Vec<f64>) -> Vec<f64> {
        for v in &mut x {
            *v = v.max(self.lower_bound);
        }
        x
    }

    fn is_converged(&self, simplex: &[(Vec<f64>, f64)]) -> bool {
        let (best, best_value) = &simplex[0];

        let f_spread = simplex
            .iter()
            .map(|(_, v)| (v - best_value).abs())
            .fold(0.0, f64::max);
        if f_spread <= self.f_tolerance * (best_value.abs() + self.f_tolerance) {
            return true;
        }

        simplex.iter().skip(1).all(|(x, _)| {
            x.iter()
                .zip(best)
                .all(|(a, b)| (a - b).abs() <= self.x_tolerance * (b.abs() + self.lower_bound))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_bowl() {
        let nm = NelderMead::default();
        let min = nm
            .minimize(&[1.0, 1.0], |x| (x[0] - 3.0).powi(2) + (x[1] - 0.5).powi(2) * 4.0)
            .unwrap();
        assert!(min.converged);
        assert_relative_eq!(min.point[0], 3.0, epsilon = 1e-4);
        assert_relative_eq!(min.point[1], 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_rosenbrock() {
        let nm = NelderMead {
            max_evaluations: 20000,
            ..Default::default()
        };
        let min = nm
            .minimize(&[0.5, 0.5], |x| {
                (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
            })
            .unwrap();
        assert_relative_eq!(min.point[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(min.point[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_lower_bound_is_respected() {
        let nm = NelderMead {
            lower_bound: 0.25,
            ..Default::default()
        };
        let min = nm.minimize(&[2.0], |x| x[0]).unwrap();
        assert!(min.point[0] >= 0.25);
        assert_relative_eq!(min.point[0], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_a_plus_b_over_a() {
        // a + 4/a has its minimum at a = 2
        let min = NelderMead::default()
            .minimize(&[1.0], |x| x[0] + 4.0 / x[0])
            .unwrap();
        assert_relative_eq!(min.point[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(min.value, 4.0, epsilon = 1e-8);
    }

    #[test]
    fn test_non_finite_start_fails() {
        let result = NelderMead::default().minimize(&[1.0, 1.0], |_| f64::NAN);
        assert!(matches!(result, Err(Error::Optimizer(_))));
    }

    #[test]
    fn test_evaluation_cap() {
        let nm = NelderMead {
            max_evaluations: 10,
            ..Default::default()
        };
        let min = nm.minimize(&[5.0, 5.0], |x| x[0] * x[0] + x[1] * x[1]).unwrap();
        assert!(!min.converged);
        assert!(min.evaluations <= 10 + 4);
    }
}
