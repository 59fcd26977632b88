//! Strategy projections sent to report sinks
//!
//! Two views of a strategy environment:
//!
//! - strat parameters: one point per strat, projections `phen{p}` (displacement)
//!   and `phen{p}.f{i}` (factor, bend), colored by stake bucket
//! - probability surfaces: population mean score while sweeping one feature
//!   over [0,1] with the others held at 0.5, or both features of an act over a
//!   grid when `heatmap` is set

use crate::environment::StratEnvironment;
use crate::feature::Feature;
use crate::strat::ActType;
use curators_core::{Error, Result};
use curators_report::{ProjectedData, ProjectionSpec};

const HELD_FEATURE_VALUE: f64 = 0.5;

fn phenotype_name(act: ActType) -> String {
    format!("phen{}", act.index())
}

fn feature_name(act: ActType, feature: usize) -> String {
    format!("phen{}.f{feature}", act.index())
}

/// Projections of [`StratEnvironment::send_strats`]; the data is colored
pub fn strat_structure() -> Vec<ProjectionSpec> {
    let mut structure = Vec::new();
    for act in ActType::ALL {
        structure.push(ProjectionSpec::new(phenotype_name(act), &["displ"]));
        for f in 0..act.arity() {
            structure.push(ProjectionSpec::new(feature_name(act, f), &["factor", "bend"]));
        }
    }
    structure
}

/// Projections of [`StratEnvironment::send_probs`]; the data is not colored
pub fn probs_structure(populations: usize, heatmap: bool) -> Vec<ProjectionSpec> {
    let mut structure = Vec::new();
    for population in 0..populations {
        for act in ActType::ALL {
            if heatmap {
                structure.push(ProjectionSpec::new(
                    format!("p_{population}_{}", phenotype_name(act)),
                    &["f0", "f1", "prob"],
                ));
            } else {
                for f in 0..act.arity() {
                    structure.push(ProjectionSpec::new(
                        format!("p_{population}_{}", feature_name(act, f)),
                        &["val", "prob"],
                    ));
                }
            }
        }
    }
    structure
}

fn grid(points_num: usize) -> Result<Vec<f64>> {
    if points_num < 2 {
        return Err(Error::config("display.probs.pointsNum", "needs at least 2 points"));
    }
    let last = (points_num - 1) as f64;
    Ok((0..points_num).map(|i| i as f64 / last).collect())
}

fn held_features(act: ActType) -> Vec<Feature> {
    act.feature_types()
        .iter()
        .map(|&kind| Feature::with_value(kind, HELD_FEATURE_VALUE))
        .collect()
}

impl StratEnvironment {
    /// One point per strat of every bucket
    pub fn send_strats(&self, sink: &mut ProjectedData) -> Result<()> {
        sink.start_sending();
        for (bucket, population) in self.populations().iter().enumerate() {
            let color = bucket as f64;
            for strat in population.strats() {
                for act in ActType::ALL {
                    let phenotype = strat.phenotype(act);
                    sink.set(&phenotype_name(act), vec![phenotype.displacement, color])?;
                    for (f, params) in phenotype.features.iter().enumerate() {
                        sink.set(
                            &feature_name(act, f),
                            vec![params.factor(), params.bend(), color],
                        )?;
                    }
                }
                sink.advance();
            }
        }
        Ok(())
    }

    /// Mean act probabilities of every bucket's population
    pub fn send_probs(&self, sink: &mut ProjectedData, points_num: usize, heatmap: bool) -> Result<()> {
        let grid = grid(points_num)?;

        for (index, population) in self.populations().iter().enumerate() {
            for act in ActType::ALL {
                if heatmap {
                    let name = format!("p_{index}_{}", phenotype_name(act));
                    let mut features = held_features(act);
                    sink.start_sending();
                    for &x in &grid {
                        for &y in &grid {
                            features[0].set(x);
                            features[1].set(y);
                            let prob = population.average_score(&features, act)?;
                            sink.set(&name, vec![x, y, prob])?;
                            sink.advance();
                        }
                    }
                    continue;
                }

                for f in 0..act.arity() {
                    let name = format!("p_{index}_{}", feature_name(act, f));
                    let mut features = held_features(act);
                    sink.start_sending();
                    for &v in &grid {
                        features[f].set(v);
                        let prob = population.average_score(&features, act)?;
                        sink.set(&name, vec![v, prob])?;
                        sink.advance();
                    }
                }
            }
        }
        Ok(())
    }
}
