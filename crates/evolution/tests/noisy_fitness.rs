//! Selection under noisy fitness
//!
//! Fitness is the negated distance to a target genotype plus gaussian noise.
//! Evolution steps should pull the population towards the target even though
//! no single observation is trustworthy.

use curators_core::RandomVariableSpec;
use curators_evolution::{
    ActType, FeatureSpec, PhenotypeSpec, PopulationConfig, PopulationInit, PopulationRun,
    SquelchConfig, Strat, StratPopulation, StratSpec,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

fn spec() -> StratSpec {
    StratSpec {
        phenotypes: ActType::ALL
            .iter()
            .map(|act| PhenotypeSpec {
                displacement: RandomVariableSpec::uniform(-1.0, 1.0),
                features: act
                    .feature_types()
                    .iter()
                    .map(|&kind| FeatureSpec {
                        kind,
                        factor: RandomVariableSpec::uniform(-1.0, 1.0),
                        bend: RandomVariableSpec::uniform(-1.0, 1.0),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn mean_distance(population: &StratPopulation, target: &Strat) -> f64 {
    let total: f64 = population.strats().iter().map(|s| s.distance(target)).sum();
    total / population.len() as f64
}

#[test]
fn test_population_converges_under_noise() {
    let mut rng = StdRng::seed_from_u64(2024);
    let config = PopulationConfig {
        init: PopulationInit {
            clans_num: 2,
            strats_num: 16,
        },
        run: PopulationRun {
            iter_size: 1,
            elit: 0.5,
            migration_rate: 0.1,
        },
        squelch: SquelchConfig {
            central_points_num: 3,
            exp_moving: 0.2,
            ext_dist_factors: vec![1.0],
        },
        ..Default::default()
    };
    let mut population = StratPopulation::new(config, &spec(), &mut rng).unwrap();
    let target = Strat::zero();
    let noise = Normal::new(0.0, 0.05).unwrap();

    let initial = mean_distance(&population, &target);
    for _ in 0..(40 * population.len()) {
        let slot = population.pick(&mut rng).unwrap();
        let fitness = -population.strats()[slot].distance(&target) + noise.sample(&mut rng);
        population.observe(slot, fitness).unwrap();
    }
    let evolved = mean_distance(&population, &target);

    assert!(population.generation() >= 39);
    assert!(
        evolved < 0.75 * initial,
        "mean distance went from {initial} to {evolved}"
    );
}

#[test]
fn test_runs_replay_with_the_same_seed() {
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut population =
            StratPopulation::new(PopulationConfig::default(), &spec(), &mut rng).unwrap();
        for i in 0..100 {
            let slot = population.pick(&mut rng).unwrap();
            population.observe(slot, (i % 7) as f64).unwrap();
        }
        population.snapshot()
    };
    assert_eq!(run(9), run(9));
}
