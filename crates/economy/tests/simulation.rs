//! Economy Simulation Integration Test
//!
//! Runs the full pass loop over a small economy:
//! - reward accounting invariants hold before and after every pass
//! - sessions report utility to the strats and drive evolution
//! - a fixed seed replays the same run

use approx::assert_relative_eq;
use curators_core::Settings;
use curators_economy::{Display, EconomyConfig, Environment};
use curators_evolution::StratEnvironment;
use curators_rules::Rules;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

fn uniform(min: f64, max: f64) -> serde_json::Value {
    json!({"distribution": "uniform", "min": min, "max": max})
}

fn feature(kind: &str) -> serde_json::Value {
    json!({"type": kind, "factor": uniform(-1.0, 1.0), "bend": uniform(-1.0, 1.0)})
}

fn settings(straightforward_prob: f64) -> Settings {
    Settings::from_value(json!({
        "environment": {"articlesNum": 10, "usersNum": 30, "passesNum": 3000, "articlesPeriod": 3},
        "user": {
            "charge": 1.0,
            "maxPasses": 8,
            "straightforwardFactorPower": 2.0,
            "stack": {"distribution": "pareto", "alpha": 1.5, "Xm": 1.0},
            "taste": [{"distribution": "uniform", "min": 0.0, "max": 1.0, "scaled": true}],
            "stackGroupBorders": {"min": 1.0, "borders": [5.0]}
        },
        "article": {
            "ratingLnFactor": 0.3,
            "passesLnFactor": 0.2,
            "properties": [uniform(0.0, 1.0)]
        },
        "population": {
            "init": {"clansNum": 2, "stratsNum": 6},
            "run": {"iterSize": 3, "elit": 0.5, "migrationRate": 0.2},
            "migrationProb": [{"operation": "const", "a": 0.3}]
        },
        "squelch": {"centralPointsNum": 2, "expMoving": 0.2, "extDistFactors": [1.0]},
        "strat": {
            "init": {"phenotypes": [
                {"displ": uniform(-1.0, 1.0), "features": [feature("PASSES_LN"), feature("RATING_LN")]},
                {"displ": uniform(-1.0, 1.0), "features": [feature("TASTE_DIST"), feature("RATING_LN")]}
            ]},
            "breed": {"pnxProb": 0.5, "normalD": 0.5, "uniformD": 0.5, "limit": 5.0}
        },
        "rules": [{
            "straightforwardProb": straightforward_prob,
            "curatorsImpact": [{"operation": "push", "arg": "r"}, {"operation": "pow", "p": 0.5}],
            "articleReward": [{"operation": "push", "arg": "r"}]
        }],
        "display": {"period": 1000, "strat": {"console": true}, "probs": {"console": true, "pointsNum": 5}},
        "report": {"period": 1000}
    }))
}

fn environment(settings: &Settings, seed: u64) -> Environment {
    let mut rng = StdRng::seed_from_u64(seed);
    let rules = Rules::from_settings(settings, "rules.0").unwrap();
    let strats = StratEnvironment::from_settings(settings, &mut rng).unwrap();
    Environment::from_settings(settings, rules, strats, rng).unwrap()
}

#[test]
fn test_reward_sums_stay_non_negative() {
    let settings = settings(0.2);
    let mut env = environment(&settings, 42);

    for _ in 0..env.config().simulation.passes_num {
        let global = *env.global();
        assert!(global.reward_pool >= 0.0 && global.reward_func_sum >= 0.0);
        env.step().unwrap();
        let global = *env.global();
        assert!(global.reward_pool >= 0.0, "pool {}", global.reward_pool);
        assert!(global.reward_func_sum >= 0.0, "sum {}", global.reward_func_sum);
    }
}

#[test]
fn test_sessions_feed_evolution() {
    let settings = settings(0.2);
    let mut env = environment(&settings, 7);
    let summary = env.run().unwrap();

    assert_eq!(summary.passes, 3000);
    assert!(summary.observations > 0);
    assert!(summary.cashouts >= 1000);
    assert!(summary.paid_out > 0.0);
    assert!(env.strats().populations()[0].generation() > 0);
}

#[test]
fn test_straightforward_users_never_report() {
    let settings = settings(1.0);
    let mut env = environment(&settings, 3);
    let summary = env.run().unwrap();

    assert!(summary.sessions > 0);
    assert_eq!(summary.observations, 0);
    assert!(env.users().iter().all(|user| user.strat().is_none()));
}

#[test]
fn test_first_pass_cashes_out_the_first_article() {
    let settings = settings(0.2);
    let mut env = environment(&settings, 11);
    let outcome = env.step().unwrap();

    assert_eq!(outcome.pass, 0);
    assert!(outcome.session_ended);
    let paid = outcome.cashout.unwrap();
    assert_eq!(env.articles()[0].generation(), 1);
    assert_relative_eq!(env.global().reward_pool + paid, 1.0, epsilon = 1e-12);
}

#[test]
fn test_same_seed_replays() {
    let settings = settings(0.2);
    let run = |seed: u64| {
        let mut env = environment(&settings, seed);
        for _ in 0..1500 {
            env.step().unwrap();
        }
        (env.summary().clone(), *env.global(), env.strats().snapshot())
    };
    assert_eq!(run(5), run(5));
}

#[test]
fn test_snapshots_are_written_and_reload() {
    let settings = settings(0.2);
    let dir = std::env::temp_dir().join(format!("curators-economy-{}", std::process::id()));
    let path = dir.join("_0_0.json");
    let mut env = environment(&settings, 13).with_snapshot_path(&path);
    env.run().unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let restored = StratEnvironment::load(&settings, &path, &mut rng).unwrap();
    assert_eq!(restored.snapshot(), env.strats().snapshot());
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_console_display() {
    let settings = settings(0.2);
    let config = EconomyConfig::from_settings(&settings).unwrap();
    let env = environment(&settings, 17);
    let display = Display::new(&config.display, env.strats(), std::path::Path::new("plots"));
    let mut env = env.with_display(display);
    for _ in 0..1001 {
        env.step().unwrap();
    }
}
