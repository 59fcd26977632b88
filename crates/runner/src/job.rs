//! Job planning and execution

use crate::config::MainConfig;
use curators_core::{Error, Result, Settings};
use curators_economy::{Display, EconomyConfig, Environment, RunSummary};
use curators_evolution::StratEnvironment;
use curators_evolution::snapshot::file_name;
use curators_rules::Rules;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

/// One independent run: rule set `rule`, copy `copy`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub index: usize,
    pub rule: usize,
    pub copy: usize,
    pub seed: Option<u64>,
    /// Snapshot to resume the strategy environment from
    pub resume: Option<PathBuf>,
    /// Where the strategy environment snapshot is written
    pub output: PathBuf,
    pub plots: PathBuf,
}

impl Job {
    pub fn name(&self) -> String {
        format!("_{}_{}", self.rule, self.copy)
    }
}

/// Every (rule set, copy) pair in rule-major order
pub fn plan(settings: &Settings, main: &MainConfig, resume: Option<&Path>) -> Result<Vec<Job>> {
    let available = settings.len("rules");
    if available == 0 {
        return Err(Error::config("rules", "no rule sets configured"));
    }
    let rules = main.rules_limit.unwrap_or(available).min(available);

    let mut jobs = Vec::with_capacity(rules * main.copies);
    for rule in 0..rules {
        for copy in 0..main.copies {
            let index = jobs.len();
            let file = file_name(rule, copy);
            jobs.push(Job {
                index,
                rule,
                copy,
                seed: main.seed.map(|seed| seed.wrapping_add(index as u64)),
                resume: resume.map(|dir| dir.join(&file)),
                output: main.output_directory.join(&file),
                plots: main.plots_directory.join(format!("_{rule}_{copy}")),
            });
        }
    }
    Ok(jobs)
}

/// Build and run the economy of `job`
pub fn run_job(settings: &Settings, job: &Job) -> Result<RunSummary> {
    log::info!("job {} (rules {}, copy {}) starting", job.index, job.rule, job.copy);

    let rules = Rules::from_settings(settings, &format!("rules.{}", job.rule))?;
    let mut rng = match job.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let strats = match &job.resume {
        Some(path) => {
            log::info!("job {}: resuming from {}", job.index, path.display());
            StratEnvironment::load(settings, path, &mut rng)?
        }
        None => StratEnvironment::from_settings(settings, &mut rng)?,
    };

    let config = EconomyConfig::from_settings(settings)?;
    let display = config
        .display
        .enable
        .then(|| Display::new(&config.display, &strats, &job.plots));

    let mut environment =
        Environment::new(config, rules, strats, rng)?.with_snapshot_path(&job.output);
    if let Some(display) = display {
        environment = environment.with_display(display);
    }
    environment.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::from_json(
            r#"{"rules": [{"straightforwardProb": 0.1}, {"straightforwardProb": 0.2}, {"straightforwardProb": 0.3}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_plan_is_rule_major() {
        let main = MainConfig {
            copies: 2,
            seed: Some(10),
            ..Default::default()
        };
        let jobs = plan(&settings(), &main, None).unwrap();
        let pairs: Vec<(usize, usize)> = jobs.iter().map(|j| (j.rule, j.copy)).collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
        assert_eq!(jobs[3].seed, Some(13));
        assert_eq!(jobs[3].output, PathBuf::from("environments_output/_1_1.json"));
        assert_eq!(jobs[3].resume, None);
    }

    #[test]
    fn test_rules_limit() {
        let main = MainConfig {
            rules_limit: Some(2),
            ..Default::default()
        };
        let jobs = plan(&settings(), &main, Some(Path::new("previous"))).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].resume, Some(PathBuf::from("previous/_1_0.json")));
        assert_eq!(jobs[1].seed, None);
        assert_eq!(jobs[1].name(), "_1_0");
    }

    #[test]
    fn test_no_rules_is_a_configuration_error() {
        let settings = Settings::from_json(r#"{"rules": []}"#).unwrap();
        assert!(matches!(
            plan(&settings, &MainConfig::default(), None),
            Err(Error::Configuration { .. })
        ));
    }
}
