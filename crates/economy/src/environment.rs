//! Simulation driver
//!
//! One pass lets exactly one user act: the user may end its session and
//! report the utility it earned, picks an article, and votes on it. The
//! reward pool grows every pass and articles are cashed out round-robin.

use crate::article::{Article, TextProperties};
use crate::config::EconomyConfig;
use crate::display::Display;
use crate::global::GlobalProps;
use crate::user::User;
use curators_core::{Error, Result, Settings};
use curators_evolution::StratEnvironment;
use curators_rules::Rules;
use rand::Rng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::time::Instant;

/// What happened during one pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub pass: usize,
    pub user: usize,
    /// The acting user's previous session ended this pass
    pub session_ended: bool,
    pub article: Option<usize>,
    pub weight: f64,
    /// Total paid when an article was cashed out
    pub cashout: Option<f64>,
}

/// Counters aggregated over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub passes: usize,
    pub sessions: usize,
    /// Sessions whose utility was reported to a strat
    pub observations: usize,
    pub votes: usize,
    pub cashouts: usize,
    pub paid_out: f64,
}

pub struct Environment {
    config: EconomyConfig,
    rules: Rules,
    strats: StratEnvironment,
    global: GlobalProps,
    articles: Vec<Article>,
    users: Vec<User>,
    article_cursor: usize,
    user_cursor: usize,
    pass: usize,
    /// Reused buffer of pick weights
    weights: Vec<f64>,
    rng: StdRng,
    display: Option<Display>,
    snapshot_path: Option<PathBuf>,
    summary: RunSummary,
    started: Instant,
}

impl Environment {
    pub fn new(config: EconomyConfig, rules: Rules, strats: StratEnvironment, mut rng: StdRng) -> Result<Self> {
        config.validate()?;

        let articles = (0..config.simulation.articles_num)
            .map(|slot| -> Result<Article> {
                let properties = TextProperties::new(&config.article.properties, &mut rng)?;
                Ok(Article::new(slot, properties))
            })
            .collect::<Result<Vec<_>>>()?;
        let users = (0..config.simulation.users_num)
            .map(|id| User::new(id, &config.user, &mut rng))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            weights: Vec::with_capacity(articles.len()),
            config,
            rules,
            strats,
            global: GlobalProps::default(),
            articles,
            users,
            article_cursor: 0,
            user_cursor: 0,
            pass: 0,
            rng,
            display: None,
            snapshot_path: None,
            summary: RunSummary::default(),
            started: Instant::now(),
        })
    }

    pub fn from_settings(settings: &Settings, rules: Rules, strats: StratEnvironment, rng: StdRng) -> Result<Self> {
        Self::new(EconomyConfig::from_settings(settings)?, rules, strats, rng)
    }

    /// Send projections to sinks every `display.period` passes
    pub fn with_display(mut self, display: Display) -> Self {
        self.display = Some(display);
        self
    }

    /// Write the strategy environment to `path` every `report.period` passes
    /// and at the end of the run
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn global(&self) -> &GlobalProps {
        &self.global
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn strats(&self) -> &StratEnvironment {
        &self.strats
    }

    pub fn pass(&self) -> usize {
        self.pass
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run one pass
    pub fn step(&mut self) -> Result<PassOutcome> {
        self.global.check()?;

        let pass = self.pass;
        let user_id = self.user_cursor;
        let user = &mut self.users[user_id];

        let session_ended = user.advance_pass(&self.config.user);
        if session_ended {
            if let Some(handle) = user.strat() {
                let stake = user.stake();
                if !(stake > 0.0) {
                    return Err(Error::invariant(format!("user {user_id} holds stake {stake}")));
                }
                let utility = user.total_utility(&self.articles, &self.global)?;
                self.strats.observe(handle, utility / stake)?;
                self.summary.observations += 1;
            }

            user.restart(&self.config.user, &mut self.rng)?;
            let strat = if self.rng.r#gen::<f64>() < self.rules.straightforward_prob() {
                None
            } else {
                Some(self.strats.pick(user.stake(), &mut self.rng)?)
            };
            let stake = self.strats.fix_stack_size(user.stake());
            user.assign(strat, stake);
            self.summary.sessions += 1;
        }

        let article = user.pick_article(
            &self.articles,
            &self.config.article,
            &self.strats,
            &mut self.weights,
            &mut self.rng,
        )?;
        self.global.reward_pool += self.config.simulation.emission;

        let mut weight = 0.0;
        if let Some(index) = article {
            let target = &mut self.articles[index];
            weight = user.vote_weight(target, &self.config.article, &self.strats, &self.config.user)?;
            let previous = target.reward_sum();
            let vote = target.add_vote(user_id, user.stake(), weight, &self.rules)?;
            self.global.reward_func_sum += target.reward_sum() - previous;
            user.register_vote(vote);
            self.summary.votes += 1;
        }

        let cashout = if pass % self.config.simulation.articles_period == 0 {
            Some(self.cash_out()?)
        } else {
            None
        };

        self.global.check()?;
        for article in &mut self.articles {
            article.pass();
        }
        self.user_cursor = (self.user_cursor + 1) % self.users.len();

        if pass % self.config.display.period == 0 {
            log::info!(
                "pass {pass}: pool={:.4} reward_sum={:.4} sessions={} elapsed={:.1?}",
                self.global.reward_pool,
                self.global.reward_func_sum,
                self.summary.sessions,
                self.started.elapsed()
            );
            if let Some(display) = &mut self.display {
                display.show(&self.strats)?;
            }
        }
        if pass > 0 && pass % self.config.report.period == 0 {
            self.save_snapshot()?;
        }

        self.pass += 1;
        self.summary.passes += 1;
        Ok(PassOutcome {
            pass,
            user: user_id,
            session_ended,
            article,
            weight,
            cashout,
        })
    }

    /// Cash out the article under the cursor and recycle it
    fn cash_out(&mut self) -> Result<f64> {
        let cursor = self.article_cursor;
        let article = &self.articles[cursor];
        let payout = article.cashout(&self.global);
        let reward_sum = article.reward_sum();

        for &(voter, share) in &payout.shares {
            self.users
                .get_mut(voter)
                .ok_or_else(|| Error::invariant(format!("vote by unknown user {voter}")))?
                .credit(share);
        }
        self.global.reward_pool -= payout.total;
        self.global.reward_func_sum -= reward_sum;
        self.articles[cursor].reset(&mut self.rng)?;
        self.article_cursor = (cursor + 1) % self.articles.len();

        self.summary.cashouts += 1;
        self.summary.paid_out += payout.total;
        Ok(payout.total)
    }

    fn save_snapshot(&self) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            self.strats.save(path)?;
            log::debug!("pass {}: snapshot written to {}", self.pass, path.display());
        }
        Ok(())
    }

    /// Run every remaining pass
    pub fn run(&mut self) -> Result<RunSummary> {
        log::info!(
            "run started: {} passes, {} users, {} articles, {} stake buckets",
            self.config.simulation.passes_num,
            self.users.len(),
            self.articles.len(),
            self.strats.populations().len()
        );

        while self.pass < self.config.simulation.passes_num {
            self.step()?;
        }
        self.save_snapshot()?;

        log::info!(
            "run finished after {:.1?}: {} sessions, {} votes, {:.4} paid out",
            self.started.elapsed(),
            self.summary.sessions,
            self.summary.votes,
            self.summary.paid_out
        );
        Ok(self.summary.clone())
    }
}
