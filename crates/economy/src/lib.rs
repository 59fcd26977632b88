//! Curators Economy
//!
//! Stochastic content economy whose outcomes are the fitness signal of the
//! curator strategies:
//!
//! - **article**: fixed article pool, arena-owned votes and cashouts
//! - **user**: curators acting in sessions, with or without a strat
//! - **global**: reward pool accounting and its invariants
//! - **environment**: the pass loop tying users, articles and strats together
//! - **display**: periodic projections of the strategy environment
//! - **config**: the settings sections read by the economy

pub mod article;
pub mod config;
pub mod display;
pub mod environment;
pub mod global;
pub mod user;

pub use article::{Article, Payout, TextProperties, Vote, VoteRef};
pub use config::{ArticleConfig, DisplayConfig, EconomyConfig, ReportConfig, SimulationConfig, UserConfig};
pub use display::Display;
pub use environment::{Environment, PassOutcome, RunSummary};
pub use global::GlobalProps;
pub use user::User;
