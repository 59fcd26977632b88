//! Curators Runner - rule-set sweeps on a worker pool
//!
//! Every configured rule set is simulated `main.copies` times. Each
//! (rule set, copy) pair is an independent job owning its own economy,
//! strategy environment and random stream:
//!
//! - **config**: the `main` settings section
//! - **job**: job planning and the body of one run
//! - **pool**: fixed-size worker threads fed over a channel
//!
//! ## Architecture
//!
//! ```text
//!   settings.json ──► plan ──► [job queue] ──► worker 0 ─┐
//!                                          ├─► worker 1 ─┼─► [reports] ──► driver
//!                                          └─► worker N ─┘
//! ```

pub mod config;
pub mod job;
pub mod pool;

pub use config::MainConfig;
pub use job::{Job, plan, run_job};
pub use pool::{JobReport, run_pool};
