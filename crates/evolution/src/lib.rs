//! Curators Evolution
//!
//! Co-evolution engine for curator strategies:
//!
//! - **feature**: clamped strategy inputs and the per-strat parameters applied to them
//! - **strat**: the genotype, its scores, distance, centroid and breeding
//! - **squelch**: noisy-fitness smoothing over a genotype metric
//! - **optimizer**: bounded Nelder–Mead used by the squelch fit
//! - **population**: clans over a strat arena, round-robin picks and evolution steps
//! - **environment**: one population per stake bucket
//! - **snapshot**: JSON forms of strats and environments
//! - **projection**: strategy views sent to report sinks
//!
//! All randomness comes from the caller's `Rng`; a run seeded with the same
//! value replays exactly.

pub mod environment;
pub mod feature;
pub mod optimizer;
pub mod population;
pub mod projection;
pub mod snapshot;
pub mod squelch;
pub mod strat;

pub use environment::{StakeBuckets, StratEnvironment, StratHandle};
pub use feature::{Feature, FeatureParams, FeatureType};
pub use population::{PopulationConfig, PopulationInit, PopulationRun, StratPopulation};
pub use snapshot::{EnvironmentSnapshot, FeatureSpec, PhenotypeSpec, PopulationSnapshot, StratSpec};
pub use squelch::{Squelch, SquelchConfig, SquelchParams, Tracked};
pub use strat::{ActType, BreedParams, Phenotype, Strat, Utility};
