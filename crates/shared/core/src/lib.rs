//! Curators Core
//!
//! Shared kernel used by every crate in the workspace:
//!
//! - **error**: the run-fatal error taxonomy
//! - **settings**: the dot-path addressed settings tree loaded once per process
//! - **random**: configured random variables and their sampled values
//!
//! Nothing here owns global state. Settings and the random stream are explicit
//! objects handed to the components that need them.

pub mod error;
pub mod random;
pub mod settings;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use random::{Distribution, RandomValue, RandomVariableSpec};
pub use settings::Settings;
