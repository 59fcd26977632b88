//! Process-level settings

use curators_core::{Result, Settings};
use serde::Deserialize;
use std::path::PathBuf;

/// Settings file read when `CURATORS_SETTINGS` is unset
pub const DEFAULT_SETTINGS: &str = "settings.json";

/// Environment variable overriding the settings file path
pub const SETTINGS_ENV: &str = "CURATORS_SETTINGS";

/// Settings section `main`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainConfig {
    /// Worker threads, one per CPU when absent
    #[serde(default)]
    pub threads: Option<usize>,
    /// Only the first `rulesLimit` rule sets are run
    #[serde(default)]
    pub rules_limit: Option<usize>,
    /// Independent runs per rule set
    #[serde(default = "default_copies")]
    pub copies: usize,
    /// Base seed; job `i` runs with `seed + i`. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default = "default_plots_directory")]
    pub plots_directory: PathBuf,
}

fn default_copies() -> usize {
    1
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("environments_output")
}

fn default_plots_directory() -> PathBuf {
    PathBuf::from("plots")
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            threads: None,
            rules_limit: None,
            copies: default_copies(),
            seed: None,
            output_directory: default_output_directory(),
            plots_directory: default_plots_directory(),
        }
    }
}

impl MainConfig {
    /// The `main` section, defaults when it is absent
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.exists("main", None) {
            settings.section("main")
        } else {
            Ok(Self::default())
        }
    }

    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}
