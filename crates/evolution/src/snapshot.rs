//! Serialized forms of strats and strategy environments
//!
//! The same [`StratSpec`] shape serves two purposes: in the settings tree
//! (`strat.init`) its leaves are arbitrary random variables sampled per strat,
//! in a snapshot every leaf is a constant.

use crate::feature::FeatureType;
use curators_core::{Error, RandomVariableSpec, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub factor: RandomVariableSpec,
    pub bend: RandomVariableSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeSpec {
    #[serde(rename = "displ")]
    pub displacement: RandomVariableSpec,
    pub features: Vec<FeatureSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratSpec {
    pub phenotypes: Vec<PhenotypeSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub clans: Vec<Vec<StratSpec>>,
}

/// One population per stake bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub populations: Vec<PopulationSnapshot>,
}

impl EnvironmentSnapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Write the snapshot, creating the parent directory when needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, content).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Snapshot file name of copy `copy` of rule set `rule`
pub fn file_name(rule: usize, copy: usize) -> String {
    format!("_{rule}_{copy}.json")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::strat::ActType;

    /// Spec with every leaf uniform over [min, max] and the feature types the
    /// simulation feeds
    pub(crate) fn uniform_spec(min: f64, max: f64) -> StratSpec {
        StratSpec {
            phenotypes: ActType::ALL
                .iter()
                .map(|act| PhenotypeSpec {
                    displacement: RandomVariableSpec::uniform(min, max),
                    features: act
                        .feature_types()
                        .iter()
                        .map(|&kind| FeatureSpec {
                            kind,
                            factor: RandomVariableSpec::uniform(min, max),
                            bend: RandomVariableSpec::uniform(min, max),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_spec_json_shape() {
        let json = r#"{
            "phenotypes": [
                {"displ": {"distribution": "constant", "val": 0.5},
                 "features": [
                    {"type": "PASSES_LN",
                     "factor": {"distribution": "uniform", "min": -1.0, "max": 1.0},
                     "bend": {"distribution": "constant", "val": 0.0}},
                    {"type": "RATING_LN",
                     "factor": {"distribution": "constant", "val": 1.0},
                     "bend": {"distribution": "constant", "val": 0.0}}
                 ]},
                {"displ": {"distribution": "constant", "val": 0.0},
                 "features": []}
            ]
        }"#;
        let spec: StratSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.phenotypes.len(), 2);
        assert_eq!(spec.phenotypes[0].features[1].kind, FeatureType::RatingLn);
        assert_eq!(
            spec.phenotypes[0].displacement,
            RandomVariableSpec::constant(0.5)
        );
    }

    #[test]
    fn test_constant_leaves_serialize_compactly() {
        let json = serde_json::to_value(RandomVariableSpec::constant(1.25)).unwrap();
        assert_eq!(json, serde_json::json!({"distribution": "constant", "val": 1.25}));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EnvironmentSnapshot::load("/nonexistent/curators/_0_0.json");
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(2, 5), "_2_5.json");
    }
}
