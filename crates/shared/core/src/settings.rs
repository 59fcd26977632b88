//! Settings tree
//!
//! Read-only JSON tree loaded once at process start and passed by reference to
//! every component. Nodes are addressed by dot paths; array elements are
//! addressed by their index, so `rules.0.curatorsImpact` is the first rule
//! set's impact function.

use crate::{Error, RandomVariableSpec, Result};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Settings {
    root: Value,
}

impl Settings {
    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        let root = serde_json::from_str(&content).map_err(|source| Error::Json {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let root = serde_json::from_str(json).map_err(|source| Error::Json {
            path: "<inline>".to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.root);
        }
        path.split('.').try_fold(&self.root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Node at `path`, or a configuration error naming the path
    pub fn node(&self, path: &str) -> Result<&Value> {
        self.lookup(path)
            .ok_or_else(|| Error::config(path, "node does not exist"))
    }

    /// Whether `path` exists and, when `name` is given, carries that attribute
    pub fn exists(&self, path: &str, name: Option<&str>) -> bool {
        match (self.lookup(path), name) {
            (Some(_), None) => true,
            (Some(Value::Object(map)), Some(name)) => map.contains_key(name),
            _ => false,
        }
    }

    /// Numeric attribute `name` of the node at `path`
    pub fn get(&self, path: &str, name: &str) -> Result<f64> {
        self.attribute(path, name)
    }

    /// Typed attribute `name` of the node at `path`
    pub fn attribute<T: DeserializeOwned>(&self, path: &str, name: &str) -> Result<T> {
        let full = join(path, name);
        let value = self
            .node(path)?
            .get(name)
            .ok_or_else(|| Error::config(&full, "attribute does not exist"))?;
        T::deserialize(value).map_err(|e| Error::config(&full, e.to_string()))
    }

    /// Deserialize the whole node at `path`
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        T::deserialize(self.node(path)?).map_err(|e| Error::config(path, e.to_string()))
    }

    /// Random variable described by the node at `path`
    pub fn random_variable(&self, path: &str) -> Result<RandomVariableSpec> {
        self.section(path)
    }

    /// One draw of the random variable described at `path`
    pub fn sample<R: Rng + ?Sized>(&self, path: &str, rng: &mut R) -> Result<f64> {
        self.random_variable(path)?.sample(rng)
    }

    /// Number of elements of the array at `path` (zero when absent or not an array)
    pub fn len(&self, path: &str) -> usize {
        match self.lookup(path) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}
