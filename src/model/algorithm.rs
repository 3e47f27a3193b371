// src/model/algorithm.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use super::window::{WindowType, WindowTypeKey};

/// Identity of an algorithm node: `(name, version)`.
///
/// Versions are never mutated in place; a new version is a new node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlgorithmKey {
    pub name: String,
    pub version: String,
}

impl AlgorithmKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for AlgorithmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// The payload kind an algorithm promises to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    #[default]
    None,
    Value,
    Array,
    Struct,
}

/// Directed edge `dependent -> depends-on`, annotated with the processor
/// expected to serve the dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmDependency {
    pub name: String,
    pub version: String,
    pub processor: String,
}

impl AlgorithmDependency {
    pub fn key(&self) -> AlgorithmKey {
        AlgorithmKey::new(self.name.clone(), self.version.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    pub name: String,
    pub version: String,
    /// The window type that triggers this algorithm.
    pub window_type: WindowType,
    #[serde(default)]
    pub dependencies: Vec<AlgorithmDependency>,
    #[serde(default)]
    pub result_shape: ResultShape,
}

impl Algorithm {
    pub fn key(&self) -> AlgorithmKey {
        AlgorithmKey::new(self.name.clone(), self.version.clone())
    }

    pub fn window_type_key(&self) -> WindowTypeKey {
        self.window_type.key()
    }

    pub fn dependency_keys(&self) -> impl Iterator<Item = AlgorithmKey> + '_ {
        self.dependencies.iter().map(AlgorithmDependency::key)
    }
}
