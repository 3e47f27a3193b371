// src/model/window.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a window type: `(name, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowTypeKey {
    pub name: String,
    pub version: String,
}

impl WindowTypeKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for WindowTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl FromStr for WindowTypeKey {
    type Err = String;

    /// Parses `name@version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().rsplit_once('@') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(WindowTypeKey::new(name, version))
            }
            _ => Err(format!(
                "invalid window type '{s}' (expected NAME@VERSION, e.g. daily@1)"
            )),
        }
    }
}

/// The category of a window. Algorithms subscribe to a window type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowType {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
}

impl WindowType {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
        }
    }

    pub fn key(&self) -> WindowTypeKey {
        WindowTypeKey::new(self.name.clone(), self.version.clone())
    }
}

/// One triggering event, bounded by `[time_from, time_to)`.
///
/// Immutable once emitted; an execution context holds it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
    pub window_type_name: String,
    pub window_type_version: String,
    /// Identifier of whatever emitted this window.
    pub origin: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Window {
    pub fn window_type(&self) -> WindowTypeKey {
        WindowTypeKey::new(
            self.window_type_name.clone(),
            self.window_type_version.clone(),
        )
    }

    /// Whether `[time_from, time_to)` intersects the given range.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.time_from < to && from < self.time_to
    }
}
