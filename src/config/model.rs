// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::EngineSettings;
use crate::exec::HeartbeatSettings;
use crate::model::{
    Algorithm, AlgorithmDependency, ProcessorRegistration, ResultShape, WindowType,
};

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [coordinator]
/// heartbeat_interval_ms = 5000
/// heartbeat_timeout_ms = 2000
/// max_missed_heartbeats = 3
///
/// [processor.stats]
/// runtime = "python3.11"
/// connection = "localhost:5377"
///
/// [[processor.stats.algorithm]]
/// name = "mean"
/// version = "1.0.0"
/// window_type = { name = "daily", version = "1" }
/// result = "value"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub coordinator: CoordinatorSection,

    /// Static processor manifest from `[processor.<name>]`.
    #[serde(default)]
    pub processor: BTreeMap<String, ProcessorConfig>,
}

/// `[coordinator]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorSection {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Upper bound on one heartbeat round trip. Must not exceed the interval.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,

    /// Consecutive missed heartbeats before a processor is declared lost.
    #[serde(default = "default_max_missed_heartbeats")]
    pub max_missed_heartbeats: u32,

    /// Buffer size of each execution's event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_heartbeat_interval_ms() -> u64 {
    5_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    2_000
}

fn default_max_missed_heartbeats() -> u32 {
    3
}

fn default_event_channel_capacity() -> usize {
    64
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            max_missed_heartbeats: default_max_missed_heartbeats(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl CoordinatorSection {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            event_channel_capacity: self.event_channel_capacity,
            heartbeat: HeartbeatSettings {
                interval: Duration::from_millis(self.heartbeat_interval_ms),
                timeout: Duration::from_millis(self.heartbeat_timeout_ms),
                max_missed: self.max_missed_heartbeats,
            },
        }
    }
}

/// `[processor.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    pub runtime: String,
    pub connection: String,

    /// `[[processor.<name>.algorithm]]` entries.
    #[serde(default)]
    pub algorithm: Vec<AlgorithmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlgorithmConfig {
    pub name: String,
    pub version: String,
    pub window_type: WindowType,
    #[serde(default)]
    pub result: ResultShape,
    #[serde(default)]
    pub depends_on: Vec<DependencyConfig>,
}

/// One `depends_on` entry. `processor` defaults to the declaring processor.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub processor: Option<String>,
}

impl ProcessorConfig {
    pub fn to_registration(&self, name: &str) -> ProcessorRegistration {
        ProcessorRegistration {
            name: name.to_string(),
            runtime: self.runtime.clone(),
            connection_str: self.connection.clone(),
            supported_algorithms: self
                .algorithm
                .iter()
                .map(|algorithm| Algorithm {
                    name: algorithm.name.clone(),
                    version: algorithm.version.clone(),
                    window_type: algorithm.window_type.clone(),
                    dependencies: algorithm
                        .depends_on
                        .iter()
                        .map(|dep| AlgorithmDependency {
                            name: dep.name.clone(),
                            version: dep.version.clone(),
                            processor: dep.processor.clone().unwrap_or_else(|| name.to_string()),
                        })
                        .collect(),
                    result_shape: algorithm.result,
                })
                .collect(),
        }
    }
}

/// Validated configuration.
///
/// Obtained only through `TryFrom<RawConfigFile>`, so holding one means the
/// timings are sane and the manifest registers cleanly.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub coordinator: CoordinatorSection,
    /// Manifest registrations, in an order in which they register cleanly.
    pub registrations: Vec<ProcessorRegistration>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        coordinator: CoordinatorSection,
        registrations: Vec<ProcessorRegistration>,
    ) -> Self {
        Self {
            coordinator,
            registrations,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        self.coordinator.engine_settings()
    }
}
