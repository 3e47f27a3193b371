#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use orca::model::{
    Algorithm, AlgorithmDependency, AlgorithmKey, ProcessorRegistration, ResultShape, Window,
    WindowType,
};

/// `name@1`, the version every builder uses unless told otherwise.
pub fn key(name: &str) -> AlgorithmKey {
    AlgorithmKey::new(name, "1")
}

/// A one-day window of type `name@version` starting 2024-01-01.
pub fn window(name: &str, version: &str) -> Window {
    window_at(
        name,
        version,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Duration::days(1),
    )
}

pub fn window_at(
    name: &str,
    version: &str,
    time_from: DateTime<Utc>,
    length: Duration,
) -> Window {
    Window {
        time_from,
        time_to: time_from + length,
        window_type_name: name.to_string(),
        window_type_version: version.to_string(),
        origin: "test".to_string(),
        metadata: BTreeMap::new(),
    }
}

/// Builder for `Algorithm`. Defaults: version `1`, window type `daily@1`,
/// result shape `value`, no dependencies.
pub struct AlgorithmBuilder {
    algorithm: Algorithm,
}

impl AlgorithmBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            algorithm: Algorithm {
                name: name.to_string(),
                version: "1".to_string(),
                window_type: WindowType::new("daily", "1"),
                dependencies: Vec::new(),
                result_shape: ResultShape::Value,
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.algorithm.version = version.to_string();
        self
    }

    pub fn window_type(mut self, name: &str, version: &str) -> Self {
        self.algorithm.window_type = WindowType::new(name, version);
        self
    }

    pub fn result(mut self, shape: ResultShape) -> Self {
        self.algorithm.result_shape = shape;
        self
    }

    /// Depend on `name@1` served by `processor`.
    pub fn depends_on(self, name: &str, processor: &str) -> Self {
        self.depends_on_version(name, "1", processor)
    }

    pub fn depends_on_version(mut self, name: &str, version: &str, processor: &str) -> Self {
        self.algorithm.dependencies.push(AlgorithmDependency {
            name: name.to_string(),
            version: version.to_string(),
            processor: processor.to_string(),
        });
        self
    }

    pub fn build(self) -> Algorithm {
        self.algorithm
    }
}

/// Builder for `ProcessorRegistration`.
pub struct RegistrationBuilder {
    registration: ProcessorRegistration,
}

impl RegistrationBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            registration: ProcessorRegistration {
                name: name.to_string(),
                runtime: "python3.11".to_string(),
                connection_str: format!("{name}:5377"),
                supported_algorithms: Vec::new(),
            },
        }
    }

    pub fn connection(mut self, connection: &str) -> Self {
        self.registration.connection_str = connection.to_string();
        self
    }

    pub fn algorithm(mut self, algorithm: AlgorithmBuilder) -> Self {
        self.registration.supported_algorithms.push(algorithm.build());
        self
    }

    pub fn build(self) -> ProcessorRegistration {
        self.registration
    }
}
