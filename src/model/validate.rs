// src/model/validate.rs

//! Message validation applied before anything reaches the engine.
//!
//! Covers required-field presence, non-empty identifiers and window time
//! ordering. Graph-level checks (cycles, window-type homogeneity,
//! dependency resolvability) belong to [`crate::dag::catalog`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::errors::{OrcaError, Result};
use crate::model::{Algorithm, ProcessorRegistration, Window};

pub fn validate_registration(reg: &ProcessorRegistration) -> Result<()> {
    require_non_empty("processor.name", &reg.name)?;
    require_non_empty("processor.runtime", &reg.runtime)?;
    require_non_empty("processor.connection_str", &reg.connection_str)?;

    let mut seen = HashSet::new();
    for algorithm in reg.supported_algorithms.iter() {
        validate_algorithm(algorithm)?;
        if !seen.insert(algorithm.key()) {
            return Err(OrcaError::Validation(format!(
                "processor '{}' declares algorithm {} more than once",
                reg.name,
                algorithm.key()
            )));
        }
    }
    Ok(())
}

pub fn validate_algorithm(algorithm: &Algorithm) -> Result<()> {
    require_non_empty("algorithm.name", &algorithm.name)?;
    require_non_empty("algorithm.version", &algorithm.version)?;
    require_non_empty("algorithm.window_type.name", &algorithm.window_type.name)?;
    require_non_empty(
        "algorithm.window_type.version",
        &algorithm.window_type.version,
    )?;

    let mut seen = HashSet::new();
    for dep in algorithm.dependencies.iter() {
        require_non_empty("dependency.name", &dep.name)?;
        require_non_empty("dependency.version", &dep.version)?;
        require_non_empty("dependency.processor", &dep.processor)?;
        if !seen.insert(dep.key()) {
            return Err(OrcaError::Validation(format!(
                "algorithm {} lists dependency {} more than once",
                algorithm.key(),
                dep.key()
            )));
        }
    }
    Ok(())
}

pub fn validate_window(window: &Window) -> Result<()> {
    require_non_empty("window.window_type_name", &window.window_type_name)?;
    require_non_empty("window.window_type_version", &window.window_type_version)?;
    require_non_empty("window.origin", &window.origin)?;

    require_after_epoch("window.time_from", window.time_from)?;
    require_after_epoch("window.time_to", window.time_to)?;

    if window.time_to <= window.time_from {
        return Err(OrcaError::Validation(format!(
            "window.time_to ({}) must be after window.time_from ({})",
            window.time_to, window.time_from
        )));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(OrcaError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_after_epoch(field: &str, value: DateTime<Utc>) -> Result<()> {
    if value <= DateTime::<Utc>::UNIX_EPOCH {
        return Err(OrcaError::Validation(format!(
            "{field} ({value}) must be after the unix epoch"
        )));
    }
    Ok(())
}
