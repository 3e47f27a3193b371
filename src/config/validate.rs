// src/config/validate.rs

use tracing::debug;

use crate::config::model::{ConfigFile, CoordinatorSection, RawConfigFile};
use crate::dag::Catalog;
use crate::errors::{OrcaError, Result};
use crate::model::{ProcessorRegistration, validate_registration};
use crate::registry::ProcessorRegistry;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = OrcaError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let registrations = validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.coordinator, registrations))
    }
}

/// Validate a raw config and return its manifest registrations in an order
/// that registers cleanly.
pub fn validate_config(cfg: &RawConfigFile) -> Result<Vec<ProcessorRegistration>> {
    validate_coordinator(&cfg.coordinator)?;

    let registrations: Vec<_> = cfg
        .processor
        .iter()
        .map(|(name, processor)| processor.to_registration(name))
        .collect();

    for registration in registrations.iter() {
        validate_registration(registration).map_err(|err| {
            OrcaError::ConfigError(format!("[processor.{}]: {err}", registration.name))
        })?;
    }

    let (_, _, ordered) = build_catalog(registrations)?;
    Ok(ordered)
}

fn validate_coordinator(section: &CoordinatorSection) -> Result<()> {
    if section.heartbeat_interval_ms == 0 {
        return Err(OrcaError::ConfigError(
            "[coordinator].heartbeat_interval_ms must be > 0".to_string(),
        ));
    }
    if section.heartbeat_timeout_ms == 0 {
        return Err(OrcaError::ConfigError(
            "[coordinator].heartbeat_timeout_ms must be > 0".to_string(),
        ));
    }
    if section.heartbeat_timeout_ms > section.heartbeat_interval_ms {
        return Err(OrcaError::ConfigError(format!(
            "[coordinator].heartbeat_timeout_ms ({}) must not exceed heartbeat_interval_ms ({})",
            section.heartbeat_timeout_ms, section.heartbeat_interval_ms
        )));
    }
    if section.max_missed_heartbeats == 0 {
        return Err(OrcaError::ConfigError(
            "[coordinator].max_missed_heartbeats must be >= 1 (got 0)".to_string(),
        ));
    }
    if section.event_channel_capacity == 0 {
        return Err(OrcaError::ConfigError(
            "[coordinator].event_channel_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Register `registrations` into a fresh registry and catalog.
///
/// Processors may depend on each other's algorithms, so registrations that
/// fail are retried while any other registration still succeeds. When no
/// progress is possible the first remaining error is returned.
///
/// Returns the registry, the catalog and the registrations in the order they
/// were accepted.
pub fn build_catalog(
    registrations: Vec<ProcessorRegistration>,
) -> Result<(ProcessorRegistry, Catalog, Vec<ProcessorRegistration>)> {
    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();
    let mut ordered = Vec::with_capacity(registrations.len());
    let mut remaining = registrations;

    while !remaining.is_empty() {
        let before = remaining.len();
        let mut failed = Vec::new();

        for registration in remaining {
            let attempt = registry
                .check_registration(&registration)
                .and_then(|()| catalog.register(&registration, &registry));
            match attempt {
                Ok(()) => {
                    debug!(processor = %registration.name, "manifest: processor accepted");
                    registry.insert(registration.clone(), true);
                    ordered.push(registration);
                }
                Err(err) => failed.push((registration, err)),
            }
        }

        if failed.len() == before {
            let (registration, err) = failed.remove(0);
            return Err(OrcaError::ConfigError(format!(
                "[processor.{}]: {err}",
                registration.name
            )));
        }
        remaining = failed.into_iter().map(|(registration, _)| registration).collect();
    }

    Ok((registry, catalog, ordered))
}
