// src/registry.rs

//! Processor registry.
//!
//! Tracks connected processors and indexes every supported algorithm
//! `(name, version)` back to the processor that owns it. A processor is the
//! exclusive executor of the algorithms it registers.
//!
//! Losing a processor only flips it to unavailable; its index entries stay so
//! that dispatches referencing it fail instead of vanishing.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::errors::{OrcaError, Result};
use crate::model::{AlgorithmKey, ProcessorHandle, ProcessorRegistration};

#[derive(Debug, Clone)]
struct ProcessorEntry {
    registration: ProcessorRegistration,
    available: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    processors: HashMap<String, ProcessorEntry>,
    /// algorithm -> owning processor name.
    index: HashMap<AlgorithmKey, String>,
}

#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    state: RwLock<RegistryState>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a registration for conflicts without mutating anything.
    ///
    /// - A processor name that is currently available is a conflict.
    /// - An unavailable processor registering again must redeclare every
    ///   algorithm it owned.
    /// - An algorithm already owned by a *different* processor is a conflict.
    pub fn check_registration(&self, reg: &ProcessorRegistration) -> Result<()> {
        if reg.connection_str.trim().is_empty() {
            return Err(OrcaError::Validation(format!(
                "processor '{}' has an empty connection address",
                reg.name
            )));
        }

        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = state.processors.get(&reg.name) {
            if existing.available {
                return Err(OrcaError::Conflict(format!(
                    "processor '{}' is already registered",
                    reg.name
                )));
            }

            // A reconnecting processor keeps every algorithm it owned; the
            // catalog still routes windows to them.
            let declared: HashSet<AlgorithmKey> =
                reg.supported_algorithms.iter().map(|a| a.key()).collect();
            let mut dropped: Vec<String> = existing
                .registration
                .supported_algorithms
                .iter()
                .map(|a| a.key())
                .filter(|key| !declared.contains(key))
                .map(|key| key.to_string())
                .collect();
            if !dropped.is_empty() {
                dropped.sort();
                return Err(OrcaError::Conflict(format!(
                    "processor '{}' must declare its previously registered algorithms again: {}",
                    reg.name,
                    dropped.join(", ")
                )));
            }
        }

        for algorithm in reg.supported_algorithms.iter() {
            let key = algorithm.key();
            if let Some(owner) = state.index.get(&key) {
                if owner != &reg.name {
                    return Err(OrcaError::Conflict(format!(
                        "algorithm {} is already served by processor '{}'",
                        key, owner
                    )));
                }
            }
        }

        Ok(())
    }

    /// Store a registration that already passed [`check_registration`] and
    /// the catalog's graph checks.
    ///
    /// [`check_registration`]: ProcessorRegistry::check_registration
    pub fn insert(&self, reg: ProcessorRegistration, available: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        for algorithm in reg.supported_algorithms.iter() {
            state.index.insert(algorithm.key(), reg.name.clone());
        }

        let reactivated = state.processors.contains_key(&reg.name);
        info!(
            processor = %reg.name,
            algorithms = reg.supported_algorithms.len(),
            available,
            reactivated,
            "registry: processor stored"
        );

        state.processors.insert(
            reg.name.clone(),
            ProcessorEntry {
                registration: reg,
                available,
            },
        );
    }

    /// Check and insert in one go. Used where no catalog is involved.
    pub fn register(&self, reg: ProcessorRegistration) -> Result<()> {
        self.check_registration(&reg)?;
        self.insert(reg, true);
        Ok(())
    }

    /// Resolve the processor serving `name@version`.
    pub fn resolve(&self, name: &str, version: &str) -> Result<ProcessorHandle> {
        let key = AlgorithmKey::new(name, version);
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        let owner = state
            .index
            .get(&key)
            .ok_or_else(|| OrcaError::NotFound(format!("no processor serves algorithm {key}")))?;

        let entry = state.processors.get(owner).ok_or_else(|| {
            OrcaError::NotFound(format!("processor '{owner}' for algorithm {key} is not registered"))
        })?;

        if !entry.available {
            return Err(OrcaError::ProcessorUnavailable(format!(
                "processor '{owner}' serving {key} is unavailable"
            )));
        }

        Ok(entry.registration.handle())
    }

    /// Owning processor of an algorithm, available or not.
    pub fn owner_of(&self, key: &AlgorithmKey) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.index.get(key).cloned()
    }

    /// Mark a processor unavailable. Returns `true` if this call changed its
    /// state.
    pub fn mark_unavailable(&self, name: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.processors.get_mut(name) {
            Some(entry) if entry.available => {
                entry.available = false;
                warn!(processor = %name, "registry: processor marked unavailable");
                true
            }
            Some(_) => {
                debug!(processor = %name, "registry: processor already unavailable");
                false
            }
            None => {
                warn!(processor = %name, "registry: unknown processor; cannot mark unavailable");
                false
            }
        }
    }

    pub fn is_available(&self, name: &str) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .processors
            .get(name)
            .map(|entry| entry.available)
            .unwrap_or(false)
    }

    pub fn handle_of(&self, name: &str) -> Option<ProcessorHandle> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .processors
            .get(name)
            .map(|entry| entry.registration.handle())
    }

    /// Handles of every processor that is currently available.
    pub fn available_processors(&self) -> Vec<ProcessorHandle> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut handles: Vec<_> = state
            .processors
            .values()
            .filter(|entry| entry.available)
            .map(|entry| entry.registration.handle())
            .collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
