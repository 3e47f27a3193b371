// src/dag/catalog.rs

//! Algorithm catalog and per-window-type DAG compilation.
//!
//! The catalog is one immutable [`CatalogState`] behind an `Arc`. Readers
//! clone the `Arc` and never observe a half-applied registration. Writers
//! [`stage`](Catalog::stage) a registration against the current state (all
//! graph checks happen here, nothing is mutated) and then
//! [`commit`](Catalog::commit) the staged state with a pointer swap.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::dag::graph::DagGraph;
use crate::errors::{GraphError, OrcaError, Result};
use crate::model::{Algorithm, AlgorithmKey, ProcessorRegistration, WindowType, WindowTypeKey};
use crate::registry::ProcessorRegistry;

/// A known algorithm and the processor that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub algorithm: Algorithm,
    pub processor: String,
}

/// Immutable snapshot of everything the catalog knows.
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    algorithms: BTreeMap<AlgorithmKey, CatalogEntry>,
    window_types: BTreeMap<WindowTypeKey, WindowType>,
    graphs: BTreeMap<WindowTypeKey, Arc<DagGraph>>,
}

impl CatalogState {
    pub fn graph(&self, window_type: &WindowTypeKey) -> Option<Arc<DagGraph>> {
        self.graphs.get(window_type).cloned()
    }

    pub fn graphs(&self) -> impl Iterator<Item = &Arc<DagGraph>> {
        self.graphs.values()
    }

    pub fn algorithm(&self, key: &AlgorithmKey) -> Option<&CatalogEntry> {
        self.algorithms.get(key)
    }

    pub fn algorithms(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.algorithms.values()
    }

    pub fn window_types(&self) -> impl Iterator<Item = &WindowType> {
        self.window_types.values()
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

/// A validated, not yet published catalog state.
#[derive(Debug)]
pub struct StagedCatalog {
    base: Arc<CatalogState>,
    next: CatalogState,
    affected: Vec<WindowTypeKey>,
}

impl StagedCatalog {
    /// Window types whose DAG this registration rebuilt.
    pub fn affected_window_types(&self) -> &[WindowTypeKey] {
        &self.affected
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    state: RwLock<Arc<CatalogState>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<CatalogState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// DAG snapshot for one window type, if anything subscribes to it.
    pub fn graph_for(&self, window_type: &WindowTypeKey) -> Option<Arc<DagGraph>> {
        self.snapshot().graph(window_type)
    }

    /// Validate `reg` against the current snapshot and build the state that
    /// would result from accepting it.
    ///
    /// Checks, in order, for every declared algorithm:
    /// - an existing `(name, version)` is only accepted if it is owned by the
    ///   same processor with an identical definition,
    /// - every dependency resolves to an algorithm served by the processor
    ///   the edge names (already registered, or declared in `reg`),
    /// - every dependency shares the dependent's window type,
    /// - the rebuilt DAG of each affected window type is acyclic.
    pub fn stage(
        &self,
        reg: &ProcessorRegistration,
        registry: &ProcessorRegistry,
    ) -> Result<StagedCatalog> {
        let base = self.snapshot();

        let declared: HashMap<AlgorithmKey, &Algorithm> = reg
            .supported_algorithms
            .iter()
            .map(|a| (a.key(), a))
            .collect();

        for algorithm in reg.supported_algorithms.iter() {
            let key = algorithm.key();
            if let Some(existing) = base.algorithms.get(&key) {
                if existing.processor != reg.name {
                    return Err(OrcaError::Conflict(format!(
                        "algorithm {} is already served by processor '{}'",
                        key, existing.processor
                    )));
                }
                if &existing.algorithm != algorithm {
                    return Err(OrcaError::Conflict(format!(
                        "algorithm {key} is already registered with a different definition; register a new version instead"
                    )));
                }
            }
        }

        for algorithm in reg.supported_algorithms.iter() {
            check_dependencies(algorithm, reg, &declared, &base, registry)?;
        }

        let mut next = (*base).clone();
        let mut affected: BTreeSet<WindowTypeKey> = BTreeSet::new();

        for algorithm in reg.supported_algorithms.iter() {
            let wt = algorithm.window_type_key();
            next.window_types
                .entry(wt.clone())
                .or_insert_with(|| algorithm.window_type.clone());
            next.algorithms.insert(
                algorithm.key(),
                CatalogEntry {
                    algorithm: algorithm.clone(),
                    processor: reg.name.clone(),
                },
            );
            affected.insert(wt);
        }

        for wt in affected.iter() {
            let entries = next
                .algorithms
                .values()
                .filter(|entry| &entry.algorithm.window_type_key() == wt)
                .map(|entry| (entry.algorithm.clone(), entry.processor.clone()));

            let graph = DagGraph::build(wt.clone(), entries)?;
            debug!(
                window_type = %wt,
                nodes = graph.len(),
                layers = graph.layers().len(),
                "catalog: rebuilt window type DAG"
            );
            next.graphs.insert(wt.clone(), Arc::new(graph));
        }

        Ok(StagedCatalog {
            base,
            next,
            affected: affected.into_iter().collect(),
        })
    }

    /// Publish a staged state.
    ///
    /// Fails with a conflict if another registration was committed after
    /// `staged` was built; the caller re-stages in that case.
    pub fn commit(&self, staged: StagedCatalog) -> Result<()> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !Arc::ptr_eq(&guard, &staged.base) {
            return Err(OrcaError::Conflict(
                "catalog changed while the registration was being validated".to_string(),
            ));
        }

        info!(
            window_types = ?staged.affected.iter().map(ToString::to_string).collect::<Vec<_>>(),
            algorithms = staged.next.algorithms.len(),
            "catalog: published new snapshot"
        );
        *guard = Arc::new(staged.next);
        Ok(())
    }

    /// Stage and commit in one call.
    pub fn register(&self, reg: &ProcessorRegistration, registry: &ProcessorRegistry) -> Result<()> {
        let staged = self.stage(reg, registry)?;
        self.commit(staged)
    }
}

fn check_dependencies(
    algorithm: &Algorithm,
    reg: &ProcessorRegistration,
    declared: &HashMap<AlgorithmKey, &Algorithm>,
    base: &CatalogState,
    registry: &ProcessorRegistry,
) -> Result<()> {
    let key = algorithm.key();
    let expected_wt = algorithm.window_type_key();

    for dep in algorithm.dependencies.iter() {
        let dep_key = dep.key();

        // Resolve the dependency's definition and owner: same registration
        // first, then the registry + published catalog.
        let resolved: Option<(&Algorithm, String)> = match declared.get(&dep_key) {
            Some(def) => Some((*def, reg.name.clone())),
            None => registry.owner_of(&dep_key).and_then(|owner| {
                base.algorithms
                    .get(&dep_key)
                    .map(|entry| (&entry.algorithm, owner))
            }),
        };

        let (definition, owner) = match resolved {
            Some(found) if found.1 == dep.processor => found,
            _ => {
                return Err(GraphError::UnresolvedDependency {
                    algorithm: key,
                    dependency: dep_key,
                    processor: dep.processor.clone(),
                }
                .into());
            }
        };

        let found_wt = definition.window_type_key();
        if found_wt != expected_wt {
            return Err(GraphError::WindowTypeMismatch {
                algorithm: key,
                dependency: dep_key,
                expected: expected_wt,
                found: found_wt,
            }
            .into());
        }

        debug!(
            algorithm = %key,
            dependency = %dep_key,
            processor = %owner,
            "catalog: dependency resolved"
        );
    }

    Ok(())
}
