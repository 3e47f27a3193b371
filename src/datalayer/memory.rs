// src/datalayer/memory.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::datalayer::{Datalayer, ExecutionRecord, ResultQuery, StoredResult, WindowQuery};
use crate::errors::Result;
use crate::model::{Algorithm, AlgorithmKey, ProcessorRegistration, Window, WindowType, WindowTypeKey};
use crate::types::BoxFuture;

#[derive(Debug, Default)]
struct MemoryState {
    processors: BTreeMap<String, ProcessorRegistration>,
    windows: Vec<Window>,
    results: Vec<StoredResult>,
}

/// In-process [`Datalayer`]. Lost on restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryDatalayer {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatalayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl Datalayer for MemoryDatalayer {
    fn create_processor(&self, registration: ProcessorRegistration) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            debug!(processor = %registration.name, "datalayer: storing processor");
            self.with_state(|state| {
                state
                    .processors
                    .insert(registration.name.clone(), registration);
            });
            Ok(())
        })
    }

    fn emit_window(&self, window: Window) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.with_state(|state| state.windows.push(window));
            Ok(())
        })
    }

    fn record_results(&self, record: ExecutionRecord) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            debug!(
                exec_id = %record.exec_id,
                results = record.results.len(),
                "datalayer: recording execution results"
            );
            self.with_state(|state| {
                for result in record.results {
                    state.results.push(StoredResult {
                        exec_id: record.exec_id,
                        window: Arc::clone(&record.window),
                        result,
                    });
                }
            });
            Ok(())
        })
    }

    fn window_types(&self) -> BoxFuture<'_, Result<Vec<WindowType>>> {
        Box::pin(async move {
            let types = self.with_state(|state| {
                let mut types: BTreeMap<WindowTypeKey, WindowType> = BTreeMap::new();
                for algorithm in state.processors.values().flat_map(|p| &p.supported_algorithms) {
                    types
                        .entry(algorithm.window_type_key())
                        .or_insert_with(|| algorithm.window_type.clone());
                }
                types.into_values().collect()
            });
            Ok(types)
        })
    }

    fn algorithms(&self) -> BoxFuture<'_, Result<Vec<Algorithm>>> {
        Box::pin(async move {
            let algorithms = self.with_state(|state| {
                let mut algorithms: BTreeMap<AlgorithmKey, Algorithm> = BTreeMap::new();
                for algorithm in state.processors.values().flat_map(|p| &p.supported_algorithms) {
                    algorithms
                        .entry(algorithm.key())
                        .or_insert_with(|| algorithm.clone());
                }
                algorithms.into_values().collect()
            });
            Ok(algorithms)
        })
    }

    fn processors(&self) -> BoxFuture<'_, Result<Vec<ProcessorRegistration>>> {
        Box::pin(async move { Ok(self.with_state(|state| state.processors.values().cloned().collect())) })
    }

    fn results(&self, query: ResultQuery) -> BoxFuture<'_, Result<Vec<StoredResult>>> {
        Box::pin(async move {
            Ok(self.with_state(|state| {
                state
                    .results
                    .iter()
                    .filter(|stored| query.matches(stored))
                    .cloned()
                    .collect()
            }))
        })
    }

    fn windows(&self, query: WindowQuery) -> BoxFuture<'_, Result<Vec<Window>>> {
        Box::pin(async move {
            Ok(self.with_state(|state| {
                state
                    .windows
                    .iter()
                    .filter(|window| query.matches(window))
                    .cloned()
                    .collect()
            }))
        })
    }
}
