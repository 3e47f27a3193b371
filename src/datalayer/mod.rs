// src/datalayer/mod.rs

//! Persistence collaborator.
//!
//! The engine keeps its live state (DAG snapshots, execution contexts) in
//! memory and treats a [`Datalayer`] as the durable record of registrations,
//! windows and results. Database-backed implementations live outside this
//! crate; [`MemoryDatalayer`] is the in-process implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::model::{
    Algorithm, AlgorithmKey, AlgorithmResult, ProcessorRegistration, Window, WindowType,
    WindowTypeKey,
};
use crate::types::{BoxFuture, ExecutionId, ExecutionStatus};

pub mod memory;

pub use memory::MemoryDatalayer;

/// Everything flushed when an execution reaches its terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub exec_id: ExecutionId,
    pub window: Arc<Window>,
    pub status: ExecutionStatus,
    pub results: Vec<AlgorithmResult>,
}

/// One historical result with the window that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub exec_id: ExecutionId,
    pub window: Arc<Window>,
    pub result: AlgorithmResult,
}

/// Filter for historical results. `None` fields match everything; the time
/// range matches windows overlapping `[time_from, time_to)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultQuery {
    pub algorithm: Option<AlgorithmKey>,
    pub window_type: Option<WindowTypeKey>,
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
}

/// Filter for emitted windows: overlap with `[time_from, time_to)`, optional
/// window type, and equality on every given metadata entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowQuery {
    pub window_type: Option<WindowTypeKey>,
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl WindowQuery {
    pub fn between(time_from: DateTime<Utc>, time_to: DateTime<Utc>) -> Self {
        Self {
            window_type: None,
            time_from,
            time_to,
            metadata: BTreeMap::new(),
        }
    }

    pub fn matches(&self, window: &Window) -> bool {
        if !window.overlaps(self.time_from, self.time_to) {
            return false;
        }
        if let Some(ref wt) = self.window_type {
            if &window.window_type() != wt {
                return false;
            }
        }
        self.metadata
            .iter()
            .all(|(key, value)| window.metadata.get(key) == Some(value))
    }
}

impl ResultQuery {
    pub fn matches(&self, stored: &StoredResult) -> bool {
        if let Some(ref algorithm) = self.algorithm {
            if &stored.result.algorithm != algorithm {
                return false;
            }
        }
        if let Some(ref wt) = self.window_type {
            if &stored.window.window_type() != wt {
                return false;
            }
        }
        let from = self.time_from.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let to = self.time_to.unwrap_or(DateTime::<Utc>::MAX_UTC);
        stored.window.overlaps(from, to)
    }
}

/// Read/write operations the engine needs from durable storage.
pub trait Datalayer: Send + Sync {
    /// Persist (or replace) a processor registration and its algorithms.
    fn create_processor(&self, registration: ProcessorRegistration) -> BoxFuture<'_, Result<()>>;

    /// Record an emitted window.
    fn emit_window(&self, window: Window) -> BoxFuture<'_, Result<()>>;

    /// Record the results of a finished execution.
    fn record_results(&self, record: ExecutionRecord) -> BoxFuture<'_, Result<()>>;

    fn window_types(&self) -> BoxFuture<'_, Result<Vec<WindowType>>>;

    fn algorithms(&self) -> BoxFuture<'_, Result<Vec<Algorithm>>>;

    fn processors(&self) -> BoxFuture<'_, Result<Vec<ProcessorRegistration>>>;

    fn results(&self, query: ResultQuery) -> BoxFuture<'_, Result<Vec<StoredResult>>>;

    fn windows(&self, query: WindowQuery) -> BoxFuture<'_, Result<Vec<Window>>>;
}
