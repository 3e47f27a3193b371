// src/dag/execution_step.rs

//! Step-by-step result type for an execution context.

use crate::dag::node_info::DispatchTask;
use crate::model::AlgorithmKey;
use crate::types::ExecutionStatus;

/// Structured result of a single execution "step".
///
/// Every state-advancing call on an
/// [`ExecutionContext`](crate::dag::ExecutionContext) returns one of these so
/// callers (and tests) can see exactly what changed.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStep {
    /// Nodes that became ready and were marked dispatched in this step.
    pub newly_dispatched: Vec<DispatchTask>,
    /// Nodes that reported a failure in this step.
    pub newly_failed: Vec<AlgorithmKey>,
    /// Nodes skipped in this step (transitive dependents of a failure, or
    /// everything non-terminal on cancellation).
    pub newly_skipped: Vec<AlgorithmKey>,
    /// Set when this step made the execution terminal.
    pub finished: Option<ExecutionStatus>,
}

impl ExecutionStep {
    pub fn is_noop(&self) -> bool {
        self.newly_dispatched.is_empty()
            && self.newly_failed.is_empty()
            && self.newly_skipped.is_empty()
            && self.finished.is_none()
    }
}
