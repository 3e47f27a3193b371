// src/dag/node_info.rs

//! Per-node state inside one execution context, and the task handed to the
//! dispatcher when a node becomes ready.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{
    Algorithm, AlgorithmKey, AlgorithmResult, ExecutionRequest, ResultStatus, TaskOutcome, Window,
};
use crate::types::ExecutionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Handled,
    Unhandled,
}

/// State of one algorithm node within one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Waiting on dependencies.
    Pending,
    /// Sent to its processor; waiting for a terminal result.
    Dispatched,
    Succeeded,
    Failed(FailureKind),
    /// An upstream node failed (never dispatched), or the execution was
    /// cancelled before this node finished.
    Skipped,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Succeeded | NodeState::Failed(_) | NodeState::Skipped
        )
    }

    /// State reached by a node that reported `status`. `None` for progress
    /// items.
    pub fn from_status(status: ResultStatus) -> Option<Self> {
        match status {
            ResultStatus::Unspecified => None,
            ResultStatus::Succeeded => Some(NodeState::Succeeded),
            ResultStatus::HandledFailure => Some(NodeState::Failed(FailureKind::Handled)),
            ResultStatus::UnhandledFailure => Some(NodeState::Failed(FailureKind::Unhandled)),
        }
    }
}

/// Static node information copied from the frozen DAG, plus per-execution
/// state.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub key: AlgorithmKey,
    pub algorithm: Algorithm,
    pub processor: String,
    /// Direct dependencies.
    pub deps: Vec<AlgorithmKey>,
    pub state: NodeState,
    /// Terminal outcome, once one arrived (or was synthesized).
    pub outcome: Option<TaskOutcome>,
}

impl NodeInfo {
    pub fn new(algorithm: Algorithm, processor: String, deps: Vec<AlgorithmKey>) -> Self {
        Self {
            key: algorithm.key(),
            algorithm,
            processor,
            deps,
            state: NodeState::Pending,
            outcome: None,
        }
    }

    pub fn result(&self) -> Option<AlgorithmResult> {
        self.outcome.as_ref().map(|outcome| AlgorithmResult {
            algorithm: self.key.clone(),
            outcome: outcome.clone(),
        })
    }
}

/// A node the execution wants its processor to run now.
#[derive(Debug, Clone)]
pub struct DispatchTask {
    pub exec_id: ExecutionId,
    /// Processor expected to serve the algorithm.
    pub processor: String,
    pub algorithm: Algorithm,
    pub window: Arc<Window>,
    /// Results of every direct dependency, all succeeded.
    pub dependency_results: Vec<AlgorithmResult>,
}

impl DispatchTask {
    pub fn key(&self) -> AlgorithmKey {
        self.algorithm.key()
    }

    pub fn to_request(&self) -> ExecutionRequest {
        ExecutionRequest {
            exec_id: self.exec_id,
            window: Arc::clone(&self.window),
            algorithm: self.algorithm.clone(),
            dependency_results: self.dependency_results.clone(),
        }
    }
}
