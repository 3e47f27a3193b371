// src/dag/execution.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dag::execution_step::ExecutionStep;
use crate::dag::graph::DagGraph;
use crate::dag::node_info::{NodeInfo, NodeState};
use crate::dag::state_manager::StateManager;
use crate::model::{AlgorithmKey, AlgorithmResult, ResultStatus, TaskOutcome, Window, WindowTypeKey};
use crate::types::{ExecutionId, ExecutionStatus};

/// Live state of one DAG traversal triggered by one window.
///
/// Owns the immutable window, the frozen DAG snapshot it was created from,
/// and a node table mapping every algorithm to its current [`NodeState`] and
/// collected outcome.
///
/// It is responsible for:
/// - dispatching layer 0 on [`start`](Self::start)
/// - dispatching dependents once **all** their dependencies succeeded
/// - skipping every transitive dependent of a failed node
/// - reporting the aggregate status once every node is terminal
///
/// All methods are synchronous and deterministic; the async actor in
/// [`crate::engine::runtime`] is the single writer.
#[derive(Debug)]
pub struct ExecutionContext {
    id: ExecutionId,
    window: Arc<Window>,
    graph: Arc<DagGraph>,
    nodes: HashMap<AlgorithmKey, NodeInfo>,
    status: ExecutionStatus,
}

impl ExecutionContext {
    /// Create a context in state `Created`. Nothing is dispatched yet.
    pub fn new(id: ExecutionId, window: Arc<Window>, graph: Arc<DagGraph>) -> Self {
        let nodes = graph
            .algorithms()
            .filter_map(|key| {
                graph.node(key).map(|node| {
                    let info = NodeInfo::new(
                        node.algorithm.clone(),
                        node.processor.clone(),
                        graph.dependencies_of(key).to_vec(),
                    );
                    (key.clone(), info)
                })
            })
            .collect();

        Self {
            id,
            window,
            graph,
            nodes,
            status: ExecutionStatus::Created,
        }
    }

    pub fn id(&self) -> ExecutionId {
        self.id
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn graph(&self) -> &Arc<DagGraph> {
        &self.graph
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Read-only view of a node's state.
    pub fn node_state(&self, key: &AlgorithmKey) -> Option<NodeState> {
        self.nodes.get(key).map(|info| info.state)
    }

    /// Collected outcomes of every node that reported one.
    pub fn results(&self) -> Vec<AlgorithmResult> {
        let mut results: Vec<_> = self.nodes.values().filter_map(NodeInfo::result).collect();
        results.sort_by(|a, b| a.algorithm.cmp(&b.algorithm));
        results
    }

    /// `Created -> Running`: dispatch every node with no dependencies.
    pub fn start(&mut self) -> ExecutionStep {
        if self.status != ExecutionStatus::Created {
            warn!(exec_id = %self.id, status = ?self.status, "start called twice; ignoring");
            return ExecutionStep::default();
        }

        self.status = ExecutionStatus::Running;
        info!(
            exec_id = %self.id,
            window_type = %self.graph.window_type(),
            nodes = self.nodes.len(),
            "execution started"
        );

        let graph = Arc::clone(&self.graph);
        let mut manager = StateManager::new(&graph, &mut self.nodes, self.id, &self.window);
        let newly_dispatched = manager.collect_ready(graph.roots());

        let mut step = ExecutionStep {
            newly_dispatched,
            ..ExecutionStep::default()
        };
        step.finished = self.maybe_finish();
        step
    }

    /// Advance the execution with a result reported for `key`.
    ///
    /// Results for nodes that are not currently `Dispatched` (duplicates,
    /// stale deliveries after a synthesized failure, results after
    /// cancellation) and non-terminal progress items are ignored.
    pub fn on_result(&mut self, key: &AlgorithmKey, outcome: TaskOutcome) -> ExecutionStep {
        if self.status != ExecutionStatus::Running {
            debug!(exec_id = %self.id, algorithm = %key, status = ?self.status, "result for inactive execution; ignoring");
            return ExecutionStep::default();
        }

        let Some(info) = self.nodes.get_mut(key) else {
            warn!(exec_id = %self.id, algorithm = %key, "result for unknown algorithm; ignoring");
            return ExecutionStep::default();
        };

        if info.state != NodeState::Dispatched {
            debug!(
                exec_id = %self.id,
                algorithm = %key,
                state = ?info.state,
                "duplicate or stale result; ignoring"
            );
            return ExecutionStep::default();
        }

        let outcome = enforce_result_shape(info, outcome);
        let Some(next_state) = NodeState::from_status(outcome.status) else {
            debug!(exec_id = %self.id, algorithm = %key, "progress result; task still open");
            return ExecutionStep::default();
        };

        info.state = next_state;
        info.outcome = Some(outcome);

        let graph = Arc::clone(&self.graph);
        let mut manager = StateManager::new(&graph, &mut self.nodes, self.id, &self.window);
        let mut step = ExecutionStep::default();

        if next_state == NodeState::Succeeded {
            debug!(exec_id = %self.id, algorithm = %key, "algorithm succeeded");
            step.newly_dispatched = manager.collect_ready(graph.dependents_of(key));
        } else {
            warn!(
                exec_id = %self.id,
                algorithm = %key,
                state = ?next_state,
                "algorithm failed; skipping dependents in this execution"
            );
            step.newly_failed.push(key.clone());
            step.newly_skipped = manager.mark_dependents_skipped(key);
        }

        step.finished = self.maybe_finish();
        step
    }

    /// Cancel: every non-terminal node becomes `Skipped`.
    pub fn cancel(&mut self) -> ExecutionStep {
        if self.status.is_terminal() {
            return ExecutionStep::default();
        }

        let graph = Arc::clone(&self.graph);
        let mut manager = StateManager::new(&graph, &mut self.nodes, self.id, &self.window);
        let newly_skipped = manager.skip_all_non_terminal();
        info!(exec_id = %self.id, skipped = newly_skipped.len(), "execution cancelled");

        // A cancelled context that never started still goes through Running
        // so the documented transitions hold.
        self.status = ExecutionStatus::Running;

        let mut step = ExecutionStep {
            newly_skipped,
            ..ExecutionStep::default()
        };
        step.finished = self.maybe_finish();
        step
    }

    /// Snapshot for callers waiting on the execution.
    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            exec_id: self.id,
            window_type: self.graph.window_type().clone(),
            status: self.status,
            nodes: self
                .nodes
                .iter()
                .map(|(key, info)| (key.clone(), info.state))
                .collect(),
            results: self.results(),
        }
    }

    /// Transition to the aggregate terminal status if every node is
    /// terminal. Returns the status reached by *this* call.
    fn maybe_finish(&mut self) -> Option<ExecutionStatus> {
        if self.status != ExecutionStatus::Running {
            return None;
        }

        let graph = Arc::clone(&self.graph);
        let manager = StateManager::new(&graph, &mut self.nodes, self.id, &self.window);
        if !manager.all_terminal() {
            return None;
        }

        let status = manager.aggregate_status();
        self.status = status;
        info!(exec_id = %self.id, status = ?status, "execution finished");
        Some(status)
    }
}

/// Convert a succeeded outcome whose payload does not match the declared
/// result shape into an unhandled failure.
fn enforce_result_shape(info: &NodeInfo, outcome: TaskOutcome) -> TaskOutcome {
    let expected = info.algorithm.result_shape;
    if outcome.status != ResultStatus::Succeeded || outcome.value.matches(expected) {
        return outcome;
    }

    warn!(
        algorithm = %info.key,
        expected = ?expected,
        found = ?outcome.value.shape(),
        "result payload does not match declared shape"
    );
    TaskOutcome::unhandled_failure(format!(
        "result shape mismatch: expected {:?}, got {:?}",
        expected,
        outcome.value.shape()
    ))
}

/// Final (or current) view of an execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub exec_id: ExecutionId,
    pub window_type: WindowTypeKey,
    pub status: ExecutionStatus,
    pub nodes: BTreeMap<AlgorithmKey, NodeState>,
    pub results: Vec<AlgorithmResult>,
}

impl ExecutionSummary {
    pub fn state_of(&self, name: &str, version: &str) -> Option<NodeState> {
        self.nodes.get(&AlgorithmKey::new(name, version)).copied()
    }
}
