// src/dag/state_manager.rs

//! Node state transitions for one execution context.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::node_info::{DispatchTask, NodeInfo, NodeState};
use crate::dag::DagGraph;
use crate::model::{AlgorithmKey, AlgorithmResult, Window};
use crate::types::{ExecutionId, ExecutionStatus};

/// Manages node state transitions within one execution.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    nodes: &'a mut HashMap<AlgorithmKey, NodeInfo>,
    exec_id: ExecutionId,
    window: &'a Arc<Window>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        nodes: &'a mut HashMap<AlgorithmKey, NodeInfo>,
        exec_id: ExecutionId,
        window: &'a Arc<Window>,
    ) -> Self {
        Self {
            graph,
            nodes,
            exec_id,
            window,
        }
    }

    /// Whether every direct dependency of `info` has succeeded.
    pub fn deps_satisfied_for_info(&self, info: &NodeInfo) -> bool {
        info.deps.iter().all(|dep| match self.nodes.get(dep) {
            Some(dep_info) => dep_info.state == NodeState::Succeeded,
            None => {
                warn!(
                    exec_id = %self.exec_id,
                    algorithm = %info.key,
                    dependency = %dep,
                    "dependency missing from execution node table"
                );
                false
            }
        })
    }

    /// Among `candidates`, mark every `Pending` node whose dependencies all
    /// succeeded as `Dispatched` and return the tasks to send.
    ///
    /// The node's own state is the dispatch-once guard: a node that is not
    /// `Pending` is never returned again.
    pub fn collect_ready<'k>(
        &mut self,
        candidates: impl IntoIterator<Item = &'k AlgorithmKey>,
    ) -> Vec<DispatchTask> {
        // Decide first, then mutate.
        let mut seen: HashSet<&AlgorithmKey> = HashSet::new();
        let ready: Vec<AlgorithmKey> = candidates
            .into_iter()
            .filter(|key| seen.insert(*key))
            .filter(|key| {
                self.nodes
                    .get(*key)
                    .map(|info| {
                        info.state == NodeState::Pending && self.deps_satisfied_for_info(info)
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let mut tasks = Vec::with_capacity(ready.len());
        for key in ready {
            let dependency_results = self.dependency_results(&key);
            if let Some(info) = self.nodes.get_mut(&key) {
                if info.state != NodeState::Pending {
                    continue;
                }
                info.state = NodeState::Dispatched;
                info!(
                    exec_id = %self.exec_id,
                    algorithm = %key,
                    processor = %info.processor,
                    dependencies = dependency_results.len(),
                    "dependencies satisfied; dispatching algorithm"
                );
                tasks.push(DispatchTask {
                    exec_id: self.exec_id,
                    processor: info.processor.clone(),
                    algorithm: info.algorithm.clone(),
                    window: Arc::clone(self.window),
                    dependency_results,
                });
            }
        }

        tasks
    }

    /// Results of the direct dependencies of `key`, in declaration order.
    fn dependency_results(&self, key: &AlgorithmKey) -> Vec<AlgorithmResult> {
        self.graph
            .dependencies_of(key)
            .iter()
            .filter_map(|dep| self.nodes.get(dep).and_then(NodeInfo::result))
            .collect()
    }

    /// Mark every transitive dependent of `failed` that is still `Pending`
    /// as `Skipped`.
    ///
    /// Each node is marked at most once; re-running the walk is a no-op.
    /// Returns the nodes newly skipped by this call.
    pub fn mark_dependents_skipped(&mut self, failed: &AlgorithmKey) -> Vec<AlgorithmKey> {
        let mut stack: Vec<AlgorithmKey> = self.graph.dependents_of(failed).to_vec();
        let mut visited: HashSet<AlgorithmKey> = HashSet::new();
        let mut newly_skipped = Vec::new();

        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }

            if let Some(info) = self.nodes.get_mut(&key) {
                if info.state == NodeState::Pending {
                    info.state = NodeState::Skipped;
                    debug!(
                        exec_id = %self.exec_id,
                        algorithm = %key,
                        upstream = %failed,
                        "skipping dependent of failed algorithm"
                    );
                    newly_skipped.push(key.clone());
                }
            }

            stack.extend(self.graph.dependents_of(&key).iter().cloned());
        }

        newly_skipped
    }

    /// Mark every non-terminal node as `Skipped` (cancellation).
    pub fn skip_all_non_terminal(&mut self) -> Vec<AlgorithmKey> {
        let mut skipped: Vec<AlgorithmKey> = self
            .nodes
            .values_mut()
            .filter(|info| !info.state.is_terminal())
            .map(|info| {
                info.state = NodeState::Skipped;
                info.key.clone()
            })
            .collect();
        skipped.sort();
        skipped
    }

    /// Check if all nodes are in a terminal state.
    pub fn all_terminal(&self) -> bool {
        self.nodes.values().all(|info| info.state.is_terminal())
    }

    /// Aggregate status once every node is terminal.
    pub fn aggregate_status(&self) -> ExecutionStatus {
        if self
            .nodes
            .values()
            .all(|info| info.state == NodeState::Succeeded)
        {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::PartiallyFailed
        }
    }
}
