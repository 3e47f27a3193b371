// src/engine/core.rs

//! Pure per-execution state machine.
//!
//! [`ExecutionCore`] consumes [`ExecutionEvent`]s and produces:
//! - an updated execution context
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::ExecutionRuntime`) is responsible for:
//! - reading events from the routed channel
//! - handing `DispatchTask`s to the dispatcher
//! - flushing results to the datalayer and closing the route
//!
//! The core has no channels, no Tokio types, and performs no IO, so it can
//! be driven step by step in tests.

use crate::dag::{ExecutionContext, ExecutionSummary};
use crate::engine::ExecutionEvent;
use crate::engine::event_handlers::{CoreStep, handle_cancel, handle_result, handle_start};
use crate::types::ExecutionId;

#[derive(Debug)]
pub struct ExecutionCore {
    context: ExecutionContext,
}

impl ExecutionCore {
    pub fn new(context: ExecutionContext) -> Self {
        Self { context }
    }

    pub fn id(&self) -> ExecutionId {
        self.context.id()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn summary(&self) -> ExecutionSummary {
        self.context.summary()
    }

    /// Start the execution: dispatch every node without dependencies.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&mut self.context)
    }

    /// Handle a single event and return the resulting commands.
    pub fn step(&mut self, event: ExecutionEvent) -> CoreStep {
        match event {
            ExecutionEvent::ResultReceived { algorithm, outcome } => {
                handle_result(&mut self.context, algorithm, outcome)
            }
            ExecutionEvent::CancelRequested => handle_cancel(&mut self.context),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::dag::DagGraph;
    use crate::engine::CoreCommand;
    use crate::model::{
        Algorithm, AlgorithmDependency, AlgorithmKey, ResultShape, ResultValue, TaskOutcome,
        Window, WindowType,
    };
    use crate::types::ExecutionStatus;

    fn algorithm(name: &str, deps: &[&str]) -> Algorithm {
        Algorithm {
            name: name.to_string(),
            version: "1".to_string(),
            window_type: WindowType::new("daily", "1"),
            dependencies: deps
                .iter()
                .map(|d| AlgorithmDependency {
                    name: d.to_string(),
                    version: "1".to_string(),
                    processor: "p".to_string(),
                })
                .collect(),
            result_shape: ResultShape::Value,
        }
    }

    fn core(algorithms: Vec<Algorithm>) -> ExecutionCore {
        let graph = DagGraph::build(
            WindowType::new("daily", "1").key(),
            algorithms.into_iter().map(|a| (a, "p".to_string())),
        )
        .unwrap();
        let window = Window {
            time_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            time_to: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            window_type_name: "daily".to_string(),
            window_type_version: "1".to_string(),
            origin: "test".to_string(),
            metadata: BTreeMap::new(),
        };
        ExecutionCore::new(ExecutionContext::new(
            ExecutionId(1),
            Arc::new(window),
            Arc::new(graph),
        ))
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks),
                _ => None,
            })
            .flatten()
            .map(|t| t.algorithm.name.clone())
            .collect()
    }

    fn result(name: &str, outcome: TaskOutcome) -> ExecutionEvent {
        ExecutionEvent::ResultReceived {
            algorithm: AlgorithmKey::new(name, "1"),
            outcome,
        }
    }

    #[test]
    fn chain_runs_to_completion() {
        let mut core = core(vec![algorithm("A", &[]), algorithm("B", &["A"])]);

        let step = core.start();
        assert_eq!(dispatched(&step), vec!["A"]);
        assert!(step.keep_running);

        let step = core.step(result("A", TaskOutcome::succeeded(ResultValue::Scalar(1.0))));
        assert_eq!(dispatched(&step), vec!["B"]);

        let step = core.step(result("B", TaskOutcome::succeeded(ResultValue::Scalar(2.0))));
        assert!(!step.keep_running);
        assert!(matches!(
            step.commands.last(),
            Some(CoreCommand::Finish(ExecutionStatus::Completed))
        ));
    }

    #[test]
    fn failure_finishes_partially_failed_without_dispatching_dependent() {
        let mut core = core(vec![algorithm("A", &[]), algorithm("B", &["A"])]);
        core.start();

        let step = core.step(result("A", TaskOutcome::unhandled_failure("boom")));
        assert!(dispatched(&step).is_empty());
        assert!(!step.keep_running);
        assert!(matches!(
            step.commands.last(),
            Some(CoreCommand::Finish(ExecutionStatus::PartiallyFailed))
        ));
    }

    #[test]
    fn duplicate_result_produces_no_commands() {
        let mut core = core(vec![
            algorithm("A", &[]),
            algorithm("B", &["A"]),
            algorithm("C", &[]),
        ]);
        core.start();

        let first = core.step(result("A", TaskOutcome::succeeded(ResultValue::Scalar(1.0))));
        assert_eq!(dispatched(&first), vec!["B"]);

        let second = core.step(result("A", TaskOutcome::succeeded(ResultValue::Scalar(1.0))));
        assert!(second.commands.is_empty());
        assert!(second.keep_running);
    }

    #[test]
    fn cancel_closes_streams_and_finishes() {
        let mut core = core(vec![algorithm("A", &[]), algorithm("B", &["A"])]);
        core.start();

        let step = core.step(ExecutionEvent::CancelRequested);
        assert!(step
            .commands
            .iter()
            .any(|c| matches!(c, CoreCommand::CloseStreams)));
        assert!(!step.keep_running);
        assert_eq!(core.summary().status, ExecutionStatus::PartiallyFailed);
    }
}
