// src/engine/event_handlers.rs

//! Event handling logic for the execution core.

use crate::dag::{DispatchTask, ExecutionContext, ExecutionStep};
use crate::model::{AlgorithmKey, TaskOutcome};
use crate::types::ExecutionStatus;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the dispatcher.
    DispatchTasks(Vec<DispatchTask>),
    /// Close every dispatcher stream still open for this execution.
    CloseStreams,
    /// The execution reached its aggregate status: flush results and stop.
    Finish(ExecutionStatus),
}

/// Decision returned by the core after handling a single `ExecutionEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the actor loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Move the context from `Created` to `Running` and dispatch its roots.
pub fn handle_start(context: &mut ExecutionContext) -> CoreStep {
    let step = context.start();
    into_core_step(step, false)
}

/// Handle a result reported for one node.
///
/// Succeeded results may make dependents ready; failures skip the failed
/// node's transitive dependents. Duplicates and stale results produce no
/// commands.
pub fn handle_result(
    context: &mut ExecutionContext,
    algorithm: AlgorithmKey,
    outcome: TaskOutcome,
) -> CoreStep {
    if context.is_finished() {
        return CoreStep {
            commands: Vec::new(),
            keep_running: false,
        };
    }
    let step = context.on_result(&algorithm, outcome);
    into_core_step(step, false)
}

/// Handle a cancellation request.
pub fn handle_cancel(context: &mut ExecutionContext) -> CoreStep {
    if context.is_finished() {
        return CoreStep {
            commands: Vec::new(),
            keep_running: false,
        };
    }
    let step = context.cancel();
    into_core_step(step, true)
}

fn into_core_step(step: ExecutionStep, close_streams: bool) -> CoreStep {
    let mut commands = Vec::new();

    if !step.newly_dispatched.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_dispatched));
    }

    if close_streams {
        commands.push(CoreCommand::CloseStreams);
    }

    let keep_running = match step.finished {
        Some(status) => {
            commands.push(CoreCommand::Finish(status));
            false
        }
        None => true,
    };

    CoreStep {
        commands,
        keep_running,
    }
}
