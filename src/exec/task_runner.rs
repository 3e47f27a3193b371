// src/exec/task_runner.rs

//! Individual task stream runner.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::dag::DispatchTask;
use crate::errors::{OrcaError, Result};
use crate::exec::dispatcher::{DispatcherShared, TaskId};
use crate::model::{AlgorithmResult, TaskOutcome};

/// Run a single dispatched task: open its result stream, wait for the first
/// terminal result and route it to the owning execution.
///
/// - If the cancel channel fires, the stream is dropped and **no** result is
///   routed for this task. Whoever cancelled it owns that decision.
/// - Any error before a terminal result arrives becomes an unhandled failure
///   synthesized by the engine.
pub(crate) async fn run_task(
    shared: Arc<DispatcherShared>,
    id: TaskId,
    task: DispatchTask,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let outcome = tokio::select! {
        outcome = stream_task(&shared, &task) => outcome,

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => info!(
                    exec_id = %id.exec_id,
                    algorithm = %id.algorithm,
                    "task stream closed on request"
                ),
                Err(_) => debug!(
                    exec_id = %id.exec_id,
                    algorithm = %id.algorithm,
                    "cancel channel dropped; closing task stream"
                ),
            }
            return;
        }
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(
                exec_id = %id.exec_id,
                algorithm = %id.algorithm,
                processor = %task.processor,
                error = %err,
                "task execution error"
            );
            TaskOutcome::unhandled_failure(err.to_string())
        }
    };

    // A concurrent `fail_processor` may already have removed the entry and
    // routed a synthesized failure; in that case this result is dropped.
    if !shared.finish(&id) {
        debug!(
            exec_id = %id.exec_id,
            algorithm = %id.algorithm,
            "task already closed elsewhere; dropping result"
        );
        return;
    }

    let delivered = shared
        .router
        .route(
            id.exec_id,
            AlgorithmResult {
                algorithm: id.algorithm.clone(),
                outcome,
            },
        )
        .await;

    if !delivered {
        debug!(exec_id = %id.exec_id, algorithm = %id.algorithm, "execution no longer listening");
    }
}

async fn stream_task(shared: &DispatcherShared, task: &DispatchTask) -> Result<TaskOutcome> {
    let key = task.key();

    let handle = shared.registry.resolve(&key.name, &key.version)?;
    if handle.name != task.processor {
        warn!(
            algorithm = %key,
            expected = %task.processor,
            actual = %handle.name,
            "algorithm resolved to a different processor than the DAG recorded"
        );
    }

    let conn = shared.connection_for(&handle).await?;

    info!(
        exec_id = %task.exec_id,
        algorithm = %key,
        processor = %handle.name,
        "opening ExecuteDagPart stream"
    );
    let mut stream = conn.execute_dag_part(task.to_request()).await?;

    while let Some(item) = stream.recv().await {
        let result = item.algorithm_result;

        if item.exec_id != task.exec_id || result.algorithm != key {
            warn!(
                exec_id = %task.exec_id,
                algorithm = %key,
                got_exec_id = %item.exec_id,
                got_algorithm = %result.algorithm,
                "stream item for a different task; ignoring"
            );
            continue;
        }

        if !result.outcome.status.is_terminal() {
            debug!(exec_id = %task.exec_id, algorithm = %key, "progress item received");
            continue;
        }

        info!(
            exec_id = %task.exec_id,
            algorithm = %key,
            status = ?result.outcome.status,
            "terminal result received; closing task"
        );
        return Ok(result.outcome);
    }

    Err(OrcaError::Transport(format!(
        "result stream for {key} closed before a terminal result"
    )))
}
