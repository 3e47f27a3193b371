// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::{DispatchTask, ExecutionSummary};
use crate::datalayer::{Datalayer, ExecutionRecord};
use crate::exec::TaskDispatcher;
use crate::model::TaskOutcome;
use crate::types::ExecutionStatus;

use super::core::ExecutionCore;
use super::router::ResultRouter;
use super::{CoreCommand, ExecutionEvent};

/// Drives one execution in response to routed `ExecutionEvent`s, and
/// delegates task delivery to a `TaskDispatcher`.
///
/// This is the IO shell around `ExecutionCore`, which holds all execution
/// semantics. Because every event for the execution arrives on the single
/// `event_rx`, this actor is the only writer of its node table.
pub struct ExecutionRuntime {
    core: ExecutionCore,
    event_rx: mpsc::Receiver<ExecutionEvent>,
    dispatcher: Arc<dyn TaskDispatcher>,
    router: Arc<ResultRouter>,
    datalayer: Arc<dyn Datalayer>,
    /// Events produced locally (dispatch failures) that are handled before
    /// reading the channel again.
    pending: VecDeque<ExecutionEvent>,
}

impl fmt::Debug for ExecutionRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl ExecutionRuntime {
    pub fn new(
        core: ExecutionCore,
        event_rx: mpsc::Receiver<ExecutionEvent>,
        dispatcher: Arc<dyn TaskDispatcher>,
        router: Arc<ResultRouter>,
        datalayer: Arc<dyn Datalayer>,
    ) -> Self {
        Self {
            core,
            event_rx,
            dispatcher,
            router,
            datalayer,
            pending: VecDeque::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Starts the execution (dispatching layer 0).
    /// - Feeds routed events into the core one at a time.
    /// - Executes the commands the core returns.
    /// - Once the core reports a terminal status, flushes results, closes
    ///   the route and returns the final summary.
    pub async fn run(mut self) -> ExecutionSummary {
        let exec_id = self.core.id();
        info!(exec_id = %exec_id, "execution actor started");

        let mut step = self.core.start();

        loop {
            let mut finished = false;
            for command in step.commands {
                if self.execute_command(command).await {
                    finished = true;
                }
            }

            if finished || !step.keep_running {
                break;
            }

            let event = match self.pending.pop_front() {
                Some(event) => event,
                None => match self.event_rx.recv().await {
                    Some(event) => event,
                    None => {
                        // Route closed under us; handled as a cancellation.
                        warn!(exec_id = %exec_id, "event channel closed; cancelling execution");
                        ExecutionEvent::CancelRequested
                    }
                },
            };

            debug!(exec_id = %exec_id, ?event, "execution received event");
            step = self.core.step(event);
        }

        let summary = self.core.summary();
        info!(exec_id = %exec_id, status = ?summary.status, "execution actor exiting");
        summary
    }

    /// Execute a single command from the core. Returns `true` once the
    /// execution has been finished.
    async fn execute_command(&mut self, command: CoreCommand) -> bool {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.dispatch(tasks).await;
                false
            }
            CoreCommand::CloseStreams => {
                self.dispatcher.cancel_execution(self.core.id()).await;
                false
            }
            CoreCommand::Finish(status) => {
                self.finish(status).await;
                true
            }
        }
    }

    async fn dispatch(&mut self, tasks: Vec<DispatchTask>) {
        if tasks.is_empty() {
            return;
        }

        let exec_id = self.core.id();
        let names: Vec<_> = tasks.iter().map(|t| t.key().to_string()).collect();
        debug!(exec_id = %exec_id, ?names, "dispatching ready tasks");

        let keys: Vec<_> = tasks.iter().map(DispatchTask::key).collect();
        if let Err(err) = self.dispatcher.dispatch(tasks).await {
            error!(exec_id = %exec_id, error = %err, "dispatch failed; failing the batch");
            // Nodes already closed by a routed result ignore these.
            for algorithm in keys {
                self.pending.push_back(ExecutionEvent::ResultReceived {
                    algorithm,
                    outcome: TaskOutcome::unhandled_failure(format!("dispatch failed: {err}")),
                });
            }
        }
    }

    async fn finish(&mut self, status: ExecutionStatus) {
        let exec_id = self.core.id();

        // Stop routing first so late results are dropped at the router.
        self.router.close(exec_id);

        let record = ExecutionRecord {
            exec_id,
            window: Arc::clone(self.core.context().window()),
            status,
            results: self.core.context().results(),
        };

        if let Err(err) = self.datalayer.record_results(record).await {
            error!(
                exec_id = %exec_id,
                error = %err,
                "failed to flush execution results; they are lost with this context"
            );
        }
    }
}
