// src/exec/dispatcher.rs

//! Streaming task dispatcher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::dag::DispatchTask;
use crate::engine::ResultRouter;
use crate::errors::Result;
use crate::exec::backend::TaskDispatcher;
use crate::exec::task_runner::run_task;
use crate::exec::transport::{ProcessorConnection, ProcessorTransport};
use crate::model::{AlgorithmKey, AlgorithmResult, HealthCheckRequest, ProcessorHandle, TaskOutcome};
use crate::registry::ProcessorRegistry;
use crate::types::{BoxFuture, ExecutionId};

/// Identity of one dispatched task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub exec_id: ExecutionId,
    pub algorithm: AlgorithmKey,
}

/// Internal handle for a task whose stream is still open.
///
/// `cancel` is used to close the stream without routing a result (execution
/// cancelled, or the processor was declared lost and a failure was already
/// synthesized).
struct OutstandingTask {
    processor: String,
    cancel: oneshot::Sender<()>,
}

/// State shared by the dispatcher and every per-task runner.
pub(crate) struct DispatcherShared {
    pub(crate) transport: Arc<dyn ProcessorTransport>,
    pub(crate) registry: Arc<ProcessorRegistry>,
    pub(crate) router: Arc<ResultRouter>,
    connections: Mutex<HashMap<String, Arc<dyn ProcessorConnection>>>,
    outstanding: Mutex<HashMap<TaskId, OutstandingTask>>,
}

impl DispatcherShared {
    /// The pooled connection for `processor`, dialing it on first use.
    pub(crate) async fn connection_for(
        &self,
        processor: &ProcessorHandle,
    ) -> Result<Arc<dyn ProcessorConnection>> {
        let pooled = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&processor.name)
            .cloned();
        if let Some(conn) = pooled {
            return Ok(conn);
        }

        debug!(processor = %processor.name, address = %processor.connection_str, "dialing processor");
        let conn = self.transport.connect(processor.clone()).await?;

        // Another task may have dialed concurrently; keep whichever landed first.
        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let conn = connections
            .entry(processor.name.clone())
            .or_insert(conn)
            .clone();
        Ok(conn)
    }

    /// Remove a task's outstanding entry. `true` means the caller now owns
    /// the right to route its result.
    pub(crate) fn finish(&self, id: &TaskId) -> bool {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    fn drop_connection(&self, processor: &str) {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(processor);
    }

    /// Remove and return every outstanding task matching `predicate`.
    fn take_outstanding(
        &self,
        predicate: impl Fn(&TaskId, &OutstandingTask) -> bool,
    ) -> Vec<(TaskId, OutstandingTask)> {
        let mut outstanding = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ids: Vec<TaskId> = outstanding
            .iter()
            .filter(|(id, task)| predicate(id, task))
            .map(|(id, _)| id.clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| outstanding.remove(&id).map(|task| (id, task)))
            .collect()
    }
}

/// Production dispatcher.
///
/// Keeps one long-lived connection per processor, shared by every task sent
/// to it, and runs each dispatched task in its own Tokio task:
///
/// - the first terminal result on the task's stream is routed back to the
///   owning execution and closes the task,
/// - a stream that ends early, a transport error, or an unknown/unavailable
///   processor produces an engine-synthesized unhandled failure,
/// - [`fail_processor`](Self::fail_processor) fails every task outstanding on
///   a lost processor.
#[derive(Clone)]
pub struct StreamingDispatcher {
    shared: Arc<DispatcherShared>,
}

impl StreamingDispatcher {
    pub fn new(
        transport: Arc<dyn ProcessorTransport>,
        registry: Arc<ProcessorRegistry>,
        router: Arc<ResultRouter>,
    ) -> Self {
        Self {
            shared: Arc::new(DispatcherShared {
                transport,
                registry,
                router,
                connections: Mutex::new(HashMap::new()),
                outstanding: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Number of tasks whose streams are still open.
    pub fn outstanding_count(&self) -> usize {
        self.shared
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Tasks currently outstanding on `processor`.
    pub fn outstanding_on(&self, processor: &str) -> Vec<TaskId> {
        let outstanding = self
            .shared
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        outstanding
            .iter()
            .filter(|(_, task)| task.processor == processor)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Send one heartbeat to `processor`, bounded by `timeout`.
    ///
    /// Returns `true` only for a timely `SERVING`/`TRANSITIONING` answer.
    pub async fn heartbeat(&self, processor: &ProcessorHandle, timeout: Duration) -> bool {
        let attempt = async {
            let conn = self.shared.connection_for(processor).await?;
            conn.health_check(HealthCheckRequest::now()).await
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(response)) => {
                debug!(processor = %processor.name, status = ?response.status, "heartbeat answered");
                response.status.is_alive()
            }
            Ok(Err(err)) => {
                debug!(processor = %processor.name, error = %err, "heartbeat failed");
                false
            }
            Err(_) => {
                debug!(processor = %processor.name, ?timeout, "heartbeat timed out");
                false
            }
        }
    }

    /// Fail every task outstanding on `processor` with a synthesized
    /// unhandled failure and drop its pooled connection.
    ///
    /// Returns how many tasks were failed.
    pub async fn fail_processor(&self, processor: &str, reason: &str) -> usize {
        self.shared.drop_connection(processor);

        let failed = self
            .shared
            .take_outstanding(|_, task| task.processor == processor);
        let count = failed.len();
        if count > 0 {
            warn!(processor = %processor, tasks = count, reason, "failing tasks outstanding on lost processor");
        }

        for (id, task) in failed {
            // Closes the runner's stream; it will not route anything itself.
            let _ = task.cancel.send(());
            let result = AlgorithmResult {
                algorithm: id.algorithm.clone(),
                outcome: TaskOutcome::unhandled_failure(format!(
                    "processor '{processor}' lost: {reason}"
                )),
            };
            self.shared.router.route(id.exec_id, result).await;
        }

        count
    }
}

impl TaskDispatcher for StreamingDispatcher {
    fn dispatch(&self, tasks: Vec<DispatchTask>) -> BoxFuture<'_, Result<()>> {
        let shared = Arc::clone(&self.shared);

        Box::pin(async move {
            for task in tasks {
                let id = TaskId {
                    exec_id: task.exec_id,
                    algorithm: task.key(),
                };
                let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

                // Register before spawning so a fast runner always finds its
                // own entry.
                {
                    let mut outstanding = shared
                        .outstanding
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    if outstanding.contains_key(&id) {
                        warn!(
                            exec_id = %id.exec_id,
                            algorithm = %id.algorithm,
                            "task already has an open stream; ignoring duplicate dispatch"
                        );
                        continue;
                    }
                    outstanding.insert(
                        id.clone(),
                        OutstandingTask {
                            processor: task.processor.clone(),
                            cancel: cancel_tx,
                        },
                    );
                }

                debug!(exec_id = %id.exec_id, algorithm = %id.algorithm, processor = %task.processor, "dispatching task");
                tokio::spawn(run_task(Arc::clone(&shared), id, task, cancel_rx));
            }
            Ok(())
        })
    }

    fn cancel_execution(&self, exec_id: ExecutionId) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let cancelled = self.shared.take_outstanding(|id, _| id.exec_id == exec_id);
            if !cancelled.is_empty() {
                info!(exec_id = %exec_id, tasks = cancelled.len(), "closing open task streams");
            }
            for (_, task) in cancelled {
                let _ = task.cancel.send(());
            }
        })
    }
}
