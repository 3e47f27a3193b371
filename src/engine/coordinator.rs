// src/engine/coordinator.rs

//! Coordinator facade.
//!
//! The [`Coordinator`] is what an RPC adapter talks to. It owns the
//! process-scoped registry and catalog, creates one execution actor per
//! triggering window, and wires the dispatcher, router and datalayer
//! together.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dag::{Catalog, ExecutionContext, ExecutionSummary};
use crate::datalayer::Datalayer;
use crate::errors::{OrcaError, Result};
use crate::exec::{HealthMonitor, ProcessorTransport, StreamingDispatcher, TaskDispatcher};
use crate::model::{
    HealthCheckResponse, ProcessorMetrics, ProcessorRegistration, ServingStatus, Status, Window,
    WindowEmitStatus, validate_registration, validate_window,
};
use crate::registry::ProcessorRegistry;
use crate::types::ExecutionId;

use super::core::ExecutionCore;
use super::resolver::WindowTriggerResolver;
use super::router::ResultRouter;
use super::runtime::ExecutionRuntime;
use super::{EngineSettings, ExecutionEvent};

/// Awaitable view of one execution started by
/// [`Coordinator::emit_window_tracked`].
#[derive(Debug)]
pub struct ExecutionHandle {
    exec_id: ExecutionId,
    done: oneshot::Receiver<ExecutionSummary>,
}

impl ExecutionHandle {
    pub fn id(&self) -> ExecutionId {
        self.exec_id
    }

    /// Wait for the execution to reach its aggregate status.
    pub async fn wait(self) -> Result<ExecutionSummary> {
        self.done.await.map_err(|_| {
            OrcaError::Other(anyhow!("execution {} ended without a summary", self.exec_id))
        })
    }
}

/// Result of emitting a window with tracking.
#[derive(Debug)]
pub struct EmitOutcome {
    pub status: WindowEmitStatus,
    /// Present only when `status` is `ProcessingTriggered`.
    pub execution: Option<ExecutionHandle>,
}

pub struct Coordinator {
    settings: EngineSettings,
    registry: Arc<ProcessorRegistry>,
    catalog: Arc<Catalog>,
    resolver: WindowTriggerResolver,
    router: Arc<ResultRouter>,
    dispatcher: Arc<dyn TaskDispatcher>,
    /// Set when the dispatcher is the streaming one; heartbeats need it.
    streaming: Option<StreamingDispatcher>,
    datalayer: Arc<dyn Datalayer>,
    /// Serializes registrations: validate, persist and publish as one unit.
    /// One lock for every window type rather than one per affected DAG;
    /// executions read immutable snapshots and never wait on it.
    registration_lock: tokio::sync::Mutex<()>,
    next_exec_id: AtomicU64,
    executions: Mutex<HashMap<ExecutionId, JoinHandle<()>>>,
    monitor: Mutex<Option<HealthMonitor>>,
    started_at: Instant,
}

impl Coordinator {
    /// Build a coordinator that streams tasks over `transport`.
    pub fn new(
        settings: EngineSettings,
        transport: Arc<dyn ProcessorTransport>,
        datalayer: Arc<dyn Datalayer>,
    ) -> Self {
        let registry = Arc::new(ProcessorRegistry::new());
        let router = Arc::new(ResultRouter::new());
        let streaming = StreamingDispatcher::new(transport, Arc::clone(&registry), Arc::clone(&router));
        let dispatcher: Arc<dyn TaskDispatcher> = Arc::new(streaming.clone());

        let mut coordinator = Self::with_parts(settings, registry, router, dispatcher, datalayer);
        coordinator.streaming = Some(streaming);
        coordinator
    }

    /// Build a coordinator around an arbitrary dispatcher. The dispatcher
    /// must report outcomes through `router`.
    pub fn with_parts(
        settings: EngineSettings,
        registry: Arc<ProcessorRegistry>,
        router: Arc<ResultRouter>,
        dispatcher: Arc<dyn TaskDispatcher>,
        datalayer: Arc<dyn Datalayer>,
    ) -> Self {
        let catalog = Arc::new(Catalog::new());
        Self {
            settings,
            registry,
            resolver: WindowTriggerResolver::new(Arc::clone(&catalog)),
            catalog,
            router,
            dispatcher,
            streaming: None,
            datalayer,
            registration_lock: tokio::sync::Mutex::new(()),
            next_exec_id: AtomicU64::new(1),
            executions: Mutex::new(HashMap::new()),
            monitor: Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    pub fn registry(&self) -> &Arc<ProcessorRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn router(&self) -> &Arc<ResultRouter> {
        &self.router
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start heartbeating registered processors. Returns `false` when the
    /// coordinator has no streaming dispatcher or a monitor already runs.
    pub fn start_health_monitor(&self) -> bool {
        let Some(ref streaming) = self.streaming else {
            warn!("health monitor needs the streaming dispatcher; not started");
            return false;
        };

        let mut monitor = self.monitor.lock().unwrap_or_else(PoisonError::into_inner);
        if monitor.is_some() {
            return false;
        }
        *monitor = Some(HealthMonitor::spawn(
            streaming.clone(),
            Arc::clone(&self.registry),
            self.settings.heartbeat,
        ));
        true
    }

    /// Register a processor and its algorithms.
    ///
    /// Either every check passes and the registration is persisted and
    /// published, or nothing changes.
    pub async fn register_processor(&self, registration: ProcessorRegistration) -> Result<Status> {
        validate_registration(&registration)?;

        let _guard = self.registration_lock.lock().await;

        self.registry.check_registration(&registration)?;
        let staged = self.catalog.stage(&registration, &self.registry)?;

        self.datalayer
            .create_processor(registration.clone())
            .await
            .map_err(|err| {
                error!(processor = %registration.name, error = %err, "failed to persist registration");
                err
            })?;

        self.catalog.commit(staged)?;

        let name = registration.name.clone();
        let algorithms = registration.supported_algorithms.len();
        self.registry.insert(registration, true);

        info!(processor = %name, algorithms, "processor registered");
        Ok(Status {
            received: true,
            message: format!("processor '{name}' registered with {algorithms} algorithm(s)"),
        })
    }

    /// Replay registrations stored in the datalayer. Restored processors are
    /// unavailable until they register again.
    ///
    /// Returns how many registrations were restored.
    pub async fn restore(&self) -> Result<usize> {
        let _guard = self.registration_lock.lock().await;

        let mut remaining = self.datalayer.processors().await?;
        let mut restored = 0;

        // Registrations may depend on each other, so retry until a pass makes
        // no progress.
        loop {
            let before = remaining.len();
            let mut failed = Vec::new();

            for registration in remaining {
                if self.registry.handle_of(&registration.name).is_some() {
                    debug!(processor = %registration.name, "already known; not restoring");
                    continue;
                }
                match self.catalog.register(&registration, &self.registry) {
                    Ok(()) => {
                        self.registry.insert(registration, false);
                        restored += 1;
                    }
                    Err(err) => failed.push((registration, err)),
                }
            }

            if failed.is_empty() || failed.len() == before {
                for (registration, err) in failed.iter() {
                    warn!(processor = %registration.name, error = %err, "stored registration could not be restored");
                }
                break;
            }
            remaining = failed.into_iter().map(|(registration, _)| registration).collect();
        }

        info!(restored, "registrations restored from datalayer");
        Ok(restored)
    }

    /// Emit a window and start the execution it triggers.
    pub async fn emit_window(&self, window: Window) -> Result<WindowEmitStatus> {
        Ok(self.emit_window_tracked(window).await?.status)
    }

    /// Like [`emit_window`](Self::emit_window), but also returns a handle to
    /// await the execution's summary.
    ///
    /// Validation errors are returned as `Err`; internal faults while
    /// creating the execution are reported as `TriggeringFailed`.
    pub async fn emit_window_tracked(&self, window: Window) -> Result<EmitOutcome> {
        validate_window(&window)?;

        if let Err(err) = self.datalayer.emit_window(window.clone()).await {
            error!(window_type = %window.window_type(), error = %err, "failed to persist window");
            return Ok(EmitOutcome {
                status: WindowEmitStatus::TriggeringFailed,
                execution: None,
            });
        }

        let resolution = self.resolver.resolve(&window);
        let Some(graph) = resolution.graph else {
            return Ok(EmitOutcome {
                status: resolution.status,
                execution: None,
            });
        };

        let exec_id = ExecutionId(self.next_exec_id.fetch_add(1, Ordering::Relaxed));
        let event_rx = self
            .router
            .open(exec_id, self.settings.event_channel_capacity);

        let context = ExecutionContext::new(exec_id, Arc::new(window), graph);
        let runtime = ExecutionRuntime::new(
            ExecutionCore::new(context),
            event_rx,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.router),
            Arc::clone(&self.datalayer),
        );

        let (done_tx, done_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let summary = runtime.run().await;
            // The caller may not be waiting.
            let _ = done_tx.send(summary);
        });

        {
            let mut executions = self.executions.lock().unwrap_or_else(PoisonError::into_inner);
            executions.retain(|_, handle| !handle.is_finished());
            executions.insert(exec_id, handle);
        }

        info!(exec_id = %exec_id, "execution created");
        Ok(EmitOutcome {
            status: WindowEmitStatus::ProcessingTriggered,
            execution: Some(ExecutionHandle {
                exec_id,
                done: done_rx,
            }),
        })
    }

    /// Request cancellation of one execution. Returns `false` if it already
    /// finished.
    pub async fn cancel(&self, exec_id: ExecutionId) -> bool {
        self.router
            .send(exec_id, ExecutionEvent::CancelRequested)
            .await
    }

    /// Ids of executions that have not finished yet.
    pub fn active_executions(&self) -> Vec<ExecutionId> {
        self.router.active()
    }

    /// Cancel every running execution, wait for the actors to finish and
    /// stop the health monitor.
    pub async fn shutdown(&self) {
        let monitor = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(monitor) = monitor {
            monitor.stop().await;
        }

        let active = self.router.active();
        info!(executions = active.len(), "coordinator shutting down");
        for exec_id in active {
            self.cancel(exec_id).await;
        }

        let handles: Vec<_> = {
            let mut executions = self.executions.lock().unwrap_or_else(PoisonError::into_inner);
            executions.drain().collect()
        };
        for (exec_id, handle) in handles {
            if let Err(err) = handle.await {
                warn!(exec_id = %exec_id, error = %err, "execution actor ended abnormally");
            }
        }
    }

    /// Answer a `HealthCheck` addressed to the coordinator itself.
    ///
    /// Processor and execution counts go in the message, since
    /// `ProcessorMetrics` has no field for them. `active_tasks` is the number
    /// of task streams still open on the streaming dispatcher (0 for any
    /// other dispatcher).
    pub fn health(&self) -> HealthCheckResponse {
        let registered = self.registry.len();
        let available = self.registry.available_processors().len();
        let executions = self.router.len();
        let active_tasks = self
            .streaming
            .as_ref()
            .map_or(0, StreamingDispatcher::outstanding_count);
        HealthCheckResponse {
            status: ServingStatus::Serving,
            message: format!(
                "{available}/{registered} processors available, {executions} active execution(s)"
            ),
            metrics: Some(ProcessorMetrics {
                active_tasks: active_tasks as u64,
                uptime_seconds: self.started_at.elapsed().as_secs(),
                ..ProcessorMetrics::default()
            }),
        }
    }
}
