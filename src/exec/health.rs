// src/exec/health.rs

//! Processor heartbeat monitoring.
//!
//! Every `interval`, each available processor gets one heartbeat bounded by
//! `timeout`. A processor that misses `max_missed` heartbeats in a row is
//! marked unavailable in the registry, and every task outstanding on it is
//! failed through the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::exec::dispatcher::StreamingDispatcher;
use crate::registry::ProcessorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_missed: u32,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(2),
            max_missed: 3,
        }
    }
}

/// Consecutive-miss bookkeeping, kept free of IO so it can be tested on its
/// own.
#[derive(Debug)]
pub struct HeartbeatTracker {
    max_missed: u32,
    missed: HashMap<String, u32>,
}

impl HeartbeatTracker {
    pub fn new(max_missed: u32) -> Self {
        Self {
            max_missed: max_missed.max(1),
            missed: HashMap::new(),
        }
    }

    /// Record one heartbeat outcome.
    ///
    /// Returns `true` exactly once, on the miss that reaches the threshold.
    /// A successful heartbeat resets the count.
    pub fn record(&mut self, processor: &str, alive: bool) -> bool {
        if alive {
            self.missed.remove(processor);
            return false;
        }

        let count = self.missed.entry(processor.to_string()).or_insert(0);
        *count += 1;
        debug!(processor = %processor, missed = *count, "heartbeat missed");
        *count == self.max_missed
    }

    pub fn missed(&self, processor: &str) -> u32 {
        self.missed.get(processor).copied().unwrap_or(0)
    }

    /// Forget a processor, e.g. once it has been declared lost.
    pub fn forget(&mut self, processor: &str) {
        self.missed.remove(processor);
    }
}

/// Handle to the background monitor. Dropping it leaves the monitor running;
/// call [`stop`](Self::stop) to end it.
#[derive(Debug)]
pub struct HealthMonitor {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    pub fn spawn(
        dispatcher: StreamingDispatcher,
        registry: Arc<ProcessorRegistry>,
        settings: HeartbeatSettings,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(monitor_loop(dispatcher, registry, settings, shutdown_rx));
        Self {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = self.handle.await {
            warn!(error = %err, "health monitor task ended abnormally");
        }
    }
}

async fn monitor_loop(
    dispatcher: StreamingDispatcher,
    registry: Arc<ProcessorRegistry>,
    settings: HeartbeatSettings,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    info!(
        interval = ?settings.interval,
        timeout = ?settings.timeout,
        max_missed = settings.max_missed,
        "health monitor started"
    );

    let mut tracker = HeartbeatTracker::new(settings.max_missed);
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown_rx => break,
        }

        let processors = registry.available_processors();
        let mut beats = JoinSet::new();
        for processor in processors {
            let dispatcher = dispatcher.clone();
            let timeout = settings.timeout;
            beats.spawn(async move {
                let alive = dispatcher.heartbeat(&processor, timeout).await;
                (processor.name, alive)
            });
        }

        while let Some(joined) = beats.join_next().await {
            let (name, alive) = match joined {
                Ok(beat) => beat,
                Err(err) => {
                    warn!(error = %err, "heartbeat task panicked");
                    continue;
                }
            };

            if !tracker.record(&name, alive) {
                continue;
            }

            tracker.forget(&name);
            if registry.mark_unavailable(&name) {
                let reason = format!("missed {} consecutive heartbeats", settings.max_missed);
                let failed = dispatcher.fail_processor(&name, &reason).await;
                warn!(processor = %name, failed_tasks = failed, "processor declared lost");
            }
        }
    }

    info!("health monitor stopped");
}
