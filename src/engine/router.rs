// src/engine/router.rs

//! Result router.
//!
//! Maps an execution id to the event channel of the actor that owns that
//! execution. Results arriving concurrently from many processors are queued
//! on that one channel, so each execution context has exactly one writer.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::model::AlgorithmResult;
use crate::types::ExecutionId;

use super::ExecutionEvent;

#[derive(Debug, Default)]
pub struct ResultRouter {
    routes: RwLock<HashMap<ExecutionId, mpsc::Sender<ExecutionEvent>>>,
}

impl ResultRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a route for `exec_id` and return the receiving end for its actor.
    pub fn open(&self, exec_id: ExecutionId, capacity: usize) -> mpsc::Receiver<ExecutionEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        if routes.insert(exec_id, tx).is_some() {
            warn!(exec_id = %exec_id, "route replaced an existing one");
        }
        rx
    }

    /// Drop the route for a finished execution. Later results are discarded.
    pub fn close(&self, exec_id: ExecutionId) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        routes.remove(&exec_id);
    }

    /// Forward a result to the execution that owns it.
    ///
    /// Returns `false` if the execution is gone (finished or cancelled).
    pub async fn route(&self, exec_id: ExecutionId, result: AlgorithmResult) -> bool {
        self.send(
            exec_id,
            ExecutionEvent::ResultReceived {
                algorithm: result.algorithm,
                outcome: result.outcome,
            },
        )
        .await
    }

    /// Forward any event to the execution's actor.
    pub async fn send(&self, exec_id: ExecutionId, event: ExecutionEvent) -> bool {
        // Clone the sender so the lock is not held across `await`.
        let sender = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            routes.get(&exec_id).cloned()
        };

        let Some(sender) = sender else {
            debug!(exec_id = %exec_id, ?event, "no route for execution; dropping event");
            return false;
        };

        if sender.send(event).await.is_err() {
            debug!(exec_id = %exec_id, "execution actor gone; dropping event");
            return false;
        }
        true
    }

    /// Ids of every execution with an open route.
    pub fn active(&self) -> Vec<ExecutionId> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = routes.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
