// src/engine/resolver.rs

//! Window trigger resolution.

use std::sync::Arc;

use tracing::debug;

use crate::dag::{Catalog, DagGraph};
use crate::model::{Window, WindowEmitStatus};

/// What a window triggers.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub status: WindowEmitStatus,
    /// The full DAG snapshot of the window's type; `None` unless
    /// `status` is `ProcessingTriggered`.
    pub graph: Option<Arc<DagGraph>>,
}

impl Resolution {
    pub fn no_triggered_algorithms() -> Self {
        Self {
            status: WindowEmitStatus::NoTriggeredAlgorithms,
            graph: None,
        }
    }
}

/// Looks up the DAG snapshot a window triggers.
///
/// Readiness order is left to the execution; the resolver hands over every
/// node of the window type's DAG.
#[derive(Debug, Clone)]
pub struct WindowTriggerResolver {
    catalog: Arc<Catalog>,
}

impl WindowTriggerResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn resolve(&self, window: &Window) -> Resolution {
        let window_type = window.window_type();

        match self.catalog.graph_for(&window_type) {
            Some(graph) if !graph.is_empty() => {
                debug!(
                    window_type = %window_type,
                    algorithms = graph.len(),
                    "window triggers algorithms"
                );
                Resolution {
                    status: WindowEmitStatus::ProcessingTriggered,
                    graph: Some(graph),
                }
            }
            _ => {
                debug!(window_type = %window_type, "no algorithms registered for window type");
                Resolution::no_triggered_algorithms()
            }
        }
    }
}
