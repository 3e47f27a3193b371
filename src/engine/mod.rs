// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the window trigger resolver (which DAG does a window start?)
//! - one execution actor per in-flight window, reacting to:
//!   - results routed back from processors
//!   - cancellation requests
//! - the result router that serializes results per execution
//! - the coordinator facade used by the RPC boundary
//!
//! The pure per-execution state machine lives in [`core`]; the async/IO
//! shell is implemented in [`runtime`].

use crate::exec::HeartbeatSettings;
use crate::model::{AlgorithmKey, TaskOutcome};

/// Events flowing into one execution actor.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// A task closed with a result (reported by its processor or
    /// synthesized by the dispatcher).
    ResultReceived {
        algorithm: AlgorithmKey,
        outcome: TaskOutcome,
    },
    /// Cancel the execution (explicit cancel or coordinator shutdown).
    CancelRequested,
}

/// Options shared by the coordinator and the execution actors.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Buffer size of each execution's event channel.
    pub event_channel_capacity: usize,
    pub heartbeat: HeartbeatSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            event_channel_capacity: 64,
            heartbeat: HeartbeatSettings::default(),
        }
    }
}

pub mod coordinator;
pub mod core;
pub mod event_handlers;
pub mod resolver;
pub mod router;
pub mod runtime;

pub use coordinator::{Coordinator, EmitOutcome, ExecutionHandle};
pub use core::ExecutionCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use resolver::{Resolution, WindowTriggerResolver};
pub use router::ResultRouter;
pub use runtime::ExecutionRuntime;
