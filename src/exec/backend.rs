// src/exec/backend.rs

//! Pluggable dispatcher abstraction.
//!
//! Execution actors talk to a `TaskDispatcher` instead of a concrete
//! transport. This makes it easy to swap in a fake dispatcher in tests while
//! keeping the production implementation in [`dispatcher`](super::dispatcher).
//!
//! - [`StreamingDispatcher`](super::StreamingDispatcher) is the default
//!   implementation. It streams each task to its processor over a shared
//!   connection and routes the terminal result back through the
//!   [`ResultRouter`](crate::engine::ResultRouter).
//! - Tests can provide their own `TaskDispatcher` that, for example, records
//!   which tasks were dispatched and routes scripted outcomes.

use crate::dag::DispatchTask;
use crate::errors::Result;
use crate::types::{BoxFuture, ExecutionId};

/// Trait abstracting how ready algorithm tasks reach processors.
pub trait TaskDispatcher: Send + Sync {
    /// Dispatch the given tasks.
    ///
    /// Must not wait for results: the outcome of every task is delivered
    /// later through the result router, including failures the dispatcher
    /// synthesizes itself (unknown or unreachable processor, broken stream).
    fn dispatch(&self, tasks: Vec<DispatchTask>) -> BoxFuture<'_, Result<()>>;

    /// Close every open stream belonging to `exec_id`. Best effort: the
    /// processor may keep working on its side. No results are routed for
    /// the closed tasks.
    fn cancel_execution(&self, exec_id: ExecutionId) -> BoxFuture<'_, ()>;
}
