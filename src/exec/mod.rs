// src/exec/mod.rs

//! Task dispatch layer.
//!
//! This module is responsible for getting ready algorithm tasks to their
//! processors and reporting every outcome back to the owning execution via
//! the [`ResultRouter`](crate::engine::ResultRouter).
//!
//! - [`transport`] defines the processor connection seam implemented by an
//!   RPC adapter.
//! - [`backend`] provides the `TaskDispatcher` trait execution actors use,
//!   which tests can replace with a fake implementation.
//! - [`dispatcher`] owns the connection pool and outstanding-task table.
//! - [`task_runner`] handles one task's result stream.
//! - [`health`] runs heartbeats and declares processors lost.

pub mod backend;
pub mod dispatcher;
pub mod health;
pub mod task_runner;
pub mod transport;

pub use backend::TaskDispatcher;
pub use dispatcher::{StreamingDispatcher, TaskId};
pub use health::{HealthMonitor, HeartbeatSettings, HeartbeatTracker};
pub use transport::{ProcessorConnection, ProcessorTransport, ResultStream};
