// src/exec/transport.rs

//! Processor transport abstraction.
//!
//! Wire encoding and the RPC stack live outside this crate. An adapter
//! implements [`ProcessorTransport`] to dial a processor and hands back a
//! [`ProcessorConnection`] that the dispatcher shares across every task sent
//! to that processor. Each `execute_dag_part` call is its own stream, so
//! concurrent tasks on one connection never interfere.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::model::{
    ExecutionRequest, ExecutionResult, HealthCheckRequest, HealthCheckResponse, ProcessorHandle,
};
use crate::types::BoxFuture;

/// Server-streamed results of one `ExecuteDagPart` call.
///
/// The stream yields zero or more progress items and is closed by the first
/// terminal result.
pub type ResultStream = mpsc::Receiver<ExecutionResult>;

/// One long-lived connection to a processor.
pub trait ProcessorConnection: Send + Sync {
    /// Start executing one task; results arrive on the returned stream.
    fn execute_dag_part(&self, request: ExecutionRequest) -> BoxFuture<'_, Result<ResultStream>>;

    /// Heartbeat.
    fn health_check(
        &self,
        request: HealthCheckRequest,
    ) -> BoxFuture<'_, Result<HealthCheckResponse>>;
}

/// Dials processors.
pub trait ProcessorTransport: Send + Sync {
    fn connect(
        &self,
        processor: ProcessorHandle,
    ) -> BoxFuture<'_, Result<Arc<dyn ProcessorConnection>>>;
}
