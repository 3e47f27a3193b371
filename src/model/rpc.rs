// src/model/rpc.rs

//! Messages exchanged at the RPC boundary.
//!
//! Encoding and transport are owned by whatever adapter sits in front of the
//! [`Coordinator`](crate::engine::Coordinator) and behind a
//! [`ProcessorTransport`](crate::exec::ProcessorTransport); these are the
//! plain Rust shapes both sides agree on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::Algorithm;
use super::result::AlgorithmResult;
use super::window::Window;
use crate::types::ExecutionId;

/// Acknowledgement for a processor registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub received: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowEmitStatus {
    /// Nothing subscribes to this window type. Not an error.
    NoTriggeredAlgorithms,
    ProcessingTriggered,
    /// Internal fault while creating the execution. Never retried by the
    /// engine; the caller re-emits if it wants another attempt.
    TriggeringFailed,
}

/// One task sent to a processor over `ExecuteDagPart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub exec_id: ExecutionId,
    pub window: Arc<Window>,
    pub algorithm: Algorithm,
    /// Results of every direct dependency. All of them are present when the
    /// task is sent.
    pub dependency_results: Vec<AlgorithmResult>,
}

/// One item of an `ExecuteDagPart` response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exec_id: ExecutionId,
    pub algorithm_result: AlgorithmResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckRequest {
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckRequest {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Unknown,
    Serving,
    Transitioning,
    NotServing,
}

impl ServingStatus {
    /// Whether a heartbeat with this status counts as a live processor.
    pub fn is_alive(self) -> bool {
        matches!(self, ServingStatus::Serving | ServingStatus::Transitioning)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorMetrics {
    pub active_tasks: u64,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: ServingStatus,
    pub message: String,
    #[serde(default)]
    pub metrics: Option<ProcessorMetrics>,
}

impl HealthCheckResponse {
    pub fn serving() -> Self {
        Self {
            status: ServingStatus::Serving,
            message: String::new(),
            metrics: None,
        }
    }
}
