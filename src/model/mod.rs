// src/model/mod.rs

//! Domain model shared by every component.
//!
//! - [`window`]: window types and emitted windows.
//! - [`algorithm`]: algorithm nodes, their dependency edges and result shapes.
//! - [`processor`]: processor registrations.
//! - [`result`]: per-algorithm outcomes.
//! - [`rpc`]: request/response shapes at the RPC boundary.
//! - [`validate`]: field-level validation of incoming messages.

pub mod algorithm;
pub mod processor;
pub mod result;
pub mod rpc;
pub mod validate;
pub mod window;

pub use algorithm::{Algorithm, AlgorithmDependency, AlgorithmKey, ResultShape};
pub use processor::{ProcessorHandle, ProcessorRegistration};
pub use result::{AlgorithmResult, ResultStatus, ResultValue, TaskOutcome};
pub use rpc::{
    ExecutionRequest, ExecutionResult, HealthCheckRequest, HealthCheckResponse,
    ProcessorMetrics, ServingStatus, Status, WindowEmitStatus,
};
pub use window::{Window, WindowType, WindowTypeKey};
pub use validate::{validate_algorithm, validate_registration, validate_window};
