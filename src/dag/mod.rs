// src/dag/mod.rs

//! Algorithm catalog, DAG representation and per-execution state.
//!
//! - [`catalog`] validates registrations and publishes immutable per-window
//!   type DAG snapshots.
//! - [`graph`] holds one window type's DAG with its topological layering.
//! - [`cycle`] finds back-edges with an explicit visited/in-progress walk.
//! - [`execution`] contains the per-window state machine that decides which
//!   algorithms are ready, and what happens when one fails.
//! - [`node_info`] provides node state and dispatch task types.
//! - [`execution_step`] defines the result type for execution steps.
//! - [`state_manager`] manages per-node state transitions.

pub mod catalog;
pub mod cycle;
pub mod execution;
pub mod execution_step;
pub mod graph;
pub mod node_info;
pub mod state_manager;

pub use catalog::{Catalog, CatalogEntry, CatalogState, StagedCatalog};
pub use execution::{ExecutionContext, ExecutionSummary};
pub use execution_step::ExecutionStep;
pub use graph::{DagGraph, DagNode};
pub use node_info::{DispatchTask, FailureKind, NodeState};
