// src/model/processor.rs

use serde::{Deserialize, Serialize};

use super::algorithm::Algorithm;

/// A processor announcing itself and the algorithms it executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorRegistration {
    pub name: String,
    /// Runtime label, e.g. `python3.11`.
    pub runtime: String,
    /// Address the coordinator dials to reach the processor.
    pub connection_str: String,
    #[serde(default)]
    pub supported_algorithms: Vec<Algorithm>,
}

impl ProcessorRegistration {
    pub fn handle(&self) -> ProcessorHandle {
        ProcessorHandle {
            name: self.name.clone(),
            runtime: self.runtime.clone(),
            connection_str: self.connection_str.clone(),
        }
    }
}

/// What the dispatcher needs to reach a processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessorHandle {
    pub name: String,
    pub runtime: String,
    pub connection_str: String,
}
