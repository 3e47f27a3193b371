// src/model/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{AlgorithmKey, ResultShape};

/// Status a processor attaches to each item of a result stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Progress item; does not close the task.
    Unspecified,
    Succeeded,
    /// Expected failure reported by the algorithm itself.
    HandledFailure,
    /// Escalation-worthy failure (processor crash, lost connection, ...).
    UnhandledFailure,
}

impl ResultStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResultStatus::Unspecified)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ResultStatus::HandledFailure | ResultStatus::UnhandledFailure
        )
    }
}

/// Exactly one payload kind, matching the algorithm's [`ResultShape`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultValue {
    #[default]
    None,
    Scalar(f64),
    Array(Vec<f64>),
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl ResultValue {
    pub fn shape(&self) -> ResultShape {
        match self {
            ResultValue::None => ResultShape::None,
            ResultValue::Scalar(_) => ResultShape::Value,
            ResultValue::Array(_) => ResultShape::Array,
            ResultValue::Structured(_) => ResultShape::Struct,
        }
    }

    pub fn matches(&self, shape: ResultShape) -> bool {
        self.shape() == shape
    }
}

/// Outcome of one algorithm execution for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub status: ResultStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub value: ResultValue,
    /// Failure detail; engine-synthesized failures always set this.
    #[serde(default)]
    pub message: Option<String>,
}

impl TaskOutcome {
    pub fn succeeded(value: ResultValue) -> Self {
        Self {
            status: ResultStatus::Succeeded,
            timestamp: Utc::now(),
            value,
            message: None,
        }
    }

    pub fn handled_failure(message: impl Into<String>) -> Self {
        Self::failure(ResultStatus::HandledFailure, message)
    }

    pub fn unhandled_failure(message: impl Into<String>) -> Self {
        Self::failure(ResultStatus::UnhandledFailure, message)
    }

    pub fn progress() -> Self {
        Self {
            status: ResultStatus::Unspecified,
            timestamp: Utc::now(),
            value: ResultValue::None,
            message: None,
        }
    }

    fn failure(status: ResultStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            value: ResultValue::None,
            message: Some(message.into()),
        }
    }
}

/// A result attributed to the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    pub algorithm: AlgorithmKey,
    pub outcome: TaskOutcome,
}
