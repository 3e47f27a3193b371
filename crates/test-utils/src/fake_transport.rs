#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use orca::errors::{OrcaError, Result};
use orca::exec::{ProcessorConnection, ProcessorTransport, ResultStream};
use orca::model::{
    AlgorithmKey, AlgorithmResult, ExecutionRequest, ExecutionResult, HealthCheckRequest,
    HealthCheckResponse, ProcessorHandle, ResultShape, ResultValue, ServingStatus, TaskOutcome,
};
use orca::types::BoxFuture;
use tokio::sync::mpsc;

/// How the fake answers `ExecuteDagPart` for one algorithm.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Stream these outcomes in order, then end the stream.
    Reply(Vec<TaskOutcome>),
    /// Keep the stream open without ever sending anything.
    Hang,
    /// End the stream without a terminal result.
    CloseEarly,
    /// Fail the call itself.
    Fail(String),
}

#[derive(Debug, Default)]
struct FakeState {
    behaviours: HashMap<AlgorithmKey, FakeBehaviour>,
    requests: Vec<ExecutionRequest>,
    dead: HashMap<String, bool>,
    heartbeats: HashMap<String, u32>,
}

/// Scriptable in-memory processor transport.
///
/// Unscripted algorithms succeed with a payload matching their declared
/// result shape. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, algorithm: AlgorithmKey, behaviour: FakeBehaviour) {
        self.state.lock().unwrap().behaviours.insert(algorithm, behaviour);
    }

    /// Make `processor` answer heartbeats with `NOT_SERVING` (or `SERVING`
    /// again with `alive = true`).
    pub fn set_alive(&self, processor: &str, alive: bool) {
        self.state
            .lock()
            .unwrap()
            .dead
            .insert(processor.to_string(), !alive);
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Names of the algorithms requested so far, in request order.
    pub fn requested_names(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.algorithm.name)
            .collect()
    }

    pub fn heartbeats(&self, processor: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .heartbeats
            .get(processor)
            .copied()
            .unwrap_or(0)
    }

    /// Poll until `name` has been requested, returning the request.
    pub async fn wait_for_request(&self, name: &str) -> ExecutionRequest {
        loop {
            let found = self
                .requests()
                .into_iter()
                .find(|r| r.algorithm.name == name);
            if let Some(request) = found {
                return request;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl ProcessorTransport for FakeTransport {
    fn connect(&self, processor: ProcessorHandle) -> BoxFuture<'_, Result<Arc<dyn ProcessorConnection>>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let conn: Arc<dyn ProcessorConnection> = Arc::new(FakeConnection {
                processor: processor.name,
                state,
            });
            Ok(conn)
        })
    }
}

struct FakeConnection {
    processor: String,
    state: Arc<Mutex<FakeState>>,
}

fn default_value(shape: ResultShape) -> ResultValue {
    match shape {
        ResultShape::None => ResultValue::None,
        ResultShape::Value => ResultValue::Scalar(1.0),
        ResultShape::Array => ResultValue::Array(vec![1.0, 2.0]),
        ResultShape::Struct => ResultValue::Structured(serde_json::Map::new()),
    }
}

impl ProcessorConnection for FakeConnection {
    fn execute_dag_part(&self, request: ExecutionRequest) -> BoxFuture<'_, Result<ResultStream>> {
        Box::pin(async move {
            let key = request.algorithm.key();
            let behaviour = {
                let mut state = self.state.lock().unwrap();
                state.requests.push(request.clone());
                state.behaviours.get(&key).cloned().unwrap_or_else(|| {
                    FakeBehaviour::Reply(vec![TaskOutcome::succeeded(default_value(
                        request.algorithm.result_shape,
                    ))])
                })
            };

            let (tx, rx) = mpsc::channel(8);
            match behaviour {
                FakeBehaviour::Reply(outcomes) => {
                    let exec_id = request.exec_id;
                    tokio::spawn(async move {
                        for outcome in outcomes {
                            let item = ExecutionResult {
                                exec_id,
                                algorithm_result: AlgorithmResult {
                                    algorithm: key.clone(),
                                    outcome,
                                },
                            };
                            if tx.send(item).await.is_err() {
                                return;
                            }
                        }
                    });
                }
                FakeBehaviour::Hang => {
                    tokio::spawn(async move { tx.closed().await });
                }
                FakeBehaviour::CloseEarly => drop(tx),
                FakeBehaviour::Fail(message) => return Err(OrcaError::Transport(message)),
            }
            Ok(rx)
        })
    }

    fn health_check(&self, _request: HealthCheckRequest) -> BoxFuture<'_, Result<HealthCheckResponse>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            *state.heartbeats.entry(self.processor.clone()).or_insert(0) += 1;
            if state.dead.get(&self.processor).copied().unwrap_or(false) {
                return Ok(HealthCheckResponse {
                    status: ServingStatus::NotServing,
                    message: "down".to_string(),
                    metrics: None,
                });
            }
            Ok(HealthCheckResponse::serving())
        })
    }
}
