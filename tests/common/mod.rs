#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use orca::datalayer::MemoryDatalayer;
use orca::engine::{Coordinator, EngineSettings};
use orca::exec::HeartbeatSettings;

pub use orca_test_utils::{
    AlgorithmBuilder, FakeBehaviour, FakeTransport, RegistrationBuilder, init_tracing, key,
    window, window_at,
};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// A coordinator wired to a fake transport and an in-memory datalayer.
pub struct Harness {
    pub coordinator: Coordinator,
    pub transport: FakeTransport,
    pub datalayer: Arc<MemoryDatalayer>,
}

pub fn harness() -> Harness {
    harness_with(EngineSettings::default())
}

pub fn harness_with(settings: EngineSettings) -> Harness {
    harness_sharing(settings, Arc::new(MemoryDatalayer::new()))
}

/// Like [`harness_with`], reusing an existing datalayer (restart scenarios).
pub fn harness_sharing(settings: EngineSettings, datalayer: Arc<MemoryDatalayer>) -> Harness {
    let transport = FakeTransport::new();
    let coordinator = Coordinator::new(settings, Arc::new(transport.clone()), datalayer.clone());
    Harness {
        coordinator,
        transport,
        datalayer,
    }
}

/// Settings with heartbeats fast enough for tests.
pub fn fast_heartbeats() -> EngineSettings {
    EngineSettings {
        event_channel_capacity: 16,
        heartbeat: HeartbeatSettings {
            interval: Duration::from_millis(20),
            timeout: Duration::from_millis(10),
            max_missed: 3,
        },
    }
}

/// Processor `P` serving `A` and `B` (depends on `A`), both on `daily@1`.
pub fn chain_registration() -> orca::model::ProcessorRegistration {
    RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("A"))
        .algorithm(AlgorithmBuilder::new("B").depends_on("A", "P"))
        .build()
}
