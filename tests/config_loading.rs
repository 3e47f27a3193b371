// tests/config_loading.rs

mod common;
use crate::common::{TestResult, init_tracing};

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use orca::config::{build_catalog, load_and_validate, parse_and_validate};
use orca::errors::OrcaError;
use orca::format_plan;
use orca::model::{ResultShape, WindowTypeKey};

const MANIFEST: &str = r#"
[coordinator]
heartbeat_interval_ms = 1000
heartbeat_timeout_ms = 500

# Declared first, but depends on `ingest`, so it registers second.
[processor.analytics]
runtime = "python3.11"
connection = "analytics:5377"

[[processor.analytics.algorithm]]
name = "mean"
version = "1.0.0"
window_type = { name = "daily", version = "1" }
result = "value"
depends_on = [{ name = "raw", version = "1.0.0", processor = "ingest" }]

[[processor.analytics.algorithm]]
name = "report"
version = "1.0.0"
window_type = { name = "daily", version = "1" }
result = "struct"
depends_on = [{ name = "mean", version = "1.0.0" }]

[processor.ingest]
runtime = "rust"
connection = "ingest:5377"

[[processor.ingest.algorithm]]
name = "raw"
version = "1.0.0"
window_type = { name = "daily", version = "1", description = "one calendar day" }
result = "array"
"#;

#[test]
fn loads_manifest_from_disk() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("Orca.toml");
    fs::write(&path, MANIFEST)?;

    let cfg = load_and_validate(&path)?;

    let settings = cfg.engine_settings();
    assert_eq!(settings.heartbeat.interval, Duration::from_millis(1000));
    assert_eq!(settings.heartbeat.timeout, Duration::from_millis(500));
    assert_eq!(settings.heartbeat.max_missed, 3);
    assert_eq!(settings.event_channel_capacity, 64);

    let names: Vec<_> = cfg.registrations.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["ingest", "analytics"]);

    let analytics = &cfg.registrations[1];
    let report = &analytics.supported_algorithms[1];
    assert_eq!(report.result_shape, ResultShape::Struct);
    // `processor` defaults to the declaring processor.
    assert_eq!(report.dependencies[0].processor, "analytics");

    Ok(())
}

#[test]
fn empty_file_uses_defaults() -> TestResult {
    let cfg = parse_and_validate("")?;
    let settings = cfg.engine_settings();
    assert_eq!(settings.heartbeat.interval, Duration::from_secs(5));
    assert_eq!(settings.heartbeat.timeout, Duration::from_secs(2));
    assert!(cfg.registrations.is_empty());
    Ok(())
}

#[test]
fn timeout_longer_than_interval_is_rejected() {
    let err = parse_and_validate(
        r#"
[coordinator]
heartbeat_interval_ms = 100
heartbeat_timeout_ms = 200
"#,
    )
    .unwrap_err();
    assert!(matches!(err, OrcaError::ConfigError(_)));
    assert!(err.to_string().contains("heartbeat_timeout_ms"));
}

#[test]
fn zero_missed_heartbeats_is_rejected() {
    let err = parse_and_validate("[coordinator]\nmax_missed_heartbeats = 0\n").unwrap_err();
    assert!(matches!(err, OrcaError::ConfigError(_)));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let err = parse_and_validate("[coordinator\n").unwrap_err();
    assert!(matches!(err, OrcaError::TomlError(_)));
}

#[test]
fn cyclic_manifest_is_rejected() {
    let err = parse_and_validate(
        r#"
[processor.p]
runtime = "rust"
connection = "p:1"

[[processor.p.algorithm]]
name = "a"
version = "1"
window_type = { name = "daily", version = "1" }
depends_on = [{ name = "b", version = "1" }]

[[processor.p.algorithm]]
name = "b"
version = "1"
window_type = { name = "daily", version = "1" }
depends_on = [{ name = "a", version = "1" }]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, OrcaError::ConfigError(_)));
    assert!(err.to_string().contains("cycle"), "{err}");
}

#[test]
fn processor_without_connection_is_rejected() {
    let err = parse_and_validate(
        r#"
[processor.p]
runtime = "rust"
connection = ""
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("[processor.p]"), "{err}");
}

#[test]
fn plan_lists_layers_per_window_type() -> TestResult {
    let cfg = parse_and_validate(MANIFEST)?;
    let (_, catalog, _) = build_catalog(cfg.registrations.clone())?;
    let snapshot = catalog.snapshot();

    let plan = format_plan(&cfg, &snapshot, None)?;
    assert!(plan.contains("window type daily@1 (3 algorithm(s)):"), "{plan}");
    assert!(plan.contains("  layer 0: raw@1.0.0 on ingest"), "{plan}");
    assert!(plan.contains("  layer 1: mean@1.0.0 on analytics"), "{plan}");
    assert!(plan.contains("  layer 2: report@1.0.0 on analytics"), "{plan}");

    let weekly = WindowTypeKey::new("weekly", "1");
    let plan = format_plan(&cfg, &snapshot, Some(&weekly))?;
    assert!(plan.contains("window type weekly@1: NO_TRIGGERED_ALGORITHMS"), "{plan}");
    Ok(())
}
