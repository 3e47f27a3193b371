// tests/catalog_validation.rs

mod common;
use crate::common::{
    AlgorithmBuilder, RegistrationBuilder, TestResult, chain_registration, harness, init_tracing,
    key, window,
};

use std::sync::Arc;

use orca::dag::{Catalog, ExecutionContext};
use orca::errors::{GraphError, OrcaError};
use orca::model::{ResultValue, TaskOutcome, WindowTypeKey};
use orca::registry::ProcessorRegistry;
use orca::types::ExecutionId;

fn daily() -> WindowTypeKey {
    WindowTypeKey::new("daily", "1")
}

#[test]
fn diamond_is_layered_by_longest_path() -> TestResult {
    init_tracing();

    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();

    let reg = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("A"))
        .algorithm(AlgorithmBuilder::new("B").depends_on("A", "P"))
        .algorithm(AlgorithmBuilder::new("D").depends_on("A", "P"))
        .algorithm(
            AlgorithmBuilder::new("C")
                .depends_on("B", "P")
                .depends_on("A", "P"),
        )
        .build();

    registry.check_registration(&reg)?;
    catalog.register(&reg, &registry)?;
    registry.insert(reg, true);

    let graph = catalog.graph_for(&daily()).expect("daily@1 graph");
    assert_eq!(graph.len(), 4);
    assert_eq!(
        graph.layers(),
        &[vec![key("A")], vec![key("B"), key("D")], vec![key("C")]]
    );
    assert_eq!(graph.roots(), &[key("A")]);
    assert_eq!(graph.dependents_of(&key("A")), &[key("B"), key("C"), key("D")]);

    Ok(())
}

#[test]
fn cycle_is_rejected_and_catalog_unchanged() -> TestResult {
    init_tracing();

    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();

    let ok = RegistrationBuilder::new("P0")
        .algorithm(AlgorithmBuilder::new("base"))
        .build();
    catalog.register(&ok, &registry)?;
    registry.insert(ok, true);
    let before = catalog.snapshot();

    let cyclic = RegistrationBuilder::new("P1")
        .algorithm(AlgorithmBuilder::new("X").depends_on("Y", "P1"))
        .algorithm(AlgorithmBuilder::new("Y").depends_on("Z", "P1"))
        .algorithm(AlgorithmBuilder::new("Z").depends_on("X", "P1"))
        .build();

    let err = catalog.register(&cyclic, &registry).unwrap_err();
    match err {
        OrcaError::Graph(GraphError::Cycle { window_type, .. }) => {
            assert_eq!(window_type, daily());
        }
        other => panic!("expected cycle error, got {other:?}"),
    }

    let after = catalog.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.len(), 1);
    assert!(after.algorithm(&key("X")).is_none());

    Ok(())
}

#[test]
fn self_dependency_is_a_cycle() {
    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();

    let reg = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("A").depends_on("A", "P"))
        .build();

    let err = catalog.register(&reg, &registry).unwrap_err();
    assert!(matches!(err, OrcaError::Graph(GraphError::Cycle { .. })));
    assert!(catalog.snapshot().is_empty());
}

#[test]
fn cross_window_type_dependency_is_rejected() -> TestResult {
    init_tracing();

    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();

    let hourly = RegistrationBuilder::new("P1")
        .algorithm(AlgorithmBuilder::new("D").window_type("hourly", "1"))
        .build();
    catalog.register(&hourly, &registry)?;
    registry.insert(hourly, true);
    let before = catalog.snapshot();

    let daily_reg = RegistrationBuilder::new("P2")
        .algorithm(AlgorithmBuilder::new("C").depends_on("D", "P1"))
        .build();
    registry.check_registration(&daily_reg)?;

    let err = catalog.register(&daily_reg, &registry).unwrap_err();
    match err {
        OrcaError::Graph(GraphError::WindowTypeMismatch {
            algorithm,
            dependency,
            expected,
            found,
        }) => {
            assert_eq!(algorithm, key("C"));
            assert_eq!(dependency, key("D"));
            assert_eq!(expected, daily());
            assert_eq!(found, WindowTypeKey::new("hourly", "1"));
        }
        other => panic!("expected window type mismatch, got {other:?}"),
    }

    assert!(Arc::ptr_eq(&before, &catalog.snapshot()));
    assert!(catalog.graph_for(&daily()).is_none());
    Ok(())
}

#[test]
fn unresolved_dependency_names_the_edge() {
    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();

    let reg = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("C").depends_on("missing", "Q"))
        .build();

    let err = catalog.register(&reg, &registry).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Graph error: algorithm C@1 depends on missing@1 which processor 'Q' does not provide"
    );
    assert_eq!(err.status_code(), "FAILED_PRECONDITION");
}

#[test]
fn dependency_on_wrong_processor_is_unresolved() -> TestResult {
    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();

    let source = RegistrationBuilder::new("P1")
        .algorithm(AlgorithmBuilder::new("A"))
        .build();
    catalog.register(&source, &registry)?;
    registry.insert(source, true);

    let consumer = RegistrationBuilder::new("P2")
        .algorithm(AlgorithmBuilder::new("B").depends_on("A", "P3"))
        .build();
    let err = catalog.register(&consumer, &registry).unwrap_err();
    assert!(matches!(
        err,
        OrcaError::Graph(GraphError::UnresolvedDependency { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn coordinator_rejects_invalid_and_conflicting_registrations() -> TestResult {
    init_tracing();
    let h = harness();

    let empty_address = RegistrationBuilder::new("P").connection("").build();
    let err = h
        .coordinator
        .register_processor(empty_address)
        .await
        .unwrap_err();
    assert!(matches!(err, OrcaError::Validation(_)));
    assert_eq!(err.status_code(), "INVALID_ARGUMENT");

    let status = h.coordinator.register_processor(chain_registration()).await?;
    assert!(status.received);

    // Same name while the first one is available.
    let err = h
        .coordinator
        .register_processor(chain_registration())
        .await
        .unwrap_err();
    assert!(matches!(err, OrcaError::Conflict(_)));
    assert_eq!(err.status_code(), "ALREADY_EXISTS");

    // Another processor claiming `A@1`.
    let thief = RegistrationBuilder::new("Q")
        .algorithm(AlgorithmBuilder::new("A"))
        .build();
    let err = h.coordinator.register_processor(thief).await.unwrap_err();
    assert!(matches!(err, OrcaError::Conflict(_)));

    // A new version is a new node and is fine for another processor.
    let v2 = RegistrationBuilder::new("Q")
        .algorithm(AlgorithmBuilder::new("A").version("2"))
        .build();
    h.coordinator.register_processor(v2).await?;

    assert_eq!(h.coordinator.catalog().snapshot().len(), 3);
    assert_eq!(h.coordinator.registry().len(), 2);
    Ok(())
}

#[tokio::test]
async fn lost_processor_can_register_again_with_identical_algorithms() -> TestResult {
    init_tracing();
    let h = harness();

    h.coordinator.register_processor(chain_registration()).await?;
    assert!(h.coordinator.registry().mark_unavailable("P"));

    // Redefining an existing version is refused.
    let changed = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("A").result(orca::model::ResultShape::Array))
        .build();
    let err = h.coordinator.register_processor(changed).await.unwrap_err();
    assert!(matches!(err, OrcaError::Conflict(_)));
    assert!(!h.coordinator.registry().is_available("P"));

    h.coordinator.register_processor(chain_registration()).await?;
    assert!(h.coordinator.registry().is_available("P"));
    let handle = h.coordinator.registry().resolve("B", "1")?;
    assert_eq!(handle.name, "P");
    Ok(())
}

#[tokio::test]
async fn reconnect_must_redeclare_owned_algorithms() -> TestResult {
    init_tracing();
    let h = harness();

    h.coordinator
        .register_processor(
            RegistrationBuilder::new("P")
                .algorithm(AlgorithmBuilder::new("A"))
                .build(),
        )
        .await?;
    assert!(h.coordinator.registry().mark_unavailable("P"));

    let without_a = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("Z"))
        .build();
    let err = h.coordinator.register_processor(without_a).await.unwrap_err();
    assert!(matches!(err, OrcaError::Conflict(_)));
    assert!(err.to_string().contains("A@1"), "{err}");
    assert!(!h.coordinator.registry().is_available("P"));
    assert!(h.coordinator.catalog().snapshot().algorithm(&key("Z")).is_none());

    // Adding new algorithms alongside the old ones is fine.
    let superset = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("A"))
        .algorithm(AlgorithmBuilder::new("Z"))
        .build();
    h.coordinator.register_processor(superset).await?;
    assert!(h.coordinator.registry().is_available("P"));

    let graph = h
        .coordinator
        .catalog()
        .graph_for(&daily())
        .expect("daily@1 graph");
    assert_eq!(graph.len(), 2);
    Ok(())
}

#[tokio::test]
async fn repeated_dependency_is_rejected_at_registration() {
    let h = harness();
    let reg = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("B"))
        .algorithm(
            AlgorithmBuilder::new("A")
                .depends_on("B", "P")
                .depends_on("B", "P"),
        )
        .build();

    let err = h.coordinator.register_processor(reg).await.unwrap_err();
    assert!(matches!(err, OrcaError::Validation(_)));
    assert!(err.to_string().contains("more than once"), "{err}");
    assert!(h.coordinator.catalog().snapshot().is_empty());
}

#[test]
fn repeated_dependency_edge_dispatches_dependent_once() -> TestResult {
    let registry = ProcessorRegistry::new();
    let catalog = Catalog::new();
    let reg = RegistrationBuilder::new("P")
        .algorithm(AlgorithmBuilder::new("B"))
        .algorithm(
            AlgorithmBuilder::new("A")
                .depends_on("B", "P")
                .depends_on("B", "P"),
        )
        .build();

    // The catalog alone does not run field validation; the graph keeps the
    // edge once.
    catalog.register(&reg, &registry)?;
    let graph = catalog.graph_for(&daily()).expect("daily@1 graph");
    assert_eq!(graph.dependencies_of(&key("A")), &[key("B")]);
    assert_eq!(graph.dependents_of(&key("B")), &[key("A")]);

    let mut context = ExecutionContext::new(ExecutionId(1), Arc::new(window("daily", "1")), graph);
    let started = context.start();
    assert_eq!(started.newly_dispatched.len(), 1);

    let step = context.on_result(
        &key("B"),
        TaskOutcome::succeeded(ResultValue::Scalar(1.0)),
    );
    assert_eq!(step.newly_dispatched.len(), 1);
    assert_eq!(step.newly_dispatched[0].algorithm.name, "A");
    assert_eq!(step.newly_dispatched[0].dependency_results.len(), 1);
    Ok(())
}

#[tokio::test]
async fn dependency_may_be_registered_by_another_processor() -> TestResult {
    let h = harness();

    h.coordinator
        .register_processor(
            RegistrationBuilder::new("source")
                .algorithm(AlgorithmBuilder::new("raw"))
                .build(),
        )
        .await?;
    h.coordinator
        .register_processor(
            RegistrationBuilder::new("stats")
                .algorithm(AlgorithmBuilder::new("mean").depends_on("raw", "source"))
                .build(),
        )
        .await?;

    let graph = h
        .coordinator
        .catalog()
        .graph_for(&daily())
        .expect("daily@1 graph");
    assert_eq!(graph.layers(), &[vec![key("raw")], vec![key("mean")]]);
    assert_eq!(graph.node(&key("mean")).map(|n| n.processor.as_str()), Some("stats"));
    Ok(())
}
