// tests/property_execution.rs

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use proptest::prelude::*;

use orca::dag::{Catalog, ExecutionContext, NodeState};
use orca::model::{ProcessorRegistration, TaskOutcome, ResultValue, WindowTypeKey};
use orca::registry::ProcessorRegistry;
use orca::types::{ExecutionId, ExecutionStatus};
use orca_test_utils::builders::{AlgorithmBuilder, RegistrationBuilder, key, window};

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Succeed,
    Handled,
    Unhandled,
}

fn outcome_strategy() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        6 => Just(Outcome::Succeed),
        1 => Just(Outcome::Handled),
        1 => Just(Outcome::Unhandled),
    ]
}

// Acyclic by construction: node N may only depend on nodes 0..N-1.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<Outcome>)> {
    (1..=max_nodes).prop_flat_map(|n| {
        (
            proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..3), n),
            proptest::collection::vec(outcome_strategy(), n),
        )
            .prop_map(|(raw, outcomes)| {
                let deps = raw
                    .into_iter()
                    .enumerate()
                    .map(|(i, candidates)| {
                        if i == 0 {
                            return Vec::new();
                        }
                        let set: HashSet<usize> = candidates.into_iter().map(|c| c % i).collect();
                        let mut deps: Vec<usize> = set.into_iter().collect();
                        deps.sort();
                        deps
                    })
                    .collect();
                (deps, outcomes)
            })
    })
}

fn name(i: usize) -> String {
    format!("alg_{i:02}")
}

fn registration(deps: &[Vec<usize>]) -> ProcessorRegistration {
    let mut builder = RegistrationBuilder::new("P");
    for (i, node_deps) in deps.iter().enumerate() {
        let mut algorithm = AlgorithmBuilder::new(&name(i));
        for dep in node_deps {
            algorithm = algorithm.depends_on(&name(*dep), "P");
        }
        builder = builder.algorithm(algorithm);
    }
    builder.build()
}

proptest! {
    #[test]
    fn execution_respects_dependencies((deps, outcomes) in dag_strategy(12)) {
        let registry = ProcessorRegistry::new();
        let catalog = Catalog::new();
        let reg = registration(&deps);
        catalog.register(&reg, &registry).expect("acyclic graph must be accepted");

        let graph = catalog
            .graph_for(&WindowTypeKey::new("daily", "1"))
            .expect("graph");
        prop_assert_eq!(graph.len(), deps.len());

        let mut context = ExecutionContext::new(
            ExecutionId(1),
            Arc::new(window("daily", "1")),
            graph,
        );

        let mut queue: VecDeque<_> = context.start().newly_dispatched.into();
        let mut dispatched: HashSet<String> = HashSet::new();
        let mut steps = 0;

        while let Some(task) = queue.pop_front() {
            steps += 1;
            prop_assert!(steps <= deps.len(), "more dispatches than nodes");

            let i: usize = task.algorithm.name[4..].parse().expect("index");
            prop_assert!(dispatched.insert(task.algorithm.name.clone()), "dispatched twice");

            // Every dependency succeeded and its result travels with the task.
            for dep in deps[i].iter() {
                prop_assert_eq!(context.node_state(&key(&name(*dep))), Some(NodeState::Succeeded));
            }
            prop_assert_eq!(task.dependency_results.len(), deps[i].len());

            let outcome = match outcomes[i] {
                Outcome::Succeed => TaskOutcome::succeeded(ResultValue::Scalar(i as f64)),
                Outcome::Handled => TaskOutcome::handled_failure("handled"),
                Outcome::Unhandled => TaskOutcome::unhandled_failure("unhandled"),
            };

            // A duplicate delivery must change nothing.
            let step = context.on_result(&task.key(), outcome.clone());
            let again = context.on_result(&task.key(), outcome);
            prop_assert!(again.is_noop());

            queue.extend(step.newly_dispatched);
        }

        prop_assert!(context.is_finished());

        // Expected state: succeeded iff its own outcome and all upstream
        // succeeded; failed if dispatched and failed; skipped otherwise.
        let mut ok = vec![false; deps.len()];
        for i in 0..deps.len() {
            let upstream_ok = deps[i].iter().all(|d| ok[*d]);
            ok[i] = upstream_ok && matches!(outcomes[i], Outcome::Succeed);

            let state = context.node_state(&key(&name(i))).expect("node");
            if ok[i] {
                prop_assert_eq!(state, NodeState::Succeeded);
            } else if upstream_ok {
                prop_assert!(matches!(state, NodeState::Failed(_)));
            } else {
                prop_assert_eq!(state, NodeState::Skipped);
                prop_assert!(!dispatched.contains(&name(i)));
            }
        }

        let expected = if ok.iter().all(|v| *v) {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::PartiallyFailed
        };
        prop_assert_eq!(context.status(), expected);
    }
}
