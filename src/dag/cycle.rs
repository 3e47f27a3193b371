// src/dag/cycle.rs

//! Cycle detection over a flat adjacency map.
//!
//! Iterative depth-first search with explicit `InProgress` / `Done` marks.
//! A dependency edge that reaches an `InProgress` node is a back-edge and
//! therefore closes a cycle.

use std::collections::{BTreeMap, HashMap};

use crate::model::AlgorithmKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Find one back-edge `(dependent, dependency)` in `deps`, if any.
///
/// `deps` maps every node to its direct dependencies. Edges pointing at keys
/// that are not in the map are ignored; resolvability is checked elsewhere.
/// Traversal order follows key order so the reported edge is deterministic.
pub fn find_back_edge(
    deps: &BTreeMap<AlgorithmKey, Vec<AlgorithmKey>>,
) -> Option<(AlgorithmKey, AlgorithmKey)> {
    let mut marks: HashMap<&AlgorithmKey, Mark> = HashMap::new();

    for start in deps.keys() {
        if marks.contains_key(start) {
            continue;
        }

        // Stack of (node, index of the next dependency to visit).
        let mut stack: Vec<(&AlgorithmKey, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::InProgress);

        while let Some((node, next)) = stack.pop() {
            let edges = deps.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if next >= edges.len() {
                marks.insert(node, Mark::Done);
                continue;
            }

            // Come back to this node for its remaining edges.
            stack.push((node, next + 1));

            let dep = &edges[next];
            if !deps.contains_key(dep) {
                continue;
            }

            match marks.get(dep) {
                Some(Mark::InProgress) => return Some((node.clone(), dep.clone())),
                Some(Mark::Done) => {}
                None => {
                    marks.insert(dep, Mark::InProgress);
                    stack.push((dep, 0));
                }
            }
        }
    }

    None
}
