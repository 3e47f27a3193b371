// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::cycle::find_back_edge;
use crate::errors::GraphError;
use crate::model::{Algorithm, AlgorithmKey, WindowTypeKey};

/// Internal node structure: the algorithm, its owner, immediate deps and
/// dependents.
#[derive(Debug, Clone)]
pub struct DagNode {
    pub algorithm: Algorithm,
    /// Processor that owns (and exclusively executes) this algorithm.
    pub processor: String,
    deps: Vec<AlgorithmKey>,
    dependents: Vec<AlgorithmKey>,
}

/// Immutable DAG of the algorithms triggered by one window type.
///
/// Nodes live in a flat map keyed by [`AlgorithmKey`]; edges are adjacency
/// lists of keys, so there are no pointer cycles to manage. Once built the
/// graph is shared behind an `Arc` and never mutated: a registration builds a
/// fresh graph and swaps it in.
#[derive(Debug, Clone)]
pub struct DagGraph {
    window_type: WindowTypeKey,
    nodes: BTreeMap<AlgorithmKey, DagNode>,
    /// Topological layering: layer 0 has no dependencies, layer `n` depends
    /// on at least one node in layer `n - 1`.
    layers: Vec<Vec<AlgorithmKey>>,
}

impl DagGraph {
    /// Build the graph for `window_type` from `(algorithm, owning processor)`
    /// pairs.
    ///
    /// Assumes every dependency is resolvable and shares `window_type`; the
    /// catalog checks both before calling this. Cycles are rejected here.
    pub fn build(
        window_type: WindowTypeKey,
        entries: impl IntoIterator<Item = (Algorithm, String)>,
    ) -> Result<Self, GraphError> {
        let mut nodes: BTreeMap<AlgorithmKey, DagNode> = BTreeMap::new();

        // First pass: create nodes with their dependency lists. A repeated
        // edge is kept once, in first-declaration order.
        for (algorithm, processor) in entries {
            let mut deps: Vec<AlgorithmKey> = Vec::new();
            for dep in algorithm.dependency_keys() {
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
            nodes.insert(
                algorithm.key(),
                DagNode {
                    algorithm,
                    processor,
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        let adjacency: BTreeMap<AlgorithmKey, Vec<AlgorithmKey>> = nodes
            .iter()
            .map(|(key, node)| (key.clone(), node.deps.clone()))
            .collect();

        if let Some((from, to)) = find_back_edge(&adjacency) {
            return Err(GraphError::Cycle {
                window_type,
                from,
                to,
            });
        }

        // Second pass: populate dependents based on deps.
        for (key, deps) in adjacency.iter() {
            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(key.clone());
                }
            }
        }

        let layers = compute_layers(&adjacency, &window_type)?;

        Ok(Self {
            window_type,
            nodes,
            layers,
        })
    }

    pub fn window_type(&self) -> &WindowTypeKey {
        &self.window_type
    }

    /// Return all algorithm keys, in key order.
    pub fn algorithms(&self) -> impl Iterator<Item = &AlgorithmKey> {
        self.nodes.keys()
    }

    pub fn node(&self, key: &AlgorithmKey) -> Option<&DagNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &AlgorithmKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Immediate dependencies of an algorithm.
    pub fn dependencies_of(&self, key: &AlgorithmKey) -> &[AlgorithmKey] {
        self.nodes
            .get(key)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of an algorithm.
    pub fn dependents_of(&self, key: &AlgorithmKey) -> &[AlgorithmKey] {
        self.nodes
            .get(key)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Algorithms with no dependencies (layer 0).
    pub fn roots(&self) -> &[AlgorithmKey] {
        self.layers.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn layers(&self) -> &[Vec<AlgorithmKey>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Longest-path layering over a petgraph topological order.
fn compute_layers(
    adjacency: &BTreeMap<AlgorithmKey, Vec<AlgorithmKey>>,
    window_type: &WindowTypeKey,
) -> Result<Vec<Vec<AlgorithmKey>>, GraphError> {
    // Edge direction: dep -> dependent.
    let mut graph: DiGraphMap<&AlgorithmKey, ()> = DiGraphMap::new();
    for key in adjacency.keys() {
        graph.add_node(key);
    }
    for (key, deps) in adjacency.iter() {
        for dep in deps {
            if adjacency.contains_key(dep) {
                graph.add_edge(dep, key, ());
            }
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| {
        let node = cycle.node_id().clone();
        GraphError::Cycle {
            window_type: window_type.clone(),
            from: node.clone(),
            to: node,
        }
    })?;

    let mut depth: HashMap<&AlgorithmKey, usize> = HashMap::new();
    for key in order.iter() {
        let level = adjacency
            .get(*key)
            .into_iter()
            .flatten()
            .filter_map(|dep| depth.get(dep).map(|d| d + 1))
            .max()
            .unwrap_or(0);
        depth.insert(*key, level);
    }

    let mut layers: Vec<Vec<AlgorithmKey>> = Vec::new();
    for (key, level) in depth {
        if layers.len() <= level {
            layers.resize_with(level + 1, Vec::new);
        }
        layers[level].push(key.clone());
    }
    for layer in layers.iter_mut() {
        layer.sort();
    }

    Ok(layers)
}
