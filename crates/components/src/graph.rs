//! Dependency graph diagnostics for the component catalog.
//!
//! A diagnostic view only: the authoritative satisfaction state comes
//! from the manager's fixpoint resolution. The graph names cycle
//! participants for the error log and provides orderings for display.

use std::collections::HashMap;

use petgraph::algo::{is_cyclic_directed, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

/// Directed dependency graph over component names.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Mapping from component name to node index.
    nodes: HashMap<String, NodeIndex>,

    /// The underlying directed graph; edges run dependency -> dependent.
    graph: DiGraph<String, ()>,
}

impl DependencyGraph {
    /// Builds a graph from `(name, dependencies)` pairs.
    ///
    /// Edges to names absent from the catalog are skipped; a missing
    /// dependency is the fixpoint resolver's concern, not a graph
    /// error.
    pub fn from_components(components: &[(String, Vec<String>)]) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for (name, _) in components {
            let idx = graph.add_node(name.clone());
            nodes.insert(name.clone(), idx);
        }

        for (name, dependencies) in components {
            let to_idx = nodes[name];
            for dep in dependencies {
                if let Some(from_idx) = nodes.get(dep) {
                    graph.add_edge(*from_idx, to_idx, ());
                }
            }
        }

        Self { nodes, graph }
    }

    /// True when any dependency cycle exists.
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Names of all components participating in a dependency cycle.
    pub fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || (scc.len() == 1 && self.graph.contains_edge(scc[0], scc[0]))
            })
            .flatten()
            .map(|idx| self.graph[idx].clone())
            .collect();
        members.sort();
        members
    }

    /// Dependency-first order over all components, or `None` when the
    /// graph is cyclic.
    pub fn topological_order(&self) -> Option<Vec<String>> {
        toposort(&self.graph, None)
            .ok()
            .map(|order| order.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Direct dependents of `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.nodes.get(name) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// All component names in the graph.
    pub fn names(&self) -> Vec<&str> {
        self.nodes.keys().map(|s| s.as_str()).collect()
    }
}
