//! Directed file dependency graph and the analyses derived from it.
//!
//! Nodes are relative file paths; an edge `a -> b` means `a` imports
//! something that resolved to `b`. Cycle detection runs Tarjan's SCC
//! algorithm first, then enumerates every elementary cycle inside each
//! non-trivial component with a rooted DFS, so the result is the full
//! cycle list rather than a cycle-exists flag.

use std::cmp::min;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: BTreeSet<String>,
    edges: BTreeSet<(String, String)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: impl Into<String>) {
        self.nodes.insert(node.into());
    }

    /// Insert a directed edge, adding endpoints as nodes when missing.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        let to = to.into();
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());
        self.edges.insert((from, to));
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.edges
            .iter()
            .any(|(f, t)| f == from && t == to)
    }

    pub fn successors(&self, node: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(f, _)| f == node)
            .map(|(_, t)| t.as_str())
            .collect()
    }

    /// Total degree: incoming plus outgoing edges.
    pub fn degree(&self, node: &str) -> usize {
        self.edges
            .iter()
            .filter(|(f, t)| f == node || t == node)
            .count()
    }

    /// Adjacency view keyed by source node, sorted both ways.
    pub fn adjacency(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut adj: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for node in &self.nodes {
            adj.entry(node.as_str()).or_default();
        }
        for (from, to) in &self.edges {
            adj.entry(from.as_str()).or_default().push(to.as_str());
        }
        adj
    }

    /// Degree centrality per node: `degree / (node_count - 1)`, rounded to
    /// 3 decimals, sorted descending (name ascending on ties), truncated to
    /// `limit` entries.
    pub fn central_files(&self, limit: usize) -> Vec<CentralFile> {
        let n = self.nodes.len();
        if n <= 1 {
            return Vec::new();
        }
        let denom = (n - 1) as f64;
        let mut ranked: Vec<CentralFile> = self
            .nodes
            .iter()
            .map(|node| CentralFile {
                file: node.clone(),
                centrality: (self.degree(node) as f64 / denom * 1000.0).round() / 1000.0,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.centrality
                .partial_cmp(&a.centrality)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file.cmp(&b.file))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Nodes with no incoming and no outgoing edges.
    pub fn isolated_nodes(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| self.degree(n) == 0)
            .cloned()
            .collect()
    }

    /// Every elementary cycle in the graph.
    ///
    /// Self-loops come out as single-element cycles. Each longer cycle is
    /// reported exactly once, rooted at its lexicographically smallest node,
    /// in deterministic order.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let names: Vec<&String> = self.nodes.iter().collect();
        let index_of: BTreeMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut cycles: Vec<Vec<String>> = Vec::new();
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
        for (from, to) in &self.edges {
            if from == to {
                cycles.push(vec![from.clone()]);
                continue;
            }
            // Edge set is sorted, so each adjacency list comes out sorted.
            adj[index_of[from.as_str()]].push(index_of[to.as_str()]);
        }

        for scc in tarjan_sccs(&adj) {
            if scc.len() < 2 {
                continue;
            }
            let members: BTreeSet<usize> = scc.iter().copied().collect();
            let mut on_path = vec![false; names.len()];
            let mut path = Vec::new();
            for &root in &members {
                cycle_dfs(
                    root,
                    root,
                    &adj,
                    &members,
                    &mut on_path,
                    &mut path,
                    &mut |cycle| cycles.push(cycle.iter().map(|&i| names[i].clone()).collect()),
                );
            }
        }
        cycles
    }
}

/// DFS from `root` restricted to SCC members with index >= `root`; every
/// closed walk back to the root is one elementary cycle.
fn cycle_dfs(
    v: usize,
    root: usize,
    adj: &[Vec<usize>],
    members: &BTreeSet<usize>,
    on_path: &mut [bool],
    path: &mut Vec<usize>,
    emit: &mut impl FnMut(&[usize]),
) {
    path.push(v);
    on_path[v] = true;
    for &w in &adj[v] {
        if w == root {
            emit(path);
        } else if w > root && members.contains(&w) && !on_path[w] {
            cycle_dfs(w, root, adj, members, on_path, path, emit);
        }
    }
    on_path[v] = false;
    path.pop();
}

struct TarjanState {
    index: usize,
    indices: Vec<Option<usize>>,
    lowlinks: Vec<usize>,
    stack: Vec<usize>,
    on_stack: Vec<bool>,
    sccs: Vec<Vec<usize>>,
}

fn tarjan_sccs(adj: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adj.len();
    let mut state = TarjanState {
        index: 0,
        indices: vec![None; n],
        lowlinks: vec![0; n],
        stack: Vec::new(),
        on_stack: vec![false; n],
        sccs: Vec::new(),
    };
    for v in 0..n {
        if state.indices[v].is_none() {
            strongconnect(v, adj, &mut state);
        }
    }
    state.sccs
}

fn strongconnect(v: usize, adj: &[Vec<usize>], state: &mut TarjanState) {
    state.indices[v] = Some(state.index);
    state.lowlinks[v] = state.index;
    state.index += 1;
    state.stack.push(v);
    state.on_stack[v] = true;

    for &w in &adj[v] {
        if state.indices[w].is_none() {
            strongconnect(w, adj, state);
            state.lowlinks[v] = min(state.lowlinks[v], state.lowlinks[w]);
        } else if state.on_stack[w] {
            let w_index = state.indices[w].unwrap_or(0);
            state.lowlinks[v] = min(state.lowlinks[v], w_index);
        }
    }

    if Some(state.lowlinks[v]) == state.indices[v] {
        let mut scc = Vec::new();
        while let Some(w) = state.stack.pop() {
            state.on_stack[w] = false;
            scc.push(w);
            if w == v {
                break;
            }
        }
        state.sccs.push(scc);
    }
}

/// One entry of the central-files ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CentralFile {
    pub file: String,
    pub centrality: f64,
}

/// Result of a full dependency analysis pass over a project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyReport {
    /// Top files by degree centrality.
    pub central_files: Vec<CentralFile>,
    /// Nodes with total degree zero.
    pub isolated_files: Vec<String>,
    /// Import tokens that matched no project file, with occurrence counts.
    pub external_dependencies: BTreeMap<String, usize>,
    /// All elementary cycles.
    pub circular_dependencies: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (f, t) in edges {
            g.add_edge(*f, *t);
        }
        g
    }

    #[test]
    fn three_ring_yields_exactly_one_cycle() {
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = g.find_cycles();
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".into(), "c".into()]]);
    }

    #[test]
    fn dag_has_no_cycles() {
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(g.find_cycles().is_empty());
    }

    #[test]
    fn self_loop_is_a_single_node_cycle() {
        let g = graph(&[("a", "a"), ("a", "b")]);
        assert_eq!(g.find_cycles(), vec![vec!["a".to_string()]]);
    }

    #[test]
    fn disjoint_two_cycles_are_both_found() {
        let g = graph(&[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")]);
        let cycles = g.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".into()]));
        assert!(cycles.contains(&vec!["c".to_string(), "d".into()]));
    }

    #[test]
    fn shared_node_cycles_are_enumerated_separately() {
        // Figure-eight through a: a<->b and a<->c are distinct elementary
        // cycles even though they sit in one SCC.
        let g = graph(&[("a", "b"), ("b", "a"), ("a", "c"), ("c", "a")]);
        let cycles = g.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".into()]));
        assert!(cycles.contains(&vec!["a".to_string(), "c".into()]));
    }

    #[test]
    fn overlapping_cycles_in_one_scc() {
        // a->b->c->a and b->c->b share the edge b->c.
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "b")]);
        let cycles = g.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".into(), "c".into()]));
        assert!(cycles.contains(&vec!["b".to_string(), "c".into()]));
    }

    #[test]
    fn centrality_ranks_the_hub_first() {
        let g = graph(&[("hub", "a"), ("hub", "b"), ("hub", "c")]);
        let ranked = g.central_files(10);
        assert_eq!(ranked[0].file, "hub");
        // degree 3 over n-1 = 3
        assert_eq!(ranked[0].centrality, 1.0);
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[1].centrality, 0.333);
    }

    #[test]
    fn isolated_nodes_have_zero_degree() {
        let mut g = graph(&[("a", "b")]);
        g.add_node("loner");
        assert_eq!(g.isolated_nodes(), vec!["loner".to_string()]);
    }

    #[test]
    fn degree_counts_both_directions() {
        let g = graph(&[("a", "b"), ("c", "b")]);
        assert_eq!(g.degree("b"), 2);
        assert_eq!(g.degree("a"), 1);
        assert_eq!(g.adjacency()["a"], vec!["b"]);
        assert!(g.adjacency()["b"].is_empty());
    }
}
