//! Cycle detection over the unlabeled union of all link types.
//!
//! Strongly connected components are found with Tarjan's algorithm, driven by
//! an explicit work stack so that stack usage does not grow with graph depth.
//! One concrete cycle is then recovered per component.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::graphmap::DiGraphMap;
use serde::Serialize;

use crate::{
    analysis::TypedGraph,
    domain::{CycleSeverity, Severity},
};

/// A closed path in the link graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Cycle {
    /// Nodes in traversal order, starting at the lexicographically smallest
    /// id. The last node links back to the first.
    pub nodes: Vec<String>,
    /// Number of nodes (and edges) on the cycle.
    pub length: usize,
    /// Severity graded by length.
    pub severity: Severity,
    /// Link types actually traversed along the cycle.
    pub link_types: BTreeSet<String>,
}

/// Finds every cycle in the graph, one per strongly connected component plus
/// one per self-loop.
///
/// The result is sorted and independent of record order.
#[must_use]
pub fn detect_cycles(graph: &TypedGraph<'_>, severity: &CycleSeverity) -> Vec<Cycle> {
    let unlabeled = graph.unlabeled();
    let mut seen: BTreeSet<Vec<&str>> = BTreeSet::new();

    for component in strongly_connected(&unlabeled) {
        if component.len() == 1 {
            let node = component[0];
            if unlabeled.contains_edge(node, node) {
                seen.insert(vec![node]);
            }
            continue;
        }

        let members: HashSet<&str> = component.iter().copied().collect();
        if let Some(path) = cycle_within(&unlabeled, &members) {
            seen.insert(canonicalize(path));
        }
    }

    let mut cycles: Vec<Cycle> = seen
        .into_iter()
        .map(|nodes| {
            let length = nodes.len();
            let link_types = nodes
                .iter()
                .zip(nodes.iter().cycle().skip(1))
                .flat_map(|(from, to)| graph.link_types_between(from, to))
                .map(str::to_string)
                .collect();
            Cycle {
                nodes: nodes.into_iter().map(str::to_string).collect(),
                length,
                severity: severity.for_length(length),
                link_types,
            }
        })
        .collect();

    cycles.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.nodes.cmp(&b.nodes)));
    cycles
}

/// Shortest cycle that the edge `from -> to` closes (or would close).
///
/// Searches breadth-first from `to` back to `from`. The returned path starts
/// at `from`, continues with `to`, and its last node links back to `from`.
/// Returns `None` if `to` cannot reach `from`.
#[must_use]
pub fn find_minimal_cycle(graph: &TypedGraph<'_>, from: &str, to: &str) -> Option<Vec<String>> {
    if from == to {
        return graph.contains(from).then(|| vec![from.to_string()]);
    }

    let mut predecessor: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([to]);
    let mut visited = HashSet::from([to]);

    while let Some(node) = queue.pop_front() {
        if node == from {
            let mut path = vec![from];
            let mut current = from;
            while current != to {
                current = predecessor[current];
                path.push(current);
            }
            // path runs from back to `to`; reverse it so that it starts at `to`,
            // then rotate `from` to the front.
            path.reverse();
            path.rotate_right(1);
            return Some(path.into_iter().map(str::to_string).collect());
        }

        for next in graph.neighbours(node) {
            if visited.insert(next) {
                predecessor.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    None
}

/// Tarjan's strongly connected components, iterative.
fn strongly_connected<'a>(graph: &DiGraphMap<&'a str, ()>) -> Vec<Vec<&'a str>> {
    struct Frame<'a> {
        node: &'a str,
        successors: Vec<&'a str>,
        next: usize,
    }

    let mut roots: Vec<&str> = graph.nodes().collect();
    roots.sort_unstable();

    let successors_of = |node: &'a str| {
        let mut successors: Vec<&str> = graph.neighbors(node).collect();
        successors.sort_unstable();
        successors
    };

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(roots.len());
    let mut lowlink: HashMap<&str, usize> = HashMap::with_capacity(roots.len());
    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut components = Vec::new();
    let mut counter = 0;

    for root in roots {
        if index.contains_key(root) {
            continue;
        }

        index.insert(root, counter);
        lowlink.insert(root, counter);
        counter += 1;
        stack.push(root);
        on_stack.insert(root);
        let mut work = vec![Frame {
            node: root,
            successors: successors_of(root),
            next: 0,
        }];

        while let Some(frame) = work.last_mut() {
            let node = frame.node;

            if let Some(&next) = frame.successors.get(frame.next) {
                frame.next += 1;
                if let Some(&next_index) = index.get(next) {
                    if on_stack.contains(next) {
                        let low = lowlink[node].min(next_index);
                        lowlink.insert(node, low);
                    }
                } else {
                    index.insert(next, counter);
                    lowlink.insert(next, counter);
                    counter += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    work.push(Frame {
                        node: next,
                        successors: successors_of(next),
                        next: 0,
                    });
                }
                continue;
            }

            work.pop();
            if let Some(parent) = work.last() {
                let low = lowlink[parent.node].min(lowlink[node]);
                lowlink.insert(parent.node, low);
            }

            if lowlink[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }

    components
}

/// Depth-first search, restricted to `members`, for a path from the smallest
/// member back to itself.
fn cycle_within<'a>(
    graph: &DiGraphMap<&'a str, ()>,
    members: &HashSet<&'a str>,
) -> Option<Vec<&'a str>> {
    let start = members.iter().copied().min()?;

    let successors_of = |node: &'a str| {
        let mut successors: Vec<&str> = graph
            .neighbors(node)
            .filter(|n| members.contains(n))
            .collect();
        successors.sort_unstable();
        successors
    };

    // Each entry is (node, its successors, next successor to try).
    let mut path: Vec<(&str, Vec<&str>, usize)> = vec![(start, successors_of(start), 0)];
    let mut visited: HashSet<&str> = HashSet::from([start]);

    while let Some((_, successors, next)) = path.last_mut() {
        let Some(&candidate) = successors.get(*next) else {
            path.pop();
            continue;
        };
        *next += 1;

        if candidate == start {
            return Some(path.into_iter().map(|(node, _, _)| node).collect());
        }
        if visited.insert(candidate) {
            path.push((candidate, successors_of(candidate), 0));
        }
    }

    None
}

/// Rotate a cycle so that it starts at its smallest id.
fn canonicalize(mut nodes: Vec<&str>) -> Vec<&str> {
    if let Some(position) = nodes
        .iter()
        .enumerate()
        .min_by_key(|&(_, node)| *node)
        .map(|(position, _)| position)
    {
        nodes.rotate_left(position);
    }
    nodes
}
