//! Typed, directed view of the link graph.
//!
//! Unlike the symmetric link graph held by the index, this view keeps link-type
//! labels and direction. It is a pure function of the records and is rebuilt
//! for every analysis run, never mutated incrementally.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graphmap::DiGraphMap;

use crate::domain::RequirementObject;

/// `node -> link type -> [target]`, with deterministic ordering throughout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedGraph<'a> {
    edges: BTreeMap<&'a str, BTreeMap<&'a str, Vec<&'a str>>>,
}

impl<'a> TypedGraph<'a> {
    /// Builds the typed view from a set of records.
    ///
    /// Every record becomes a node, even without links. Repeated targets
    /// within one link type collapse to a single edge.
    pub fn build(records: impl IntoIterator<Item = &'a RequirementObject>) -> Self {
        let mut edges: BTreeMap<&str, BTreeMap<&str, Vec<&str>>> = BTreeMap::new();

        for record in records {
            let node = edges.entry(record.id.as_str()).or_default();
            for (link_type, targets) in &record.links {
                let mut unique: Vec<&str> = targets.iter().map(String::as_str).collect();
                unique.sort_unstable();
                unique.dedup();
                if !unique.is_empty() {
                    node.insert(link_type.as_str(), unique);
                }
            }
        }

        Self { edges }
    }

    /// Ids of all records in the graph, sorted.
    pub fn nodes(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.edges.keys().copied()
    }

    /// Whether `id` is a record in the graph.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Outgoing edges of `node` grouped by link type.
    #[must_use]
    pub fn links(&self, node: &str) -> Option<&BTreeMap<&'a str, Vec<&'a str>>> {
        self.edges.get(node)
    }

    /// Outgoing `(link type, target)` pairs of `node`.
    pub fn successors(&self, node: &str) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.edges
            .get(node)
            .into_iter()
            .flat_map(|by_type| {
                by_type
                    .iter()
                    .flat_map(|(&link_type, targets)| targets.iter().map(move |&t| (link_type, t)))
            })
    }

    /// Distinct targets of `node` across every link type, sorted.
    #[must_use]
    pub fn neighbours(&self, node: &str) -> Vec<&'a str> {
        let unique: BTreeSet<&str> = self.successors(node).map(|(_, t)| t).collect();
        unique.into_iter().collect()
    }

    /// Link types on the direct edge `from -> to`.
    #[must_use]
    pub fn link_types_between(&self, from: &str, to: &str) -> BTreeSet<&'a str> {
        self.successors(from)
            .filter(|&(_, target)| target == to)
            .map(|(link_type, _)| link_type)
            .collect()
    }

    /// Total number of typed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// The unlabeled union of all link types, restricted to edges between
    /// records (dangling targets cannot take part in a cycle).
    #[must_use]
    pub fn unlabeled(&self) -> DiGraphMap<&'a str, ()> {
        let mut graph = DiGraphMap::with_capacity(self.edges.len(), self.edge_count());
        for &node in self.edges.keys() {
            graph.add_node(node);
        }
        for &node in self.edges.keys() {
            for target in self.neighbours(node) {
                if self.edges.contains_key(target) {
                    graph.add_edge(node, target, ());
                }
            }
        }
        graph
    }
}
