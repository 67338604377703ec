//! In-memory multi-index over requirement records.
//!
//! The [`RequirementIndex`] knows nothing about documents or files on disk. It
//! stores records keyed by id together with a set of derived secondary
//! indexes, all kept consistent on every mutation. Mutation is crate-private:
//! the [`IndexBuilder`](crate::domain::IndexBuilder) is the only writer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::domain::RequirementObject;

/// An in-memory representation of the set of requirements.
///
/// Storage is decomposed into:
/// - Records: `HashMap<String, RequirementObject>` (the primary mapping)
/// - Secondary indexes by file, type, level, status and baseline, each mapping
///   a key to the set of ids carrying it
/// - The link graph: a symmetric, reference-counted adjacency map answering
///   "is this id connected to that id, in either direction"
///
/// Directional, typed relationships are not stored here; they are recovered
/// from the records themselves by the graph adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementIndex {
    objects: HashMap<String, RequirementObject>,

    by_file: HashMap<String, BTreeSet<String>>,
    by_type: HashMap<String, BTreeSet<String>>,
    by_level: HashMap<String, BTreeSet<String>>,
    by_status: HashMap<String, BTreeSet<String>>,
    by_baseline: HashMap<String, BTreeSet<String>>,

    /// Symmetric adjacency. `link_refs[a][b]` counts how many existing records
    /// contribute the undirected edge `a - b` (at most 2: `a -> b` and
    /// `b -> a`). Entries are dropped when their count reaches zero.
    link_refs: HashMap<String, BTreeMap<String, usize>>,
}

/// Record counts per secondary index key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Total number of records.
    pub total: usize,
    /// Records per type.
    pub by_type: BTreeMap<String, usize>,
    /// Records per level.
    pub by_level: BTreeMap<String, usize>,
    /// Records per status.
    pub by_status: BTreeMap<String, usize>,
    /// Records per baseline.
    pub by_baseline: BTreeMap<String, usize>,
    /// Records per source file.
    pub by_file: BTreeMap<String, usize>,
    /// Number of distinct undirected links.
    pub links: usize,
}

impl RequirementIndex {
    /// Creates an empty index with room for `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            objects: HashMap::with_capacity(capacity),
            link_refs: HashMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the index holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RequirementObject> {
        self.objects.get(id)
    }

    /// Whether a record with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// Iterate over all records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &RequirementObject> {
        self.objects.values()
    }

    /// All records sorted by id.
    ///
    /// Analyzers use this to make their output independent of insertion order.
    #[must_use]
    pub fn sorted(&self) -> Vec<&RequirementObject> {
        let mut records: Vec<_> = self.objects.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Ids of records parsed from `file`.
    pub fn ids_by_file(&self, file: &str) -> impl Iterator<Item = &str> {
        lookup(&self.by_file, file)
    }

    /// Ids of records with the given type.
    pub fn ids_by_type(&self, kind: &str) -> impl Iterator<Item = &str> {
        lookup(&self.by_type, kind)
    }

    /// Ids of records with the given level.
    pub fn ids_by_level(&self, level: &str) -> impl Iterator<Item = &str> {
        lookup(&self.by_level, level)
    }

    /// Ids of records with the given status.
    pub fn ids_by_status(&self, status: &str) -> impl Iterator<Item = &str> {
        lookup(&self.by_status, status)
    }

    /// Ids of records tagged with the given baseline.
    pub fn ids_by_baseline(&self, baseline: &str) -> impl Iterator<Item = &str> {
        lookup(&self.by_baseline, baseline)
    }

    /// Every source file that currently contributes records.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.by_file.keys().map(String::as_str)
    }

    /// Ids connected to `id` by a link in either direction.
    ///
    /// This may include ids that have no record (dangling link targets), and
    /// includes `id` itself if it links to itself.
    pub fn link_graph(&self, id: &str) -> impl Iterator<Item = &str> {
        self.link_refs
            .get(id)
            .into_iter()
            .flat_map(BTreeMap::keys)
            .map(String::as_str)
    }

    /// Whether `a` and `b` are connected in either direction.
    #[must_use]
    pub fn linked(&self, a: &str, b: &str) -> bool {
        self.link_refs.get(a).is_some_and(|n| n.contains_key(b))
    }

    /// Existing records, other than `id` itself, that link to `id`.
    ///
    /// Candidates come from the symmetric link graph; the direction is then
    /// confirmed against the candidate's own links.
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.link_graph(id).filter(move |&other| {
            other != id
                && self
                    .objects
                    .get(other)
                    .is_some_and(|record| record.targets().any(|t| t == id))
        })
    }

    /// Record counts per secondary index key.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        fn counts(map: &HashMap<String, BTreeSet<String>>) -> BTreeMap<String, usize> {
            map.iter().map(|(k, ids)| (k.clone(), ids.len())).collect()
        }

        // Each undirected edge is stored twice, self-loops once.
        let doubled: usize = self
            .link_refs
            .iter()
            .map(|(a, neighbours)| {
                neighbours
                    .keys()
                    .map(|b| if a == b { 2 } else { 1 })
                    .sum::<usize>()
            })
            .sum();

        IndexStats {
            total: self.objects.len(),
            by_type: counts(&self.by_type),
            by_level: counts(&self.by_level),
            by_status: counts(&self.by_status),
            by_baseline: counts(&self.by_baseline),
            by_file: counts(&self.by_file),
            links: doubled / 2,
        }
    }

    /// The raw symmetric link references, for snapshot export.
    pub(crate) fn link_refs(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, usize>)> {
        self.link_refs.iter().map(|(id, n)| (id.as_str(), n))
    }

    /// Inserts a record, replacing and fully unindexing any record with the
    /// same id. Returns the replaced record.
    pub(crate) fn insert(&mut self, record: RequirementObject) -> Option<RequirementObject> {
        let previous = self.remove(&record.id);

        index_insert(&mut self.by_file, &record.location.file, &record.id);
        index_insert(&mut self.by_type, &record.kind, &record.id);
        if let Some(level) = &record.level {
            index_insert(&mut self.by_level, level, &record.id);
        }
        if let Some(status) = &record.status {
            index_insert(&mut self.by_status, status, &record.id);
        }
        if let Some(baseline) = record.baseline() {
            index_insert(&mut self.by_baseline, baseline, &record.id);
        }

        let targets: Vec<String> = record.targets().map(str::to_string).collect();
        for target in &targets {
            self.add_link_ref(&record.id, target);
        }

        self.objects.insert(record.id.clone(), record);
        previous
    }

    /// Removes a record and every contribution it made to the secondary
    /// indexes and to both directions of the link graph.
    pub(crate) fn remove(&mut self, id: &str) -> Option<RequirementObject> {
        let record = self.objects.remove(id)?;

        index_remove(&mut self.by_file, &record.location.file, id);
        index_remove(&mut self.by_type, &record.kind, id);
        if let Some(level) = &record.level {
            index_remove(&mut self.by_level, level, id);
        }
        if let Some(status) = &record.status {
            index_remove(&mut self.by_status, status, id);
        }
        if let Some(baseline) = record.baseline() {
            index_remove(&mut self.by_baseline, baseline, id);
        }

        for target in record.targets() {
            self.remove_link_ref(id, target);
        }

        Some(record)
    }

    /// Rebuild an index from exported records with unique ids.
    ///
    /// Secondary indexes and the link graph are derived eagerly.
    pub(crate) fn from_records(records: Vec<RequirementObject>) -> Self {
        let mut index = Self::with_capacity(records.len());
        for record in records {
            index.insert(record);
        }
        index
    }

    /// The symmetric link references `records` would contribute.
    pub(crate) fn derive_link_refs(
        records: &[RequirementObject],
    ) -> HashMap<String, BTreeMap<String, usize>> {
        let mut index = Self::default();
        for record in records {
            for target in record.targets() {
                index.add_link_ref(&record.id, target);
            }
        }
        index.link_refs
    }

    fn add_link_ref(&mut self, from: &str, to: &str) {
        *self
            .link_refs
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_default() += 1;
        if from != to {
            *self
                .link_refs
                .entry(to.to_string())
                .or_default()
                .entry(from.to_string())
                .or_default() += 1;
        }
    }

    fn remove_link_ref(&mut self, from: &str, to: &str) {
        self.decrement(from, to);
        if from != to {
            self.decrement(to, from);
        }
    }

    fn decrement(&mut self, a: &str, b: &str) {
        let Some(neighbours) = self.link_refs.get_mut(a) else {
            return;
        };
        if let Some(count) = neighbours.get_mut(b) {
            *count -= 1;
            if *count == 0 {
                neighbours.remove(b);
            }
        }
        if neighbours.is_empty() {
            self.link_refs.remove(a);
        }
    }
}

fn lookup<'a>(
    map: &'a HashMap<String, BTreeSet<String>>,
    key: &str,
) -> impl Iterator<Item = &'a str> + use<'a> {
    map.get(key)
        .into_iter()
        .flat_map(BTreeSet::iter)
        .map(String::as_str)
}

fn index_insert(map: &mut HashMap<String, BTreeSet<String>>, key: &str, id: &str) {
    map.entry(key.to_string()).or_default().insert(id.to_string());
}

fn index_remove(map: &mut HashMap<String, BTreeSet<String>>, key: &str, id: &str) {
    if let Some(ids) = map.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            map.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Location;

    fn record(id: &str, file: &str) -> RequirementObject {
        RequirementObject::new(id, "requirement", Location::new(file, 1))
    }

    fn assert_symmetric(index: &RequirementIndex) {
        for record in index.iter() {
            for target in record.targets() {
                assert!(
                    index.link_graph(&record.id).any(|n| n == target),
                    "{} -> {target} missing forward entry",
                    record.id
                );
                assert!(
                    index.link_graph(target).any(|n| n == record.id),
                    "{} -> {target} missing reverse entry",
                    record.id
                );
            }
        }
    }

    #[test]
    fn insert_populates_secondary_indexes() {
        let mut index = RequirementIndex::default();
        index.insert(
            record("A", "a.rst")
                .with_status("draft")
                .with_level("system")
                .with_baseline("v1"),
        );

        assert_eq!(index.ids_by_file("a.rst").collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(index.ids_by_type("requirement").count(), 1);
        assert_eq!(index.ids_by_level("system").count(), 1);
        assert_eq!(index.ids_by_status("draft").count(), 1);
        assert_eq!(index.ids_by_baseline("v1").count(), 1);
    }

    #[test]
    fn link_graph_is_symmetric() {
        let mut index = RequirementIndex::default();
        index.insert(record("A", "a.rst").with_link("satisfies", "B"));
        index.insert(record("B", "a.rst").with_link("implements", "C"));
        index.insert(record("C", "b.rst").with_link("links", "A"));

        assert_symmetric(&index);
        assert!(index.linked("B", "A"));
        assert!(index.linked("A", "C"));
    }

    #[test]
    fn replacing_a_record_unwinds_old_links() {
        let mut index = RequirementIndex::default();
        index.insert(record("A", "a.rst").with_link("satisfies", "B"));
        index.insert(record("B", "a.rst"));

        let previous = index.insert(record("A", "a.rst").with_status("approved"));

        assert!(previous.is_some());
        assert!(!index.linked("A", "B"));
        assert!(!index.linked("B", "A"));
        assert_eq!(index.ids_by_status("approved").count(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn removing_one_side_keeps_the_reverse_link() {
        let mut index = RequirementIndex::default();
        index.insert(record("A", "a.rst").with_link("links", "B"));
        index.insert(record("B", "b.rst").with_link("links", "A"));

        index.remove("A");

        // B still links to A, so the undirected edge survives.
        assert!(index.linked("B", "A"));
        assert!(index.linked("A", "B"));
        assert_eq!(index.ids_by_file("a.rst").count(), 0);

        index.remove("B");
        assert_eq!(index.link_graph("A").count(), 0);
        assert_eq!(index.link_graph("B").count(), 0);
        assert!(index.is_empty());
        assert_eq!(index, RequirementIndex::default());
    }

    #[test]
    fn duplicate_targets_count_once() {
        let mut index = RequirementIndex::default();
        index.insert(
            record("A", "a.rst")
                .with_link("satisfies", "B")
                .with_link("implements", "B"),
        );
        index.remove("A");
        assert!(!index.linked("B", "A"));
    }

    #[test]
    fn incoming_confirms_direction() {
        let mut index = RequirementIndex::default();
        index.insert(record("A", "a.rst").with_link("satisfies", "B"));
        index.insert(record("B", "a.rst"));

        assert_eq!(index.incoming("B").collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(index.incoming("A").count(), 0);
    }

    #[test]
    fn stats_count_undirected_links() {
        let mut index = RequirementIndex::default();
        index.insert(record("A", "a.rst").with_link("links", "B"));
        index.insert(record("B", "a.rst").with_link("links", "A"));
        index.insert(record("C", "b.rst").with_link("links", "C"));

        let stats = index.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.links, 2);
        assert_eq!(stats.by_file.get("a.rst"), Some(&2));
    }
}
