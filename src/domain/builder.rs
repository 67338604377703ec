//! The single writer of the requirement index.
//!
//! The [`IndexBuilder`] is fed parsed records on startup and on every document
//! change. It keeps the index consistent, records duplicate-id faults, and
//! notifies subscribers after every mutation that actually changed something.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    domain::{Location, RequirementIndex, RequirementObject},
    storage::{IndexSnapshot, SnapshotError},
};

/// Two records claimed the same id.
///
/// The later upsert wins. The displaced definition is remembered, so the fault
/// is reported for as long as both definitions exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateIdFault {
    /// The contested id.
    pub id: String,
    /// Where the displaced record came from.
    pub existing: Location,
    /// Where the winning record came from.
    pub incoming: Location,
}

/// Result of upserting a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record with this id existed.
    Inserted,
    /// A record with this id was replaced.
    Replaced,
    /// An identical record was already present; nothing changed.
    Unchanged,
}

type Listener = Box<dyn Fn() + Send + Sync>;

/// Owns and exclusively mutates a [`RequirementIndex`].
///
/// Readers take cheap [`snapshot`](Self::snapshot)s. Mutation is
/// clone-on-write: if a snapshot is still held by an analysis run, the builder
/// mutates a private copy, so the run never observes a half-applied change.
#[derive(Default)]
pub struct IndexBuilder {
    index: Arc<RequirementIndex>,
    /// Definitions displaced by a record with the same id, oldest first.
    shadowed: HashMap<String, Vec<RequirementObject>>,
    listeners: Vec<Listener>,
    generation: u64,
}

impl fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("records", &self.index.len())
            .field("shadowed", &self.shadowed.len())
            .field("listeners", &self.listeners.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl IndexBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a batch of records, firing no notifications.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = RequirementObject>) -> Self {
        let mut builder = Self::default();
        for record in records {
            builder.upsert_silently(record, false);
        }
        builder
    }

    /// Read access to the current index.
    #[must_use]
    pub fn index(&self) -> &RequirementIndex {
        &self.index
    }

    /// An immutable snapshot of the current index.
    ///
    /// The snapshot stays internally consistent for as long as it is held,
    /// regardless of later mutations.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RequirementIndex> {
        Arc::clone(&self.index)
    }

    /// Duplicate-id faults that are still relevant, sorted by id.
    ///
    /// One fault is reported per displaced definition.
    #[must_use]
    pub fn duplicates(&self) -> Vec<DuplicateIdFault> {
        let mut shadowed: Vec<_> = self.shadowed.iter().collect();
        shadowed.sort_by(|a, b| a.0.cmp(b.0));

        shadowed
            .into_iter()
            .filter_map(|(id, displaced)| Some((self.index.get(id)?, displaced)))
            .flat_map(|(winner, displaced)| {
                displaced.iter().map(|record| DuplicateIdFault {
                    id: winner.id.clone(),
                    existing: record.location.clone(),
                    incoming: winner.location.clone(),
                })
            })
            .collect()
    }

    /// Number of changes applied so far.
    ///
    /// Subscribers can compare generations to detect missed notifications.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Registers a callback invoked after every successful mutation.
    ///
    /// The callback carries no payload; subscribers re-read state.
    pub fn subscribe(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Inserts or replaces a record by id.
    ///
    /// If the id is already held by a record from a different file, the
    /// incoming record wins and the displaced one is kept as a
    /// [`DuplicateIdFault`].
    #[instrument(level = "debug", skip_all, fields(id = %record.id))]
    pub fn upsert(&mut self, record: RequirementObject) -> UpsertOutcome {
        let outcome = self.upsert_silently(record, false);
        if outcome != UpsertOutcome::Unchanged {
            self.notify();
        }
        outcome
    }

    /// Removes a single record, along with any definitions it displaced.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, id: &str) -> Option<RequirementObject> {
        let removed = Arc::make_mut(&mut self.index).remove(id)?;
        self.shadowed.remove(id);
        self.notify();
        Some(removed)
    }

    /// Removes every record parsed from `file`.
    ///
    /// If another file also defines one of the removed ids, its definition
    /// takes over. Returns the ids whose definition from `file` was removed,
    /// in sorted order.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_by_file(&mut self, file: &str) -> Vec<String> {
        let (removed, changed) = self.remove_file_silently(file, &BTreeSet::new());
        if changed {
            self.notify();
        }
        removed
    }

    /// Replaces the contents of one source file with a freshly parsed set of
    /// records.
    ///
    /// Records of `file` that are absent from `records` are removed, the rest
    /// are upserted. A single notification fires if anything changed.
    #[instrument(level = "debug", skip(self, records))]
    pub fn replace_file(&mut self, file: &str, records: Vec<RequirementObject>) -> bool {
        let keep: BTreeSet<String> = records.iter().map(|r| r.id.clone()).collect();
        let (_, mut changed) = self.remove_file_silently(file, &keep);

        let mut seen = BTreeSet::new();
        for record in records {
            let repeated = !seen.insert(record.id.clone());
            changed |= self.upsert_silently(record, repeated) != UpsertOutcome::Unchanged;
        }

        if changed {
            self.notify();
        }
        changed
    }

    /// Exports the full index state.
    #[must_use]
    pub fn export_snapshot(&self) -> IndexSnapshot {
        IndexSnapshot::capture(&self.index)
    }

    /// Replaces the index with an exported snapshot.
    ///
    /// The imported state is immediately queryable. Duplicate-id faults are
    /// cleared, since a snapshot holds exactly one record per id.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot fails its integrity checks; the
    /// current index is left untouched in that case.
    #[instrument(level = "debug", skip_all)]
    pub fn import_snapshot(&mut self, snapshot: IndexSnapshot) -> Result<(), SnapshotError> {
        let index = snapshot.into_index()?;
        debug!(records = index.len(), "imported snapshot");
        self.index = Arc::new(index);
        self.shadowed.clear();
        self.notify();
        Ok(())
    }
}

impl IndexBuilder {
    /// `repeated` marks a second definition of an id within one parsed file,
    /// which displaces the first rather than replacing it.
    fn upsert_silently(&mut self, record: RequirementObject, repeated: bool) -> UpsertOutcome {
        let outcome = match self.index.get(&record.id) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing.fingerprint() == record.fingerprint() => {
                return UpsertOutcome::Unchanged;
            }
            Some(existing) => {
                if repeated || existing.location.file != record.location.file {
                    let existing = existing.clone();
                    self.displace(existing, &record, repeated);
                }
                UpsertOutcome::Replaced
            }
        };

        Arc::make_mut(&mut self.index).insert(record);
        outcome
    }

    /// Drops every definition `file` contributed, except the winning records
    /// whose id is in `keep`. Displaced definitions from other files take over
    /// ids that lose their winner.
    fn remove_file_silently(
        &mut self,
        file: &str,
        keep: &BTreeSet<String>,
    ) -> (Vec<String>, bool) {
        let mut changed = false;
        self.shadowed.retain(|_, displaced| {
            let before = displaced.len();
            displaced.retain(|record| record.location.file != file);
            changed |= displaced.len() != before;
            !displaced.is_empty()
        });

        let doomed: Vec<String> = self
            .index
            .ids_by_file(file)
            .filter(|id| !keep.contains(*id))
            .map(str::to_string)
            .collect();

        for id in &doomed {
            let survivor = self.shadowed.get_mut(id).and_then(Vec::pop);
            if self.shadowed.get(id).is_some_and(Vec::is_empty) {
                self.shadowed.remove(id);
            }

            let index = Arc::make_mut(&mut self.index);
            index.remove(id);
            if let Some(survivor) = survivor {
                debug!(id = %id, location = %survivor.location, "restoring displaced definition");
                index.insert(survivor);
            }
        }

        changed |= !doomed.is_empty();
        (doomed, changed)
    }

    fn displace(
        &mut self,
        existing: RequirementObject,
        incoming: &RequirementObject,
        repeated: bool,
    ) {
        warn!(
            id = %incoming.id,
            existing = %existing.location,
            incoming = %incoming.location,
            "duplicate requirement id"
        );
        let displaced = self.shadowed.entry(incoming.id.clone()).or_default();
        if !repeated {
            // The incoming record is its file's definition now.
            displaced.retain(|record| record.location.file != incoming.location.file);
        }
        displaced.push(existing);
    }

    fn notify(&mut self) {
        self.generation += 1;
        for listener in &self.listeners {
            listener();
        }
    }
}
