//! Serializable snapshot of the full index state, for caching collaborators.

use std::collections::{BTreeMap, BTreeSet};

use borsh::BorshSerialize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{RequirementIndex, RequirementObject};

/// Symmetric link references: `id -> neighbour -> contributing record count`.
type LinkRefs = BTreeMap<String, BTreeMap<String, usize>>;

/// Errors raised while decoding or importing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot is not valid JSON, or has an unknown `_version`.
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// The content does not match the recorded fingerprint.
    #[error("snapshot fingerprint mismatch (expected {expected}, found {actual})")]
    FingerprintMismatch {
        /// Fingerprint stored in the snapshot.
        expected: String,
        /// Fingerprint computed from the content.
        actual: String,
    },

    /// The link references are not symmetric.
    #[error("snapshot link graph is not symmetric at {from} -> {to}")]
    AsymmetricLink {
        /// Id holding the reference.
        from: String,
        /// Id missing the reverse reference.
        to: String,
    },

    /// Two records share an id.
    #[error("snapshot holds more than one record with id {0}")]
    DuplicateRecord(String),

    /// The link references disagree with the links the records declare.
    #[error("snapshot link references for {0} do not match the records")]
    LinkMismatch(String),
}

/// The full state of a [`RequirementIndex`]: records plus link references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct IndexSnapshot {
    exported_at: DateTime<Utc>,
    fingerprint: String,
    records: Vec<RequirementObject>,
    links: LinkRefs,
}

impl IndexSnapshot {
    /// Captures the state of an index.
    #[must_use]
    pub fn capture(index: &RequirementIndex) -> Self {
        let mut records: Vec<RequirementObject> = index.iter().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let links: LinkRefs = index
            .link_refs()
            .map(|(id, neighbours)| (id.to_string(), neighbours.clone()))
            .collect();

        let fingerprint = fingerprint(&records, &links);

        Self {
            exported_at: Utc::now(),
            fingerprint,
            records,
            links,
        }
    }

    /// When the snapshot was taken.
    #[must_use]
    pub const fn exported_at(&self) -> DateTime<Utc> {
        self.exported_at
    }

    /// Content fingerprint recorded at export time.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The exported records, sorted by id.
    #[must_use]
    pub fn records(&self) -> &[RequirementObject] {
        &self.records
    }

    /// Encodes the snapshot as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed. Integrity is checked on
    /// import, not here.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks the fingerprint, the symmetry of the link references, that ids
    /// are unique, and that the link references are exactly those the records
    /// declare.
    ///
    /// # Errors
    ///
    /// Returns the first integrity violation found.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        let actual = fingerprint(&self.records, &self.links);
        if actual != self.fingerprint {
            return Err(SnapshotError::FingerprintMismatch {
                expected: self.fingerprint.clone(),
                actual,
            });
        }

        for (from, neighbours) in &self.links {
            for (to, count) in neighbours {
                let reverse = self.links.get(to).and_then(|n| n.get(from));
                if reverse != Some(count) {
                    return Err(SnapshotError::AsymmetricLink {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        let mut ids = BTreeSet::new();
        if let Some(record) = self.records.iter().find(|r| !ids.insert(r.id.as_str())) {
            return Err(SnapshotError::DuplicateRecord(record.id.clone()));
        }

        let expected: LinkRefs = RequirementIndex::derive_link_refs(&self.records)
            .into_iter()
            .collect();
        let keys: BTreeSet<&String> = expected.keys().chain(self.links.keys()).collect();
        if let Some(id) = keys
            .into_iter()
            .find(|id| expected.get(*id) != self.links.get(*id))
        {
            return Err(SnapshotError::LinkMismatch(id.clone()));
        }

        Ok(())
    }

    /// Verifies the snapshot and turns it into a queryable index.
    ///
    /// # Errors
    ///
    /// Returns an error if [`verify`](Self::verify) fails.
    pub fn into_index(self) -> Result<RequirementIndex, SnapshotError> {
        self.verify()?;
        Ok(RequirementIndex::from_records(self.records))
    }
}

fn fingerprint(records: &Vec<RequirementObject>, links: &LinkRefs) -> String {
    #[derive(BorshSerialize)]
    struct FingerprintData<'a> {
        records: &'a Vec<RequirementObject>,
        links: &'a LinkRefs,
    }

    let data = FingerprintData { records, links };

    // encode using [borsh](https://borsh.io/)
    let encoded = borsh::to_vec(&data).expect("this should never fail");
    let hash = Sha256::digest(encoded);
    format!("{hash:x}")
}

/// The serialized versions of the snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        exported_at: DateTime<Utc>,
        fingerprint: String,
        records: Vec<RequirementObject>,
        #[serde(default)]
        links: LinkRefs,
    },
}

impl From<Versions> for IndexSnapshot {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                exported_at,
                fingerprint,
                records,
                links,
            } => Self {
                exported_at,
                fingerprint,
                records,
                links,
            },
        }
    }
}

impl From<IndexSnapshot> for Versions {
    fn from(snapshot: IndexSnapshot) -> Self {
        let IndexSnapshot {
            exported_at,
            fingerprint,
            records,
            links,
        } = snapshot;
        Self::V1 {
            exported_at,
            fingerprint,
            records,
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IndexBuilder, Location};

    fn builder() -> IndexBuilder {
        IndexBuilder::from_records([
            RequirementObject::new("A", "requirement", Location::new("a.rst", 1))
                .with_link("satisfies", "B"),
            RequirementObject::new("B", "design", Location::new("a.rst", 8))
                .with_status("draft"),
        ])
    }

    #[test]
    fn json_round_trip_preserves_queries() {
        let builder = builder();
        let json = builder.export_snapshot().to_json().unwrap();
        assert!(json.contains("\"_version\": \"1\""));

        let index = IndexSnapshot::from_json(&json).unwrap().into_index().unwrap();
        assert_eq!(&index, builder.index());
        assert!(index.linked("B", "A"));
        assert_eq!(index.ids_by_status("draft").collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn tampered_records_fail_verification() {
        let mut snapshot = builder().export_snapshot();
        snapshot.records[0].status = Some("approved".into());
        assert!(matches!(
            snapshot.verify(),
            Err(SnapshotError::FingerprintMismatch { .. })
        ));
    }

    #[test]
    fn asymmetric_links_are_rejected() {
        let mut snapshot = builder().export_snapshot();
        snapshot.links.remove("B");
        snapshot.fingerprint = fingerprint(&snapshot.records, &snapshot.links);
        assert!(matches!(
            snapshot.into_index(),
            Err(SnapshotError::AsymmetricLink { .. })
        ));
    }

    #[test]
    fn link_references_must_match_the_records() {
        let mut snapshot = builder().export_snapshot();
        snapshot.links.clear();
        snapshot.fingerprint = fingerprint(&snapshot.records, &snapshot.links);
        assert!(matches!(
            snapshot.into_index(),
            Err(SnapshotError::LinkMismatch(id)) if id == "A"
        ));
    }

    #[test]
    fn repeated_ids_are_rejected() {
        let mut snapshot = builder().export_snapshot();
        let mut copy = snapshot.records[1].clone();
        copy.location = Location::new("b.rst", 2);
        snapshot.records.push(copy);
        snapshot.fingerprint = fingerprint(&snapshot.records, &snapshot.links);
        assert!(matches!(
            snapshot.verify(),
            Err(SnapshotError::DuplicateRecord(id)) if id == "B"
        ));
    }

    #[test]
    fn unknown_version_is_malformed() {
        let json = r#"{"_version":"9","exported_at":"2024-01-01T00:00:00Z","fingerprint":"","records":[]}"#;
        assert!(matches!(
            IndexSnapshot::from_json(json),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn import_failure_leaves_builder_untouched() {
        let mut target = builder();
        let mut snapshot = IndexBuilder::new().export_snapshot();
        snapshot.fingerprint = "bogus".into();

        assert!(target.import_snapshot(snapshot).is_err());
        assert_eq!(target.index().len(), 2);
    }
}
