mod snapshot;

pub use snapshot::{IndexSnapshot, SnapshotError};
