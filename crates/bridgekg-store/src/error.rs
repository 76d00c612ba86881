use crate::model::NodeId;
use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("merge requires at least one node")]
    EmptyMerge,

    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot is not valid JSON: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("snapshot slot {slot} forwards to {target}, which is not a lower id")]
    SnapshotForwarding { slot: NodeId, target: NodeId },

    #[error("unsupported snapshot version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
}
