//! BridgeKG shared graph store.
//!
//! ```text
//!   batch graphs ──commit_batch──► GraphStore ──ConsolidationEngine──► merged graph
//!                                      │
//!                                      └──PathEnumerator──► review rows
//! ```
//!
//! Commits are optimistic: every batch creates its own identities, and
//! equal `(label, name)` entities from different batches are unified later
//! by [`ConsolidationEngine`]. Attribute nodes are never unified.

pub mod commit;
pub mod consolidate;
pub mod error;
pub mod memory;
pub mod model;
pub mod paths;
pub mod store;

pub use commit::{commit_batch, CommitSummary};
pub use consolidate::{
    consolidate, is_root, ConsolidationConfig, ConsolidationEngine, ConsolidationReport,
    FailedGroup, GroupKey, MergedGroup, DEFAULT_MAX_DEPTH,
};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryGraphStore;
pub use model::{Edge, MergeOutcome, Node, NodeId, NodeKey, NodeKind, NodeSpec, PropertyConflict};
pub use paths::{PathEnumerator, PathRow};
pub use store::GraphStore;
