use crate::error::StoreResult;
use crate::model::{Edge, MergeOutcome, Node, NodeId, NodeSpec};

/// Property-graph backend shared by ingestion, consolidation and export.
///
/// Every operation may fail with a store error; callers decide whether the
/// failure is fatal (ingest) or scoped (one consolidation group).
pub trait GraphStore: Send + Sync {
    /// Node for `spec.key`, creating it when no node with that key exists.
    fn create_node_if_absent(&self, spec: NodeSpec) -> StoreResult<NodeId>;

    /// Directed edge `source -relation-> target`. Creating an identical edge
    /// twice is a no-op.
    fn create_edge(&self, source: NodeId, target: NodeId, relation: &str) -> StoreResult<()>;

    /// Set a scalar property, returning the previous value.
    fn set_property(&self, node: NodeId, key: &str, value: &str) -> StoreResult<Option<String>>;

    /// Remove every node and edge.
    fn detach_delete_all(&self) -> StoreResult<()>;

    /// Fold `nodes` into one survivor (the lowest live id). Ids of nodes that
    /// were already absorbed by an earlier merge resolve to their survivor.
    fn merge_nodes(&self, nodes: &[NodeId]) -> StoreResult<MergeOutcome>;

    /// Live id `id` now stands for, following merge forwarding.
    fn resolve(&self, id: NodeId) -> StoreResult<NodeId>;

    /// Live node; `None` for unknown or absorbed ids.
    fn node(&self, id: NodeId) -> StoreResult<Option<Node>>;

    /// Ids of all live nodes in ascending order.
    fn node_ids(&self) -> StoreResult<Vec<NodeId>>;

    fn outgoing(&self, id: NodeId) -> StoreResult<Vec<Edge>>;

    fn incoming_count(&self, id: NodeId) -> StoreResult<usize>;
}
