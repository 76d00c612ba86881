//! Node, edge and merge types shared by every [`GraphStore`](crate::GraphStore).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable arena index of a node. Never reused within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Entity,
    /// One concrete attribute occurrence (category or value). Never merged.
    Attribute,
}

/// Creation key: `(label, name, uid)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: String,
    pub name: String,
    pub uid: String,
}

/// Request for an idempotent node creation.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub batch: Option<String>,
}

impl NodeSpec {
    pub fn entity(label: &str, name: &str, uid: &str) -> Self {
        Self {
            key: NodeKey {
                label: label.to_string(),
                name: name.to_string(),
                uid: uid.to_string(),
            },
            kind: NodeKind::Entity,
            batch: None,
        }
    }

    pub fn attribute(label: &str, name: &str, uid: &str) -> Self {
        Self {
            kind: NodeKind::Attribute,
            ..Self::entity(label, name, uid)
        }
    }

    pub fn in_batch(mut self, batch: &str) -> Self {
        self.batch = Some(batch.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Primary label first; merges append the absorbed nodes' labels.
    pub labels: Vec<String>,
    pub name: String,
    pub uid: String,
    pub kind: NodeKind,
    /// Every batch that contributed to this node.
    pub batches: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
}

impl Node {
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or_default()
    }

    pub fn is_attribute(&self) -> bool {
        self.kind == NodeKind::Attribute
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .labels
            .iter()
            .map(|label| format!("{label}:{}", self.name))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub relation: String,
}

/// A scalar property clash resolved last-writer-wins during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyConflict {
    pub survivor: NodeId,
    pub key: String,
    pub kept: String,
    pub discarded: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub survivor: NodeId,
    pub absorbed: Vec<NodeId>,
    pub conflicts: Vec<PropertyConflict>,
}
