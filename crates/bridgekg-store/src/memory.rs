//! In-process [`GraphStore`]: node arena with adjacency lists behind a
//! `parking_lot::RwLock`, plus JSON snapshots.

use crate::error::{StoreError, StoreResult};
use crate::model::{Edge, MergeOutcome, Node, NodeId, NodeKey, NodeSpec, PropertyConflict};
use crate::store::GraphStore;
use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Slot {
    Live(Node),
    /// Absorbed by a merge; points at a lower id.
    Forwarded(NodeId),
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    outgoing: Vec<Vec<Edge>>,
    incoming: Vec<Vec<Edge>>,
    by_key: AHashMap<NodeKey, NodeId>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    slots: Vec<Slot>,
    edges: Vec<Edge>,
    keys: Vec<(NodeKey, NodeId)>,
}

impl Arena {
    /// Follow merge forwarding to the live node. Forwarding always points to
    /// a lower id, so the walk terminates.
    fn resolve(&self, mut id: NodeId) -> Option<NodeId> {
        loop {
            match self.slots.get(id.index())? {
                Slot::Live(_) => return Some(id),
                Slot::Forwarded(next) => id = *next,
            }
        }
    }

    fn live(&self, id: NodeId) -> StoreResult<&Node> {
        match self.slots.get(id.index()) {
            Some(Slot::Live(node)) => Ok(node),
            _ => Err(StoreError::NodeNotFound(id)),
        }
    }

    fn live_mut(&mut self, id: NodeId) -> StoreResult<&mut Node> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Live(node)) => Ok(node),
            _ => Err(StoreError::NodeNotFound(id)),
        }
    }

    fn create(&mut self, spec: NodeSpec) -> NodeId {
        if let Some(id) = self.by_key.get(&spec.key).and_then(|id| self.resolve(*id)) {
            if let (Some(batch), Ok(node)) = (spec.batch, self.live_mut(id)) {
                node.batches.insert(batch);
            }
            return id;
        }

        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot::Live(Node {
            id,
            labels: vec![spec.key.label.clone()],
            name: spec.key.name.clone(),
            uid: spec.key.uid.clone(),
            kind: spec.kind,
            batches: spec.batch.into_iter().collect(),
            properties: BTreeMap::new(),
        }));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.by_key.insert(spec.key, id);
        id
    }

    fn add_edge(&mut self, edge: Edge) -> bool {
        let out = &mut self.outgoing[edge.source.index()];
        if out.contains(&edge) {
            return false;
        }
        out.push(edge.clone());
        self.incoming[edge.target.index()].push(edge);
        true
    }

    fn remove_edge(&mut self, edge: &Edge) {
        self.outgoing[edge.source.index()].retain(|e| e != edge);
        self.incoming[edge.target.index()].retain(|e| e != edge);
    }

    fn merge(&mut self, ids: &[NodeId]) -> StoreResult<MergeOutcome> {
        let mut members = ids
            .iter()
            .map(|id| self.resolve(*id).ok_or(StoreError::NodeNotFound(*id)))
            .collect::<StoreResult<Vec<_>>>()?;
        members.sort_unstable();
        members.dedup();
        let Some(&survivor) = members.first() else {
            return Err(StoreError::EmptyMerge);
        };
        if members.len() == 1 {
            return Ok(MergeOutcome {
                survivor,
                absorbed: Vec::new(),
                conflicts: Vec::new(),
            });
        }
        let member_set: AHashSet<NodeId> = members.iter().copied().collect();

        // Fold in id order: later nodes overwrite earlier values.
        let mut labels: Vec<String> = Vec::new();
        let mut batches: BTreeSet<String> = BTreeSet::new();
        let mut properties: BTreeMap<String, String> = BTreeMap::new();
        let mut conflicts = Vec::new();
        for id in &members {
            let node = self.live(*id)?;
            for label in &node.labels {
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
            batches.extend(node.batches.iter().cloned());
            for (key, value) in &node.properties {
                if let Some(previous) = properties.insert(key.clone(), value.clone()) {
                    if previous != *value {
                        conflicts.push(PropertyConflict {
                            survivor,
                            key: key.clone(),
                            kept: value.clone(),
                            discarded: previous,
                        });
                    }
                }
            }
        }

        let mut seen: AHashSet<Edge> = AHashSet::new();
        let mut touched: Vec<Edge> = Vec::new();
        for id in &members {
            let idx = id.index();
            for edge in self.outgoing[idx].iter().chain(self.incoming[idx].iter()) {
                if seen.insert(edge.clone()) {
                    touched.push(edge.clone());
                }
            }
        }
        for edge in &touched {
            self.remove_edge(edge);
        }
        let remap = |id: NodeId| if member_set.contains(&id) { survivor } else { id };
        for edge in touched {
            let (source, target) = (remap(edge.source), remap(edge.target));
            // Edges between duplicates would become self-loops.
            if source == target && edge.source != edge.target {
                continue;
            }
            self.add_edge(Edge {
                source,
                target,
                relation: edge.relation,
            });
        }

        let absorbed: Vec<NodeId> = members[1..].to_vec();
        for id in &absorbed {
            self.slots[id.index()] = Slot::Forwarded(survivor);
        }
        let node = self.live_mut(survivor)?;
        node.labels = labels;
        node.batches = batches;
        node.properties = properties;

        for conflict in &conflicts {
            tracing::warn!(
                node = %survivor,
                key = %conflict.key,
                kept = %conflict.kept,
                discarded = %conflict.discarded,
                "property conflict during merge; last writer wins"
            );
        }
        tracing::debug!(survivor = %survivor, absorbed = absorbed.len(), "merged nodes");

        Ok(MergeOutcome {
            survivor,
            absorbed,
            conflicts,
        })
    }

    fn edge_count(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }
}

/// Thread-safe in-memory graph store.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    inner: RwLock<Arena>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.inner
            .read()
            .slots
            .iter()
            .filter(|s| matches!(s, Slot::Live(_)))
            .count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().edge_count()
    }

    /// Live nodes with the given primary label and name.
    pub fn find(&self, label: &str, name: &str) -> Vec<Node> {
        self.inner
            .read()
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Live(node) if node.primary_label() == label && node.name == name => {
                    Some(node.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn save_snapshot(&self, path: &Path) -> StoreResult<()> {
        let snapshot = {
            let arena = self.inner.read();
            Snapshot {
                version: SNAPSHOT_VERSION,
                saved_at: Utc::now(),
                slots: arena.slots.clone(),
                edges: arena.outgoing.iter().flatten().cloned().collect(),
                keys: arena
                    .by_key
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect(),
            }
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, bytes).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_snapshot(path: &Path) -> StoreResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        for (index, slot) in snapshot.slots.iter().enumerate() {
            if let Slot::Forwarded(target) = slot {
                if target.index() >= index {
                    return Err(StoreError::SnapshotForwarding {
                        slot: NodeId(index as u32),
                        target: *target,
                    });
                }
            }
        }

        let n = snapshot.slots.len();
        let mut arena = Arena {
            slots: snapshot.slots,
            outgoing: vec![Vec::new(); n],
            incoming: vec![Vec::new(); n],
            by_key: snapshot.keys.into_iter().collect(),
        };
        for edge in snapshot.edges {
            if arena.live(edge.source).is_err() || arena.live(edge.target).is_err() {
                tracing::warn!(
                    source = %edge.source,
                    target = %edge.target,
                    "snapshot edge references a missing node; dropped"
                );
                continue;
            }
            arena.add_edge(edge);
        }
        tracing::info!(
            path = %path.display(),
            saved_at = %snapshot.saved_at,
            nodes = n,
            "loaded graph snapshot"
        );
        Ok(Self {
            inner: RwLock::new(arena),
        })
    }

    /// Snapshot at `path` if it exists, otherwise an empty store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if path.exists() {
            Self::load_snapshot(path)
        } else {
            Ok(Self::new())
        }
    }
}

impl GraphStore for MemoryGraphStore {
    fn create_node_if_absent(&self, spec: NodeSpec) -> StoreResult<NodeId> {
        Ok(self.inner.write().create(spec))
    }

    fn create_edge(&self, source: NodeId, target: NodeId, relation: &str) -> StoreResult<()> {
        let mut arena = self.inner.write();
        arena.live(source)?;
        arena.live(target)?;
        arena.add_edge(Edge {
            source,
            target,
            relation: relation.to_string(),
        });
        Ok(())
    }

    fn set_property(&self, node: NodeId, key: &str, value: &str) -> StoreResult<Option<String>> {
        let mut arena = self.inner.write();
        let node = arena.live_mut(node)?;
        Ok(node.properties.insert(key.to_string(), value.to_string()))
    }

    fn detach_delete_all(&self) -> StoreResult<()> {
        *self.inner.write() = Arena::default();
        Ok(())
    }

    fn merge_nodes(&self, nodes: &[NodeId]) -> StoreResult<MergeOutcome> {
        self.inner.write().merge(nodes)
    }

    fn resolve(&self, id: NodeId) -> StoreResult<NodeId> {
        self.inner.read().resolve(id).ok_or(StoreError::NodeNotFound(id))
    }

    fn node(&self, id: NodeId) -> StoreResult<Option<Node>> {
        Ok(self.inner.read().live(id).ok().cloned())
    }

    fn node_ids(&self) -> StoreResult<Vec<NodeId>> {
        Ok(self
            .inner
            .read()
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Live(node) => Some(node.id),
                Slot::Forwarded(_) => None,
            })
            .collect())
    }

    fn outgoing(&self, id: NodeId) -> StoreResult<Vec<Edge>> {
        let arena = self.inner.read();
        arena.live(id)?;
        Ok(arena.outgoing[id.index()].clone())
    }

    fn incoming_count(&self, id: NodeId) -> StoreResult<usize> {
        let arena = self.inner.read();
        arena.live(id)?;
        Ok(arena.incoming[id.index()].len())
    }
}
