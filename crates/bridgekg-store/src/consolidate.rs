//! Cross-batch consolidation: unify nodes that independent batches created
//! for the same real-world entity.
//!
//! Roots (no incoming edge, at least one outgoing edge) are grouped by
//! `(primary label, name)` and merged. After each merge the survivor's
//! children are grouped by name and merged in turn, down to `max_depth`.
//! Attribute nodes are never candidates at any level.
//!
//! Root groups run concurrently, and their subtrees may share nodes. Each
//! merge step locks the resolved ids it merges, in ascending order, and keeps
//! them locked while it reads the survivor's children. Two steps touching the
//! same node therefore never interleave. Ids queued by an earlier step are
//! resolved again under the lock, so a node absorbed by another worker in the
//! meantime is followed to its survivor.

use crate::error::{StoreError, StoreResult};
use crate::model::{MergeOutcome, NodeId, PropertyConflict};
use crate::store::GraphStore;
use ahash::AHashSet;
use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct ConsolidationConfig {
    /// Deepest child level merged below a root group (roots are depth 0).
    pub max_depth: usize,
    /// Run independent root groups on the rayon pool.
    pub parallel: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            parallel: true,
        }
    }
}

pub type GroupKey = (String, String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedGroup {
    pub label: String,
    pub name: String,
    pub depth: usize,
    pub survivor: NodeId,
    pub absorbed: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedGroup {
    pub label: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub merged: Vec<MergedGroup>,
    pub absorbed: usize,
    pub conflicts: Vec<PropertyConflict>,
    pub failed: Vec<FailedGroup>,
    /// Child frontiers left unmerged because they were deeper than `max_depth`.
    pub depth_capped: usize,
}

impl ConsolidationReport {
    fn absorb(&mut self, other: ConsolidationReport) {
        self.absorbed += other.absorbed;
        self.merged.extend(other.merged);
        self.conflicts.extend(other.conflicts);
        self.failed.extend(other.failed);
        self.depth_capped += other.depth_capped;
    }
}

pub struct ConsolidationEngine<'s, S: GraphStore + ?Sized> {
    store: &'s S,
    config: ConsolidationConfig,
    /// Per-node merge locks, created on first use.
    locks: DashMap<NodeId, Arc<Mutex<()>>>,
}

impl<'s, S: GraphStore + ?Sized> ConsolidationEngine<'s, S> {
    pub fn new(store: &'s S, config: ConsolidationConfig) -> Self {
        Self {
            store,
            config,
            locks: DashMap::new(),
        }
    }

    /// Candidate root groups with more than one member, in key order.
    pub fn duplicate_root_groups(&self) -> StoreResult<Vec<(GroupKey, Vec<NodeId>)>> {
        let mut groups: BTreeMap<GroupKey, Vec<NodeId>> = BTreeMap::new();
        for id in self.store.node_ids()? {
            let Some(node) = self.store.node(id)? else {
                continue;
            };
            if node.is_attribute() || !is_root(self.store, id)? {
                continue;
            }
            groups
                .entry((node.primary_label().to_string(), node.name.clone()))
                .or_default()
                .push(id);
        }
        Ok(groups.into_iter().filter(|(_, ids)| ids.len() > 1).collect())
    }

    /// One full pass. Only the initial root scan can fail the whole run; a
    /// store error inside a group is recorded and the next group proceeds.
    pub fn run(&self) -> StoreResult<ConsolidationReport> {
        let groups = self.duplicate_root_groups()?;
        tracing::info!(groups = groups.len(), "consolidating duplicate root groups");

        let outcomes: Vec<ConsolidationReport> = if self.config.parallel {
            groups
                .into_par_iter()
                .map(|(key, ids)| self.consolidate_group(key, ids))
                .collect()
        } else {
            groups
                .into_iter()
                .map(|(key, ids)| self.consolidate_group(key, ids))
                .collect()
        };

        let mut report = ConsolidationReport::default();
        for outcome in outcomes {
            report.absorb(outcome);
        }
        tracing::info!(
            merged = report.merged.len(),
            absorbed = report.absorbed,
            conflicts = report.conflicts.len(),
            failed = report.failed.len(),
            "consolidation finished"
        );
        Ok(report)
    }

    /// Merge one root group and, recursively, its duplicate children.
    pub fn consolidate_group(&self, key: GroupKey, ids: Vec<NodeId>) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();
        if let Err(err) = self.merge_recursive(&key, ids, &mut report) {
            tracing::warn!(
                label = %key.0,
                name = %key.1,
                error = %err,
                "consolidation group aborted; earlier merges are kept"
            );
            report.failed.push(FailedGroup {
                label: key.0,
                name: key.1,
                error: err.to_string(),
            });
        }
        report
    }

    fn merge_recursive(
        &self,
        root_key: &GroupKey,
        ids: Vec<NodeId>,
        report: &mut ConsolidationReport,
    ) -> Result<(), StoreError> {
        let mut visited: AHashSet<NodeId> = AHashSet::new();
        let mut frontier: Vec<(GroupKey, Vec<NodeId>, usize)> = vec![(root_key.clone(), ids, 0)];

        while let Some(((label, name), members, depth)) = frontier.pop() {
            if depth > self.config.max_depth {
                tracing::warn!(%label, %name, depth, "merge depth cap reached; frontier left unmerged");
                report.depth_capped += 1;
                continue;
            }

            let (outcome, children) = self.merge_step(&members, &visited)?;
            visited.insert(outcome.survivor);
            visited.extend(outcome.absorbed.iter().copied());
            if !outcome.absorbed.is_empty() {
                report.absorbed += outcome.absorbed.len();
                report.merged.push(MergedGroup {
                    label,
                    name,
                    depth,
                    survivor: outcome.survivor,
                    absorbed: outcome.absorbed,
                });
            }
            report.conflicts.extend(outcome.conflicts);

            for (child_key, child_ids) in children {
                frontier.push((child_key, child_ids, depth + 1));
            }
        }
        Ok(())
    }

    /// Merge `members` and collect the survivor's duplicate children while
    /// holding the lock of every resolved member.
    fn merge_step(
        &self,
        members: &[NodeId],
        visited: &AHashSet<NodeId>,
    ) -> StoreResult<(MergeOutcome, Vec<(GroupKey, Vec<NodeId>)>)> {
        let mut resolved = self.resolve_all(members)?;
        loop {
            let handles: Vec<Arc<Mutex<()>>> = resolved
                .iter()
                .map(|id| self.locks.entry(*id).or_default().value().clone())
                .collect();
            let _guards: Vec<_> = handles.iter().map(|lock| lock.lock()).collect();

            // Another worker may have merged some of these before we got the locks.
            let current = self.resolve_all(&resolved)?;
            if current != resolved {
                resolved = current;
                continue;
            }

            let outcome = self.store.merge_nodes(&resolved)?;
            let children = self.duplicate_children(outcome.survivor, visited)?;
            return Ok((outcome, children));
        }
    }

    /// Live ids for `ids`, sorted and deduplicated.
    fn resolve_all(&self, ids: &[NodeId]) -> StoreResult<Vec<NodeId>> {
        let mut resolved = ids
            .iter()
            .map(|id| self.store.resolve(*id))
            .collect::<StoreResult<Vec<_>>>()?;
        resolved.sort_unstable();
        resolved.dedup();
        Ok(resolved)
    }

    /// Direct children of `parent`, grouped by name, with more than one member.
    fn duplicate_children(
        &self,
        parent: NodeId,
        visited: &AHashSet<NodeId>,
    ) -> StoreResult<Vec<(GroupKey, Vec<NodeId>)>> {
        let mut by_name: BTreeMap<String, (String, Vec<NodeId>)> = BTreeMap::new();
        for edge in self.store.outgoing(parent)? {
            let child = edge.target;
            if visited.contains(&child) {
                continue;
            }
            let Some(node) = self.store.node(child)? else {
                continue;
            };
            if node.is_attribute() {
                continue;
            }
            let entry = by_name
                .entry(node.name.clone())
                .or_insert_with(|| (node.primary_label().to_string(), Vec::new()));
            if !entry.1.contains(&child) {
                entry.1.push(child);
            }
        }
        Ok(by_name
            .into_iter()
            .filter(|(_, (_, ids))| ids.len() > 1)
            .map(|(name, (label, ids))| ((label, name), ids))
            .collect())
    }
}

/// No incoming edge and at least one outgoing edge.
pub fn is_root<S: GraphStore + ?Sized>(store: &S, id: NodeId) -> StoreResult<bool> {
    Ok(store.incoming_count(id)? == 0 && !store.outgoing(id)?.is_empty())
}

/// Convenience wrapper over [`ConsolidationEngine::run`].
pub fn consolidate<S: GraphStore + ?Sized>(
    store: &S,
    config: ConsolidationConfig,
) -> StoreResult<ConsolidationReport> {
    ConsolidationEngine::new(store, config).run()
}
