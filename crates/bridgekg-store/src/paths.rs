//! Root-to-leaf path export for human review.

use crate::error::StoreResult;
use crate::model::{Node, NodeId};
use crate::store::GraphStore;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// One root-to-leaf path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRow {
    /// `Label:name - relation - Label:name ...`
    pub sentence: String,
    /// Rendered nodes, root first.
    pub hops: Vec<String>,
    /// Relation names; always one shorter than `hops`.
    pub relations: Vec<String>,
}

impl PathRow {
    fn render(hops: Vec<String>, relations: Vec<String>) -> Self {
        let mut sentence = String::new();
        for (i, hop) in hops.iter().enumerate() {
            if i > 0 {
                sentence.push_str(&format!(" - {} - ", relations[i - 1]));
            }
            sentence.push_str(hop);
        }
        Self {
            sentence,
            hops,
            relations,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathEnumerator {
    /// Name of the top-level collection node, never treated as a root.
    collection_node: Option<String>,
}

impl PathEnumerator {
    pub fn new(collection_node: Option<String>) -> Self {
        Self { collection_node }
    }

    /// Root ids: no incoming edge, excluding the collection node.
    pub fn roots<S: GraphStore + ?Sized>(&self, store: &S) -> StoreResult<Vec<NodeId>> {
        let mut roots = Vec::new();
        for id in store.node_ids()? {
            if store.incoming_count(id)? > 0 {
                continue;
            }
            let Some(node) = store.node(id)? else {
                continue;
            };
            if self.collection_node.as_deref() == Some(node.name.as_str()) {
                continue;
            }
            roots.push(id);
        }
        Ok(roots)
    }

    /// Every maximal path from every root, one row per leaf.
    ///
    /// A path ends at a node with no outgoing edge, or where every outgoing
    /// edge leads back onto the current path. A root without outgoing edges
    /// yields no row.
    pub fn enumerate<S: GraphStore + ?Sized>(&self, store: &S) -> StoreResult<Vec<PathRow>> {
        let mut cache: AHashMap<NodeId, String> = AHashMap::new();
        let mut rows = Vec::new();
        for root in self.roots(store)? {
            self.walk(store, root, &mut cache, &mut rows)?;
        }
        tracing::debug!(rows = rows.len(), "enumerated paths");
        Ok(rows)
    }

    fn walk<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        root: NodeId,
        cache: &mut AHashMap<NodeId, String>,
        rows: &mut Vec<PathRow>,
    ) -> StoreResult<()> {
        // Iterative DFS; each frame holds the node and its unexplored edges.
        let mut path: Vec<NodeId> = vec![root];
        let mut relations: Vec<String> = Vec::new();
        let mut on_path: AHashSet<NodeId> = AHashSet::from_iter([root]);
        let mut stack = vec![(root, store.outgoing(root)?, 0usize, false)];

        while let Some((node, edges, next, extended)) = stack.last_mut() {
            let Some(edge) = edges.get(*next) else {
                if !*extended && !relations.is_empty() {
                    let hops = path
                        .iter()
                        .map(|id| hop(store, *id, cache))
                        .collect::<StoreResult<Vec<_>>>()?;
                    rows.push(PathRow::render(hops, relations.clone()));
                }
                let done = *node;
                stack.pop();
                on_path.remove(&done);
                path.pop();
                relations.pop();
                continue;
            };
            *next += 1;
            if on_path.contains(&edge.target) {
                continue;
            }
            *extended = true;
            let (target, relation) = (edge.target, edge.relation.clone());
            on_path.insert(target);
            path.push(target);
            relations.push(relation);
            let out = store.outgoing(target)?;
            stack.push((target, out, 0, false));
        }
        Ok(())
    }
}

fn hop<S: GraphStore + ?Sized>(
    store: &S,
    id: NodeId,
    cache: &mut AHashMap<NodeId, String>,
) -> StoreResult<String> {
    if let Some(rendered) = cache.get(&id) {
        return Ok(rendered.clone());
    }
    let rendered = store
        .node(id)?
        .as_ref()
        .map(Node::to_string)
        .unwrap_or_else(|| id.to_string());
    cache.insert(id, rendered.clone());
    Ok(rendered)
}
