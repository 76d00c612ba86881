use crate::error::StoreResult;
use crate::model::{NodeId, NodeSpec};
use crate::store::GraphStore;
use bridgekg_batch::{BatchGraph, Object};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub nodes: usize,
    pub edges: usize,
    pub properties: usize,
}

/// Write one batch graph into the shared store.
///
/// One idempotent creation per instance (keyed by its uid, so equal names
/// from different batches stay distinct until consolidation), one edge per
/// instance-object triple. Literal objects become properties of the subject
/// keyed by the relation name.
pub fn commit_batch<S: GraphStore + ?Sized>(
    store: &S,
    graph: &BatchGraph,
    batch_name: &str,
) -> StoreResult<CommitSummary> {
    let mut summary = CommitSummary::default();
    let mut ids: Vec<NodeId> = Vec::with_capacity(graph.instances().len());

    for instance in graph.instances() {
        let uid = instance.uid.to_string();
        let spec = if instance.role.is_attribute_kind() {
            NodeSpec::attribute(&instance.class, &instance.label, &uid)
        } else {
            NodeSpec::entity(&instance.class, &instance.label, &uid)
        };
        ids.push(store.create_node_if_absent(spec.in_batch(batch_name))?);
        summary.nodes += 1;
    }

    for triple in graph.triples() {
        let subject = ids[triple.subject.raw() as usize];
        match &triple.object {
            Object::Instance(object) => {
                store.create_edge(subject, ids[object.raw() as usize], &triple.relation)?;
                summary.edges += 1;
            }
            Object::Literal(lit) => {
                if let Some(previous) = store.set_property(subject, &triple.relation, &lit.lexical)? {
                    tracing::debug!(
                        node = %subject,
                        relation = %triple.relation,
                        previous = %previous,
                        "literal property overwritten within batch"
                    );
                }
                summary.properties += 1;
            }
        }
    }

    tracing::info!(
        batch = batch_name,
        nodes = summary.nodes,
        edges = summary.edges,
        properties = summary.properties,
        "committed batch"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraphStore;
    use bridgekg_batch::{build_batch, BatchInput};
    use bridgekg_ontology::Vocabulary;

    #[test]
    fn commits_nodes_edges_and_literals() {
        let input = BatchInput {
            text: "主梁腹板有裂缝".to_string(),
            triples: vec![
                "Component:Beam>hasPart>Part:Web".to_string(),
                "Part:Web>hasDefect>Defect:Crack".to_string(),
                r#"Defect:Crack>width>"0.2"^^xsd:decimal"#.to_string(),
            ],
            attributes: vec!["Crack>length>1m".to_string()],
        };
        let built = build_batch(&input, &Vocabulary::default());
        let store = MemoryGraphStore::new();
        let summary = commit_batch(&store, &built.graph, "b1").unwrap();

        assert_eq!(summary.nodes, 5);
        assert_eq!(summary.edges, 4);
        assert_eq!(summary.properties, 1);
        assert_eq!(store.node_count(), 5);

        let crack = &store.find("Defect", "Crack")[0];
        assert_eq!(crack.properties["width"], "0.2");
        assert!(crack.batches.contains("b1"));
        assert!(store.find("AttributeCategory", "length")[0].is_attribute());
    }

    #[test]
    fn recommitting_the_same_graph_is_idempotent() {
        let input = BatchInput {
            text: String::new(),
            triples: vec!["Component:Beam>hasPart>Part:Web".to_string()],
            attributes: Vec::new(),
        };
        let built = build_batch(&input, &Vocabulary::default());
        let store = MemoryGraphStore::new();
        commit_batch(&store, &built.graph, "b1").unwrap();
        commit_batch(&store, &built.graph, "b1").unwrap();
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
    }
}
