//! Integration tests for the complete BridgeKG pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Ontology (Turtle) → OntologyContext
//! - Batch JSON → InstanceGraphBuilder → Validator → report
//! - Commit → ConsolidationEngine → PathEnumerator
//!
//! Run with: cargo test --test integration_tests

use bridgekg_batch::{
    parse_batches, validate_inputs_parallel, BatchInput, CorrectionLoop, IssueKind,
    ValidationReport,
};
use bridgekg_ontology::{OntologyContext, Vocabulary};
use bridgekg_store::{
    commit_batch, ConsolidationConfig, ConsolidationEngine, MemoryGraphStore, PathEnumerator,
};
use std::path::PathBuf;
use tempfile::tempdir;

const ONTOLOGY: &str = r#"
@prefix ont:  <http://example.org/bridge#> .
@prefix owl:  <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd:  <http://www.w3.org/2001/XMLSchema#> .

ont:Component a owl:Class .
ont:ComponentID a owl:Class .
ont:Part a owl:Class .
ont:Defect a owl:Class .
ont:DefectLocation a owl:Class .
ont:AttributeCategory a owl:Class .
ont:AttributeValue a owl:Class .
ont:Girder rdfs:subClassOf ont:Component .

ont:hasPart a owl:ObjectProperty ;
    rdfs:domain [ owl:unionOf ( ont:Component ont:ComponentID ) ] ;
    rdfs:range ont:Part .
ont:locatedAt a owl:ObjectProperty ;
    rdfs:domain ont:Component ;
    rdfs:range ont:ComponentID .
ont:hasDefect a owl:ObjectProperty ;
    rdfs:domain [ owl:unionOf ( ont:Component ont:ComponentID ont:Part ont:DefectLocation ) ] ;
    rdfs:range ont:Defect .
ont:defectLocatedAt a owl:ObjectProperty ;
    rdfs:domain [ owl:unionOf ( ont:Component ont:ComponentID ont:Part ) ] ;
    rdfs:range ont:DefectLocation .
ont:hasCategory a owl:ObjectProperty ;
    rdfs:domain ont:Defect ;
    rdfs:range ont:AttributeCategory .
ont:hasValue a owl:ObjectProperty ;
    rdfs:domain ont:AttributeCategory ;
    rdfs:range ont:AttributeValue .
"#;

const BATCHES: &str = r#"[
  {
    "文本": "1号主梁腹板存在竖向裂缝，宽度0.2mm",
    "三元组": [
      "Component:主梁>locatedAt>ComponentID:1号",
      "ComponentID:1号>hasPart>Part:腹板",
      "Part:腹板>hasDefect>Defect:竖向裂缝"
    ],
    "属性": ["竖向裂缝>宽度>0.2mm"]
  },
  {
    "text": "1号主梁腹板另有蜂窝麻面，翼缘完好",
    "triples": [
      "Component:主梁>locatedAt>ComponentID:1号",
      "ComponentID:1号>hasPart>Part:腹板",
      "ComponentID:1号>hasPart>Part:翼缘",
      "Part:腹板>hasDefect>Defect:蜂窝麻面"
    ],
    "attributes": ["蜂窝麻面>面积>0.5m2"]
  },
  {
    "text": "主梁位于腹板",
    "triples": ["Component:主梁>locatedAt>Part:腹板"]
  }
]"#;

fn write_ontology() -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bridge.ttl");
    std::fs::write(&path, ONTOLOGY).unwrap();
    (dir, path)
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_batches_against_turtle_ontology() {
    let (_dir, path) = write_ontology();
    let ctx = OntologyContext::load(&path, Vocabulary::default()).unwrap();
    let inputs = parse_batches(BATCHES).unwrap();
    let validated = validate_inputs_parallel(inputs, &ctx.vocabulary, Some(&ctx));

    assert!(validated[0].report.is_accepted(), "{}", validated[0].report.render());
    assert!(validated[1].report.is_accepted(), "{}", validated[1].report.render());

    let bad = &validated[2].report;
    assert_eq!(bad.of_kind(IssueKind::RangeError).count(), 1);
    assert_eq!(bad.of_kind(IssueKind::RoleConflict).count(), 1);
    assert!((bad.score() - 0.8).abs() < 1e-9);
}

#[test]
fn test_degraded_mode_when_ontology_is_missing() {
    let dir = tempdir().unwrap();
    let ctx = OntologyContext::load_or_degrade(&dir.path().join("missing.ttl"), Vocabulary::default());
    assert!(ctx.is_none());

    let inputs = parse_batches(BATCHES).unwrap();
    let validated = validate_inputs_parallel(inputs, &Vocabulary::default(), ctx.as_deref());
    assert!(validated.iter().all(|v| v.report.unvalidated));
    assert_eq!(validated[0].graph.triples().len(), 5);
}

#[test]
fn test_correction_loop_repairs_swapped_relation() {
    let (_dir, path) = write_ontology();
    let ctx = OntologyContext::load(&path, Vocabulary::default()).unwrap();
    let input = BatchInput {
        text: "主梁位于1号".to_string(),
        triples: vec!["ComponentID:1号>locatedAt>Component:主梁".to_string()],
        attributes: Vec::new(),
    };

    // Stand-in for the model-backed corrector: swap subject and object.
    let mut swap = |input: &BatchInput, _report: &ValidationReport| -> anyhow::Result<BatchInput> {
        let triples = input
            .triples
            .iter()
            .map(|t| {
                let parts: Vec<&str> = t.split('>').collect();
                format!("{}>{}>{}", parts[2], parts[1], parts[0])
            })
            .collect();
        Ok(BatchInput {
            triples,
            ..input.clone()
        })
    };
    let outcome = CorrectionLoop::default().run(input, &ctx.vocabulary, Some(&ctx), &mut swap);
    assert!(outcome.is_accepted());
    assert_eq!(outcome.iterations(), 1);
}

// ============================================================================
// Store → Consolidation → Paths
// ============================================================================

#[test]
fn test_ingest_consolidate_and_enumerate_paths() {
    let (dir, path) = write_ontology();
    let ctx = OntologyContext::load(&path, Vocabulary::default()).unwrap();
    let inputs = parse_batches(BATCHES).unwrap();
    let validated = validate_inputs_parallel(inputs, &ctx.vocabulary, Some(&ctx));

    let store = MemoryGraphStore::new();
    for (i, v) in validated.iter().take(2).enumerate() {
        commit_batch(&store, &v.graph, &format!("b{i}")).unwrap();
    }
    assert_eq!(store.find("Component", "主梁").len(), 2);

    let report = ConsolidationEngine::new(&store, ConsolidationConfig::default())
        .run()
        .unwrap();
    assert!(report.failed.is_empty());
    assert_eq!(store.find("Component", "主梁").len(), 1);
    assert_eq!(store.find("ComponentID", "1号").len(), 1);
    assert_eq!(store.find("Part", "腹板").len(), 1);
    assert_eq!(store.find("Part", "翼缘").len(), 1);
    assert_eq!(store.find("AttributeCategory", "宽度").len(), 1);

    // Snapshot survives a reload.
    let snapshot = dir.path().join("graph.json");
    store.save_snapshot(&snapshot).unwrap();
    let reloaded = MemoryGraphStore::load_snapshot(&snapshot).unwrap();
    assert_eq!(reloaded.node_count(), store.node_count());

    let rows = PathEnumerator::new(None).enumerate(&reloaded).unwrap();
    let mut sentences: Vec<&str> = rows.iter().map(|r| r.sentence.as_str()).collect();
    sentences.sort_unstable();
    let mut expected = vec![
        "Component:主梁 - locatedAt - ComponentID:1号 - hasPart - Part:腹板 - hasDefect - Defect:竖向裂缝 - hasCategory - AttributeCategory:宽度 - hasValue - AttributeValue:0.2mm",
        "Component:主梁 - locatedAt - ComponentID:1号 - hasPart - Part:腹板 - hasDefect - Defect:蜂窝麻面 - hasCategory - AttributeCategory:面积 - hasValue - AttributeValue:0.5m2",
        "Component:主梁 - locatedAt - ComponentID:1号 - hasPart - Part:翼缘",
    ];
    expected.sort_unstable();
    assert_eq!(sentences, expected);
    let json = serde_json::to_string(&rows).unwrap();
    assert!(json.contains("\"relations\""));
}
