use bridgekg_batch::{validate_input, validate_inputs_parallel, BatchInput, Issue, IssueKind};
use bridgekg_ontology::{OntologyContext, Schema, SchemaBuilder, TypeExpr, Vocabulary};
use proptest::prelude::*;

fn batch(triples: &[&str]) -> BatchInput {
    BatchInput {
        text: String::new(),
        triples: triples.iter().map(|s| s.to_string()).collect(),
        attributes: Vec::new(),
    }
}

fn count(issues: &[Issue], kind: IssueKind) -> usize {
    issues.iter().filter(|i| i.kind() == kind).count()
}

fn located_at_context() -> OntologyContext {
    let schema = Schema::builder()
        .class("Component", &[])
        .class("ComponentID", &[])
        .property(
            "locatedAt",
            Some(TypeExpr::class("Component")),
            Some(TypeExpr::class("ComponentID")),
        )
        .build()
        .unwrap();
    OntologyContext::new(schema, Vocabulary::default())
}

#[test]
fn located_at_in_declared_direction_passes() {
    let ctx = located_at_context();
    let out = validate_input(
        batch(&["Component:Beam>locatedAt>ComponentID:3"]),
        &ctx.vocabulary,
        Some(&ctx),
    );
    assert_eq!(count(&out.report.issues, IssueKind::DomainError), 0);
    assert_eq!(count(&out.report.issues, IssueKind::RangeError), 0);
    assert!(out.report.is_accepted(), "{}", out.report.render());
}

#[test]
fn swapped_located_at_yields_domain_and_range_errors() {
    let ctx = located_at_context();
    let out = validate_input(
        batch(&["ComponentID:3>locatedAt>Component:Beam"]),
        &ctx.vocabulary,
        Some(&ctx),
    );
    assert_eq!(count(&out.report.issues, IssueKind::DomainError), 1);
    assert_eq!(count(&out.report.issues, IssueKind::RangeError), 1);
    assert!(!out.report.is_accepted());
    let rendered = out.report.render();
    assert!(rendered.contains("Domain Error"));
    assert!(rendered.contains("Range Error"));
}

#[test]
fn schema_without_constraints_never_reports_domain_or_range() {
    let schema = Schema::builder()
        .class("Component", &[])
        .class("Part", &[])
        .class("Defect", &[])
        .property("hasPart", None, None)
        .property("hasDefect", None, None)
        .build()
        .unwrap();
    let ctx = OntologyContext::new(schema, Vocabulary::default());
    let out = validate_input(
        batch(&[
            "Component:Beam>hasPart>Part:Web",
            "Defect:Crack>hasDefect>Component:Beam",
            "Part:Web>hasDefect>Defect:Crack",
        ]),
        &ctx.vocabulary,
        Some(&ctx),
    );
    assert_eq!(count(&out.report.issues, IssueKind::DomainError), 0);
    assert_eq!(count(&out.report.issues, IssueKind::RangeError), 0);
}

#[test]
fn parallel_validation_preserves_order() {
    let ctx = located_at_context();
    let inputs: Vec<BatchInput> = (0..32)
        .map(|i| {
            if i % 2 == 0 {
                batch(&["Component:Beam>locatedAt>ComponentID:3"])
            } else {
                batch(&["ComponentID:3>locatedAt>Component:Beam"])
            }
        })
        .collect();
    let out = validate_inputs_parallel(inputs, &ctx.vocabulary, Some(&ctx));
    assert_eq!(out.len(), 32);
    for (i, validated) in out.iter().enumerate() {
        assert_eq!(validated.report.is_accepted(), i % 2 == 0);
    }
}

// ============================================================================
// Properties
// ============================================================================

/// Chain C0 <: C1 <: ... <: C{n-1}; `rel` has domain C{d}.
fn chain_context(n: usize, d: usize) -> OntologyContext {
    let mut b = SchemaBuilder::default();
    for i in 0..n {
        b.declare_class(&format!("C{i}"));
    }
    for i in 0..n.saturating_sub(1) {
        b.declare_subclass(&format!("C{i}"), &format!("C{}", i + 1));
    }
    b.declare_class("Target");
    let schema = b
        .property("rel", Some(TypeExpr::class(&format!("C{d}"))), None)
        .build()
        .unwrap();
    OntologyContext::new(schema, Vocabulary::default())
}

proptest! {
    #[test]
    fn domain_error_iff_subject_outside_domain(n in 1usize..8, d in 0usize..8, s in 0usize..8) {
        let d = d % n;
        let s = s % n;
        let ctx = chain_context(n, d);
        let triple = format!("C{s}:x>rel>Target:y");
        let out = validate_input(batch(&[&triple]), &ctx.vocabulary, Some(&ctx));
        let expected = if s <= d { 0 } else { 1 };
        prop_assert_eq!(count(&out.report.issues, IssueKind::DomainError), expected);
    }

    #[test]
    fn undeclared_relation_warns_exactly_once(rel in "[a-z]{3,10}") {
        prop_assume!(rel != "rel");
        let ctx = chain_context(2, 0);
        let triple = format!("C0:x>{rel}>Target:y");
        let out = validate_input(batch(&[&triple]), &ctx.vocabulary, Some(&ctx));
        prop_assert_eq!(count(&out.report.issues, IssueKind::Warning), 1);
        prop_assert_eq!(count(&out.report.issues, IssueKind::DomainError), 0);
        prop_assert_eq!(count(&out.report.issues, IssueKind::RangeError), 0);
    }
}
