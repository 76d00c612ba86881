//! Schema and role checks over a built [`BatchGraph`].
//!
//! Per triple: declared relation, domain, range. Per instance: aggregate
//! role conformance over everything the instance takes part in. The graph is
//! only read; the function is safe to call concurrently on a shared context.

use crate::graph::{BatchGraph, Instance, InstanceId, Literal, Object, Triple};
use crate::issue::{Issue, Position, WarningKind};
use bridgekg_ontology::{Alternative, Datatype, OntologyContext, Schema};
use std::collections::{BTreeMap, BTreeSet};

/// Relations each instance was seen in, per position.
#[derive(Default)]
struct Usage {
    as_subject: BTreeSet<String>,
    as_object: BTreeSet<String>,
}

pub fn validate(graph: &BatchGraph, ctx: &OntologyContext) -> Vec<Issue> {
    let schema = &ctx.schema;
    let mut issues = Vec::new();
    let mut usage: BTreeMap<InstanceId, Usage> = BTreeMap::new();

    for triple in graph.triples() {
        let rendered = graph.render_triple(triple);
        let subject = graph.instance(triple.subject);

        usage
            .entry(triple.subject)
            .or_default()
            .as_subject
            .insert(triple.relation.clone());
        if let Object::Instance(id) = &triple.object {
            usage
                .entry(*id)
                .or_default()
                .as_object
                .insert(triple.relation.clone());
        }

        if schema.property(&triple.relation).is_none() {
            issues.push(Issue::Warning {
                warning: WarningKind::UndeclaredRelation,
                relation: triple.relation.clone(),
                triple: rendered,
            });
            continue;
        }

        check_domain(schema, triple, subject, &rendered, &mut issues);
        check_range(schema, graph, triple, &rendered, &mut issues);
    }

    for (id, used) in &usage {
        let instance = graph.instance(*id);
        if !schema.has_class(&instance.class) {
            for (position, relations) in [
                (Position::Subject, &used.as_subject),
                (Position::Object, &used.as_object),
            ] {
                if !relations.is_empty() {
                    issues.push(Issue::UntypedWarning {
                        entity: instance.label.clone(),
                        declared_type: instance.class.clone(),
                        position,
                    });
                }
            }
            continue;
        }
        check_roles(ctx, instance, used, &mut issues);
    }

    issues
}

fn check_domain(
    schema: &Schema,
    triple: &Triple,
    subject: &Instance,
    rendered: &str,
    issues: &mut Vec<Issue>,
) {
    let domain = schema.resolve_domain(&triple.relation);
    if domain.is_empty() || schema.class_matches(&subject.class, &domain) {
        return;
    }
    issues.push(Issue::DomainError {
        triple: rendered.to_string(),
        relation: triple.relation.clone(),
        subject: subject.label.clone(),
        subject_type: subject.class.clone(),
        expected: render_alternatives(&domain),
    });
}

fn check_range(
    schema: &Schema,
    graph: &BatchGraph,
    triple: &Triple,
    rendered: &str,
    issues: &mut Vec<Issue>,
) {
    let range = schema.resolve_range(&triple.relation);
    if range.is_empty() {
        return;
    }
    let (object, object_type) = match &triple.object {
        Object::Instance(id) => {
            let object = graph.instance(*id);
            if schema.class_matches(&object.class, &range) {
                return;
            }
            (object.label.clone(), object.class.clone())
        }
        Object::Literal(lit) => {
            if literal_matches(lit, &range) {
                return;
            }
            (lit.to_string(), lit.type_name())
        }
    };
    issues.push(Issue::RangeError {
        triple: rendered.to_string(),
        relation: triple.relation.clone(),
        object,
        object_type,
        expected: render_alternatives(&range),
    });
}

/// Whether a literal fits one of the literal alternatives of a range.
pub fn literal_matches(lit: &Literal, alternatives: &[Alternative]) -> bool {
    let mut expected = alternatives.iter().filter_map(|alt| match alt {
        Alternative::Literal(dt) => Some(dt),
        Alternative::Class(_) => None,
    });

    if lit.language.is_some() {
        return expected.any(|dt| {
            matches!(
                dt,
                Datatype::LangString | Datatype::String | Datatype::AnyLiteral
            )
        });
    }
    match &lit.datatype {
        Some(actual) => {
            expected.any(|dt| dt.admits(actual) && actual.accepts_lexical(&lit.lexical))
        }
        None => expected.any(|dt| dt.accepts_lexical(&lit.lexical)),
    }
}

fn check_roles(ctx: &OntologyContext, instance: &Instance, used: &Usage, issues: &mut Vec<Issue>) {
    let rule = ctx.roles.rule(instance.role);
    for (position, relations) in [
        (Position::Subject, &used.as_subject),
        (Position::Object, &used.as_object),
    ] {
        let allowed = rule
            .map(|r| match position {
                Position::Subject => &r.as_subject,
                Position::Object => &r.as_object,
            })
            .cloned()
            .unwrap_or_default();
        let offending: Vec<String> = relations
            .iter()
            .filter(|rel| !allowed.contains(*rel))
            .cloned()
            .collect();
        if offending.is_empty() {
            continue;
        }
        issues.push(Issue::RoleConflict {
            entity: instance.label.clone(),
            entity_type: instance.class.clone(),
            position,
            relations: offending,
            allowed: allowed.into_iter().collect(),
        });
    }
}

fn render_alternatives(alternatives: &[Alternative]) -> Vec<String> {
    alternatives.iter().map(ToString::to_string).collect()
}
