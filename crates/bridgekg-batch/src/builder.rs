//! Parse one batch's triple and attribute strings into a [`BatchGraph`].
//!
//! Grammars:
//!
//! ```text
//! triple    := Type:Name > relation > (Type:Name | literal)
//! literal   := "lexical" | "lexical"@lang | "lexical"^^datatype
//! attribute := EntityName > Category > Value
//! ```
//!
//! Malformed items become [`Issue::FormatError`] / [`Issue::LinkError`]
//! diagnostics and are skipped; the rest of the batch is still processed.

use crate::graph::{BatchGraph, InstanceId, Literal, Object};
use crate::issue::Issue;
use crate::BatchInput;
use bridgekg_ontology::{Datatype, Role, Vocabulary};

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: BatchGraph,
    pub diagnostics: Vec<Issue>,
}

pub struct InstanceGraphBuilder<'v> {
    vocabulary: &'v Vocabulary,
    graph: BatchGraph,
    diagnostics: Vec<Issue>,
}

enum ObjectToken<'a> {
    Pair(&'a str, &'a str),
    Literal(Literal),
}

impl<'v> InstanceGraphBuilder<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self {
            vocabulary,
            graph: BatchGraph::new(),
            diagnostics: Vec::new(),
        }
    }

    /// All triples first, then attributes (attributes link to entities the
    /// triples created).
    pub fn add_input(&mut self, input: &BatchInput) {
        for item in &input.triples {
            self.add_triple(item);
        }
        for item in &input.attributes {
            self.add_attribute(item);
        }
    }

    pub fn add_triple(&mut self, item: &str) {
        let Some((subject_part, rest)) = item.split_once('>') else {
            return self.format_error(item, "expected `Type:Name>Relation>Type:Name`, found no `>`");
        };
        let Some((relation, object_part)) = rest.split_once('>') else {
            return self.format_error(item, "expected `Type:Name>Relation>Type:Name`, found one `>`");
        };
        let relation = relation.trim();
        if relation.is_empty() {
            return self.format_error(item, "relation token is empty");
        }

        let (subject_type, subject_name) = match split_pair(subject_part) {
            Ok(pair) => pair,
            Err(message) => return self.format_error(item, &format!("subject {message}")),
        };
        let object = match parse_object(object_part) {
            Ok(object) => object,
            Err(message) => return self.format_error(item, &format!("object {message}")),
        };

        let subject = self.instance(subject_type, subject_name);
        let object = match object {
            ObjectToken::Pair(ty, name) => Object::Instance(self.instance(ty, name)),
            ObjectToken::Literal(lit) => Object::Literal(lit),
        };
        self.graph.push_triple(subject, relation, object);
    }

    pub fn add_attribute(&mut self, item: &str) {
        let parts: Vec<&str> = item.split('>').map(str::trim).collect();
        let [entity, category, value] = parts.as_slice() else {
            return self.format_error(
                item,
                &format!(
                    "expected `EntityName>Category>Value`, found {} part(s)",
                    parts.len()
                ),
            );
        };
        if entity.is_empty() || category.is_empty() || value.is_empty() {
            return self.format_error(item, "entity, category and value must all be non-empty");
        }

        let candidates = self.graph.named(entity);
        if candidates.is_empty() {
            return self.link_error(item, entity, "the entity is not defined by any triple in this batch");
        }
        let defect = candidates
            .iter()
            .copied()
            .find(|id| self.graph.instance(*id).role == Role::Defect);
        let Some(defect) = defect else {
            let types: Vec<String> = candidates
                .iter()
                .map(|id| self.graph.instance(*id).class.clone())
                .collect();
            let message = format!(
                "attributes attach only to `{}` entities, found type(s) {}",
                self.vocabulary.class_name(Role::Defect),
                types.join(", ")
            );
            return self.link_error(item, entity, &message);
        };

        // One concrete occurrence per attribute line: never shared.
        let category_class = self.vocabulary.class_name(Role::AttributeCategory);
        let value_class = self.vocabulary.class_name(Role::AttributeValue);
        let category_id = self
            .graph
            .create_fresh(&category_class, category, Role::AttributeCategory);
        let value_id = self
            .graph
            .create_fresh(&value_class, value, Role::AttributeValue);

        let relations = &self.vocabulary.relations;
        self.graph
            .push_triple(defect, &relations.has_category, Object::Instance(category_id));
        self.graph
            .push_triple(category_id, &relations.has_value, Object::Instance(value_id));
    }

    pub fn finish(self) -> BuildOutput {
        BuildOutput {
            graph: self.graph,
            diagnostics: self.diagnostics,
        }
    }

    fn instance(&mut self, class: &str, name: &str) -> InstanceId {
        let role = self.vocabulary.role_of(class);
        let (id, created) = self.graph.get_or_create(class, name, role);
        if created && self.graph.named(name).len() > 1 {
            // Same name, different declared type: kept as a separate identity.
            tracing::debug!(name, class, "name already used with another type; new identity");
        }
        id
    }

    fn format_error(&mut self, item: &str, message: &str) {
        self.diagnostics.push(Issue::FormatError {
            item: item.to_string(),
            message: message.to_string(),
        });
    }

    fn link_error(&mut self, item: &str, entity: &str, message: &str) {
        self.diagnostics.push(Issue::LinkError {
            item: item.to_string(),
            entity: entity.to_string(),
            message: message.to_string(),
        });
    }
}

/// Build the graph for one batch with a fresh builder.
pub fn build_batch(input: &BatchInput, vocabulary: &Vocabulary) -> BuildOutput {
    let mut builder = InstanceGraphBuilder::new(vocabulary);
    builder.add_input(input);
    builder.finish()
}

fn split_pair(part: &str) -> Result<(&str, &str), String> {
    let part = part.trim();
    let Some((ty, name)) = part.split_once(':') else {
        return Err(format!("`{part}` should be `Type:Name`"));
    };
    let (ty, name) = (ty.trim(), name.trim());
    if ty.is_empty() {
        return Err(format!("`{part}` has an empty type"));
    }
    if name.is_empty() {
        return Err(format!("`{part}` has an empty name"));
    }
    Ok((ty, name))
}

fn parse_object(part: &str) -> Result<ObjectToken<'_>, String> {
    let trimmed = part.trim();
    if trimmed.starts_with('"') {
        return parse_literal(trimmed).map(ObjectToken::Literal);
    }
    if trimmed.contains('>') {
        return Err(format!("`{trimmed}` contains an extra `>`"));
    }
    split_pair(trimmed).map(|(ty, name)| ObjectToken::Pair(ty, name))
}

fn parse_literal(s: &str) -> Result<Literal, String> {
    let end = match s.rfind('"') {
        Some(end) if end > 0 => end,
        _ => return Err(format!("literal `{s}` is missing its closing quote")),
    };
    let lexical = s[1..end].to_string();
    let suffix = s[end + 1..].trim();

    if suffix.is_empty() {
        return Ok(Literal {
            lexical,
            datatype: None,
            language: None,
        });
    }
    if let Some(lang) = suffix.strip_prefix('@') {
        if lang.is_empty() {
            return Err(format!("literal `{s}` has an empty language tag"));
        }
        return Ok(Literal {
            lexical,
            datatype: None,
            language: Some(lang.to_string()),
        });
    }
    if let Some(dt) = suffix.strip_prefix("^^") {
        if dt.trim().is_empty() {
            return Err(format!("literal `{s}` has an empty datatype"));
        }
        return Ok(Literal {
            lexical,
            datatype: Some(Datatype::from_token(dt)),
            language: None,
        });
    }
    Err(format!("literal `{s}` has trailing text `{suffix}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueKind;

    fn build(triples: &[&str], attributes: &[&str]) -> BuildOutput {
        let input = BatchInput {
            text: String::new(),
            triples: triples.iter().map(|s| s.to_string()).collect(),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
        };
        build_batch(&input, &Vocabulary::default())
    }

    #[test]
    fn parses_a_well_formed_triple() {
        let out = build(&["Component:Beam>locatedAt>ComponentID:3"], &[]);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.graph.instances().len(), 2);
        assert_eq!(out.graph.triples().len(), 1);
        let beam = out.graph.lookup("Component", "Beam").unwrap();
        assert_eq!(out.graph.instance(beam).role, Role::Component);
        assert_eq!(
            out.graph.render_triple(&out.graph.triples()[0]),
            "Component:Beam>locatedAt>ComponentID:3"
        );
    }

    #[test]
    fn malformed_triples_are_skipped_not_fatal() {
        let out = build(
            &[
                "Component:Beam>locatedAt",
                "Component:Beam>hasPart>Part:Web>extra",
                "Beam>hasPart>Part:Web",
                ":Beam>hasPart>Part:Web",
                "Component:Beam> >Part:Web",
                "Component:Beam>hasPart>Part:Web",
            ],
            &[],
        );
        assert_eq!(out.diagnostics.len(), 5);
        assert!(out
            .diagnostics
            .iter()
            .all(|d| d.kind() == IssueKind::FormatError));
        assert_eq!(out.graph.triples().len(), 1);
    }

    #[test]
    fn identity_is_reused_only_for_matching_type() {
        let out = build(
            &[
                "Component:Beam>hasPart>Part:Web",
                "Component:Beam>locatedAt>ComponentID:3",
                "Part:Beam>hasDefect>Defect:Crack",
            ],
            &[],
        );
        let named = out.graph.named("Beam");
        assert_eq!(named.len(), 2);
        let classes: Vec<&str> = named
            .iter()
            .map(|id| out.graph.instance(*id).class.as_str())
            .collect();
        assert_eq!(classes, vec!["Component", "Part"]);
        assert_eq!(out.graph.instances().len(), 5);
    }

    #[test]
    fn attributes_attach_to_defects() {
        let out = build(
            &["Part:Web>hasDefect>Defect:Crack"],
            &["Crack>width>0.2mm", "Crack>length>1.5m"],
        );
        assert!(out.diagnostics.is_empty());
        // defect, part, plus one category and one value per attribute line
        assert_eq!(out.graph.instances().len(), 6);
        assert_eq!(out.graph.triples().len(), 5);
        let categories = out
            .graph
            .instances()
            .iter()
            .filter(|i| i.role == Role::AttributeCategory)
            .count();
        assert_eq!(categories, 2);
    }

    #[test]
    fn repeated_attribute_categories_stay_distinct() {
        let out = build(
            &["Part:Web>hasDefect>Defect:Crack"],
            &["Crack>width>0.2mm", "Crack>width>0.3mm"],
        );
        assert_eq!(out.graph.named("width").len(), 2);
    }

    #[test]
    fn attribute_link_errors() {
        let out = build(
            &["Component:Beam>hasPart>Part:Web"],
            &["Ghost>width>1mm", "Web>width>1mm", "Web>width"],
        );
        let kinds: Vec<IssueKind> = out.diagnostics.iter().map(Issue::kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::LinkError, IssueKind::LinkError, IssueKind::FormatError]
        );
        assert_eq!(out.graph.triples().len(), 1);
    }

    #[test]
    fn literal_objects() {
        let out = build(
            &[
                r#"Defect:Crack>width>"0.2"^^xsd:decimal"#,
                r#"Defect:Crack>note>"see photo 3>4"@en"#,
                r#"Defect:Crack>note>"unterminated"#,
            ],
            &[],
        );
        assert_eq!(out.diagnostics.len(), 1);
        let lits: Vec<&Literal> = out
            .graph
            .triples()
            .iter()
            .filter_map(|t| match &t.object {
                Object::Literal(l) => Some(l),
                Object::Instance(_) => None,
            })
            .collect();
        assert_eq!(lits[0].datatype, Some(Datatype::Decimal));
        assert_eq!(lits[1].lexical, "see photo 3>4");
        assert_eq!(lits[1].language.as_deref(), Some("en"));
    }
}
