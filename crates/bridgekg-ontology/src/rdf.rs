//! Ontology loading from RDF (Turtle / N-Triples) via Sophia.
//!
//! Only the RDFS/OWL vocabulary needed for domain/range validation is
//! interpreted: class declarations, `rdfs:subClassOf`, property
//! declarations, `rdfs:domain`, `rdfs:range` and `owl:unionOf` lists.
//! Everything else in the file (labels, comments, individuals) is ignored.

use crate::datatype::Datatype;
use crate::error::SchemaLoadError;
use crate::schema::{Alternative, PropertyKind, Schema, SchemaBuilder, TypeExpr};
use anyhow::{anyhow, Result};
use sophia::api::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
const OWL: &str = "http://www.w3.org/2002/07/owl#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
}

impl RdfFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            _ => None,
        }
    }
}

// ============================================================================
// Term model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RdfNode {
    Iri(String),
    BlankNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RdfObject {
    Node(RdfNode),
    Literal(String),
}

#[derive(Debug, Clone)]
struct RdfStatement {
    subject: RdfNode,
    predicate_iri: String,
    object: RdfObject,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct RdfSinkError {
    message: String,
}

impl From<anyhow::Error> for RdfSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

pub(crate) fn local_name(iri: &str) -> String {
    iri.rsplit(['#', '/']).next().unwrap_or(iri).to_string()
}

fn parse_term_display(term: &str) -> Result<RdfObject> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(RdfObject::Node(RdfNode::Iri(rest.to_string())));
    }
    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(RdfObject::Node(RdfNode::BlankNode(rest.to_string())));
    }
    if s.starts_with('"') {
        // Literals only matter for labels/comments, which we skip.
        return Ok(RdfObject::Literal(s.to_string()));
    }
    Err(anyhow!("unsupported RDF term form: {s}"))
}

fn parse_node_term_display(term: &str) -> Result<RdfNode> {
    match parse_term_display(term)? {
        RdfObject::Node(node) => Ok(node),
        RdfObject::Literal(_) => Err(anyhow!("expected IRI/blank node, got literal: {term}")),
    }
}

fn parse_statements(bytes: &[u8], format: RdfFormat) -> Result<Vec<RdfStatement>> {
    let reader = std::io::BufReader::new(std::io::Cursor::new(bytes));
    let mut out: Vec<RdfStatement> = Vec::new();

    let mut sink = |subject: String, predicate: String, object: String| -> std::result::Result<(), RdfSinkError> {
        let subject = parse_node_term_display(&subject).map_err(RdfSinkError::from)?;
        let RdfNode::Iri(predicate_iri) =
            parse_node_term_display(&predicate).map_err(RdfSinkError::from)?
        else {
            return Ok(());
        };
        let object = parse_term_display(&object).map_err(RdfSinkError::from)?;
        out.push(RdfStatement {
            subject,
            predicate_iri,
            object,
        });
        Ok(())
    };

    match format {
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    sink(t.s().to_string(), t.p().to_string(), t.o().to_string())
                })
                .map_err(|e| anyhow!("failed to parse N-Triples: {e}"))?;
        }
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    sink(t.s().to_string(), t.p().to_string(), t.o().to_string())
                })
                .map_err(|e| anyhow!("failed to parse Turtle: {e}"))?;
        }
    }
    Ok(out)
}

// ============================================================================
// Statements -> Schema
// ============================================================================

pub fn load_schema_file(path: &Path) -> Result<Schema, SchemaLoadError> {
    let format = RdfFormat::from_path(path).ok_or_else(|| {
        SchemaLoadError::UnsupportedFormat(path.display().to_string())
    })?;
    let bytes = std::fs::read(path).map_err(|source| SchemaLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_schema(&bytes, format)
}

pub fn load_schema(bytes: &[u8], format: RdfFormat) -> Result<Schema, SchemaLoadError> {
    let statements =
        parse_statements(bytes, format).map_err(|e| SchemaLoadError::Syntax(e.to_string()))?;
    let schema = schema_from_statements(&statements)?;
    tracing::debug!(
        classes = schema.classes().count(),
        properties = schema.properties().count(),
        "loaded ontology"
    );
    Ok(schema)
}

fn schema_from_statements(statements: &[RdfStatement]) -> Result<Schema, SchemaLoadError> {
    let rdf_type = format!("{RDF}type");
    let rdf_first = format!("{RDF}first");
    let rdf_rest = format!("{RDF}rest");
    let rdf_nil = format!("{RDF}nil");
    let rdf_property = format!("{RDF}Property");
    let rdfs_class = format!("{RDFS}Class");
    let rdfs_subclass = format!("{RDFS}subClassOf");
    let rdfs_domain = format!("{RDFS}domain");
    let rdfs_range = format!("{RDFS}range");
    let owl_class = format!("{OWL}Class");
    let owl_object_property = format!("{OWL}ObjectProperty");
    let owl_datatype_property = format!("{OWL}DatatypeProperty");
    let owl_union_of = format!("{OWL}unionOf");

    // Blank-node bookkeeping for union expressions and RDF collections.
    let mut first: HashMap<String, RdfObject> = HashMap::new();
    let mut rest: HashMap<String, RdfObject> = HashMap::new();
    let mut union_of: HashMap<String, RdfObject> = HashMap::new();
    for st in statements {
        let RdfNode::BlankNode(bn) = &st.subject else {
            continue;
        };
        if st.predicate_iri == rdf_first {
            first.insert(bn.clone(), st.object.clone());
        } else if st.predicate_iri == rdf_rest {
            rest.insert(bn.clone(), st.object.clone());
        } else if st.predicate_iri == owl_union_of {
            union_of.insert(bn.clone(), st.object.clone());
        }
    }

    let mut builder = SchemaBuilder::default();
    for st in statements {
        let RdfNode::Iri(subject) = &st.subject else {
            continue;
        };
        let subject_name = local_name(subject);
        let p = st.predicate_iri.as_str();

        if p == rdf_type {
            let RdfObject::Node(RdfNode::Iri(ty)) = &st.object else {
                continue;
            };
            if *ty == owl_class || *ty == rdfs_class {
                builder.declare_class(&subject_name);
            } else if *ty == owl_object_property {
                builder.declare_property(&subject_name, PropertyKind::Object);
            } else if *ty == owl_datatype_property {
                builder.declare_property(&subject_name, PropertyKind::Datatype);
            } else if *ty == rdf_property {
                builder.declare_property(&subject_name, PropertyKind::Plain);
            }
        } else if p == rdfs_subclass {
            // Restrictions (blank-node superclasses) are not part of the hierarchy.
            if let RdfObject::Node(RdfNode::Iri(sup)) = &st.object {
                builder.declare_subclass(&subject_name, &local_name(sup));
            }
        } else if p == rdfs_domain || p == rdfs_range {
            let expr = type_expr(&subject_name, &st.object, &union_of, &first, &rest, &rdf_nil)?;
            if p == rdfs_domain {
                builder.add_domain(&subject_name, expr);
            } else {
                builder.add_range(&subject_name, expr);
            }
        }
    }

    builder.build()
}

fn alternative_for_iri(iri: &str) -> Alternative {
    match Datatype::from_iri(iri) {
        Some(dt) => Alternative::Literal(dt),
        None => Alternative::Class(local_name(iri)),
    }
}

fn type_expr(
    property: &str,
    object: &RdfObject,
    union_of: &HashMap<String, RdfObject>,
    first: &HashMap<String, RdfObject>,
    rest: &HashMap<String, RdfObject>,
    rdf_nil: &str,
) -> Result<TypeExpr, SchemaLoadError> {
    let malformed = |message: String| SchemaLoadError::MalformedUnion {
        property: property.to_string(),
        message,
    };

    match object {
        RdfObject::Node(RdfNode::Iri(iri)) => Ok(TypeExpr::One(alternative_for_iri(iri))),
        RdfObject::Literal(lit) => Err(malformed(format!("literal {lit} is not a type"))),
        RdfObject::Node(RdfNode::BlankNode(bn)) => {
            let Some(list_head) = union_of.get(bn) else {
                return Err(SchemaLoadError::DanglingBlankNode {
                    property: property.to_string(),
                    node: bn.clone(),
                });
            };

            let mut alternatives: Vec<Alternative> = Vec::new();
            let mut seen: HashSet<String> = HashSet::new();
            let mut cursor = list_head.clone();
            loop {
                let next = match &cursor {
                    RdfObject::Node(RdfNode::Iri(iri)) if iri == rdf_nil => break,
                    RdfObject::Node(RdfNode::BlankNode(cell)) => {
                        if !seen.insert(cell.clone()) {
                            return Err(malformed(format!("list cell _:{cell} repeats")));
                        }
                        match first.get(cell) {
                            Some(RdfObject::Node(RdfNode::Iri(member))) => {
                                alternatives.push(alternative_for_iri(member));
                            }
                            Some(_) => {
                                return Err(malformed(format!(
                                    "list cell _:{cell} holds a non-IRI member"
                                )))
                            }
                            None => {
                                return Err(malformed(format!("list cell _:{cell} has no rdf:first")))
                            }
                        }
                        rest.get(cell)
                            .cloned()
                            .ok_or_else(|| malformed(format!("list cell _:{cell} has no rdf:rest")))?
                    }
                    _ => return Err(malformed("list is not terminated by rdf:nil".to_string())),
                };
                cursor = next;
            }

            if alternatives.is_empty() {
                return Err(malformed("empty union".to_string()));
            }
            Ok(TypeExpr::Union(alternatives))
        }
    }
}
