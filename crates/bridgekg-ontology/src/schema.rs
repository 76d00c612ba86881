//! Indexed class hierarchy and property domain/range declarations.
//!
//! A [`Schema`] is immutable once built. The subclass relation is
//! precomputed as a reflexive-transitive closure (`supertypes_of`), so
//! `is_subclass` is a hash lookup and never walks the hierarchy.

use crate::datatype::Datatype;
use crate::error::SchemaLoadError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    /// Direct superclasses only.
    pub superclasses: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    Object,
    Datatype,
    Plain,
}

/// One admissible type in a domain or range expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Alternative {
    Class(String),
    Literal(Datatype),
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alternative::Class(name) => write!(f, "{name}"),
            Alternative::Literal(dt) => write!(f, "{dt}"),
        }
    }
}

/// Domain/range expression: a single reference or a union of alternatives.
///
/// A union is satisfied when any one alternative matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    One(Alternative),
    Union(Vec<Alternative>),
}

impl TypeExpr {
    pub fn class(name: &str) -> Self {
        TypeExpr::One(Alternative::Class(name.to_string()))
    }

    pub fn literal(dt: Datatype) -> Self {
        TypeExpr::One(Alternative::Literal(dt))
    }

    pub fn union<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeExpr::Union(
            classes
                .into_iter()
                .map(|c| Alternative::Class(c.into()))
                .collect(),
        )
    }

    pub fn alternatives(&self) -> &[Alternative] {
        match self {
            TypeExpr::One(alt) => std::slice::from_ref(alt),
            TypeExpr::Union(alts) => alts,
        }
    }

    /// Fold another declaration into this one ("any of" semantics).
    pub fn widen(self, other: TypeExpr) -> TypeExpr {
        let mut alts: Vec<Alternative> = self.alternatives().to_vec();
        for alt in other.alternatives() {
            if !alts.contains(alt) {
                alts.push(alt.clone());
            }
        }
        if alts.len() == 1 {
            TypeExpr::One(alts.remove(0))
        } else {
            TypeExpr::Union(alts)
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::One(alt) => write!(f, "{alt}"),
            TypeExpr::Union(alts) => {
                let parts: Vec<String> = alts.iter().map(|a| a.to_string()).collect();
                write!(f, "({})", parts.join(" or "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub kind: PropertyKind,
    pub domain: Option<TypeExpr>,
    pub range: Option<TypeExpr>,
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Schema {
    classes: BTreeMap<String, ClassDecl>,
    properties: BTreeMap<String, PropertyDecl>,
    supertypes_of: HashMap<String, HashSet<String>>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDecl> {
        self.properties.values()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.get(name)
    }

    /// Reflexive, transitive subclass test over declared `subClassOf` edges.
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        self.supertypes_of
            .get(sub)
            .map(|s| s.contains(sup))
            .unwrap_or(sub == sup)
    }

    /// Alternatives of a property's domain; empty when the property is
    /// undeclared or declares no domain.
    pub fn resolve_domain(&self, property: &str) -> Vec<Alternative> {
        self.properties
            .get(property)
            .and_then(|p| p.domain.as_ref())
            .map(|e| e.alternatives().to_vec())
            .unwrap_or_default()
    }

    pub fn resolve_range(&self, property: &str) -> Vec<Alternative> {
        self.properties
            .get(property)
            .and_then(|p| p.range.as_ref())
            .map(|e| e.alternatives().to_vec())
            .unwrap_or_default()
    }

    /// Whether `class` is subclass-or-equal of any class alternative.
    pub fn class_matches(&self, class: &str, alternatives: &[Alternative]) -> bool {
        alternatives.iter().any(|alt| match alt {
            Alternative::Class(expected) => self.is_subclass(class, expected),
            Alternative::Literal(_) => false,
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    classes: BTreeMap<String, ClassDecl>,
    properties: BTreeMap<String, PropertyDecl>,
}

impl SchemaBuilder {
    /// Declare a class (idempotent; superclasses accumulate).
    pub fn class(mut self, name: &str, superclasses: &[&str]) -> Self {
        self.declare_class(name);
        for sup in superclasses {
            self.declare_subclass(name, sup);
        }
        self
    }

    pub fn property(mut self, name: &str, domain: Option<TypeExpr>, range: Option<TypeExpr>) -> Self {
        self.declare_property(name, PropertyKind::Plain);
        if let Some(domain) = domain {
            self.add_domain(name, domain);
        }
        if let Some(range) = range {
            self.add_range(name, range);
        }
        self
    }

    pub fn declare_class(&mut self, name: &str) {
        self.classes
            .entry(name.to_string())
            .or_insert_with(|| ClassDecl {
                name: name.to_string(),
                superclasses: BTreeSet::new(),
            });
    }

    pub fn declare_subclass(&mut self, sub: &str, sup: &str) {
        self.declare_class(sup);
        self.declare_class(sub);
        if let Some(decl) = self.classes.get_mut(sub) {
            decl.superclasses.insert(sup.to_string());
        }
    }

    pub fn declare_property(&mut self, name: &str, kind: PropertyKind) {
        let entry = self
            .properties
            .entry(name.to_string())
            .or_insert_with(|| PropertyDecl {
                name: name.to_string(),
                kind,
                domain: None,
                range: None,
            });
        if entry.kind == PropertyKind::Plain {
            entry.kind = kind;
        }
    }

    pub fn add_domain(&mut self, property: &str, expr: TypeExpr) {
        self.declare_property(property, PropertyKind::Plain);
        if let Some(p) = self.properties.get_mut(property) {
            p.domain = Some(match p.domain.take() {
                Some(existing) => existing.widen(expr),
                None => expr,
            });
        }
    }

    pub fn add_range(&mut self, property: &str, expr: TypeExpr) {
        self.declare_property(property, PropertyKind::Plain);
        if let Some(p) = self.properties.get_mut(property) {
            p.range = Some(match p.range.take() {
                Some(existing) => existing.widen(expr),
                None => expr,
            });
        }
    }

    pub fn build(self) -> Result<Schema, SchemaLoadError> {
        if self.classes.is_empty() && self.properties.is_empty() {
            return Err(SchemaLoadError::Empty);
        }
        check_acyclic(&self.classes)?;
        let supertypes_of = compute_supertypes_closure(&self.classes);
        Ok(Schema {
            classes: self.classes,
            properties: self.properties,
            supertypes_of,
        })
    }
}

fn compute_supertypes_closure(
    classes: &BTreeMap<String, ClassDecl>,
) -> HashMap<String, HashSet<String>> {
    let mut supertypes_of: HashMap<String, HashSet<String>> = HashMap::new();
    for (name, decl) in classes {
        let mut supers = HashSet::new();
        supers.insert(name.clone());
        let mut stack: Vec<String> = decl.superclasses.iter().cloned().collect();
        while let Some(sup) = stack.pop() {
            if supers.insert(sup.clone()) {
                if let Some(next) = classes.get(&sup) {
                    stack.extend(next.superclasses.iter().cloned());
                }
            }
        }
        supertypes_of.insert(name.clone(), supers);
    }
    supertypes_of
}

fn check_acyclic(classes: &BTreeMap<String, ClassDecl>) -> Result<(), SchemaLoadError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Open,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for start in classes.keys() {
        if marks.contains_key(start.as_str()) {
            continue;
        }
        // Iterative DFS: (class, superclasses not yet visited).
        let mut stack: Vec<(&str, Vec<&str>)> = Vec::new();
        marks.insert(start.as_str(), Mark::Open);
        stack.push((start.as_str(), supers_of(classes, start)));
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            match top.1.pop() {
                Some(next) => match marks.get(next) {
                    Some(Mark::Open) => {
                        return Err(SchemaLoadError::CyclicHierarchy(next.to_string()))
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::Open);
                        stack.push((next, supers_of(classes, next)));
                    }
                },
                None => {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                }
            }
        }
    }
    Ok(())
}

fn supers_of<'a>(classes: &'a BTreeMap<String, ClassDecl>, name: &str) -> Vec<&'a str> {
    classes
        .get(name)
        .map(|d| d.superclasses.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_schema() -> Schema {
        Schema::builder()
            .class("Element", &[])
            .class("Component", &["Element"])
            .class("Girder", &["Component"])
            .class("ComponentID", &[])
            .property(
                "locatedAt",
                Some(TypeExpr::class("Component")),
                Some(TypeExpr::class("ComponentID")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn subclass_is_reflexive_and_transitive() {
        let schema = bridge_schema();
        assert!(schema.is_subclass("Girder", "Girder"));
        assert!(schema.is_subclass("Girder", "Component"));
        assert!(schema.is_subclass("Girder", "Element"));
        assert!(!schema.is_subclass("Element", "Girder"));
        assert!(!schema.is_subclass("ComponentID", "Component"));
        // Undeclared names are only equal to themselves.
        assert!(schema.is_subclass("Mystery", "Mystery"));
        assert!(!schema.is_subclass("Mystery", "Component"));
    }

    #[test]
    fn resolves_domain_and_range() {
        let schema = bridge_schema();
        assert_eq!(
            schema.resolve_domain("locatedAt"),
            vec![Alternative::Class("Component".to_string())]
        );
        assert!(schema.resolve_domain("unknownRelation").is_empty());
        assert!(schema.class_matches("Girder", &schema.resolve_domain("locatedAt")));
    }

    #[test]
    fn repeated_domain_declarations_widen_to_union() {
        let mut b = Schema::builder().class("A", &[]).class("B", &[]);
        b.add_domain("p", TypeExpr::class("A"));
        b.add_domain("p", TypeExpr::class("B"));
        b.add_domain("p", TypeExpr::class("A"));
        let schema = b.build().unwrap();
        let alts = schema.resolve_domain("p");
        assert_eq!(alts.len(), 2);
        assert!(schema.class_matches("B", &alts));
    }

    #[test]
    fn cyclic_hierarchy_is_rejected() {
        let err = Schema::builder()
            .class("A", &["B"])
            .class("B", &["C"])
            .class("C", &["A"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaLoadError::CyclicHierarchy(_)));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let schema = Schema::builder()
            .class("Top", &[])
            .class("Left", &["Top"])
            .class("Right", &["Top"])
            .class("Bottom", &["Left", "Right"])
            .build()
            .unwrap();
        assert!(schema.is_subclass("Bottom", "Top"));
    }

    #[test]
    fn empty_schema_is_an_error() {
        assert!(matches!(
            Schema::builder().build(),
            Err(SchemaLoadError::Empty)
        ));
    }

    #[test]
    fn union_display() {
        let expr = TypeExpr::union(["Component", "Part"]);
        assert_eq!(expr.to_string(), "(Component or Part)");
    }
}
