//! BridgeKG ontology layer.
//!
//! Loads the inspection ontology (classes, `subClassOf` hierarchy, property
//! domain/range declarations) and indexes it for validation:
//!
//! - [`Schema`]: read-only class/property index with a precomputed subclass
//!   closure and union-typed domain/range expressions.
//! - [`Vocabulary`] / [`Role`]: binding of schema class names to the closed
//!   set of inspection roles (Component, Defect, ...).
//! - [`RoleConformance`]: which relations each role may take part in.
//! - [`OntologyContext`]: all of the above, built once at startup and shared
//!   by reference (`Arc`) across validation workers.

pub mod datatype;
pub mod error;
pub mod rdf;
pub mod roles;
pub mod schema;

use std::path::Path;
use std::sync::Arc;

pub use datatype::Datatype;
pub use error::SchemaLoadError;
pub use rdf::{load_schema, load_schema_file, RdfFormat};
pub use roles::{RelationNames, Role, RoleConformance, RoleConformanceRule, Vocabulary};
pub use schema::{Alternative, ClassDecl, PropertyDecl, PropertyKind, Schema, SchemaBuilder, TypeExpr};

/// Immutable validation context. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct OntologyContext {
    pub schema: Schema,
    pub vocabulary: Vocabulary,
    pub roles: RoleConformance,
}

impl OntologyContext {
    /// Context with the role table derived from `vocabulary`.
    pub fn new(schema: Schema, vocabulary: Vocabulary) -> Self {
        let roles = RoleConformance::for_vocabulary(&vocabulary);
        Self {
            schema,
            vocabulary,
            roles,
        }
    }

    pub fn with_roles(mut self, roles: RoleConformance) -> Self {
        self.roles = roles;
        self
    }

    pub fn load(path: &Path, vocabulary: Vocabulary) -> Result<Arc<Self>, SchemaLoadError> {
        let schema = load_schema_file(path)?;
        Ok(Arc::new(Self::new(schema, vocabulary)))
    }

    /// Load the context, or log the failure and return `None` so the caller
    /// can continue in unvalidated mode.
    pub fn load_or_degrade(path: &Path, vocabulary: Vocabulary) -> Option<Arc<Self>> {
        match Self::load(path, vocabulary) {
            Ok(ctx) => Some(ctx),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "ontology failed to load; continuing without validation"
                );
                None
            }
        }
    }
}
