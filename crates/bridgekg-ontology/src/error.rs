use std::path::PathBuf;

/// Failure to turn a schema source into a usable [`crate::Schema`].
///
/// Fatal to validation only: callers log it and continue unvalidated.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("cannot read ontology `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported ontology format `{0}` (expected .ttl or .nt)")]
    UnsupportedFormat(String),
    #[error("ontology syntax error: {0}")]
    Syntax(String),
    #[error("ontology declares no classes and no properties")]
    Empty,
    #[error("malformed union list for `{property}`: {message}")]
    MalformedUnion { property: String, message: String },
    #[error("`{property}` refers to blank node `{node}` that carries no owl:unionOf")]
    DanglingBlankNode { property: String, node: String },
    #[error("subclass hierarchy is cyclic through `{0}`")]
    CyclicHierarchy(String),
}
