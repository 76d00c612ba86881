//! BridgeKG batch layer.
//!
//! Turns one extraction record (sentence, triple strings, attribute strings)
//! into a typed [`BatchGraph`] and validates it against an
//! [`OntologyContext`](bridgekg_ontology::OntologyContext):
//!
//! - [`InstanceGraphBuilder`]: parse and link; malformed items become
//!   diagnostics instead of aborting the batch.
//! - [`validate`]: domain/range, undeclared relations, aggregate role
//!   conformance.
//! - [`ValidationReport`]: structured issues, rendered report and score.
//! - [`CorrectionLoop`]: bounded re-validation around an external
//!   [`Corrector`].

pub mod builder;
pub mod correction;
pub mod graph;
pub mod issue;
pub mod pipeline;
pub mod report;
pub mod validate;

pub use builder::{build_batch, BuildOutput, InstanceGraphBuilder};
pub use correction::{CorrectionLoop, CorrectionOutcome, Corrector, DEFAULT_MAX_ITERATIONS};
pub use graph::{BatchGraph, Instance, InstanceId, Literal, Object, Triple};
pub use issue::{Issue, IssueKind, Position, WarningKind};
pub use pipeline::{
    parse_batch_file, parse_batches, validate_input, validate_inputs_parallel, BatchInput,
    ValidatedBatch,
};
pub use report::ValidationReport;
pub use validate::{literal_matches, validate};
