//! Batch input files and the parse → build → validate pipeline.

use crate::builder::build_batch;
use crate::graph::BatchGraph;
use crate::report::ValidationReport;
use crate::validate::validate;
use anyhow::{Context, Result};
use bridgekg_ontology::{OntologyContext, Vocabulary};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One extraction record: the source sentence plus the extracted strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInput {
    #[serde(default, alias = "文本")]
    pub text: String,
    #[serde(default, alias = "三元组")]
    pub triples: Vec<String>,
    #[serde(default, alias = "属性")]
    pub attributes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<BatchInput>),
    One(BatchInput),
}

/// Parse batch JSON holding either a single object or an array of them.
pub fn parse_batches(json: &str) -> Result<Vec<BatchInput>> {
    let parsed: OneOrMany = serde_json::from_str(json).context("invalid batch JSON")?;
    Ok(match parsed {
        OneOrMany::Many(batches) => batches,
        OneOrMany::One(batch) => vec![batch],
    })
}

pub fn parse_batch_file(path: &Path) -> Result<Vec<BatchInput>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file {}", path.display()))?;
    parse_batches(&json).with_context(|| format!("failed to parse {}", path.display()))
}

/// A batch together with the graph built from it and its report.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub input: BatchInput,
    pub graph: BatchGraph,
    pub report: ValidationReport,
}

/// Build and validate one batch. With `ctx == None` (ontology failed to
/// load) only the parse/link diagnostics are produced.
pub fn validate_input(
    input: BatchInput,
    vocabulary: &Vocabulary,
    ctx: Option<&OntologyContext>,
) -> ValidatedBatch {
    let built = build_batch(&input, vocabulary);
    let report = match ctx {
        Some(ctx) => ValidationReport {
            issues: validate(&built.graph, ctx),
            diagnostics: built.diagnostics,
            unvalidated: false,
        },
        None => {
            tracing::warn!(
                triples = input.triples.len(),
                "no ontology loaded; batch left unvalidated"
            );
            ValidationReport {
                diagnostics: built.diagnostics,
                issues: Vec::new(),
                unvalidated: true,
            }
        }
    };
    tracing::debug!(
        instances = built.graph.instances().len(),
        triples = built.graph.triples().len(),
        blocking = report.blocking_count(),
        "batch validated"
    );
    ValidatedBatch {
        input,
        graph: built.graph,
        report,
    }
}

/// Validate independent batches concurrently against one shared context.
/// Output order matches input order.
pub fn validate_inputs_parallel(
    inputs: Vec<BatchInput>,
    vocabulary: &Vocabulary,
    ctx: Option<&OntologyContext>,
) -> Vec<ValidatedBatch> {
    inputs
        .into_par_iter()
        .map(|input| validate_input(input, vocabulary, ctx))
        .collect()
}
