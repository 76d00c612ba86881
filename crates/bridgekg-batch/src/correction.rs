//! Bounded validate → correct → re-validate loop.

use crate::pipeline::{validate_input, BatchInput, ValidatedBatch};
use crate::report::ValidationReport;
use anyhow::Result;
use bridgekg_ontology::{OntologyContext, Vocabulary};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Revises a batch given its validation report (typically model backed).
pub trait Corrector {
    fn correct(&mut self, input: &BatchInput, report: &ValidationReport) -> Result<BatchInput>;
}

impl<F> Corrector for F
where
    F: FnMut(&BatchInput, &ValidationReport) -> Result<BatchInput>,
{
    fn correct(&mut self, input: &BatchInput, report: &ValidationReport) -> Result<BatchInput> {
        self(input, report)
    }
}

#[derive(Debug, Clone)]
pub enum CorrectionOutcome {
    Accepted {
        batch: ValidatedBatch,
        iterations: usize,
    },
    /// Still not accepted after the last iteration; the final attempt is kept.
    Exhausted {
        batch: ValidatedBatch,
        iterations: usize,
    },
}

impl CorrectionOutcome {
    pub fn batch(&self) -> &ValidatedBatch {
        match self {
            CorrectionOutcome::Accepted { batch, .. } | CorrectionOutcome::Exhausted { batch, .. } => {
                batch
            }
        }
    }

    pub fn into_batch(self) -> ValidatedBatch {
        match self {
            CorrectionOutcome::Accepted { batch, .. } | CorrectionOutcome::Exhausted { batch, .. } => {
                batch
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, CorrectionOutcome::Accepted { .. })
    }

    /// Number of correction rounds performed.
    pub fn iterations(&self) -> usize {
        match self {
            CorrectionOutcome::Accepted { iterations, .. }
            | CorrectionOutcome::Exhausted { iterations, .. } => *iterations,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CorrectionLoop {
    pub max_iterations: usize,
}

impl Default for CorrectionLoop {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl CorrectionLoop {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    pub fn run<C: Corrector + ?Sized>(
        &self,
        input: BatchInput,
        vocabulary: &Vocabulary,
        ctx: Option<&OntologyContext>,
        corrector: &mut C,
    ) -> CorrectionOutcome {
        let mut batch = validate_input(input, vocabulary, ctx);
        let mut iterations = 0;

        // Nothing to correct against without an ontology.
        if batch.report.unvalidated {
            return CorrectionOutcome::Exhausted { batch, iterations };
        }

        while !batch.report.is_accepted() && iterations < self.max_iterations {
            iterations += 1;
            let revised = match corrector.correct(&batch.input, &batch.report) {
                Ok(revised) => revised,
                Err(err) => {
                    tracing::warn!(iteration = iterations, error = %err, "correction failed");
                    return CorrectionOutcome::Exhausted { batch, iterations };
                }
            };
            batch = validate_input(revised, vocabulary, ctx);
            tracing::debug!(
                iteration = iterations,
                score = batch.report.score(),
                "re-validated corrected batch"
            );
        }

        if batch.report.is_accepted() {
            CorrectionOutcome::Accepted { batch, iterations }
        } else {
            tracing::warn!(
                iterations,
                score = batch.report.score(),
                "correction budget exhausted; keeping last attempt"
            );
            CorrectionOutcome::Exhausted { batch, iterations }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgekg_ontology::{Schema, TypeExpr};

    fn ctx() -> OntologyContext {
        let schema = Schema::builder()
            .class("Component", &[])
            .class("Part", &[])
            .property(
                "hasPart",
                Some(TypeExpr::class("Component")),
                Some(TypeExpr::class("Part")),
            )
            .build()
            .unwrap();
        OntologyContext::new(schema, Vocabulary::default())
    }

    fn input(triple: &str) -> BatchInput {
        BatchInput {
            text: String::new(),
            triples: vec![triple.to_string()],
            attributes: Vec::new(),
        }
    }

    #[test]
    fn accepted_without_correction() {
        let ctx = ctx();
        let mut never = |_: &BatchInput, _: &ValidationReport| -> Result<BatchInput> {
            panic!("corrector should not be called")
        };
        let outcome = CorrectionLoop::default().run(
            input("Component:Beam>hasPart>Part:Web"),
            &ctx.vocabulary,
            Some(&ctx),
            &mut never,
        );
        assert!(outcome.is_accepted());
        assert_eq!(outcome.iterations(), 0);
    }

    #[test]
    fn corrector_fixes_on_second_round() {
        let ctx = ctx();
        let mut calls = 0;
        let mut fixer = |_: &BatchInput, _: &ValidationReport| -> Result<BatchInput> {
            calls += 1;
            Ok(if calls < 2 {
                input("Part:Web>hasPart>Component:Beam")
            } else {
                input("Component:Beam>hasPart>Part:Web")
            })
        };
        let outcome = CorrectionLoop::default().run(
            input("Part:Web>hasPart>Component:Beam"),
            &ctx.vocabulary,
            Some(&ctx),
            &mut fixer,
        );
        assert!(outcome.is_accepted());
        assert_eq!(outcome.iterations(), 2);
    }

    #[test]
    fn exhausts_after_max_iterations() {
        let ctx = ctx();
        let mut stubborn =
            |i: &BatchInput, _: &ValidationReport| -> Result<BatchInput> { Ok(i.clone()) };
        let outcome = CorrectionLoop::new(3).run(
            input("Part:Web>hasPart>Component:Beam"),
            &ctx.vocabulary,
            Some(&ctx),
            &mut stubborn,
        );
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.iterations(), 3);
        assert!(!outcome.batch().report.is_accepted());
    }

    #[test]
    fn corrector_error_stops_the_loop() {
        let ctx = ctx();
        let mut failing = |_: &BatchInput, _: &ValidationReport| -> Result<BatchInput> {
            anyhow::bail!("model unavailable")
        };
        let outcome = CorrectionLoop::default().run(
            input("Part:Web>hasPart>Component:Beam"),
            &ctx.vocabulary,
            Some(&ctx),
            &mut failing,
        );
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.iterations(), 1);
    }
}
