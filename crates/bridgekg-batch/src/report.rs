use crate::issue::{Issue, IssueKind};
use serde::{Deserialize, Serialize};

const SUCCESS: &str = "Validation passed: all triples and attributes conform to the ontology.";
const UNVALIDATED: &str = "Ontology unavailable: batch was parsed but not validated.";

/// Outcome of validating one batch.
///
/// `diagnostics` come from parsing/linking, `issues` from the schema and role
/// checks. `unvalidated` is set when no ontology was available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Issue>,
    pub issues: Vec<Issue>,
    pub unvalidated: bool,
}

impl ValidationReport {
    pub fn all(&self) -> impl Iterator<Item = &Issue> {
        self.diagnostics.iter().chain(self.issues.iter())
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.all().filter(move |i| i.kind() == kind)
    }

    pub fn blocking_count(&self) -> usize {
        self.all().filter(|i| i.is_blocking()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty() && self.issues.is_empty()
    }

    /// `max(0, 1 - 0.1 * blocking)`.
    pub fn score(&self) -> f64 {
        (1.0 - 0.1 * self.blocking_count() as f64).max(0.0)
    }

    pub fn is_accepted(&self) -> bool {
        self.blocking_count() == 0
    }

    /// Newline-joined human readable report.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self.all().map(ToString::to_string).collect();
        if self.unvalidated {
            lines.push(UNVALIDATED.to_string());
        } else if lines.is_empty() {
            lines.push(SUCCESS.to_string());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::WarningKind;

    fn format_error(n: usize) -> Issue {
        Issue::FormatError {
            item: format!("item{n}"),
            message: "bad".to_string(),
        }
    }

    #[test]
    fn empty_report_is_accepted() {
        let report = ValidationReport::default();
        assert!(report.is_accepted());
        assert_eq!(report.score(), 1.0);
        assert_eq!(report.render(), SUCCESS);
    }

    #[test]
    fn warnings_do_not_cost_score() {
        let report = ValidationReport {
            issues: vec![Issue::Warning {
                warning: WarningKind::UndeclaredRelation,
                relation: "r".to_string(),
                triple: "A:a>r>B:b".to_string(),
            }],
            ..Default::default()
        };
        assert!(report.is_accepted());
        assert!(report.render().starts_with("Warning:"));
    }

    #[test]
    fn score_floors_at_zero() {
        let report = ValidationReport {
            diagnostics: (0..3).map(format_error).collect(),
            ..Default::default()
        };
        assert!((report.score() - 0.7).abs() < 1e-9);
        assert!(!report.is_accepted());

        let many = ValidationReport {
            diagnostics: (0..14).map(format_error).collect(),
            ..Default::default()
        };
        assert_eq!(many.score(), 0.0);
    }

    #[test]
    fn unvalidated_report_says_so() {
        let report = ValidationReport {
            unvalidated: true,
            ..Default::default()
        };
        assert_eq!(report.render(), UNVALIDATED);
    }
}
