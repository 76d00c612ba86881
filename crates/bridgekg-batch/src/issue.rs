//! Tagged, non-fatal findings about a batch.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Subject,
    Object,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Subject => f.write_str("subject"),
            Position::Object => f.write_str("object"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    UndeclaredRelation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    FormatError,
    LinkError,
    Warning,
    DomainError,
    RangeError,
    RoleConflict,
    UntypedWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Issue {
    /// Item does not follow the triple/attribute grammar; it was skipped.
    FormatError { item: String, message: String },
    /// Attribute could not be attached to a defect; it was skipped.
    LinkError {
        item: String,
        entity: String,
        message: String,
    },
    Warning {
        warning: WarningKind,
        relation: String,
        triple: String,
    },
    DomainError {
        triple: String,
        relation: String,
        subject: String,
        subject_type: String,
        expected: Vec<String>,
    },
    RangeError {
        triple: String,
        relation: String,
        object: String,
        object_type: String,
        expected: Vec<String>,
    },
    RoleConflict {
        entity: String,
        entity_type: String,
        position: Position,
        relations: Vec<String>,
        allowed: Vec<String>,
    },
    UntypedWarning {
        entity: String,
        declared_type: String,
        position: Position,
    },
}

impl Issue {
    pub fn kind(&self) -> IssueKind {
        match self {
            Issue::FormatError { .. } => IssueKind::FormatError,
            Issue::LinkError { .. } => IssueKind::LinkError,
            Issue::Warning { .. } => IssueKind::Warning,
            Issue::DomainError { .. } => IssueKind::DomainError,
            Issue::RangeError { .. } => IssueKind::RangeError,
            Issue::RoleConflict { .. } => IssueKind::RoleConflict,
            Issue::UntypedWarning { .. } => IssueKind::UntypedWarning,
        }
    }

    /// Issues that cost score and feed the correction loop; warnings are
    /// informational.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Issue::Warning { .. } | Issue::UntypedWarning { .. })
    }
}

fn braced(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        format!("{{{}}}", items.join(", "))
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::FormatError { item, message } => {
                write!(f, "Format Error: `{item}`: {message}. Skipped.")
            }
            Issue::LinkError {
                item,
                entity,
                message,
            } => write!(
                f,
                "Linking Error: attribute `{item}` cannot be linked to `{entity}`: {message}. Skipped."
            ),
            Issue::Warning {
                warning: WarningKind::UndeclaredRelation,
                relation,
                triple,
            } => write!(
                f,
                "Warning: the relationship `{relation}` is not declared as a property in the ontology (found in {triple})."
            ),
            Issue::DomainError {
                triple,
                relation,
                subject,
                subject_type,
                expected,
            } => write!(
                f,
                "Domain Error: `{subject}` (type {subject_type}) as subject of `{relation}` violates its domain {} (in {triple}).",
                braced(expected)
            ),
            Issue::RangeError {
                triple,
                relation,
                object,
                object_type,
                expected,
            } => write!(
                f,
                "Range Error: `{object}` (type {object_type}) as object of `{relation}` violates its range {} (in {triple}).",
                braced(expected)
            ),
            Issue::RoleConflict {
                entity,
                entity_type,
                position,
                relations,
                allowed,
            } => write!(
                f,
                "Role Conflict ({position}): `{entity}` (type {entity_type}) should not be the {position} of {}. Allowed {position} roles: {}.",
                braced(relations),
                braced(allowed)
            ),
            Issue::UntypedWarning {
                entity,
                declared_type,
                position,
            } => write!(
                f,
                "Role Warning: `{entity}` is used as a {position} but its type `{declared_type}` is not a declared class."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let issue = Issue::FormatError {
            item: "a>b".to_string(),
            message: "expected three parts".to_string(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "FormatError");
        let back: Issue = serde_json::from_value(json).unwrap();
        assert_eq!(back, issue);
    }

    #[test]
    fn warnings_are_not_blocking() {
        let w = Issue::Warning {
            warning: WarningKind::UndeclaredRelation,
            relation: "r".to_string(),
            triple: "A:a>r>B:b".to_string(),
        };
        assert!(!w.is_blocking());
        assert_eq!(w.kind(), IssueKind::Warning);
        assert!(w.to_string().starts_with("Warning:"));
    }
}
