//! Typed roles for inspection-domain classes and the role conformance table.
//!
//! Class and relation *names* stay schema driven; the [`Vocabulary`] binds
//! them to the closed [`Role`] set the rest of the pipeline reasons about.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Component,
    ComponentId,
    Part,
    DefectLocation,
    Defect,
    AttributeCategory,
    AttributeValue,
    /// Any other declared (or undeclared) class.
    Other,
}

impl Role {
    pub const KNOWN: [Role; 7] = [
        Role::Component,
        Role::ComponentId,
        Role::Part,
        Role::DefectLocation,
        Role::Defect,
        Role::AttributeCategory,
        Role::AttributeValue,
    ];

    /// Attribute-kind roles describe one concrete occurrence each and are
    /// never unified during consolidation.
    pub fn is_attribute_kind(self) -> bool {
        matches!(self, Role::AttributeCategory | Role::AttributeValue)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Component => "Component",
            Role::ComponentId => "ComponentID",
            Role::Part => "Part",
            Role::DefectLocation => "DefectLocation",
            Role::Defect => "Defect",
            Role::AttributeCategory => "AttributeCategory",
            Role::AttributeValue => "AttributeValue",
            Role::Other => "Other",
        };
        f.write_str(s)
    }
}

/// Names of the six domain relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationNames {
    pub has_part: String,
    pub located_at: String,
    pub has_defect: String,
    pub defect_located_at: String,
    pub has_category: String,
    pub has_value: String,
}

impl Default for RelationNames {
    fn default() -> Self {
        Self {
            has_part: "hasPart".to_string(),
            located_at: "locatedAt".to_string(),
            has_defect: "hasDefect".to_string(),
            defect_located_at: "defectLocatedAt".to_string(),
            has_category: "hasCategory".to_string(),
            has_value: "hasValue".to_string(),
        }
    }
}

/// Binding between schema class names and typed roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub classes: HashMap<Role, String>,
    pub relations: RelationNames,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let classes = Role::KNOWN
            .iter()
            .map(|role| (*role, role.to_string()))
            .collect();
        Self {
            classes,
            relations: RelationNames::default(),
        }
    }
}

impl Vocabulary {
    /// Role carried by instances of `class_name`.
    pub fn role_of(&self, class_name: &str) -> Role {
        Role::KNOWN
            .iter()
            .copied()
            .find(|role| self.classes.get(role).map(String::as_str) == Some(class_name))
            .unwrap_or(Role::Other)
    }

    /// Class name bound to `role` (falls back to the role's canonical name).
    pub fn class_name(&self, role: Role) -> String {
        self.classes
            .get(&role)
            .cloned()
            .unwrap_or_else(|| role.to_string())
    }
}

// ============================================================================
// Role conformance
// ============================================================================

/// Relations a role may legally appear as subject of, and as object of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConformanceRule {
    pub as_subject: BTreeSet<String>,
    pub as_object: BTreeSet<String>,
}

/// Static, closed table: a role without a rule may take part in nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConformance {
    rules: HashMap<Role, RoleConformanceRule>,
}

impl RoleConformance {
    pub fn from_rules(rules: HashMap<Role, RoleConformanceRule>) -> Self {
        Self { rules }
    }

    /// Inspection-domain table expressed in `vocab`'s relation names.
    pub fn for_vocabulary(vocab: &Vocabulary) -> Self {
        let r = &vocab.relations;
        let rule = |subj: &[&String], obj: &[&String]| RoleConformanceRule {
            as_subject: subj.iter().map(|s| s.to_string()).collect(),
            as_object: obj.iter().map(|s| s.to_string()).collect(),
        };

        let mut rules = HashMap::new();
        rules.insert(Role::Defect, rule(&[&r.has_category], &[&r.has_defect]));
        rules.insert(
            Role::Component,
            rule(
                &[&r.has_part, &r.located_at, &r.has_defect, &r.defect_located_at],
                &[],
            ),
        );
        rules.insert(
            Role::ComponentId,
            rule(
                &[&r.has_part, &r.has_defect, &r.defect_located_at],
                &[&r.located_at],
            ),
        );
        rules.insert(
            Role::Part,
            rule(&[&r.has_defect, &r.defect_located_at], &[&r.has_part]),
        );
        rules.insert(
            Role::AttributeCategory,
            rule(&[&r.has_value], &[&r.has_category]),
        );
        rules.insert(Role::AttributeValue, rule(&[], &[&r.has_value]));
        rules.insert(
            Role::DefectLocation,
            rule(&[&r.has_defect], &[&r.defect_located_at]),
        );
        Self { rules }
    }

    pub fn rule(&self, role: Role) -> Option<&RoleConformanceRule> {
        self.rules.get(&role)
    }

    pub fn allows_subject(&self, role: Role, relation: &str) -> bool {
        self.rules
            .get(&role)
            .is_some_and(|r| r.as_subject.contains(relation))
    }

    pub fn allows_object(&self, role: Role, relation: &str) -> bool {
        self.rules
            .get(&role)
            .is_some_and(|r| r.as_object.contains(relation))
    }
}
