//! Typed, identity-keyed graph for one extraction batch.

use bridgekg_ontology::{Datatype, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Index of an instance inside its [`BatchGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct InstanceId(u32);

impl InstanceId {
    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// Stable identity assigned at creation; survives into the store.
    pub uid: Uuid,
    /// Declared class. Fixed for the lifetime of the instance.
    pub class: String,
    pub role: Role,
    pub label: String,
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<Datatype>,
    pub language: Option<String>,
}

impl Literal {
    pub fn plain(lexical: &str) -> Self {
        Self {
            lexical: lexical.to_string(),
            datatype: None,
            language: None,
        }
    }

    /// Datatype name used in reports.
    pub fn type_name(&self) -> String {
        match (&self.datatype, &self.language) {
            (Some(dt), _) => dt.to_string(),
            (None, Some(_)) => Datatype::LangString.to_string(),
            (None, None) => "plain literal".to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical)?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")?;
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^{dt}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Object {
    Instance(InstanceId),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: InstanceId,
    pub relation: String,
    pub object: Object,
}

/// Instances and triples produced from one text line.
///
/// Instances are keyed by `(class, name)` within this batch only; equal keys
/// in different batches are different instances until consolidation.
#[derive(Debug, Clone, Default)]
pub struct BatchGraph {
    instances: Vec<Instance>,
    triples: Vec<Triple>,
    by_key: HashMap<(String, String), InstanceId>,
    by_name: HashMap<String, Vec<InstanceId>>,
}

impl BatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id.index())
    }

    pub fn lookup(&self, class: &str, name: &str) -> Option<InstanceId> {
        self.by_key
            .get(&(class.to_string(), name.to_string()))
            .copied()
    }

    /// Every identity carrying `name`, in creation order.
    pub fn named(&self, name: &str) -> &[InstanceId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.triples.is_empty()
    }

    /// Render a triple as `Class:Name>relation>Class:Name`.
    pub fn render_triple(&self, triple: &Triple) -> String {
        let subject = self.instance(triple.subject);
        match &triple.object {
            Object::Instance(id) => {
                format!("{subject}>{}>{}", triple.relation, self.instance(*id))
            }
            Object::Literal(lit) => format!("{subject}>{}>{lit}", triple.relation),
        }
    }

    /// Existing identity for `(class, name)` or a new one. The bool is
    /// `true` when the instance was created by this call.
    pub(crate) fn get_or_create(&mut self, class: &str, name: &str, role: Role) -> (InstanceId, bool) {
        if let Some(id) = self.lookup(class, name) {
            return (id, false);
        }
        let id = self.create_fresh(class, name, role);
        self.by_key.insert((class.to_string(), name.to_string()), id);
        (id, true)
    }

    /// Always a new identity; not reachable through `lookup`.
    pub(crate) fn create_fresh(&mut self, class: &str, name: &str, role: Role) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(Instance {
            id,
            uid: Uuid::new_v4(),
            class: class.to_string(),
            role,
            label: name.to_string(),
        });
        self.by_name.entry(name.to_string()).or_default().push(id);
        id
    }

    pub(crate) fn push_triple(&mut self, subject: InstanceId, relation: &str, object: Object) {
        self.triples.push(Triple {
            subject,
            relation: relation.to_string(),
            object,
        });
    }
}
