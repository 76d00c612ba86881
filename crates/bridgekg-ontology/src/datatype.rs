//! Literal datatypes that may appear as range alternatives.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const RDF_LANG_STRING_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const RDFS_LITERAL_IRI: &str = "http://www.w3.org/2000/01/rdf-schema#Literal";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Datatype {
    String,
    LangString,
    /// `rdfs:Literal`: any literal at all.
    AnyLiteral,
    Integer,
    Decimal,
    Double,
    Boolean,
    Date,
    DateTime,
    /// Another XSD datatype; lexical shape is not checked.
    Other(String),
}

impl Datatype {
    /// Classify a full IRI. Returns `None` for IRIs that name classes.
    pub fn from_iri(iri: &str) -> Option<Self> {
        if iri == RDF_LANG_STRING_IRI {
            return Some(Self::LangString);
        }
        if iri == RDFS_LITERAL_IRI {
            return Some(Self::AnyLiteral);
        }
        let local = iri.strip_prefix(XSD_NS)?;
        Some(Self::from_xsd_local(local))
    }

    /// Parse the short forms used inside batch literals:
    /// `xsd:decimal`, `decimal`, `rdf:langString`, `rdfs:Literal`.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim().trim_start_matches('<').trim_end_matches('>');
        if let Some(dt) = Self::from_iri(token) {
            return dt;
        }
        match token {
            "rdf:langString" | "langString" => Self::LangString,
            "rdfs:Literal" | "Literal" => Self::AnyLiteral,
            other => Self::from_xsd_local(other.strip_prefix("xsd:").unwrap_or(other)),
        }
    }

    fn from_xsd_local(local: &str) -> Self {
        match local {
            "string" | "normalizedString" | "token" => Self::String,
            "integer" | "int" | "long" | "short" | "nonNegativeInteger" | "positiveInteger" => {
                Self::Integer
            }
            "decimal" => Self::Decimal,
            "double" | "float" => Self::Double,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether `lexical` is a well-formed value of this datatype.
    pub fn accepts_lexical(&self, lexical: &str) -> bool {
        let s = lexical.trim();
        match self {
            Self::String | Self::LangString | Self::AnyLiteral | Self::Other(_) => true,
            Self::Integer => s.parse::<i128>().is_ok(),
            Self::Decimal => decimal_re().is_match(s),
            Self::Double => s.parse::<f64>().is_ok(),
            Self::Boolean => matches!(s, "true" | "false" | "1" | "0"),
            Self::Date => date_re().is_match(s),
            Self::DateTime => datetime_re().is_match(s),
        }
    }

    /// Whether a literal of datatype `other` may stand where `self` is expected.
    pub fn admits(&self, other: &Datatype) -> bool {
        match self {
            Self::AnyLiteral => true,
            Self::Decimal => matches!(other, Self::Decimal | Self::Integer),
            _ => self == other,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "xsd:string"),
            Self::LangString => write!(f, "rdf:langString"),
            Self::AnyLiteral => write!(f, "rdfs:Literal"),
            Self::Integer => write!(f, "xsd:integer"),
            Self::Decimal => write!(f, "xsd:decimal"),
            Self::Double => write!(f, "xsd:double"),
            Self::Boolean => write!(f, "xsd:boolean"),
            Self::Date => write!(f, "xsd:date"),
            Self::DateTime => write!(f, "xsd:dateTime"),
            Self::Other(local) => write!(f, "xsd:{local}"),
        }
    }
}

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("static regex"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{4}-\d{2}-\d{2}(Z|[+-]\d{2}:\d{2})?$").expect("static regex"))
}

fn datetime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^-?\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
            .expect("static regex")
    })
}
