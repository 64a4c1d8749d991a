//! Per-node cell-type constraints.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Regular expression over mtype names, matched anywhere in the name.
#[derive(Debug, Clone)]
pub struct TypePattern(Regex);

impl TypePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

impl PartialEq for TypePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for TypePattern {}

impl Serialize for TypePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TypePattern::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// What a template node allows as its cell type.
///
/// JSON forms: `"any"`, `{"exact": "L5_TTPC1"}`, `{"pattern": "^L23_"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeConstraint {
    #[default]
    Any,
    Exact(String),
    Pattern(TypePattern),
}

impl TypeConstraint {
    pub fn exact(name: impl Into<String>) -> Self {
        TypeConstraint::Exact(name.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        TypePattern::new(pattern).map(TypeConstraint::Pattern)
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            TypeConstraint::Any => true,
            TypeConstraint::Exact(exact) => exact == name,
            TypeConstraint::Pattern(p) => p.is_match(name),
        }
    }

    /// Status a node with this constraint starts resolution in.
    pub fn initial_status(&self) -> NodeStatus {
        match self {
            TypeConstraint::Any => NodeStatus::Free,
            TypeConstraint::Pattern(_) => NodeStatus::Patterned,
            TypeConstraint::Exact(_) => NodeStatus::Resolved,
        }
    }
}

/// Resolution status of a template node. Only ever moves to `Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Free,
    Patterned,
    Resolved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_json_forms() {
        let any: TypeConstraint = serde_json::from_str(r#""any""#).unwrap();
        assert_eq!(any, TypeConstraint::Any);

        let exact: TypeConstraint = serde_json::from_str(r#"{"exact": "L5_TTPC1"}"#).unwrap();
        assert_eq!(exact, TypeConstraint::exact("L5_TTPC1"));

        let pattern: TypeConstraint = serde_json::from_str(r#"{"pattern": "^L23_"}"#).unwrap();
        assert!(pattern.matches("L23_PC"));
        assert!(!pattern.matches("L4_L23_X"));

        assert_eq!(serde_json::to_string(&pattern).unwrap(), r#"{"pattern":"^L23_"}"#);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let res: Result<TypeConstraint, _> = serde_json::from_str(r#"{"pattern": "L5_("}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_pattern_search_semantics() {
        let c = TypeConstraint::pattern("PC").unwrap();
        assert!(c.matches("L23_PC"));
        assert!(c.matches("L6_TPC_L4"));
        assert!(!c.matches("L1_DAC"));
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(TypeConstraint::Any.initial_status(), NodeStatus::Free);
        assert_eq!(TypeConstraint::exact("A").initial_status(), NodeStatus::Resolved);
        assert_eq!(
            TypeConstraint::pattern("A").unwrap().initial_status(),
            NodeStatus::Patterned,
        );
    }
}
