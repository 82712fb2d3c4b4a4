use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal staff vs. external contractors. The board groups rows by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeKind {
    #[default]
    Internal,
    External,
}

impl fmt::Display for EmployeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmployeeKind::Internal => write!(f, "internal"),
            EmployeeKind::External => write!(f, "external"),
        }
    }
}

impl std::str::FromStr for EmployeeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "internal" => Ok(EmployeeKind::Internal),
            "external" => Ok(EmployeeKind::External),
            other => Err(format!("unknown employee kind: {}", other)),
        }
    }
}

/// A row on the board: who, what they do, and which group they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub position: String,
    #[serde(rename = "type")]
    pub kind: EmployeeKind,
}

impl Employee {
    pub fn new(name: impl Into<String>, position: impl Into<String>, kind: EmployeeKind) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            kind,
        }
    }

    /// Stable document id for the roster collection: lower-cased name with
    /// whitespace runs collapsed to `_` ("Honza Dočkal" -> "honza_dočkal").
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Case-normalised employee key used in schedule document ids.
pub fn employee_key(name: &str) -> String {
    name.to_lowercase()
}
