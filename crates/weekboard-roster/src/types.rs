use serde::{Deserialize, Serialize};
use weekboard_core::{Employee, EmployeeKind};

/// A stored roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEmployee {
    pub id: String,
    pub name: String,
    pub position: String,
    #[serde(rename = "type")]
    pub kind: EmployeeKind,
    pub order: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl RosterEmployee {
    pub fn employee(&self) -> Employee {
        Employee::new(self.name.clone(), self.position.clone(), self.kind)
    }
}

/// Published after every roster write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    Saved(String),
    Deleted(String),
    Reordered,
}
