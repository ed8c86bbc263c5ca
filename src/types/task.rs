use std::fmt;

/// Identifies an organisation, the tenant boundary for every lookup.
///
/// Tasks and rules belong to exactly one organisation; nothing in the engine
/// resolves across two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrgId(pub u64);

/// Identifies a task within an organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// A task as the rule engine sees it: an identifier, its owning organisation,
/// and a display name. The engine never mutates tasks; it only resolves ids
/// to them within one tenant scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub org: OrgId,
    pub name: String,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, org: OrgId, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            org,
            name: name.into(),
        }
    }
}

impl From<u64> for TaskId {
    fn from(v: u64) -> Self {
        TaskId(v)
    }
}

impl From<u64> for OrgId {
    fn from(v: u64) -> Self {
        OrgId(v)
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
