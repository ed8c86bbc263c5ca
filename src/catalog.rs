use std::collections::HashMap;

use crate::types::{OrgId, Task, TaskId};

/// Tenant-scoped task directory.
///
/// Stands where a task store would sit in a full backend: the engine
/// resolves the ids referenced by a rule against this, always within a
/// single organisation. Tasks are read-only from the engine's perspective.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: HashMap<OrgId, HashMap<TaskId, Task>>,
}

impl TaskCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under its owning organisation. Re-inserting the same
    /// id replaces the previous entry.
    pub fn insert(&mut self, task: Task) {
        self.tasks.entry(task.org).or_default().insert(task.id, task);
    }

    /// Look up one task within an organisation.
    #[must_use]
    pub fn get(&self, org: OrgId, id: TaskId) -> Option<&Task> {
        self.tasks.get(&org)?.get(&id)
    }

    /// Resolve `ids` within `org`. Returns the map of resolved tasks along
    /// with the ids that did not resolve, in first-seen order without
    /// duplicates. Nothing outside `org` is ever consulted.
    #[must_use]
    pub fn resolve(&self, org: OrgId, ids: &[TaskId]) -> (HashMap<TaskId, Task>, Vec<TaskId>) {
        let mut resolved = HashMap::new();
        let mut missing = Vec::new();
        for &id in ids {
            match self.get(org, id) {
                Some(task) => {
                    resolved.insert(id, task.clone());
                }
                None => {
                    if !missing.contains(&id) {
                        missing.push(id);
                    }
                }
            }
        }
        (resolved, missing)
    }
}
