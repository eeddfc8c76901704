//! Task hierarchy manager.
//!
//! Keeps each project's task tree consistent and duplicate-free: sibling
//! titles are unique per `(project_id, parent_id)`, levels always equal
//! `parent.level + 1` (0 at the root), and a task can never become its own
//! ancestor.

mod reconcile;

pub use reconcile::ReconcileReport;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::entities::{ProjectId, Task, TaskId};
use crate::errors::{PlanError, PlanResult};
use crate::store::PlanStore;

/// Bounded suffix probes before the timestamp fallback kicks in.
const MAX_SUFFIX_ATTEMPTS: u32 = 100;

/// Input for task creation.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub parent_id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub objective: Option<String>,
    pub hours: Option<f64>,
}

impl NewTask {
    pub fn new(
        project_id: ProjectId,
        parent_id: Option<TaskId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            parent_id,
            title: title.into(),
            description: String::new(),
            objective: None,
            hours: None,
        }
    }
}

/// High-level facade over the store for tree operations.
#[derive(Clone)]
pub struct HierarchyManager {
    store: Arc<PlanStore>,
}

impl HierarchyManager {
    pub fn new(store: Arc<PlanStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<PlanStore> {
        &self.store
    }

    /// Whether a title is free among the given siblings.
    pub fn is_title_unique(
        &self,
        project_id: ProjectId,
        parent_id: Option<TaskId>,
        title: &str,
    ) -> bool {
        self.store.lookup_title(project_id, parent_id, title).is_none()
    }

    /// Return `base` if free among siblings, else the smallest free
    /// `base (n)` for n ≥ 2. Past [`MAX_SUFFIX_ATTEMPTS`] probes, a
    /// timestamp suffix guarantees termination.
    ///
    /// Read-only: callers use the returned title when creating a node.
    /// `create_task` re-runs the same sequence under the store's constraint,
    /// so a concurrent insert between preview and create cannot produce a
    /// duplicate.
    pub fn ensure_unique_title(
        &self,
        project_id: ProjectId,
        parent_id: Option<TaskId>,
        base: &str,
    ) -> String {
        if self.is_title_unique(project_id, parent_id, base) {
            return base.to_string();
        }
        for n in 2..=(MAX_SUFFIX_ATTEMPTS + 1) {
            let candidate = format!("{base} ({n})");
            if self.is_title_unique(project_id, parent_id, &candidate) {
                return candidate;
            }
        }
        format!("{base} ({})", Utc::now().timestamp_millis())
    }

    /// Create a task, retrying with the suffix sequence on title conflicts.
    ///
    /// Placement (level from the parent, order as the next sibling slot) is
    /// assigned by the store inside the insert's write lock, so neither a
    /// concurrent insert nor a reparent of the parent can leave a stale
    /// level behind. The store's index is the arbiter: unlike a
    /// read-then-write check, a conflicting concurrent insert just moves us
    /// to the next suffix.
    pub fn create_task(&self, new_task: NewTask) -> PlanResult<Task> {
        let mut task = Task::new(new_task.project_id, new_task.title.clone(), new_task.description);
        task.parent_id = new_task.parent_id;
        task.objective = new_task.objective.unwrap_or_default();
        task.hours = new_task.hours;

        let base = new_task.title;
        let mut attempt = 0u32;
        loop {
            match self.store.insert_task_placed(task.clone()) {
                Ok(inserted) => return Ok(inserted),
                Err(PlanError::Conflict { .. }) if attempt < MAX_SUFFIX_ATTEMPTS => {
                    attempt += 1;
                    task.title = format!("{base} ({})", attempt + 1);
                }
                Err(PlanError::Conflict { .. }) => {
                    task.title = format!("{base} ({})", Utc::now().timestamp_millis());
                    return self.store.insert_task_placed(task);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reparent a task, recomputing levels for its whole subtree.
    ///
    /// Rejects moves under the task itself or any of its descendants; a
    /// sibling title collision at the destination surfaces as `Conflict`
    /// rather than being auto-suffixed.
    pub fn relocate(&self, task_id: TaskId, new_parent_id: Option<TaskId>) -> PlanResult<Task> {
        let task = self.store.get_task(task_id)?;

        let new_level = match new_parent_id {
            Some(pid) => {
                if pid == task_id || self.subtree_ids(task_id).contains(&pid) {
                    return Err(PlanError::CycleDetected {
                        task_id,
                        ancestor_id: pid,
                    });
                }
                let parent = self.store.get_task(pid)?;
                parent.level + 1
            }
            None => 0,
        };

        let moved = self.store.reparent_task(task_id, new_parent_id, new_level)?;

        tracing::info!(
            task_id = %task_id,
            title = %task.title,
            new_parent = ?new_parent_id,
            level = new_level,
            "Relocated task"
        );

        self.shift_subtree_levels(task_id, new_level)?;
        Ok(moved)
    }

    /// All ids in the subtree rooted at `task_id`, the root included.
    pub fn subtree_ids(&self, task_id: TaskId) -> Vec<TaskId> {
        let mut ids = vec![task_id];
        let mut frontier = vec![task_id];
        while let Some(id) = frontier.pop() {
            for child in self.store.children_of(id) {
                ids.push(child.id);
                frontier.push(child.id);
            }
        }
        ids
    }

    /// Recompute `level = parent.level + 1` for every descendant.
    fn shift_subtree_levels(&self, task_id: TaskId, level: u32) -> PlanResult<()> {
        for child in self.store.children_of(task_id) {
            self.store.update_task(child.id, |t| {
                t.level = level + 1;
                Ok(())
            })?;
            self.shift_subtree_levels(child.id, level + 1)?;
        }
        Ok(())
    }

    /// Data-integrity scan used by the admin `check` command.
    ///
    /// Reports level/parent violations and sibling-title duplicates without
    /// repairing anything.
    pub fn integrity_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let tasks = self.store.all_tasks();

        for task in &tasks {
            match task.parent_id {
                None => {
                    if task.level != 0 {
                        issues.push(format!(
                            "root task '{}' ({}) has level {}",
                            task.title, task.id, task.level
                        ));
                    }
                }
                Some(pid) => match self.store.get_task(pid) {
                    Ok(parent) => {
                        if task.level != parent.level + 1 {
                            issues.push(format!(
                                "task '{}' ({}) has level {}, parent level is {}",
                                task.title, task.id, task.level, parent.level
                            ));
                        }
                        if parent.project_id != task.project_id {
                            issues.push(format!(
                                "task '{}' ({}) crosses projects with its parent",
                                task.title, task.id
                            ));
                        }
                    }
                    Err(_) => issues.push(format!(
                        "task '{}' ({}) references missing parent {}",
                        task.title, task.id, pid
                    )),
                },
            }
        }

        let mut seen: std::collections::HashMap<(Uuid, Option<Uuid>, &str), u32> =
            std::collections::HashMap::new();
        for task in &tasks {
            *seen
                .entry((task.project_id, task.parent_id, task.title.as_str()))
                .or_default() += 1;
        }
        for ((_, parent, title), count) in seen {
            if count > 1 {
                issues.push(format!(
                    "title '{title}' appears {count} times under parent {parent:?}"
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Project, User};

    fn setup() -> (Arc<PlanStore>, HierarchyManager, ProjectId) {
        let store = Arc::new(PlanStore::new());
        let user = User::new("dev@example.com");
        let project = Project::new(user.id, "Test");
        let project_id = project.id;
        store.insert_user(user);
        store.insert_project(project);
        let hierarchy = HierarchyManager::new(store.clone());
        (store, hierarchy, project_id)
    }

    #[test]
    fn test_ensure_unique_title_free() {
        let (_, hierarchy, project_id) = setup();
        assert_eq!(
            hierarchy.ensure_unique_title(project_id, None, "Setup"),
            "Setup"
        );
    }

    #[test]
    fn test_ensure_unique_title_smallest_free_suffix() {
        let (_, hierarchy, project_id) = setup();
        for title in ["Setup", "Setup (2)", "Setup (3)"] {
            hierarchy
                .create_task(NewTask::new(project_id, None, title))
                .unwrap();
        }
        assert_eq!(
            hierarchy.ensure_unique_title(project_id, None, "Setup"),
            "Setup (4)"
        );
    }

    #[test]
    fn test_ensure_unique_title_skips_gaps() {
        let (_, hierarchy, project_id) = setup();
        for title in ["Setup", "Setup (3)"] {
            hierarchy
                .create_task(NewTask::new(project_id, None, title))
                .unwrap();
        }
        // (2) is free, so it wins over the occupied (3)
        assert_eq!(
            hierarchy.ensure_unique_title(project_id, None, "Setup"),
            "Setup (2)"
        );
    }

    #[test]
    fn test_create_task_suffixes_on_conflict() {
        let (_, hierarchy, project_id) = setup();
        let first = hierarchy
            .create_task(NewTask::new(project_id, None, "Setup"))
            .unwrap();
        let second = hierarchy
            .create_task(NewTask::new(project_id, None, "Setup"))
            .unwrap();
        assert_eq!(first.title, "Setup");
        assert_eq!(second.title, "Setup (2)");
    }

    #[test]
    fn test_forced_collision_chain_terminates() {
        let (_, hierarchy, project_id) = setup();
        // "Setup", "Setup (2)" ... "Setup (101)" exhaust the suffix budget
        for _ in 0..102 {
            hierarchy
                .create_task(NewTask::new(project_id, None, "Setup"))
                .unwrap();
        }
        let overflow = hierarchy
            .store()
            .all_tasks()
            .into_iter()
            .filter_map(|t| {
                t.title
                    .strip_prefix("Setup (")
                    .and_then(|s| s.strip_suffix(')'))
                    .and_then(|s| s.parse::<i64>().ok())
            })
            .max()
            .unwrap();
        // The 102nd creation fell back to a millisecond timestamp
        assert!(overflow > i64::from(MAX_SUFFIX_ATTEMPTS) + 1);
    }

    #[test]
    fn test_create_task_levels_and_order() {
        let (_, hierarchy, project_id) = setup();
        let phase = hierarchy
            .create_task(NewTask::new(project_id, None, "Backend"))
            .unwrap();
        let a = hierarchy
            .create_task(NewTask::new(project_id, Some(phase.id), "API"))
            .unwrap();
        let b = hierarchy
            .create_task(NewTask::new(project_id, Some(phase.id), "DB"))
            .unwrap();

        assert_eq!(phase.level, 0);
        assert_eq!(a.level, 1);
        assert_eq!(b.level, 1);
        assert!(a.order < b.order);
    }

    #[test]
    fn test_relocate_recomputes_level() {
        let (store, hierarchy, project_id) = setup();
        let phase = hierarchy
            .create_task(NewTask::new(project_id, None, "Backend"))
            .unwrap();
        let task = hierarchy
            .create_task(NewTask::new(project_id, None, "API"))
            .unwrap();

        let moved = hierarchy.relocate(task.id, Some(phase.id)).unwrap();
        assert_eq!(moved.level, phase.level + 1);
        assert_eq!(moved.parent_id, Some(phase.id));
        assert_eq!(store.get_task(task.id).unwrap().level, 1);
    }

    #[test]
    fn test_relocate_shifts_subtree() {
        let (store, hierarchy, project_id) = setup();
        let phase = hierarchy
            .create_task(NewTask::new(project_id, None, "Backend"))
            .unwrap();
        let mid = hierarchy
            .create_task(NewTask::new(project_id, None, "API"))
            .unwrap();
        let leaf = hierarchy
            .create_task(NewTask::new(project_id, Some(mid.id), "Auth"))
            .unwrap();
        assert_eq!(leaf.level, 1);

        hierarchy.relocate(mid.id, Some(phase.id)).unwrap();
        assert_eq!(store.get_task(leaf.id).unwrap().level, 2);
    }

    #[test]
    fn test_relocate_rejects_self_and_descendant() {
        let (_, hierarchy, project_id) = setup();
        let phase = hierarchy
            .create_task(NewTask::new(project_id, None, "Backend"))
            .unwrap();
        let child = hierarchy
            .create_task(NewTask::new(project_id, Some(phase.id), "API"))
            .unwrap();

        let err = hierarchy.relocate(phase.id, Some(phase.id)).unwrap_err();
        assert!(matches!(err, PlanError::CycleDetected { .. }));

        let err = hierarchy.relocate(phase.id, Some(child.id)).unwrap_err();
        assert!(matches!(err, PlanError::CycleDetected { .. }));
    }

    #[test]
    fn test_relocate_to_root() {
        let (_, hierarchy, project_id) = setup();
        let phase = hierarchy
            .create_task(NewTask::new(project_id, None, "Backend"))
            .unwrap();
        let child = hierarchy
            .create_task(NewTask::new(project_id, Some(phase.id), "API"))
            .unwrap();

        let moved = hierarchy.relocate(child.id, None).unwrap();
        assert_eq!(moved.level, 0);
        assert!(moved.parent_id.is_none());
    }

    #[test]
    fn test_integrity_issues_flags_bad_level() {
        let (store, hierarchy, project_id) = setup();
        let phase = hierarchy
            .create_task(NewTask::new(project_id, None, "Backend"))
            .unwrap();
        store
            .update_task(phase.id, |t| {
                t.level = 3;
                Ok(())
            })
            .unwrap();

        let issues = hierarchy.integrity_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("level 3"));
    }

    #[test]
    fn test_integrity_clean_tree() {
        let (_, hierarchy, project_id) = setup();
        let phase = hierarchy
            .create_task(NewTask::new(project_id, None, "Backend"))
            .unwrap();
        hierarchy
            .create_task(NewTask::new(project_id, Some(phase.id), "API"))
            .unwrap();
        assert!(hierarchy.integrity_issues().is_empty());
    }
}
