//! Arena-style in-memory store.
//!
//! The store is the only shared mutable resource. Tasks live in an id → node
//! arena with explicit child lists instead of a self-referential foreign key,
//! and a title index acts as the hard uniqueness constraint on
//! `(project_id, parent_id, title)`: `insert_task` refuses a duplicate with
//! `Conflict`, and only the snapshot import path may bypass it.

pub mod snapshot;

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Datelike, Utc};

use crate::entities::{
    Estimation, EstimationId, EstimationStatus, Project, ProjectId, SubTask, Subscription, Task,
    TaskDocument, TaskId, User, UserId,
};
use crate::errors::{PlanError, PlanResult};

/// Key of the sibling-title uniqueness index.
type TitleKey = (ProjectId, Option<TaskId>, String);

#[derive(Default)]
struct Arena {
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
    /// Child id lists, ordered by insertion; reads sort by `order`.
    children: HashMap<TaskId, Vec<TaskId>>,
    /// Root task ids (phases) per project.
    roots: HashMap<ProjectId, Vec<TaskId>>,
    /// Hard uniqueness constraint on sibling titles.
    title_index: HashMap<TitleKey, TaskId>,
    subtasks: HashMap<TaskId, Vec<SubTask>>,
    documents: HashMap<TaskId, Vec<TaskDocument>>,
    estimations: HashMap<EstimationId, Estimation>,
    users: HashMap<UserId, User>,
    subscriptions: HashMap<UserId, Subscription>,
}

impl Arena {
    fn title_key(&self, task: &Task) -> TitleKey {
        (task.project_id, task.parent_id, task.title.clone())
    }

    /// Human-readable scope for conflict errors.
    fn scope_label(&self, project_id: ProjectId, parent_id: Option<TaskId>) -> String {
        match parent_id {
            Some(pid) => match self.tasks.get(&pid) {
                Some(parent) => format!("task '{}'", parent.title),
                None => format!("task '{pid}'"),
            },
            None => format!("project '{project_id}' root"),
        }
    }

    fn attach(&mut self, task: &Task) {
        match task.parent_id {
            Some(pid) => self.children.entry(pid).or_default().push(task.id),
            None => self.roots.entry(task.project_id).or_default().push(task.id),
        }
    }

    fn detach(&mut self, task: &Task) {
        let list = match task.parent_id {
            Some(pid) => self.children.get_mut(&pid),
            None => self.roots.get_mut(&task.project_id),
        };
        if let Some(list) = list {
            list.retain(|id| *id != task.id);
        }
    }

    fn validate_links(&self, task: &Task) -> PlanResult<()> {
        if !self.projects.contains_key(&task.project_id) {
            return Err(PlanError::ProjectNotFound {
                project_id: task.project_id,
            });
        }
        if let Some(pid) = task.parent_id {
            let parent = self
                .tasks
                .get(&pid)
                .ok_or(PlanError::TaskNotFound { task_id: pid })?;
            if parent.project_id != task.project_id {
                return Err(PlanError::Validation {
                    reason: format!(
                        "parent task '{pid}' belongs to a different project"
                    ),
                });
            }
        }
        Ok(())
    }

    fn next_sibling_order(&self, project_id: ProjectId, parent_id: Option<TaskId>) -> u32 {
        let ids = match parent_id {
            Some(pid) => self.children.get(&pid),
            None => self.roots.get(&project_id),
        };
        ids.map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .map(|t| t.order + 1)
            .max()
            .unwrap_or(0)
    }

    fn ordered(&self, ids: &[TaskId]) -> Vec<Task> {
        let mut tasks: Vec<Task> = ids
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.order, t.created_at));
        tasks
    }
}

/// Shared store; interior locking, clone-out reads.
#[derive(Default)]
pub struct PlanStore {
    inner: RwLock<Arena>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Projects & users
    // -------------------------------------------------------------------------

    pub fn insert_project(&self, project: Project) {
        let mut arena = self.inner.write().unwrap();
        arena.roots.entry(project.id).or_default();
        arena.projects.insert(project.id, project);
    }

    pub fn get_project(&self, project_id: ProjectId) -> PlanResult<Project> {
        let arena = self.inner.read().unwrap();
        arena
            .projects
            .get(&project_id)
            .cloned()
            .ok_or(PlanError::ProjectNotFound { project_id })
    }

    pub fn update_project<F>(&self, project_id: ProjectId, f: F) -> PlanResult<Project>
    where
        F: FnOnce(&mut Project),
    {
        let mut arena = self.inner.write().unwrap();
        let project = arena
            .projects
            .get_mut(&project_id)
            .ok_or(PlanError::ProjectNotFound { project_id })?;
        f(project);
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    pub fn insert_user(&self, user: User) {
        let mut arena = self.inner.write().unwrap();
        arena.users.insert(user.id, user);
    }

    pub fn get_user(&self, user_id: UserId) -> PlanResult<User> {
        let arena = self.inner.read().unwrap();
        arena
            .users
            .get(&user_id)
            .cloned()
            .ok_or(PlanError::UserNotFound { user_id })
    }

    pub fn upsert_subscription(&self, subscription: Subscription) {
        let mut arena = self.inner.write().unwrap();
        arena
            .subscriptions
            .insert(subscription.user_id, subscription);
    }

    pub fn subscription_of(&self, user_id: UserId) -> Option<Subscription> {
        let arena = self.inner.read().unwrap();
        arena.subscriptions.get(&user_id).cloned()
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    /// Insert a task under the uniqueness constraint.
    ///
    /// Fails with `Conflict` when a sibling already carries the same title.
    pub fn insert_task(&self, task: Task) -> PlanResult<()> {
        let mut arena = self.inner.write().unwrap();
        arena.validate_links(&task)?;

        let key = arena.title_key(&task);
        if arena.title_index.contains_key(&key) {
            return Err(PlanError::Conflict {
                title: task.title.clone(),
                scope: arena.scope_label(task.project_id, task.parent_id),
            });
        }

        arena.title_index.insert(key, task.id);
        arena.attach(&task);
        arena.tasks.insert(task.id, task);
        Ok(())
    }

    /// Insert a task with level and order assigned by the store.
    ///
    /// Level comes from the parent chain and order is the next sibling
    /// slot, both read under the same write lock as the insert, so a
    /// concurrent reparent of the parent cannot leave a stale level
    /// behind. Whatever the caller set on the task is overwritten.
    pub fn insert_task_placed(&self, mut task: Task) -> PlanResult<Task> {
        let mut arena = self.inner.write().unwrap();
        arena.validate_links(&task)?;

        task.level = match task.parent_id {
            Some(pid) => {
                arena
                    .tasks
                    .get(&pid)
                    .ok_or(PlanError::TaskNotFound { task_id: pid })?
                    .level
                    + 1
            }
            None => 0,
        };
        task.order = arena.next_sibling_order(task.project_id, task.parent_id);

        let key = arena.title_key(&task);
        if arena.title_index.contains_key(&key) {
            return Err(PlanError::Conflict {
                title: task.title.clone(),
                scope: arena.scope_label(task.project_id, task.parent_id),
            });
        }

        arena.title_index.insert(key, task.id);
        arena.attach(&task);
        arena.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    /// Insert bypassing the title index (import/repair path).
    ///
    /// The index keeps pointing at the first occupant of a colliding key, so
    /// duplicates admitted here are exactly what `reconcile_duplicates`
    /// repairs later.
    pub fn insert_task_unchecked(&self, task: Task) -> PlanResult<()> {
        let mut arena = self.inner.write().unwrap();
        arena.validate_links(&task)?;

        let key = arena.title_key(&task);
        arena.title_index.entry(key).or_insert(task.id);
        arena.attach(&task);
        arena.tasks.insert(task.id, task);
        Ok(())
    }

    pub fn get_task(&self, task_id: TaskId) -> PlanResult<Task> {
        let arena = self.inner.read().unwrap();
        arena
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(PlanError::TaskNotFound { task_id })
    }

    /// Mutate a task in place. The closure must not change title or parent;
    /// use `rename_task` / `reparent_task` for those so the index stays
    /// consistent.
    pub fn update_task<F>(&self, task_id: TaskId, f: F) -> PlanResult<Task>
    where
        F: FnOnce(&mut Task) -> PlanResult<()>,
    {
        let mut arena = self.inner.write().unwrap();
        let task = arena
            .tasks
            .get_mut(&task_id)
            .ok_or(PlanError::TaskNotFound { task_id })?;
        f(task)?;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Rename a task, re-keying the title index.
    pub fn rename_task(&self, task_id: TaskId, new_title: impl Into<String>) -> PlanResult<Task> {
        let new_title = new_title.into();
        let mut arena = self.inner.write().unwrap();

        let task = arena
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(PlanError::TaskNotFound { task_id })?;

        let new_key = (task.project_id, task.parent_id, new_title.clone());
        if let Some(occupant) = arena.title_index.get(&new_key) {
            if *occupant != task_id {
                return Err(PlanError::Conflict {
                    title: new_title,
                    scope: arena.scope_label(task.project_id, task.parent_id),
                });
            }
        }

        // A duplicate admitted via the unchecked path may not own its old
        // index entry; only remove the entry if it points at this task.
        let old_key = arena.title_key(&task);
        if arena.title_index.get(&old_key) == Some(&task_id) {
            arena.title_index.remove(&old_key);
        }
        arena.title_index.insert(new_key, task_id);

        let task = arena
            .tasks
            .get_mut(&task_id)
            .ok_or(PlanError::TaskNotFound { task_id })?;
        task.title = new_title;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Move a task under a new parent (or to the project root).
    ///
    /// Cycle prevention and subtree level recomputation are the hierarchy
    /// manager's responsibility; this primitive only keeps the arena's links
    /// and the title index consistent, failing with `Conflict` when the
    /// destination already has a sibling with the same title.
    pub fn reparent_task(
        &self,
        task_id: TaskId,
        new_parent_id: Option<TaskId>,
        new_level: u32,
    ) -> PlanResult<Task> {
        let mut arena = self.inner.write().unwrap();

        let task = arena
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(PlanError::TaskNotFound { task_id })?;

        if let Some(pid) = new_parent_id {
            let parent = arena
                .tasks
                .get(&pid)
                .ok_or(PlanError::TaskNotFound { task_id: pid })?;
            if parent.project_id != task.project_id {
                return Err(PlanError::Validation {
                    reason: format!(
                        "parent task '{pid}' belongs to a different project"
                    ),
                });
            }
        }

        let new_key = (task.project_id, new_parent_id, task.title.clone());
        if let Some(occupant) = arena.title_index.get(&new_key) {
            if *occupant != task_id {
                return Err(PlanError::Conflict {
                    title: task.title.clone(),
                    scope: arena.scope_label(task.project_id, new_parent_id),
                });
            }
        }

        let old_key = arena.title_key(&task);
        if arena.title_index.get(&old_key) == Some(&task_id) {
            arena.title_index.remove(&old_key);
        }
        arena.title_index.insert(new_key, task_id);

        arena.detach(&task);
        let order = arena.next_sibling_order(task.project_id, new_parent_id);

        let task = arena
            .tasks
            .get_mut(&task_id)
            .ok_or(PlanError::TaskNotFound { task_id })?;
        task.parent_id = new_parent_id;
        task.level = new_level;
        task.order = order;
        task.updated_at = Utc::now();
        let updated = task.clone();

        arena.attach(&updated);
        Ok(updated)
    }

    /// Direct children of a task, in sibling order.
    pub fn children_of(&self, task_id: TaskId) -> Vec<Task> {
        let arena = self.inner.read().unwrap();
        let ids = arena.children.get(&task_id).cloned().unwrap_or_default();
        arena.ordered(&ids)
    }

    /// Root tasks (phases) of a project, in sibling order.
    pub fn roots_of(&self, project_id: ProjectId) -> Vec<Task> {
        let arena = self.inner.read().unwrap();
        let ids = arena.roots.get(&project_id).cloned().unwrap_or_default();
        arena.ordered(&ids)
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        let arena = self.inner.read().unwrap();
        arena.tasks.values().cloned().collect()
    }

    pub fn task_count(&self) -> usize {
        let arena = self.inner.read().unwrap();
        arena.tasks.len()
    }

    /// Id holding a sibling title, if any.
    pub fn lookup_title(
        &self,
        project_id: ProjectId,
        parent_id: Option<TaskId>,
        title: &str,
    ) -> Option<TaskId> {
        let arena = self.inner.read().unwrap();
        arena
            .title_index
            .get(&(project_id, parent_id, title.to_string()))
            .copied()
    }

    // -------------------------------------------------------------------------
    // Subtasks & documents
    // -------------------------------------------------------------------------

    pub fn add_subtask(&self, subtask: SubTask) -> PlanResult<SubTask> {
        let mut arena = self.inner.write().unwrap();
        if !arena.tasks.contains_key(&subtask.task_id) {
            return Err(PlanError::TaskNotFound {
                task_id: subtask.task_id,
            });
        }
        arena
            .subtasks
            .entry(subtask.task_id)
            .or_default()
            .push(subtask.clone());
        Ok(subtask)
    }

    pub fn subtasks_of(&self, task_id: TaskId) -> Vec<SubTask> {
        let arena = self.inner.read().unwrap();
        let mut subtasks = arena.subtasks.get(&task_id).cloned().unwrap_or_default();
        subtasks.sort_by_key(|s| s.order);
        subtasks
    }

    /// Insert or replace a document by `(task_id, title)`.
    ///
    /// A matching title keeps the original id and creation time and replaces
    /// content, kind and url.
    pub fn upsert_document(&self, doc: TaskDocument) -> PlanResult<TaskDocument> {
        let mut arena = self.inner.write().unwrap();
        if !arena.tasks.contains_key(&doc.task_id) {
            return Err(PlanError::TaskNotFound {
                task_id: doc.task_id,
            });
        }

        let docs = arena.documents.entry(doc.task_id).or_default();
        if let Some(existing) = docs.iter_mut().find(|d| d.title == doc.title) {
            existing.content = doc.content;
            existing.kind = doc.kind;
            existing.url = doc.url;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    pub fn documents_of(&self, task_id: TaskId) -> Vec<TaskDocument> {
        let arena = self.inner.read().unwrap();
        arena.documents.get(&task_id).cloned().unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Estimations
    // -------------------------------------------------------------------------

    pub fn insert_estimation(&self, estimation: Estimation) -> PlanResult<Estimation> {
        let mut arena = self.inner.write().unwrap();
        if !arena.projects.contains_key(&estimation.project_id) {
            return Err(PlanError::ProjectNotFound {
                project_id: estimation.project_id,
            });
        }
        arena.estimations.insert(estimation.id, estimation.clone());
        Ok(estimation)
    }

    pub fn get_estimation(&self, estimation_id: EstimationId) -> PlanResult<Estimation> {
        let arena = self.inner.read().unwrap();
        arena
            .estimations
            .get(&estimation_id)
            .cloned()
            .ok_or(PlanError::EstimationNotFound { estimation_id })
    }

    pub fn set_estimation_status(
        &self,
        estimation_id: EstimationId,
        status: EstimationStatus,
    ) -> PlanResult<Estimation> {
        let mut arena = self.inner.write().unwrap();
        let estimation = arena
            .estimations
            .get_mut(&estimation_id)
            .ok_or(PlanError::EstimationNotFound { estimation_id })?;
        estimation.status = status;
        Ok(estimation.clone())
    }

    /// Estimations created in `now`'s calendar month across the user's
    /// projects. Feeds the free-tier quota gate.
    pub fn count_estimations_in_month(&self, user_id: UserId, now: DateTime<Utc>) -> u32 {
        let arena = self.inner.read().unwrap();
        let owned: Vec<ProjectId> = arena
            .projects
            .values()
            .filter(|p| p.owner_id == user_id)
            .map(|p| p.id)
            .collect();

        arena
            .estimations
            .values()
            .filter(|e| owned.contains(&e.project_id))
            .filter(|e| {
                e.created_at.year() == now.year() && e.created_at.month() == now.month()
            })
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DocumentKind, EstimationBreakdown, Plan};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn seed_project(store: &PlanStore) -> (UserId, ProjectId) {
        let user = User::new("dev@example.com");
        let user_id = user.id;
        store.insert_user(user);
        let project = Project::new(user_id, "Test Project");
        let project_id = project.id;
        store.insert_project(project);
        (user_id, project_id)
    }

    #[test]
    fn test_insert_task_conflict() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        store
            .insert_task(Task::new(project_id, "Setup", ""))
            .unwrap();
        let err = store
            .insert_task(Task::new(project_id, "Setup", ""))
            .unwrap_err();
        assert!(matches!(err, PlanError::Conflict { .. }));
    }

    #[test]
    fn test_insert_task_placed_assigns_level_and_order() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        let parent = store
            .insert_task_placed(Task::new(project_id, "Backend", ""))
            .unwrap();
        assert_eq!(parent.level, 0);
        assert_eq!(parent.order, 0);

        // Caller-set placement is overwritten from the parent chain.
        let mut child = Task::new(project_id, "Setup", "");
        child.parent_id = Some(parent.id);
        child.level = 9;
        child.order = 9;
        let child = store.insert_task_placed(child).unwrap();
        assert_eq!(child.level, 1);
        assert_eq!(child.order, 0);

        let mut sibling = Task::new(project_id, "Deploy", "");
        sibling.parent_id = Some(parent.id);
        let sibling = store.insert_task_placed(sibling).unwrap();
        assert_eq!(sibling.order, 1);

        let stored = store.get_task(child.id).unwrap();
        assert_eq!(stored.level, 1);
    }

    #[test]
    fn test_insert_task_placed_reflects_moved_parent() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        let root = store
            .insert_task_placed(Task::new(project_id, "Backend", ""))
            .unwrap();
        let mut parent = Task::new(project_id, "API", "");
        parent.parent_id = Some(root.id);
        let parent = store.insert_task_placed(parent).unwrap();
        assert_eq!(parent.level, 1);

        // Hoist the parent to the root; a child built before the move must
        // still land at the parent's current level + 1.
        let mut child = Task::new(project_id, "Routes", "");
        child.parent_id = Some(parent.id);
        store.reparent_task(parent.id, None, 0).unwrap();

        let child = store.insert_task_placed(child).unwrap();
        assert_eq!(child.level, 1);
    }

    #[test]
    fn test_same_title_under_different_parents() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        let phase_a = Task::new(project_id, "Backend", "");
        let phase_b = Task::new(project_id, "Frontend", "");
        let (a_id, b_id) = (phase_a.id, phase_b.id);
        store.insert_task(phase_a).unwrap();
        store.insert_task(phase_b).unwrap();

        for parent in [a_id, b_id] {
            let mut task = Task::new(project_id, "Setup", "");
            task.parent_id = Some(parent);
            task.level = 1;
            store.insert_task(task).unwrap();
        }
        assert_eq!(store.children_of(a_id).len(), 1);
        assert_eq!(store.children_of(b_id).len(), 1);
    }

    #[test]
    fn test_unchecked_insert_keeps_first_index_entry() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        let first = Task::new(project_id, "Setup", "");
        let first_id = first.id;
        store.insert_task(first).unwrap();
        store
            .insert_task_unchecked(Task::new(project_id, "Setup", ""))
            .unwrap();

        assert_eq!(store.lookup_title(project_id, None, "Setup"), Some(first_id));
        assert_eq!(store.task_count(), 2);
    }

    #[test]
    fn test_rename_rekeys_index() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        let task = Task::new(project_id, "Setup", "");
        let task_id = task.id;
        store.insert_task(task).unwrap();

        store.rename_task(task_id, "Setup (2)").unwrap();
        assert_eq!(store.lookup_title(project_id, None, "Setup"), None);
        assert_eq!(
            store.lookup_title(project_id, None, "Setup (2)"),
            Some(task_id)
        );
    }

    #[test]
    fn test_reparent_conflict_at_destination() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        let phase = Task::new(project_id, "Backend", "");
        let phase_id = phase.id;
        store.insert_task(phase).unwrap();

        let mut child = Task::new(project_id, "Setup", "");
        child.parent_id = Some(phase_id);
        child.level = 1;
        store.insert_task(child).unwrap();

        // Root already has no "Setup"; but phase does, so moving a root
        // "Setup" under the phase must conflict.
        let loose = Task::new(project_id, "Setup", "");
        let loose_id = loose.id;
        store.insert_task(loose).unwrap();

        let err = store.reparent_task(loose_id, Some(phase_id), 1).unwrap_err();
        assert!(matches!(err, PlanError::Conflict { .. }));
    }

    #[test]
    fn test_children_sorted_by_order() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);

        let phase = Task::new(project_id, "Backend", "");
        let phase_id = phase.id;
        store.insert_task(phase).unwrap();

        for (i, title) in ["First", "Second", "Third"].iter().enumerate() {
            let mut task = Task::new(project_id, *title, "");
            task.parent_id = Some(phase_id);
            task.level = 1;
            task.order = i as u32;
            store.insert_task(task).unwrap();
        }

        let titles: Vec<String> = store
            .children_of(phase_id)
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_document_upsert_replaces_content() {
        let store = PlanStore::new();
        let (_, project_id) = seed_project(&store);
        let task = Task::new(project_id, "Setup", "");
        let task_id = task.id;
        store.insert_task(task).unwrap();

        let first = store
            .upsert_document(TaskDocument::new(task_id, "Plan", "v1", DocumentKind::Plan))
            .unwrap();
        let second = store
            .upsert_document(TaskDocument::new(task_id, "Plan", "v2", DocumentKind::Plan))
            .unwrap();

        assert_eq!(first.id, second.id);
        let docs = store.documents_of(task_id);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "v2");
    }

    #[test]
    fn test_count_estimations_in_month() {
        let store = PlanStore::new();
        let (user_id, project_id) = seed_project(&store);

        let in_month = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
        let other_month = Utc.with_ymd_and_hms(2026, 7, 31, 12, 0, 0).unwrap();

        for created_at in [in_month, in_month, other_month] {
            let mut estimation =
                Estimation::new(project_id, EstimationBreakdown::default());
            estimation.created_at = created_at;
            store.insert_estimation(estimation).unwrap();
        }

        let now = Utc.with_ymd_and_hms(2026, 8, 20, 0, 0, 0).unwrap();
        assert_eq!(store.count_estimations_in_month(user_id, now), 2);

        // Other users see none of these
        assert_eq!(store.count_estimations_in_month(Uuid::new_v4(), now), 0);
    }

    #[test]
    fn test_subscription_roundtrip() {
        let store = PlanStore::new();
        let (user_id, _) = seed_project(&store);
        assert!(store.subscription_of(user_id).is_none());

        store.upsert_subscription(Subscription {
            user_id,
            plan: Plan::Pro,
            active: true,
        });
        assert!(store.subscription_of(user_id).unwrap().is_unmetered());
    }
}
