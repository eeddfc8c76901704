//! Whole-store JSON snapshot persistence.
//!
//! The server loads a snapshot at boot and saves after mutating handlers;
//! the admin binary works against the same files. Loading revalidates
//! levels against the parent chain and rebuilds the title index: entries
//! that collide are admitted through the unchecked path and left for
//! `reconcile_duplicates`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use super::PlanStore;
use crate::entities::{Estimation, Project, SubTask, Subscription, Task, TaskDocument, User};
use crate::errors::{PlanError, PlanResult};

/// Serialized form of the whole arena.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    #[serde(default)]
    pub documents: Vec<TaskDocument>,
    #[serde(default)]
    pub estimations: Vec<Estimation>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

impl PlanStore {
    /// Export the current contents as a snapshot.
    pub fn export(&self) -> StoreSnapshot {
        let arena = self.inner.read().unwrap();
        StoreSnapshot {
            projects: arena.projects.values().cloned().collect(),
            tasks: arena.tasks.values().cloned().collect(),
            subtasks: arena.subtasks.values().flatten().cloned().collect(),
            documents: arena.documents.values().flatten().cloned().collect(),
            estimations: arena.estimations.values().cloned().collect(),
            users: arena.users.values().cloned().collect(),
            subscriptions: arena.subscriptions.values().cloned().collect(),
        }
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Tasks are admitted parents-first; a task whose recorded level
    /// disagrees with its parent chain is corrected and logged.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> PlanResult<Self> {
        let store = Self::new();

        for user in snapshot.users {
            store.insert_user(user);
        }
        for subscription in snapshot.subscriptions {
            store.upsert_subscription(subscription);
        }
        for project in snapshot.projects {
            store.insert_project(project);
        }

        let mut tasks = snapshot.tasks;
        tasks.sort_by_key(|t| (t.level, t.created_at));
        for mut task in tasks {
            let expected_level = match task.parent_id {
                Some(pid) => store.get_task(pid)?.level + 1,
                None => 0,
            };
            if task.level != expected_level {
                tracing::warn!(
                    task_id = %task.id,
                    recorded = task.level,
                    expected = expected_level,
                    "Correcting task level from parent chain"
                );
                task.level = expected_level;
            }
            store.insert_task_unchecked(task)?;
        }

        for subtask in snapshot.subtasks {
            store.add_subtask(subtask)?;
        }
        for document in snapshot.documents {
            store.upsert_document(document)?;
        }
        for estimation in snapshot.estimations {
            store.insert_estimation(estimation)?;
        }

        Ok(store)
    }
}

/// Load a store from a snapshot file; a missing file yields an empty store.
pub async fn load(path: impl AsRef<Path>) -> PlanResult<PlanStore> {
    let path = path.as_ref();
    match fs::read_to_string(path).await {
        Ok(content) => {
            let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
            PlanStore::from_snapshot(snapshot)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No snapshot file, starting empty");
            Ok(PlanStore::new())
        }
        Err(e) => Err(PlanError::Storage {
            reason: format!("failed to read '{}': {e}", path.display()),
        }),
    }
}

/// Save the store to a snapshot file.
pub async fn save(store: &PlanStore, path: impl AsRef<Path>) -> PlanResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let content = serde_json::to_string_pretty(&store.export())?;
    fs::write(path, content)
        .await
        .map_err(|e| PlanError::Storage {
            reason: format!("failed to write '{}': {e}", path.display()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Project, Task, User};
    use tempfile::TempDir;

    fn seeded_store() -> PlanStore {
        let store = PlanStore::new();
        let user = User::new("dev@example.com");
        let project = Project::new(user.id, "Test");
        let project_id = project.id;
        store.insert_user(user);
        store.insert_project(project);

        let phase = Task::new(project_id, "Backend", "");
        let phase_id = phase.id;
        store.insert_task(phase).unwrap();

        let mut child = Task::new(project_id, "Setup", "");
        child.parent_id = Some(phase_id);
        child.level = 1;
        store.insert_task(child).unwrap();
        store
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");

        let store = seeded_store();
        save(&store, &path).await.unwrap();

        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.task_count(), store.task_count());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = load(temp.path().join("missing.json")).await.unwrap();
        assert_eq!(store.task_count(), 0);
    }

    #[tokio::test]
    async fn test_load_corrects_levels() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");

        let store = seeded_store();
        let mut snapshot = store.export();
        // Corrupt a child level
        for task in &mut snapshot.tasks {
            if task.parent_id.is_some() {
                task.level = 7;
            }
        }
        fs::write(&path, serde_json::to_string(&snapshot).unwrap())
            .await
            .unwrap();

        let loaded = load(&path).await.unwrap();
        let bad = loaded.all_tasks().into_iter().find(|t| t.level == 7);
        assert!(bad.is_none());
    }
}
