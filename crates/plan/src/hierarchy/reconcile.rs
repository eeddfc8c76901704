//! Offline duplicate-title repair.
//!
//! Duplicates cannot enter through the live creation path (the store's
//! index plus suffix retry closes that race), but snapshot imports go
//! through the unchecked path and legacy data may carry collisions. This
//! batch pass finds and renames them; it runs off the request path.

use std::collections::HashMap;

use serde::Serialize;

use super::HierarchyManager;
use crate::entities::TaskId;

/// Counts from a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReconcileReport {
    /// Duplicate groups found
    pub groups: usize,
    /// Tasks renamed
    pub renamed: usize,
}

impl HierarchyManager {
    /// Detect and repair duplicate sibling titles across all projects.
    ///
    /// Tasks are grouped by `(project_id, parent_id, title)`; in each group
    /// of two or more the earliest-created member keeps the title and the
    /// rest get the smallest free numeric suffix at rename time. Idempotent:
    /// a second run finds zero groups.
    pub fn reconcile_duplicates(&self) -> ReconcileReport {
        let mut groups: HashMap<(TaskId, Option<TaskId>, String), Vec<_>> = HashMap::new();
        for task in self.store().all_tasks() {
            groups
                .entry((task.project_id, task.parent_id, task.title.clone()))
                .or_default()
                .push(task);
        }

        let mut report = ReconcileReport::default();
        for ((project_id, parent_id, title), mut members) in groups {
            if members.len() < 2 {
                continue;
            }
            report.groups += 1;
            members.sort_by_key(|t| (t.created_at, t.order, t.id));

            // First occurrence keeps the title
            for duplicate in members.into_iter().skip(1) {
                let new_title = self.ensure_unique_title(project_id, parent_id, &title);
                match self.store().rename_task(duplicate.id, &new_title) {
                    Ok(_) => {
                        report.renamed += 1;
                        tracing::info!(
                            task_id = %duplicate.id,
                            from = %title,
                            to = %new_title,
                            "Renamed duplicate task"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            task_id = %duplicate.id,
                            error = %e,
                            "Failed to rename duplicate task"
                        );
                    }
                }
            }
        }
        report
    }
}
