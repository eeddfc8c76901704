//! Domain entities for the planning data model.

mod document;
mod estimation;
mod project;
mod subtask;
mod task;
mod user;

pub use document::{DocumentKind, TaskDocument};
pub use estimation::{
    Estimation, EstimationBreakdown, EstimationStatus, PhaseEstimate, TaskEstimate,
};
pub use project::Project;
pub use subtask::SubTask;
pub use task::{Task, TaskStatus};
pub use user::{Plan, Subscription, User};

/// Identifier aliases. All entities use v4 UUIDs.
pub type ProjectId = uuid::Uuid;
pub type TaskId = uuid::Uuid;
pub type SubTaskId = uuid::Uuid;
pub type DocumentId = uuid::Uuid;
pub type EstimationId = uuid::Uuid;
pub type UserId = uuid::Uuid;
