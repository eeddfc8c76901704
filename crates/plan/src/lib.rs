//! Scopeline planning library.
//!
//! Provides the task-tree data model (project → phase → task → subtask),
//! the hierarchy manager that keeps sibling titles unique, the AI backend
//! selector and provider clients, the chat/tool orchestrator, and
//! estimation usage metering.

pub mod ai;
pub mod entities;
pub mod errors;
pub mod hierarchy;
pub mod store;
pub mod usage;

pub use errors::{PlanError, PlanResult};
pub use hierarchy::{HierarchyManager, NewTask, ReconcileReport};
pub use store::PlanStore;
