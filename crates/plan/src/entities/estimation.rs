//! Estimation snapshot entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EstimationId, ProjectId};
use crate::errors::PlanError;

/// A single estimated task inside a phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEstimate {
    pub name: String,
    pub hours: f64,
    /// Free-form complexity label (e.g. "low", "medium", "high")
    pub complexity: String,
}

/// A phase with its estimated tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseEstimate {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<TaskEstimate>,
}

/// The stored breakdown shape: `{ phases: [{ name, tasks: [...] }] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimationBreakdown {
    #[serde(default)]
    pub phases: Vec<PhaseEstimate>,
}

impl EstimationBreakdown {
    /// Sum of all task hours across phases.
    pub fn total_hours(&self) -> f64 {
        self.phases
            .iter()
            .flat_map(|p| p.tasks.iter())
            .map(|t| t.hours)
            .sum()
    }
}

/// Estimation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EstimationStatus {
    #[default]
    Draft,
    Confirmed,
    Completed,
}

impl std::fmt::Display for EstimationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for EstimationStatus {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            _ => Err(PlanError::InvalidStatus {
                status: s.to_string(),
            }),
        }
    }
}

/// Snapshot breakdown attached to a project.
///
/// Immutable after creation except for `status`. Creation is what the
/// usage meter counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimation {
    pub id: EstimationId,

    pub project_id: ProjectId,

    pub breakdown: EstimationBreakdown,

    #[serde(default)]
    pub status: EstimationStatus,

    pub created_at: DateTime<Utc>,
}

impl Estimation {
    pub fn new(project_id: ProjectId, breakdown: EstimationBreakdown) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            breakdown,
            status: EstimationStatus::Draft,
            created_at: Utc::now(),
        }
    }
}
