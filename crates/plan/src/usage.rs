//! Estimation usage metering.
//!
//! Free-tier users get a fixed number of estimations per calendar month,
//! counted across all their projects. Billing itself is an external
//! collaborator; the store only mirrors subscription state from its
//! webhook contract.

use chrono::{DateTime, Utc};

use crate::entities::{Estimation, EstimationBreakdown, ProjectId, UserId};
use crate::errors::{PlanError, PlanResult};
use crate::store::PlanStore;

/// Monthly allowance on the free tier.
pub const FREE_TIER_MONTHLY_ESTIMATIONS: u32 = 3;

/// Fail with `QuotaExceeded` when a free-tier user is at their monthly
/// limit. An active Pro subscription is unmetered.
pub fn check_estimation_quota(
    store: &PlanStore,
    user_id: UserId,
    now: DateTime<Utc>,
) -> PlanResult<()> {
    if let Some(subscription) = store.subscription_of(user_id) {
        if subscription.is_unmetered() {
            return Ok(());
        }
    }

    let used = store.count_estimations_in_month(user_id, now);
    if used >= FREE_TIER_MONTHLY_ESTIMATIONS {
        return Err(PlanError::QuotaExceeded {
            used,
            limit: FREE_TIER_MONTHLY_ESTIMATIONS,
        });
    }
    Ok(())
}

/// Run the quota gate, then record the estimation snapshot.
pub fn record_estimation(
    store: &PlanStore,
    user_id: UserId,
    project_id: ProjectId,
    breakdown: EstimationBreakdown,
    now: DateTime<Utc>,
) -> PlanResult<Estimation> {
    check_estimation_quota(store, user_id, now)?;
    let mut estimation = Estimation::new(project_id, breakdown);
    estimation.created_at = now;
    store.insert_estimation(estimation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Plan, Project, Subscription, User};
    use chrono::TimeZone;

    fn setup() -> (PlanStore, UserId, ProjectId) {
        let store = PlanStore::new();
        let user = User::new("dev@example.com");
        let user_id = user.id;
        store.insert_user(user);
        let project = Project::new(user_id, "Test");
        let project_id = project.id;
        store.insert_project(project);
        (store, user_id, project_id)
    }

    #[test]
    fn test_free_tier_fourth_estimation_rejected() {
        let (store, user_id, project_id) = setup();
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();

        for _ in 0..3 {
            record_estimation(
                &store,
                user_id,
                project_id,
                EstimationBreakdown::default(),
                now,
            )
            .unwrap();
        }

        let err = record_estimation(
            &store,
            user_id,
            project_id,
            EstimationBreakdown::default(),
            now,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::QuotaExceeded { used: 3, limit: 3 }));
    }

    #[test]
    fn test_quota_resets_next_month() {
        let (store, user_id, project_id) = setup();
        let august = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
        let september = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();

        for _ in 0..3 {
            record_estimation(
                &store,
                user_id,
                project_id,
                EstimationBreakdown::default(),
                august,
            )
            .unwrap();
        }

        assert!(check_estimation_quota(&store, user_id, september).is_ok());
    }

    #[test]
    fn test_pro_is_unmetered() {
        let (store, user_id, project_id) = setup();
        store.upsert_subscription(Subscription {
            user_id,
            plan: Plan::Pro,
            active: true,
        });

        let now = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
        for _ in 0..10 {
            record_estimation(
                &store,
                user_id,
                project_id,
                EstimationBreakdown::default(),
                now,
            )
            .unwrap();
        }
    }

    #[test]
    fn test_lapsed_pro_is_metered() {
        let (store, user_id, _) = setup();
        store.upsert_subscription(Subscription {
            user_id,
            plan: Plan::Pro,
            active: false,
        });

        let now = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
        assert!(check_estimation_quota(&store, user_id, now).is_ok());
    }
}
