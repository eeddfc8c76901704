//! Admin handlers.

use axum::extract::State;
use plan::ReconcileReport;

use crate::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

/// `POST /api/admin/reconcile`
///
/// Off-path batch repair of duplicate sibling titles, for data admitted
/// through the unchecked import path. Idempotent.
pub async fn reconcile(State(state): State<AppState>) -> ApiResult<ReconcileReport> {
    let report = state.hierarchy.reconcile_duplicates();
    if report.renamed > 0 {
        state.persist().await;
    }
    tracing::info!(
        groups = report.groups,
        renamed = report.renamed,
        "Reconcile run finished"
    );
    Ok(ApiResponse::ok(report))
}
