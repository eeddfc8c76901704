//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use plan::ai::{ChatOrchestrator, ProviderCredentials};
use plan::store::snapshot;
use plan::{HierarchyManager, PlanStore};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PlanStore>,
    pub hierarchy: HierarchyManager,
    pub orchestrator: ChatOrchestrator,
    snapshot_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        store: Arc<PlanStore>,
        creds: ProviderCredentials,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        let hierarchy = HierarchyManager::new(store.clone());
        let orchestrator = ChatOrchestrator::new(store.clone(), creds);
        Self {
            store,
            hierarchy,
            orchestrator,
            snapshot_path,
        }
    }

    /// Save the store snapshot after a mutating handler.
    ///
    /// Best-effort: a failed save is logged, not surfaced, so a disk
    /// hiccup cannot fail a request whose state change already happened.
    pub async fn persist(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Err(e) = snapshot::save(&self.store, path).await {
            tracing::warn!(error = %e, path = %path.display(), "Snapshot save failed");
        }
    }
}
