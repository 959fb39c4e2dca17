//! Targeted refresh after writes
//!
//! Once a create, update or delete against a resource succeeds, only that
//! resource is reloaded and only its visible collection is replaced. Sections
//! are never re-run from here.

use futures::future::join_all;
use tracing::info;

use crate::data::ResourceId;
use crate::loader::{Loaded, LoaderSet};
use crate::state::DashboardState;

/// Reloads exactly the resources a successful mutation touched
#[derive(Debug, Clone)]
pub struct MutationRefresh {
    loaders: LoaderSet,
    state: DashboardState,
}

impl MutationRefresh {
    pub fn new(loaders: LoaderSet, state: DashboardState) -> Self {
        Self { loaders, state }
    }

    /// Reloads `resource` from a call issued after the write, and commits it
    ///
    /// A load already in flight may predate the write, so it is never reused.
    /// The commit is unconditional: the view that issued the write is the one
    /// on screen. Fallback data is committed too, so a failed reload still
    /// leaves the view consistent with what the loader reported.
    pub async fn after_mutation(&self, resource: ResourceId) -> Loaded {
        info!(resource = %resource, "refreshing after mutation");
        let loaded = self.loaders.get(resource).refetch().await;
        self.state.commit(resource, loaded.data.clone());
        loaded
    }

    /// Refreshes several resources touched by one write, concurrently
    ///
    /// # Arguments
    /// * `resources` - Every resource the write affected; duplicates are
    ///   coalesced by the loaders
    pub async fn after_mutations(&self, resources: &[ResourceId]) -> Vec<Loaded> {
        join_all(resources.iter().map(|&resource| self.after_mutation(resource))).await
    }
}
