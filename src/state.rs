//! Shared, in-memory view state
//!
//! Three small pieces of state are shared between the loaders, the
//! orchestrator and the UI:
//! - [`LoadingState`]: which resources have a network call outstanding
//! - [`DashboardState`]: the collections currently visible
//! - [`ActiveSection`]: which section is on screen, used by the relevance guard
//!
//! Locks are only held for the duration of a map operation, never across an
//! `.await`.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::data::{Collection, ResourceId};
use crate::section::SectionId;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-resource "network call outstanding" flags
#[derive(Debug, Clone, Default)]
pub struct LoadingState {
    flags: Arc<Mutex<HashMap<ResourceId, bool>>>,
}

impl LoadingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self, resource: ResourceId) -> bool {
        lock(&self.flags).get(&resource).copied().unwrap_or(false)
    }

    /// True while any resource has a call outstanding
    pub fn any(&self) -> bool {
        lock(&self.flags).values().any(|loading| *loading)
    }

    /// Read-only copy of every flag, including resources never loaded
    pub fn snapshot(&self) -> BTreeMap<ResourceId, bool> {
        let flags = lock(&self.flags);
        ResourceId::ALL
            .into_iter()
            .map(|id| (id, flags.get(&id).copied().unwrap_or(false)))
            .collect()
    }

    pub(crate) fn set(&self, resource: ResourceId, loading: bool) {
        lock(&self.flags).insert(resource, loading);
    }
}

/// Identifies one navigation: a section plus a monotonically increasing generation
///
/// Results fetched under a token are only shown while that token is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationToken {
    pub section: SectionId,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct ActiveInner {
    current: Option<NavigationToken>,
    next_generation: u64,
}

/// The section currently on screen
#[derive(Debug, Clone, Default)]
pub struct ActiveSection {
    inner: Arc<Mutex<ActiveInner>>,
}

impl ActiveSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `section` the active one and supersedes every earlier token
    pub fn enter(&self, section: SectionId) -> NavigationToken {
        let mut inner = lock(&self.inner);
        inner.next_generation += 1;
        let token = NavigationToken {
            section,
            generation: inner.next_generation,
        };
        inner.current = Some(token);
        token
    }

    pub fn current(&self) -> Option<SectionId> {
        lock(&self.inner).current.map(|token| token.section)
    }

    pub fn current_token(&self) -> Option<NavigationToken> {
        lock(&self.inner).current
    }

    pub fn is_current(&self, token: &NavigationToken) -> bool {
        lock(&self.inner).current.as_ref() == Some(token)
    }
}

/// Collections currently visible to the user
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    collections: Arc<Mutex<HashMap<ResourceId, Collection>>>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the visible collection for `resource`
    pub fn commit(&self, resource: ResourceId, data: Collection) {
        lock(&self.collections).insert(resource, data);
    }

    /// Commits only if `token` is still the active navigation
    ///
    /// The navigation lock is held across the check and the write so a
    /// concurrent `enter` cannot slip in between. Returns whether the
    /// collection was applied.
    pub fn commit_if_current(
        &self,
        active: &ActiveSection,
        token: &NavigationToken,
        resource: ResourceId,
        data: Collection,
    ) -> bool {
        let navigation = lock(&active.inner);
        if navigation.current.as_ref() != Some(token) {
            return false;
        }
        lock(&self.collections).insert(resource, data);
        true
    }

    pub fn get(&self, resource: ResourceId) -> Option<Collection> {
        lock(&self.collections).get(&resource).cloned()
    }

    /// Number of visible records for `resource` (0 if never loaded)
    pub fn len(&self, resource: ResourceId) -> usize {
        lock(&self.collections).get(&resource).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.collections).is_empty()
    }

    pub fn snapshot(&self) -> HashMap<ResourceId, Collection> {
        lock(&self.collections).clone()
    }
}
