//! Application facade
//!
//! `App` is the surface a view layer talks to: per-resource loads, section
//! navigation, targeted refreshes, cache clearing, loading flags, the visible
//! collections and the derived statistics. It owns nothing a test cannot
//! replace; everything is wired from a [`LoaderContext`].

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::data::{Collection, EnvCredentials, HttpTransport, ResourceId};
use crate::loader::{Loaded, LoaderContext, LoaderSet};
use crate::notify::Notifier;
use crate::orchestrator::{LoadOrchestrator, SectionOutcome};
use crate::refresh::MutationRefresh;
use crate::section::SectionId;
use crate::state::{ActiveSection, DashboardState, LoadingState};
use crate::stats::DashboardStats;

/// Errors raised while wiring the application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Could not determine a cache directory; set cache_dir in the config file")]
    NoCacheDir,
}

/// What `refresh_data` ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum Refreshed {
    /// A single resource was reloaded
    Resource(Loaded),
    /// The active section was re-run
    Section(SectionOutcome),
}

/// The data layer as seen by the UI
#[derive(Debug, Clone)]
pub struct App {
    loaders: LoaderSet,
    state: DashboardState,
    orchestrator: LoadOrchestrator,
    mutations: MutationRefresh,
}

impl App {
    /// Wires the production collaborators described by `config`
    ///
    /// # Arguments
    /// * `config` - Tenant, API location and optional cache root
    /// * `notifier` - Where fallback and timeout notices are sent
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let cache = match &config.cache_dir {
            Some(root) => CacheStore::for_tenant(root, &config.tenant),
            None => CacheStore::open(&config.tenant).ok_or(AppError::NoCacheDir)?,
        };
        info!(
            tenant = %config.tenant,
            base_url = %config.api.base_url,
            cache_dir = %cache.dir().display(),
            "data layer ready"
        );

        Ok(Self::with_loaders(LoaderSet::new(LoaderContext {
            tenant: config.tenant.clone(),
            cache,
            transport: Arc::new(HttpTransport::new(config.api.base_url.clone())),
            credentials: Arc::new(EnvCredentials),
            notifier,
            loading: LoadingState::new(),
            call_timeout: config.call_timeout(),
        })))
    }

    /// Builds the facade over an existing loader set (used for testing)
    pub fn with_loaders(loaders: LoaderSet) -> Self {
        let state = DashboardState::new();
        let orchestrator =
            LoadOrchestrator::new(loaders.clone(), state.clone(), ActiveSection::new());
        let mutations = MutationRefresh::new(loaders.clone(), state.clone());
        Self {
            loaders,
            state,
            orchestrator,
            mutations,
        }
    }

    pub fn tenant(&self) -> &str {
        &self.loaders.context().tenant
    }

    /// Loads one resource and shows the result
    pub async fn load(&self, resource: ResourceId, force_refresh: bool) -> Loaded {
        let loaded = self.loaders.get(resource).load(force_refresh).await;
        self.state.commit(resource, loaded.data.clone());
        loaded
    }

    /// Switches to `section` and loads everything it needs
    pub async fn navigate(&self, section: SectionId) -> SectionOutcome {
        self.orchestrator.run_section(section).await
    }

    /// Forces a reload
    ///
    /// # Arguments
    /// * `resource` - Reload just this resource; `None` re-runs the active
    ///   section (the overview if nothing has been shown yet)
    pub async fn refresh_data(&self, resource: Option<ResourceId>) -> Refreshed {
        match resource {
            Some(resource) => Refreshed::Resource(self.load(resource, true).await),
            None => {
                let section = self.active_section().unwrap_or(SectionId::Overview);
                Refreshed::Section(self.navigate(section).await)
            }
        }
    }

    /// Call once a create, update or delete against `resource` has succeeded
    pub async fn after_mutation(&self, resource: ResourceId) -> Loaded {
        self.mutations.after_mutation(resource).await
    }

    /// Removes one cache entry, or every entry of this tenant
    pub fn clear_cache(&self, key: Option<&str>) -> io::Result<()> {
        self.loaders.cache().clear(key)
    }

    pub fn loading_flags(&self) -> BTreeMap<ResourceId, bool> {
        self.loaders.loading().snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.loaders.loading().any()
    }

    /// The collection currently shown for `resource`, if it was ever loaded
    pub fn collection(&self, resource: ResourceId) -> Option<Collection> {
        self.state.get(resource)
    }

    pub fn collections(&self) -> HashMap<ResourceId, Collection> {
        self.state.snapshot()
    }

    pub fn active_section(&self) -> Option<SectionId> {
        self.orchestrator.active().current()
    }

    pub fn stats(&self) -> DashboardStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> DashboardStats {
        DashboardStats::compute(&self.state, now)
    }
}
